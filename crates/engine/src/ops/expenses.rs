use chrono::NaiveDate;
use uuid::Uuid;

use crate::{EngineError, Expense, ExpenseSource, ResultEngine, Transfer};

use super::Engine;

impl Engine {
    /// Validate `expense` and append it to the group's ledger.
    pub fn add_expense(&mut self, group_id: Uuid, expense: Expense) -> ResultEngine<()> {
        let group = self
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("group {group_id}")))?;
        group.add_expense(expense, &*self.rates)
    }

    /// Run a producer against the group and append what it produced.
    pub fn submit(&mut self, group_id: Uuid, source: impl ExpenseSource) -> ResultEngine<Uuid> {
        let expense = source.produce(self.require_group(group_id)?)?;
        let id = expense.id;
        self.add_expense(group_id, expense)?;
        Ok(id)
    }

    /// Record that `transfer` was paid.
    pub fn record_settlement(
        &mut self,
        group_id: Uuid,
        transfer: &Transfer,
        date: NaiveDate,
    ) -> ResultEngine<Uuid> {
        let entry = Expense::settlement(group_id, transfer, date);
        let id = entry.id;
        self.add_expense(group_id, entry)?;
        tracing::info!(
            group = %group_id,
            from = %transfer.from,
            to = %transfer.to,
            amount = %transfer.amount,
            "settlement recorded"
        );
        Ok(id)
    }

    /// Undo an entry by appending its exact mirror. The original stays in
    /// the ledger.
    pub fn reverse_expense(&mut self, group_id: Uuid, expense_id: Uuid, date: NaiveDate) -> ResultEngine<Uuid> {
        let reversal = self
            .require_group(group_id)?
            .expense(expense_id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("expense {expense_id}")))?
            .reversal(date);
        let id = reversal.id;
        self.add_expense(group_id, reversal)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Currency, ExpenseDraft, MemberId, Money};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn setup() -> (Engine, Uuid) {
        let mut engine = Engine::builder().build();
        let id = engine
            .create_group("Cabin", Currency::Usd, ["Alice", "Bob"])
            .unwrap();
        (engine, id)
    }

    #[test]
    fn unknown_group_is_reported() {
        let (mut engine, _) = setup();
        let err = engine
            .submit(Uuid::new_v4(), ExpenseDraft::new("Fuel", "10", "Alice", date(1)))
            .unwrap_err();
        assert!(matches!(err, EngineError::KeyNotFound(_)));
    }

    #[test]
    fn recorded_settlement_clears_debt() {
        let (mut engine, group) = setup();
        engine
            .submit(group, ExpenseDraft::new("Fuel", "10.00", "Alice", date(1)))
            .unwrap();
        let transfers = engine.settle(group, date(2)).unwrap();
        assert_eq!(transfers.len(), 1);
        engine.record_settlement(group, &transfers[0], date(2)).unwrap();

        let balances = engine.compute_balances(group).unwrap();
        assert!(balances.values().all(|b| b.is_zero()));
    }

    #[test]
    fn settlement_between_non_members_is_rejected() {
        let (mut engine, group) = setup();
        let transfer = Transfer {
            from: MemberId::new("mallory").unwrap(),
            to: MemberId::new("alice").unwrap(),
            amount: Money::new(100, Currency::Usd),
        };
        assert_eq!(
            engine.record_settlement(group, &transfer, date(1)),
            Err(EngineError::UnknownMember("mallory".to_string()))
        );
    }

    #[test]
    fn reverse_expense_undoes_entry() {
        let (mut engine, group) = setup();
        let expense = engine
            .submit(group, ExpenseDraft::new("Fuel", "10.00", "Alice", date(1)))
            .unwrap();
        engine.reverse_expense(group, expense, date(3)).unwrap();

        assert_eq!(engine.group(group).unwrap().expenses().len(), 2);
        let balances = engine.compute_balances(group).unwrap();
        assert!(balances.values().all(|b| b.is_zero()));

        assert!(matches!(
            engine.reverse_expense(group, Uuid::new_v4(), date(3)),
            Err(EngineError::KeyNotFound(_))
        ));
    }
}
