//! Group and trip views: settlement, category spending, budgets, the
//! flattened ledger export, and the trip saving outlook.
//!
//! Everything here is a pure read over a [`Ledger`]; nothing is persisted and
//! no file I/O happens.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Category, Currency, EngineError, ExpenseKind, Ledger, MemberId, Money, ResultEngine, Transfer,
    TripPlan, settle,
};

/// A flattened expense for reports and CSV export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub expense_id: Uuid,
    pub date: NaiveDate,
    pub kind: String,
    pub description: String,
    pub category: Option<String>,
    pub payer: MemberId,
    pub amount: Money,
    pub currency: Currency,
    pub shares: Vec<(MemberId, Money)>,
}

impl Ledger<'_> {
    /// Transfers that settle every balance from entries dated on or before
    /// `as_of`, in the group's home currency.
    pub fn settlement_for(&self, as_of: NaiveDate) -> ResultEngine<Vec<Transfer>> {
        let balances = self.balances(Some(as_of))?;
        settle(&balances)
    }

    /// Spending per category in the home currency.
    ///
    /// Settlements are not spending and are skipped; reversals count against
    /// the category of the entry they undo.
    pub fn category_totals(&self, as_of: Option<NaiveDate>) -> ResultEngine<BTreeMap<Category, Money>> {
        let home = self.group.home_currency;
        let mut totals: BTreeMap<Category, Money> = BTreeMap::new();
        for expense in self.entries(as_of) {
            if expense.kind == ExpenseKind::Settlement {
                continue;
            }
            let category = expense
                .category
                .clone()
                .unwrap_or_else(Category::uncategorized);
            let amount = self.home_amount(expense, as_of)?;
            let total = totals.entry(category).or_insert_with(|| Money::zero(home));
            *total = total.try_add(amount)?;
        }
        Ok(totals)
    }

    /// Budget minus spending for `category`. Overspending yields a negative
    /// amount, which is a valid result.
    pub fn remaining_budget(&self, category: &Category, as_of: Option<NaiveDate>) -> ResultEngine<Money> {
        let plan = self.trip_plan()?;
        let budget = plan
            .budgets
            .get(category)
            .copied()
            .ok_or_else(|| EngineError::KeyNotFound(format!("budget for '{category}'")))?;
        let spent = self
            .category_totals(as_of)?
            .remove(category)
            .unwrap_or_else(|| Money::zero(self.group.home_currency));
        budget.try_sub(spent)
    }

    /// Remaining budget of every budgeted category.
    pub fn budget_report(&self, as_of: Option<NaiveDate>) -> ResultEngine<Vec<BudgetLine>> {
        let plan = self.trip_plan()?;
        let totals = self.category_totals(as_of)?;
        plan.budgets
            .iter()
            .map(|(category, budget)| {
                let spent = totals
                    .get(category)
                    .copied()
                    .unwrap_or_else(|| Money::zero(self.group.home_currency));
                Ok(BudgetLine {
                    category: category.clone(),
                    budget: *budget,
                    spent,
                    remaining: budget.try_sub(spent)?,
                })
            })
            .collect()
    }

    /// The ledger flattened into rows, in append order.
    #[must_use]
    pub fn export_ledger(&self) -> Vec<LedgerRow> {
        self.group
            .expenses
            .iter()
            .map(|expense| LedgerRow {
                expense_id: expense.id,
                date: expense.created_at,
                kind: expense.kind.as_str().to_string(),
                description: expense.description.clone(),
                category: expense.category.as_ref().map(|c| c.name().to_string()),
                payer: expense.payer.clone(),
                amount: expense.amount,
                currency: expense.currency(),
                shares: expense
                    .shares
                    .iter()
                    .map(|(member, share)| (member.clone(), *share))
                    .collect(),
            })
            .collect()
    }

    fn trip_plan(&self) -> ResultEngine<&TripPlan> {
        self.group
            .trip
            .as_ref()
            .ok_or_else(|| EngineError::KeyNotFound("group is not a trip".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub category: Category,
    pub budget: Money,
    pub spent: Money,
    pub remaining: Money,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripVerdict {
    Comfortable,
    Tight,
    Over,
    Today,
    Past,
}

/// Whether current savings cover a planned trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripOutlook {
    pub days_until: i64,
    pub daily_saving_needed: Money,
    pub projected_savings: Money,
    pub verdict: TripVerdict,
}

/// Projects `monthly_savings` forward to the trip start.
///
/// Savings accrue per 30-day month. `Tight` means the projection covers at
/// least 70% of the estimate.
pub fn trip_outlook(plan: &TripPlan, today: NaiveDate, monthly_savings: Money) -> ResultEngine<TripOutlook> {
    let cost = plan.estimated_cost;
    let currency = cost.currency();
    if monthly_savings.currency() != currency {
        return Err(EngineError::CurrencyMismatch(format!(
            "savings are in {}, trip estimate is in {currency}",
            monthly_savings.currency()
        )));
    }

    let days_until = (plan.start_date - today).num_days();
    if days_until <= 0 {
        return Ok(TripOutlook {
            days_until: 0,
            daily_saving_needed: Money::zero(currency),
            projected_savings: Money::zero(currency),
            verdict: if days_until == 0 {
                TripVerdict::Today
            } else {
                TripVerdict::Past
            },
        });
    }

    let daily = i128::from(cost.minor()).div_euclid(i128::from(days_until))
        + i128::from(i128::from(cost.minor()).rem_euclid(i128::from(days_until)) != 0);
    let projected = (i128::from(monthly_savings.minor()) * i128::from(days_until)).div_euclid(30);
    let to_money = |value: i128| {
        i64::try_from(value)
            .map(|minor| Money::new(minor, currency))
            .map_err(|_| EngineError::overflow())
    };
    let projected_savings = to_money(projected)?;

    let verdict = if projected >= i128::from(cost.minor()) {
        TripVerdict::Comfortable
    } else if projected * 10 >= i128::from(cost.minor()) * 7 {
        TripVerdict::Tight
    } else {
        TripVerdict::Over
    };

    Ok(TripOutlook {
        days_until,
        daily_saving_needed: to_money(daily)?,
        projected_savings,
        verdict,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{ConversionPolicy, ExpenseDraft, ExpenseSource, Group, NoRates};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn usd(minor: i64) -> Money {
        Money::new(minor, Currency::Usd)
    }

    fn trip() -> Group {
        let plan = TripPlan::new(usd(200_000), date(7, 1))
            .ending(date(7, 10))
            .with_budget(Category::new("Food").unwrap(), usd(30_000))
            .with_budget(Category::new("Lodging").unwrap(), usd(90_000));
        let mut group = Group::new("Lisbon", Currency::Usd, ["Alice", "Bob"])
            .unwrap()
            .with_trip(plan)
            .unwrap();
        for draft in [
            ExpenseDraft::new("Dinner", "120.00", "Alice", date(7, 1)).category("Food"),
            ExpenseDraft::new("Hotel", "950.00", "Bob", date(7, 1)).category("lodging"),
            ExpenseDraft::new("Lunch", "45.50", "Bob", date(7, 2)).category("food"),
            ExpenseDraft::new("Tram", "6.00", "Alice", date(7, 3)),
        ] {
            let expense = draft.produce(&group).unwrap();
            group.add_expense(expense, &NoRates).unwrap();
        }
        group
    }

    #[test]
    fn category_totals_group_by_normalized_name() {
        let group = trip();
        let ledger = Ledger::new(&group, &NoRates, ConversionPolicy::default());
        let totals = ledger.category_totals(None).unwrap();
        assert_eq!(totals[&Category::new("Food").unwrap()], usd(16_550));
        assert_eq!(totals[&Category::new("Lodging").unwrap()], usd(95_000));
        assert_eq!(totals[&Category::uncategorized()], usd(600));
    }

    #[test]
    fn remaining_budget_may_go_negative() {
        let group = trip();
        let ledger = Ledger::new(&group, &NoRates, ConversionPolicy::default());
        let food = Category::new("Food").unwrap();
        let lodging = Category::new("Lodging").unwrap();
        assert_eq!(ledger.remaining_budget(&food, None).unwrap(), usd(13_450));
        assert_eq!(ledger.remaining_budget(&lodging, None).unwrap(), usd(-5_000));
        assert_eq!(
            ledger.remaining_budget(&food, Some(date(7, 1))).unwrap(),
            usd(18_000)
        );
    }

    #[test]
    fn remaining_budget_requires_trip_and_budget() {
        let group = trip();
        let ledger = Ledger::new(&group, &NoRates, ConversionPolicy::default());
        assert!(matches!(
            ledger.remaining_budget(&Category::new("Museums").unwrap(), None),
            Err(EngineError::KeyNotFound(_))
        ));

        let plain = Group::new("Flat", Currency::Usd, ["Alice"]).unwrap();
        let ledger = Ledger::new(&plain, &NoRates, ConversionPolicy::default());
        assert!(matches!(
            ledger.remaining_budget(&Category::new("Food").unwrap(), None),
            Err(EngineError::KeyNotFound(_))
        ));
    }

    #[test]
    fn budget_report_lists_every_budget() {
        let group = trip();
        let ledger = Ledger::new(&group, &NoRates, ConversionPolicy::default());
        let report = ledger.budget_report(None).unwrap();
        let names: Vec<&str> = report.iter().map(|l| l.category.name()).collect();
        assert_eq!(names, vec!["Food", "Lodging"]);
        assert_eq!(report[1].remaining, usd(-5_000));
    }

    #[test]
    fn settlements_are_not_spending() {
        let mut group = trip();
        let ledger = Ledger::new(&group, &NoRates, ConversionPolicy::default());
        let transfers = ledger.settlement_for(date(7, 31)).unwrap();
        let before = ledger.category_totals(None).unwrap();
        for transfer in &transfers {
            let entry = crate::Expense::settlement(group.id, transfer, date(7, 31));
            group.add_expense(entry, &NoRates).unwrap();
        }
        let ledger = Ledger::new(&group, &NoRates, ConversionPolicy::default());
        assert_eq!(ledger.category_totals(None).unwrap(), before);
        assert!(ledger.settlement_for(date(7, 31)).unwrap().is_empty());
    }

    #[test]
    fn export_keeps_append_order() {
        let group = trip();
        let rows = Ledger::new(&group, &NoRates, ConversionPolicy::default()).export_ledger();
        let descriptions: Vec<&str> = rows.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Dinner", "Hotel", "Lunch", "Tram"]);
        assert_eq!(rows[0].kind, "expense");
        assert_eq!(rows[0].currency, Currency::Usd);
        assert_eq!(rows[0].shares.len(), 2);
        assert_eq!(rows[3].category, None);
    }

    #[rstest]
    #[case::comfortable(date(5, 2), 300_000, TripVerdict::Comfortable)]
    #[case::tight(date(5, 2), 75_000, TripVerdict::Tight)]
    #[case::over(date(5, 2), 50_000, TripVerdict::Over)]
    #[case::today(date(7, 1), 50_000, TripVerdict::Today)]
    #[case::past(date(7, 5), 50_000, TripVerdict::Past)]
    fn outlook_verdicts(#[case] today: NaiveDate, #[case] monthly: i64, #[case] verdict: TripVerdict) {
        let group = trip();
        let plan = group.trip.as_ref().unwrap();
        let outlook = trip_outlook(plan, today, usd(monthly)).unwrap();
        assert_eq!(outlook.verdict, verdict);
    }

    #[test]
    fn outlook_rounds_daily_saving_up() {
        let plan = TripPlan::new(usd(1_000), date(7, 1));
        let outlook = trip_outlook(&plan, date(6, 28), usd(3_000)).unwrap();
        assert_eq!(outlook.days_until, 3);
        assert_eq!(outlook.daily_saving_needed, usd(334));
        assert_eq!(outlook.projected_savings, usd(300));
        assert_eq!(outlook.verdict, TripVerdict::Over);
    }

    #[test]
    fn outlook_requires_matching_currency() {
        let plan = TripPlan::new(usd(1_000), date(7, 1));
        assert!(matches!(
            trip_outlook(&plan, date(6, 1), Money::new(100, Currency::Eur)),
            Err(EngineError::CurrencyMismatch(_))
        ));
    }
}
