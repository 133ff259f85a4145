use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    Balances, BudgetLine, Category, EngineError, LedgerRow, Money, ResultEngine, Transfer,
    TripOutlook, trip_outlook,
};

use super::Engine;

impl Engine {
    /// Net balance of every member over the whole ledger.
    pub fn compute_balances(&self, group_id: Uuid) -> ResultEngine<Balances> {
        self.ledger(group_id)?.balances(None)
    }

    /// Net balance of every member from entries dated on or before `as_of`.
    pub fn compute_balances_as_of(&self, group_id: Uuid, as_of: NaiveDate) -> ResultEngine<Balances> {
        self.ledger(group_id)?.balances(Some(as_of))
    }

    /// Transfers that settle the group as of `as_of`.
    pub fn settle(&self, group_id: Uuid, as_of: NaiveDate) -> ResultEngine<Vec<Transfer>> {
        self.ledger(group_id)?
            .settlement_for(as_of)
            .inspect_err(|err| log_integrity_violation(group_id, err))
    }

    /// Spending per category in the home currency; settlements excluded.
    pub fn category_totals(
        &self,
        group_id: Uuid,
        as_of: Option<NaiveDate>,
    ) -> ResultEngine<BTreeMap<Category, Money>> {
        self.ledger(group_id)?.category_totals(as_of)
    }

    /// Trip budget for `category` minus its spending. Negative when
    /// overspent.
    pub fn remaining_budget(
        &self,
        group_id: Uuid,
        category: &Category,
        as_of: Option<NaiveDate>,
    ) -> ResultEngine<Money> {
        self.ledger(group_id)?.remaining_budget(category, as_of)
    }

    /// Remaining budget of every budgeted category of a trip.
    pub fn budget_report(&self, group_id: Uuid, as_of: Option<NaiveDate>) -> ResultEngine<Vec<BudgetLine>> {
        self.ledger(group_id)?.budget_report(as_of)
    }

    /// The group's entries flattened into rows, in append order.
    pub fn export_ledger(&self, group_id: Uuid) -> ResultEngine<Vec<LedgerRow>> {
        Ok(self.ledger(group_id)?.export_ledger())
    }

    /// Saving outlook of a trip group.
    pub fn trip_outlook(&self, group_id: Uuid, today: NaiveDate, monthly_savings: Money) -> ResultEngine<TripOutlook> {
        let plan = self
            .require_group(group_id)?
            .trip
            .as_ref()
            .ok_or_else(|| EngineError::KeyNotFound("group is not a trip".to_string()))?;
        trip_outlook(plan, today, monthly_savings)
    }
}

fn log_integrity_violation(group_id: Uuid, err: &EngineError) {
    if err.is_integrity_violation() {
        tracing::error!(group = %group_id, "ledger integrity violation: {err}");
    }
}
