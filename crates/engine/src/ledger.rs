//! The expense ledger.
//!
//! Balances are never stored: they are re-derived from the immutable expense
//! sequence on every query. Each entry is converted to the home currency
//! *before* summation, so the result doesn't depend on summation order and
//! the balances of a group always sum to exactly zero.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    Converter, EngineError, Expense, ExpenseKind, Group, MemberId, Money, RateSource, ResultEngine,
    fx::convert_with,
};

/// Net balance per member in the group's home currency.
///
/// Positive: the member is owed money. Negative: the member owes money.
pub type Balances = BTreeMap<MemberId, Money>;

/// Which date's exchange rate values a foreign-currency entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPolicy {
    /// Every entry is converted at the rate effective on its own date.
    #[default]
    AtExpenseDate,
    /// Every entry is converted at the rate effective on the query's as-of
    /// date. Queries without an as-of date fall back to the entry dates.
    AtSettlementDate,
}

impl Group {
    /// Validates `expense` against this group and appends it.
    ///
    /// Nothing is appended on failure. Callers must serialize writers per
    /// group: balances are re-derived from the full sequence, so a lost
    /// update would break conservation.
    pub fn add_expense(&mut self, expense: Expense, rates: &dyn RateSource) -> ResultEngine<()> {
        if let Err(err) = self.validate_expense(&expense, rates) {
            tracing::warn!(group = %self.id, expense = %expense.id, "rejected expense: {err}");
            return Err(err);
        }
        tracing::debug!(
            group = %self.id,
            expense = %expense.id,
            kind = expense.kind.as_str(),
            amount = %expense.amount,
            "expense appended"
        );
        self.expenses.push(expense);
        Ok(())
    }

    fn validate_expense(&self, expense: &Expense, rates: &dyn RateSource) -> ResultEngine<()> {
        if expense.group_id != self.id {
            return Err(EngineError::InvalidSplit(format!(
                "expense belongs to group {}, not {}",
                expense.group_id, self.id
            )));
        }
        if self.expense(expense.id).is_some() {
            return Err(EngineError::ExistingKey(expense.id.to_string()));
        }

        self.ensure_member(&expense.payer)?;
        for member in expense.shares.keys() {
            self.ensure_member(member)?;
        }
        expense.validate_shape()?;

        if let ExpenseKind::Reversal { of } = expense.kind {
            self.validate_reversal(expense, of)?;
        }

        if expense.fx_rate_to_home.is_none() {
            Converter::new(rates).rate(
                expense.currency(),
                self.home_currency,
                self.rate_date(expense),
            )?;
        }
        Ok(())
    }

    /// Date whose exchange rate values `expense`. A reversal is valued like
    /// the entry it undoes, so the two cancel exactly in the home currency.
    pub(crate) fn rate_date(&self, expense: &Expense) -> NaiveDate {
        match expense.kind {
            ExpenseKind::Reversal { of } => self
                .expense(of)
                .map_or(expense.created_at, |original| original.created_at),
            _ => expense.created_at,
        }
    }

    fn validate_reversal(&self, reversal: &Expense, of: uuid::Uuid) -> ResultEngine<()> {
        let original = self
            .expense(of)
            .ok_or_else(|| EngineError::KeyNotFound(of.to_string()))?;
        if reversal.created_at < original.created_at {
            return Err(EngineError::InvalidSplit(format!(
                "reversal dated {} precedes expense {of} dated {}",
                reversal.created_at, original.created_at
            )));
        }
        if matches!(original.kind, ExpenseKind::Reversal { .. }) {
            return Err(EngineError::InvalidSplit(
                "a reversal cannot itself be reversed".to_string(),
            ));
        }
        let already_reversed = self
            .expenses
            .iter()
            .any(|e| e.kind == ExpenseKind::Reversal { of });
        if already_reversed {
            return Err(EngineError::InvalidSplit(format!(
                "expense {of} is already reversed"
            )));
        }

        let mirrors = reversal.payer == original.payer
            && reversal.amount == -original.amount
            && reversal.fx_rate_to_home == original.fx_rate_to_home
            && reversal.shares.len() == original.shares.len()
            && original
                .shares
                .iter()
                .all(|(member, share)| reversal.shares.get(member) == Some(&-*share));
        if !mirrors {
            return Err(EngineError::InvalidSplit(format!(
                "reversal does not mirror expense {of}"
            )));
        }
        Ok(())
    }
}

/// Read-only view of a group's ledger bound to a rate source and policy.
///
/// Every query is pure; concurrent readers can share a view over the same
/// snapshot.
pub struct Ledger<'a> {
    pub(crate) group: &'a Group,
    pub(crate) converter: Converter<'a>,
    pub(crate) policy: ConversionPolicy,
}

impl<'a> Ledger<'a> {
    pub fn new(group: &'a Group, rates: &'a dyn RateSource, policy: ConversionPolicy) -> Self {
        Self {
            group,
            converter: Converter::new(rates),
            policy,
        }
    }

    #[must_use]
    pub fn group(&self) -> &'a Group {
        self.group
    }

    /// Entries dated on or before `as_of` (all entries when `None`).
    pub(crate) fn entries(&self, as_of: Option<NaiveDate>) -> impl Iterator<Item = &'a Expense> {
        self.group
            .expenses
            .iter()
            .filter(move |e| as_of.is_none_or(|date| e.created_at <= date))
    }

    fn valuation_date(&self, expense: &Expense, as_of: Option<NaiveDate>) -> NaiveDate {
        match (self.policy, as_of) {
            (ConversionPolicy::AtSettlementDate, Some(date)) => date,
            _ => self.group.rate_date(expense),
        }
    }

    /// Converts an entry's total to the home currency.
    pub(crate) fn home_amount(&self, expense: &Expense, as_of: Option<NaiveDate>) -> ResultEngine<Money> {
        let home = self.group.home_currency;
        match expense.fx_rate_to_home {
            Some(rate) => convert_with(expense.amount, home, rate),
            None => self
                .converter
                .convert(expense.amount, home, self.valuation_date(expense, as_of)),
        }
    }

    /// Net balance of every member from entries dated on or before `as_of`.
    pub fn balances(&self, as_of: Option<NaiveDate>) -> ResultEngine<Balances> {
        let home = self.group.home_currency;
        let mut balances: Balances = self
            .group
            .members
            .keys()
            .map(|id| (id.clone(), Money::zero(home)))
            .collect();

        for expense in self.entries(as_of) {
            let total = self.home_amount(expense, as_of)?;
            let shares = convert_shares(expense, total)?;

            credit(&mut balances, &expense.payer, total)?;
            for (member, share) in shares {
                credit(&mut balances, member, -share)?;
            }
        }
        Ok(balances)
    }
}

/// Splits `home_total` across the entry's share-holders proportionally to
/// their original shares, in member-id order.
pub(crate) fn convert_shares(expense: &Expense, home_total: Money) -> ResultEngine<Vec<(&MemberId, Money)>> {
    if home_total.currency() == expense.currency() {
        return Ok(expense.shares.iter().map(|(m, s)| (m, *s)).collect());
    }
    let weights: Vec<u64> = expense
        .shares
        .values()
        .map(|share| share.minor().unsigned_abs())
        .collect();
    let parts = home_total.allocate(&weights)?;
    Ok(expense.shares.keys().zip(parts).collect())
}

fn credit(balances: &mut Balances, member: &MemberId, amount: Money) -> ResultEngine<()> {
    let balance = balances
        .get_mut(member)
        .ok_or_else(|| EngineError::UnknownMember(member.to_string()))?;
    *balance = balance.try_add(amount)?;
    Ok(())
}
