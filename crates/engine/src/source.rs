//! Expense producers.
//!
//! Form entry, receipt scanning and SMS import all end up emitting the same
//! [`Expense`] shape. Each producer is an [`ExpenseSource`]: it either builds
//! a valid expense for a group or fails. The engine ships the form adapter,
//! [`ExpenseDraft`]; text parsers live outside the engine and can implement
//! the trait themselves.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    Category, Currency, EngineError, Expense, Group, MemberId, Money, Rate, ResultEngine,
    util::normalize_optional_text,
};

pub trait ExpenseSource {
    /// Produce a valid expense for `group`, or fail.
    fn produce(self, group: &Group) -> ResultEngine<Expense>;
}

impl ExpenseSource for Expense {
    fn produce(self, _group: &Group) -> ResultEngine<Expense> {
        Ok(self)
    }
}

/// How an amount is divided among share-holders.
///
/// Members are referenced by display name or id. Remainders from integer
/// division always go to the first members in id order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "members", rename_all = "snake_case")]
pub enum SplitRule {
    /// Equal split across every member of the group.
    #[default]
    Equal,
    /// Equal split across the listed members only.
    EqualAmong(Vec<String>),
    /// Explicit per-member amounts, in the expense currency.
    Exact(BTreeMap<String, String>),
    /// Split proportional to integer weights.
    Weighted(BTreeMap<String, u64>),
}

impl SplitRule {
    /// Resolves the rule into concrete shares of `amount`.
    pub fn shares(&self, group: &Group, amount: Money) -> ResultEngine<BTreeMap<MemberId, Money>> {
        match self {
            SplitRule::Equal => {
                let members: Vec<MemberId> = group.members.keys().cloned().collect();
                split_evenly(amount, members)
            }
            SplitRule::EqualAmong(names) => {
                let members = resolve_unique(group, names.iter().map(String::as_str))?;
                split_evenly(amount, members)
            }
            SplitRule::Exact(amounts) => {
                let members = resolve_unique(group, amounts.keys().map(String::as_str))?;
                members
                    .into_iter()
                    .zip(amounts.values())
                    .map(|(member, raw)| {
                        Money::parse(raw, amount.currency()).map(|share| (member, share))
                    })
                    .collect()
            }
            SplitRule::Weighted(weights) => {
                let members = resolve_unique(group, weights.keys().map(String::as_str))?;
                let mut by_member: BTreeMap<MemberId, u64> = BTreeMap::new();
                for (member, weight) in members.into_iter().zip(weights.values()) {
                    by_member.insert(member, *weight);
                }
                let ordered: Vec<u64> = by_member.values().copied().collect();
                let parts = amount.allocate(&ordered)?;
                Ok(by_member.into_keys().zip(parts).collect())
            }
        }
    }
}

fn split_evenly(amount: Money, mut members: Vec<MemberId>) -> ResultEngine<BTreeMap<MemberId, Money>> {
    members.sort();
    let parts = amount.split_evenly(members.len())?;
    Ok(members.into_iter().zip(parts).collect())
}

fn resolve_unique<'a, I>(group: &Group, names: I) -> ResultEngine<Vec<MemberId>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = Vec::new();
    for name in names {
        let id = group.resolve_member(name)?;
        if seen.contains(&id) {
            return Err(EngineError::InvalidSplit(format!(
                "member '{}' listed more than once",
                name.trim()
            )));
        }
        seen.push(id);
    }
    Ok(seen)
}

/// Structured input from the add-expense form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub description: String,
    /// Amount in major units, e.g. `"12.50"`.
    pub amount: String,
    /// Defaults to the group's home currency.
    #[serde(default)]
    pub currency: Option<Currency>,
    pub payer: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub fx_rate_to_home: Option<Rate>,
    /// Defaults to the group's split rule.
    #[serde(default)]
    pub split: Option<SplitRule>,
}

impl ExpenseDraft {
    pub fn new(
        description: impl Into<String>,
        amount: impl Into<String>,
        payer: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            description: description.into(),
            amount: amount.into(),
            currency: None,
            payer: payer.into(),
            date,
            category: None,
            fx_rate_to_home: None,
            split: None,
        }
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn split(mut self, split: SplitRule) -> Self {
        self.split = Some(split);
        self
    }

    #[must_use]
    pub fn fx_rate_to_home(mut self, rate: Rate) -> Self {
        self.fx_rate_to_home = Some(rate);
        self
    }
}

impl ExpenseSource for ExpenseDraft {
    fn produce(self, group: &Group) -> ResultEngine<Expense> {
        let description = normalize_optional_text(Some(&self.description)).ok_or_else(|| {
            EngineError::InvalidName("expense description must not be empty".to_string())
        })?;
        let currency = self.currency.unwrap_or(group.home_currency);
        let amount = Money::parse(&self.amount, currency)?;
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "expense amount must be > 0, got {amount}"
            )));
        }
        let payer = group.resolve_member(&self.payer)?;
        let split = self.split.as_ref().unwrap_or(&group.default_split);
        let shares = split.shares(group, amount)?;

        let mut expense =
            Expense::new(group.id, payer, amount, shares, self.date).with_description(description);
        if let Some(category) = normalize_optional_text(self.category.as_deref()) {
            expense = expense.with_category(Category::new(&category)?);
        }
        if let Some(rate) = self.fx_rate_to_home {
            expense = expense.with_fx_rate_to_home(rate);
        }
        Ok(expense)
    }
}
