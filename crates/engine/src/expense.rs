//! Expense primitives.
//!
//! An [`Expense`] is an immutable ledger entry: one payer, an amount, and the
//! portion each share-holder owes. Shares are always expressed in the
//! expense's own currency and reconcile exactly with the amount.
//!
//! Entries are never edited or deleted. A confirmed payment between members
//! is recorded as a [`ExpenseKind::Settlement`] entry and a mistake is undone
//! with an offsetting [`ExpenseKind::Reversal`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Category, Currency, EngineError, MemberId, Money, Rate, ResultEngine, Transfer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpenseKind {
    Expense,
    Settlement,
    Reversal { of: Uuid },
}

impl ExpenseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Settlement => "settlement",
            Self::Reversal { .. } => "reversal",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Uuid,
    pub kind: ExpenseKind,
    pub description: String,
    pub category: Option<Category>,
    pub payer: MemberId,
    pub amount: Money,
    pub shares: BTreeMap<MemberId, Money>,
    pub created_at: NaiveDate,
    /// Pinned conversion rate to the group's home currency. When present it
    /// takes precedence over the rate source.
    pub fx_rate_to_home: Option<Rate>,
}

impl Expense {
    /// Creates an ordinary shared expense.
    pub fn new(
        group_id: Uuid,
        payer: MemberId,
        amount: Money,
        shares: BTreeMap<MemberId, Money>,
        created_at: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            kind: ExpenseKind::Expense,
            description: String::new(),
            category: None,
            payer,
            amount,
            shares,
            created_at,
            fx_rate_to_home: None,
        }
    }

    /// Records a confirmed settlement transfer as a ledger entry.
    ///
    /// The sender is the payer and the receiver owes the whole amount, which
    /// moves both balances toward zero.
    pub fn settlement(group_id: Uuid, transfer: &Transfer, created_at: NaiveDate) -> Self {
        let mut entry = Self::new(
            group_id,
            transfer.from.clone(),
            transfer.amount,
            BTreeMap::from([(transfer.to.clone(), transfer.amount)]),
            created_at,
        );
        entry.kind = ExpenseKind::Settlement;
        entry.description = format!("settlement {} -> {}", transfer.from, transfer.to);
        entry
    }

    /// Builds the entry that exactly offsets `self`.
    pub fn reversal(&self, created_at: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: self.group_id,
            kind: ExpenseKind::Reversal { of: self.id },
            description: format!("reversal of {}", self.id),
            category: self.category.clone(),
            payer: self.payer.clone(),
            amount: -self.amount,
            shares: self
                .shares
                .iter()
                .map(|(member, share)| (member.clone(), -*share))
                .collect(),
            created_at,
            fx_rate_to_home: self.fx_rate_to_home,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn with_fx_rate_to_home(mut self, rate: Rate) -> Self {
        self.fx_rate_to_home = Some(rate);
        self
    }

    #[must_use]
    pub fn currency(&self) -> Currency {
        self.amount.currency()
    }

    /// Checks the invariants that don't need the group: share currency,
    /// exact reconciliation, and the sign rules of each kind.
    pub fn validate_shape(&self) -> ResultEngine<()> {
        if self.shares.is_empty() {
            return Err(EngineError::InvalidSplit(
                "expense must have at least one share-holder".to_string(),
            ));
        }
        for (member, share) in &self.shares {
            if share.currency() != self.currency() {
                return Err(EngineError::CurrencyMismatch(format!(
                    "share of {member} is in {}, expense is in {}",
                    share.currency(),
                    self.currency()
                )));
            }
        }

        let total = Money::try_sum(self.currency(), self.shares.values().copied())?;
        if total != self.amount {
            return Err(EngineError::InvalidSplit(format!(
                "shares sum to {total}, expense amount is {}",
                self.amount
            )));
        }

        match self.kind {
            ExpenseKind::Expense => {
                if !self.amount.is_positive() {
                    return Err(EngineError::InvalidSplit(
                        "expense amount must be > 0".to_string(),
                    ));
                }
                if self.shares.values().any(|s| s.is_negative()) {
                    return Err(EngineError::InvalidSplit(
                        "shares must not be negative".to_string(),
                    ));
                }
            }
            ExpenseKind::Settlement => {
                if !self.amount.is_positive() {
                    return Err(EngineError::InvalidSplit(
                        "settlement amount must be > 0".to_string(),
                    ));
                }
                if self.shares.len() != 1 || self.shares.contains_key(&self.payer) {
                    return Err(EngineError::InvalidSplit(
                        "settlement must move money to exactly one other member".to_string(),
                    ));
                }
            }
            ExpenseKind::Reversal { .. } => {
                if !self.amount.is_negative() || self.shares.values().any(|s| s.is_positive()) {
                    return Err(EngineError::InvalidSplit(
                        "reversal must negate the original entry".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
