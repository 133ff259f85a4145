//! The module contains the errors the engine can return.
//!
//! Every failure is an ordinary, recoverable result:
//!
//! - [`CurrencyMismatch`] arithmetic attempted across currencies.
//! - [`InvalidSplit`] shares that don't reconcile with the expense total.
//! - [`UnknownMember`] payer or share-holder outside the group.
//! - [`RateUnavailable`] no exchange rate for a pair/date.
//! - [`UnbalancedLedger`] balances fed to the solver don't sum to zero. This
//!   one points at a data-integrity bug upstream and callers should log it
//!   as such.
//!
//!  [`CurrencyMismatch`]: EngineError::CurrencyMismatch
//!  [`InvalidSplit`]: EngineError::InvalidSplit
//!  [`UnknownMember`]: EngineError::UnknownMember
//!  [`RateUnavailable`]: EngineError::RateUnavailable
//!  [`UnbalancedLedger`]: EngineError::UnbalancedLedger
use chrono::NaiveDate;
use thiserror::Error;

use crate::Currency;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Unknown member: \"{0}\"")]
    UnknownMember(String),
    #[error("No {from}->{to} rate available for {date}")]
    RateUnavailable {
        from: Currency,
        to: Currency,
        date: NaiveDate,
    },
    #[error("Unbalanced ledger: balances sum to {residual} minor units of {currency}")]
    UnbalancedLedger { currency: Currency, residual: i64 },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
}

impl EngineError {
    /// Returns `true` for errors that indicate corrupted ledger state rather
    /// than bad input.
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::UnbalancedLedger { .. })
    }

    pub(crate) fn overflow() -> Self {
        Self::InvalidAmount("amount overflow".to_string())
    }
}
