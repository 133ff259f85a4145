//! Currency conversion.
//!
//! The engine never fetches exchange rates itself: it asks a [`RateSource`]
//! collaborator for the rate of a (from, to, date) triple and fails closed
//! with [`EngineError::RateUnavailable`] when the source has no answer.
//!
//! Conversion multiplies in a [`Decimal`] intermediate and rounds to the
//! target's minor units with round-half-to-even, so many small conversions
//! do not drift in one direction.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{Currency, EngineError, Money, ResultEngine};

/// Units of the target currency per one major unit of the source currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(Decimal);

impl Rate {
    /// Creates a rate, rejecting zero and negative values.
    pub fn new(value: Decimal) -> ResultEngine<Rate> {
        if value <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "exchange rate must be > 0, got {value}"
            )));
        }
        Ok(Rate(value))
    }

    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// The rate of the opposite direction.
    pub fn inverse(self) -> ResultEngine<Rate> {
        Decimal::ONE
            .checked_div(self.0)
            .ok_or_else(EngineError::overflow)
            .and_then(Rate::new)
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Rate::new(value)
    }
}

impl From<Rate> for Decimal {
    fn from(value: Rate) -> Self {
        value.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// External collaborator answering exchange-rate lookups.
///
/// Implementations must be a pure function of `(from, to, date)` for a given
/// snapshot of their data. `None` means "not found".
pub trait RateSource {
    fn rate_for(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<Rate>;
}

impl<T: RateSource + ?Sized> RateSource for Arc<T> {
    fn rate_for(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<Rate> {
        (**self).rate_for(from, to, date)
    }
}

/// A source that knows no rates; every cross-currency lookup fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRates;

impl RateSource for NoRates {
    fn rate_for(&self, _from: Currency, _to: Currency, _date: NaiveDate) -> Option<Rate> {
        None
    }
}

/// In-memory table of dated quotes.
///
/// The effective quote for a date is the latest one dated on or before it.
/// When a pair has no direct quote the inverse of the reverse pair is used.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RateTable {
    quotes: HashMap<(Currency, Currency), BTreeMap<NaiveDate, Rate>>,
}

impl RateTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the `from -> to` quote effective from `date` onwards.
    pub fn insert(&mut self, from: Currency, to: Currency, date: NaiveDate, rate: Rate) {
        self.quotes.entry((from, to)).or_default().insert(date, rate);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with_rate(mut self, from: Currency, to: Currency, date: NaiveDate, rate: Rate) -> Self {
        self.insert(from, to, date, rate);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    fn direct(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<Rate> {
        self.quotes
            .get(&(from, to))?
            .range(..=date)
            .next_back()
            .map(|(_, rate)| *rate)
    }
}

impl RateSource for RateTable {
    fn rate_for(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<Rate> {
        if from == to {
            return Some(Rate(Decimal::ONE));
        }
        self.direct(from, to, date)
            .or_else(|| self.direct(to, from, date)?.inverse().ok())
    }
}

/// Converts money between currencies using a [`RateSource`].
pub struct Converter<'a> {
    rates: &'a dyn RateSource,
}

impl<'a> Converter<'a> {
    pub fn new(rates: &'a dyn RateSource) -> Self {
        Self { rates }
    }

    /// Looks up the rate for a pair, failing with `RateUnavailable`.
    pub fn rate(&self, from: Currency, to: Currency, as_of: NaiveDate) -> ResultEngine<Rate> {
        if from == to {
            return Ok(Rate(Decimal::ONE));
        }
        self.rates
            .rate_for(from, to, as_of)
            .ok_or(EngineError::RateUnavailable {
                from,
                to,
                date: as_of,
            })
    }

    /// Converts `money` into `target` at the rate effective on `as_of`.
    pub fn convert(&self, money: Money, target: Currency, as_of: NaiveDate) -> ResultEngine<Money> {
        if money.currency() == target {
            return Ok(money);
        }
        let rate = self.rate(money.currency(), target, as_of)?;
        convert_with(money, target, rate)
    }
}

/// Converts `money` into `target` with an explicit rate.
///
/// `minor_to = minor_from * rate * 10^(exp_to - exp_from)`, rounded half to
/// even.
pub fn convert_with(money: Money, target: Currency, rate: Rate) -> ResultEngine<Money> {
    if money.currency() == target {
        return Ok(money);
    }
    let source = money.currency();
    let exp_delta = i32::from(target.minor_units()) - i32::from(source.minor_units());
    let shift = Decimal::from(10i64.pow(exp_delta.unsigned_abs()));

    let mut value = Decimal::from(money.minor())
        .checked_mul(rate.value())
        .ok_or_else(EngineError::overflow)?;
    value = if exp_delta >= 0 {
        value.checked_mul(shift)
    } else {
        value.checked_div(shift)
    }
    .ok_or_else(EngineError::overflow)?;

    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    let minor = i64::try_from(rounded).map_err(|_| EngineError::overflow())?;
    Ok(Money::new(minor, target))
}
