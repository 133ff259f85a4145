use std::{cmp::Ordering, fmt, ops::Neg};

use serde::{Deserialize, Serialize};

use crate::{Currency, EngineError, ResultEngine};

/// Signed money amount represented as an **integer number of minor units**
/// tagged with its [`Currency`].
///
/// Use this type for **all** monetary values in the engine (expense totals,
/// shares, balances, budgets) to avoid floating-point drift. Values in
/// different currencies never combine directly: arithmetic and comparison
/// fail with [`EngineError::CurrencyMismatch`] and callers must convert first.
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// let amount = Money::new(12_34, Currency::Usd);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34 USD");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects
/// more decimals than the currency has):
///
/// ```rust
/// use engine::{Currency, Money};
///
/// assert_eq!(Money::parse("10,5", Currency::Eur).unwrap().minor(), 1050);
/// assert!(Money::parse("12.345", Currency::Eur).is_err());
/// assert!(Money::parse("1.5", Currency::Jpy).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.amount
    }

    #[must_use]
    pub const fn currency(self) -> Currency {
        self.currency
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.amount == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.amount > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.amount < 0
    }

    /// Absolute value, failing only for `i64::MIN`.
    pub fn abs(self) -> ResultEngine<Money> {
        self.amount
            .checked_abs()
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(EngineError::overflow)
    }

    fn ensure_same_currency(self, rhs: Money) -> ResultEngine<()> {
        if self.currency != rhs.currency {
            return Err(EngineError::CurrencyMismatch(format!(
                "cannot combine {} with {}",
                self.currency, rhs.currency
            )));
        }
        Ok(())
    }

    pub fn try_add(self, rhs: Money) -> ResultEngine<Money> {
        self.ensure_same_currency(rhs)?;
        self.amount
            .checked_add(rhs.amount)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(EngineError::overflow)
    }

    pub fn try_sub(self, rhs: Money) -> ResultEngine<Money> {
        self.ensure_same_currency(rhs)?;
        self.amount
            .checked_sub(rhs.amount)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(EngineError::overflow)
    }

    /// Total order within one currency.
    pub fn try_cmp(self, rhs: Money) -> ResultEngine<Ordering> {
        self.ensure_same_currency(rhs)?;
        Ok(self.amount.cmp(&rhs.amount))
    }

    /// Sums `values`, all of which must be in `currency`.
    pub fn try_sum<I>(currency: Currency, values: I) -> ResultEngine<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        values
            .into_iter()
            .try_fold(Money::zero(currency), |acc, value| acc.try_add(value))
    }

    /// Splits the amount into `parts` shares that sum exactly to `self`.
    ///
    /// Each share gets the floor of the even split; the remainder `r` is
    /// handed out one minor unit at a time to the first `r` shares. The
    /// caller decides the order of the shares.
    ///
    /// ```rust
    /// use engine::{Currency, Money};
    ///
    /// let shares = Money::new(100, Currency::Usd).split_evenly(3).unwrap();
    /// let minors: Vec<i64> = shares.iter().map(|m| m.minor()).collect();
    /// assert_eq!(minors, vec![34, 33, 33]);
    /// ```
    pub fn split_evenly(self, parts: usize) -> ResultEngine<Vec<Money>> {
        if parts == 0 {
            return Err(EngineError::InvalidSplit(
                "cannot split an amount across zero members".to_string(),
            ));
        }
        self.allocate(&vec![1; parts])
    }

    /// Splits the amount proportionally to integer `weights`.
    ///
    /// Every share receives the floor of its proportional part; the minor
    /// units left over go one at a time to the shares with a nonzero weight,
    /// in order. Zero-weight shares always receive zero. Negative amounts are
    /// split by magnitude and negated, so `allocate` is symmetric under
    /// negation.
    pub fn allocate(self, weights: &[u64]) -> ResultEngine<Vec<Money>> {
        let total_weight: u128 = weights.iter().map(|w| u128::from(*w)).sum();
        if total_weight == 0 {
            return Err(EngineError::InvalidSplit(
                "weights must not all be zero".to_string(),
            ));
        }

        let sign: i128 = if self.amount < 0 { -1 } else { 1 };
        let magnitude = u128::from(self.amount.unsigned_abs());

        let mut parts: Vec<u128> = weights
            .iter()
            .map(|w| magnitude * u128::from(*w) / total_weight)
            .collect();
        let assigned: u128 = parts.iter().sum();
        let mut leftover = magnitude - assigned;

        for (part, weight) in parts.iter_mut().zip(weights) {
            if leftover == 0 {
                break;
            }
            if *weight > 0 {
                *part += 1;
                leftover -= 1;
            }
        }

        parts
            .into_iter()
            .map(|part| {
                let signed = i128::try_from(part).map_err(|_| EngineError::overflow())? * sign;
                i64::try_from(signed)
                    .map(|amount| Money::new(amount, self.currency))
                    .map_err(|_| EngineError::overflow())
            })
            .collect()
    }

    /// Parses a decimal string expressed in major units of `currency`.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - at most `currency.minor_units()` fractional digits
    /// - rejects empty/invalid strings
    pub fn parse(s: &str, currency: Currency) -> ResultEngine<Money> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount(format!("invalid amount: {}", s.trim()));

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(empty());
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let major_str = parts.next().ok_or_else(invalid)?;
        let minor_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if major_str.is_empty() || !major_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let major: i64 = major_str.parse().map_err(|_| EngineError::overflow())?;

        let digits = usize::from(currency.minor_units());
        let minor: i64 = match minor_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                if frac.len() > digits {
                    return Err(EngineError::InvalidAmount(format!(
                        "too many decimals for {currency}"
                    )));
                }
                let padded = format!("{frac:0<digits$}");
                padded.parse().map_err(|_| invalid())?
            }
        };

        let total = major
            .checked_mul(currency.scale())
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(EngineError::overflow)?;

        let signed = if negative {
            total.checked_neg().ok_or_else(EngineError::overflow)?
        } else {
            total
        };

        Ok(Money::new(signed, currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        let digits = usize::from(self.currency.minor_units());
        if digits == 0 {
            return write!(f, "{sign}{abs} {}", self.currency);
        }
        let scale = self.currency.scale().unsigned_abs();
        let major = abs / scale;
        let minor = abs % scale;
        write!(f, "{sign}{major}.{minor:0digits$} {}", self.currency)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money::new(-self.amount, self.currency)
    }
}
