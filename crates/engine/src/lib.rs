//! Multi-party, multi-currency expense-splitting settlement engine.
//!
//! Expenses enter a group's append-only [`Ledger`], get converted to the
//! group's home currency, and produce net [`Balances`]; the solver then turns
//! the balances into [`Transfer`]s that settle the group. All money is
//! integer minor units ([`Money`]); no floating point is involved anywhere.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use engine::{Currency, Engine, ExpenseDraft};
//!
//! let mut engine = Engine::builder().build();
//! let group = engine
//!     .create_group("Flat", Currency::Usd, ["Alice", "Bob", "Carol"])
//!     .unwrap();
//! let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
//! engine
//!     .submit(group, ExpenseDraft::new("Dinner", "1.00", "Alice", date))
//!     .unwrap();
//!
//! let transfers = engine.settle(group, date).unwrap();
//! assert_eq!(transfers.len(), 2);
//! assert_eq!(transfers[0].amount.to_string(), "0.33 USD");
//! ```

pub use aggregate::{BudgetLine, LedgerRow, TripOutlook, TripVerdict, trip_outlook};
pub use currency::Currency;
pub use error::EngineError;
pub use expense::{Expense, ExpenseKind};
pub use fx::{Converter, NoRates, Rate, RateSource, RateTable, convert_with};
pub use group::{Category, Group, Member, MemberId, TripPlan};
pub use ledger::{Balances, ConversionPolicy, Ledger};
pub use money::Money;
pub use ops::{Engine, EngineBuilder};
pub use settlement::{Transfer, apply_transfers, settle};
pub use source::{ExpenseDraft, ExpenseSource, SplitRule};

mod aggregate;
mod currency;
mod error;
mod expense;
mod fx;
mod group;
mod ledger;
mod money;
mod ops;
mod settlement;
mod source;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
