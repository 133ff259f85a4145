//! Groups, members and the trip overlay.
//!
//! A [`Group`] is the unit of settlement: it owns its members and its
//! append-only expense sequence, and balances are never computed across
//! groups. A trip is a group carrying a [`TripPlan`] with per-category
//! budgets.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, Expense, Money, ResultEngine, SplitRule,
    util::{normalize_display, normalize_key},
};

/// Stable member identifier, derived from the display name.
///
/// Ordering is the canonical "member id ascending" order used for remainder
/// distribution and solver tie-breaks.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberId(String);

impl MemberId {
    /// Derives the id from a display name or an existing id.
    pub fn new(raw: &str) -> ResultEngine<MemberId> {
        normalize_key(raw, "member").map(MemberId)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MemberId {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MemberId::new(&value)
    }
}

impl From<MemberId> for String {
    fn from(value: MemberId) -> Self {
        value.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub display_name: String,
}

impl Member {
    pub fn new(display_name: &str) -> ResultEngine<Member> {
        let display_name = normalize_display(display_name, "member")?;
        Ok(Member {
            id: MemberId::new(&display_name)?,
            display_name,
        })
    }
}

const UNCATEGORIZED: &str = "Uncategorized";

/// Expense category label, compared by its normalized key.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category {
    key: String,
    display: String,
}

impl Category {
    pub fn new(name: &str) -> ResultEngine<Category> {
        let display = normalize_display(name, "category")?;
        let key = normalize_key(&display, "category")?;
        Ok(Category { key, display })
    }

    /// Bucket for expenses recorded without a category.
    #[must_use]
    pub fn uncategorized() -> Category {
        Category {
            key: UNCATEGORIZED.to_ascii_lowercase(),
            display: UNCATEGORIZED.to_string(),
        }
    }

    /// Folded form used for equality and ordering.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.display
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Category {}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Category {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl std::hash::Hash for Category {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl TryFrom<String> for Category {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Category::new(&value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.display
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Trip overlay: planned cost, dates and per-category budgets.
///
/// Budgets are expressed in the group's home currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripPlan {
    pub estimated_cost: Money,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budgets: BTreeMap<Category, Money>,
}

impl TripPlan {
    #[must_use]
    pub fn new(estimated_cost: Money, start_date: NaiveDate) -> Self {
        Self {
            estimated_cost,
            start_date,
            end_date: None,
            budgets: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn ending(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn with_budget(mut self, category: Category, limit: Money) -> Self {
        self.budgets.insert(category, limit);
        self
    }

    fn validate(&self, home_currency: Currency) -> ResultEngine<()> {
        if !self.estimated_cost.is_positive() {
            return Err(EngineError::InvalidAmount(
                "estimated trip cost must be > 0".to_string(),
            ));
        }
        if let Some(end) = self.end_date
            && end < self.start_date
        {
            return Err(EngineError::InvalidAmount(format!(
                "trip ends ({end}) before it starts ({})",
                self.start_date
            )));
        }
        for (category, limit) in &self.budgets {
            if limit.currency() != home_currency {
                return Err(EngineError::CurrencyMismatch(format!(
                    "budget for '{category}' is in {}, group home currency is {home_currency}",
                    limit.currency()
                )));
            }
            if limit.is_negative() {
                return Err(EngineError::InvalidAmount(format!(
                    "budget for '{category}' must be >= 0"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub home_currency: Currency,
    pub members: BTreeMap<MemberId, Member>,
    #[serde(default)]
    pub default_split: SplitRule,
    pub trip: Option<TripPlan>,
    pub(crate) expenses: Vec<Expense>,
}

impl Group {
    /// Creates an empty group. Member names must be unique once normalized.
    pub fn new<'a, I>(name: &str, home_currency: Currency, members: I) -> ResultEngine<Group>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut group = Group {
            id: Uuid::new_v4(),
            name: normalize_display(name, "group")?,
            home_currency,
            members: BTreeMap::new(),
            default_split: SplitRule::default(),
            trip: None,
            expenses: Vec::new(),
        };
        for member in members {
            group.add_member(member)?;
        }
        Ok(group)
    }

    /// Attaches a trip overlay, validating its budgets against the home currency.
    pub fn with_trip(mut self, plan: TripPlan) -> ResultEngine<Group> {
        plan.validate(self.home_currency)?;
        self.trip = Some(plan);
        Ok(self)
    }

    #[must_use]
    pub fn with_default_split(mut self, split: SplitRule) -> Group {
        self.default_split = split;
        self
    }

    pub fn add_member(&mut self, display_name: &str) -> ResultEngine<MemberId> {
        let member = Member::new(display_name)?;
        if self.members.contains_key(&member.id) {
            return Err(EngineError::ExistingKey(member.display_name));
        }
        let id = member.id.clone();
        self.members.insert(id.clone(), member);
        Ok(id)
    }

    #[must_use]
    pub fn is_member(&self, id: &MemberId) -> bool {
        self.members.contains_key(id)
    }

    /// Resolves a display name or id to a member of this group.
    pub fn resolve_member(&self, name_or_id: &str) -> ResultEngine<MemberId> {
        let id = MemberId::new(name_or_id)
            .map_err(|_| EngineError::UnknownMember(name_or_id.trim().to_string()))?;
        if !self.is_member(&id) {
            return Err(EngineError::UnknownMember(name_or_id.trim().to_string()));
        }
        Ok(id)
    }

    pub(crate) fn ensure_member(&self, id: &MemberId) -> ResultEngine<()> {
        if !self.is_member(id) {
            return Err(EngineError::UnknownMember(id.to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn display_name(&self, id: &MemberId) -> Option<&str> {
        self.members.get(id).map(|m| m.display_name.as_str())
    }

    /// The expense sequence in append order.
    #[must_use]
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    #[must_use]
    pub fn expense(&self, id: Uuid) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn is_trip(&self) -> bool {
        self.trip.is_some()
    }
}
