//! JSON input files: the group document and the rate table.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use engine::{
    Category, Currency, Engine, ExpenseDraft, Group, Money, Rate, RateTable, SplitRule, Transfer,
    TripPlan,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// A group with its full expense history.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupDocument {
    pub name: String,
    pub home_currency: Currency,
    pub members: Vec<String>,
    #[serde(default)]
    pub default_split: Option<SplitRule>,
    #[serde(default)]
    pub trip: Option<TripDocument>,
    #[serde(default)]
    pub expenses: Vec<ExpenseDraft>,
    /// Transfers already paid back.
    #[serde(default)]
    pub settlements: Vec<SettlementRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripDocument {
    pub estimated_cost: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budgets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettlementRecord {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
struct RateRecord {
    from: Currency,
    to: Currency,
    date: NaiveDate,
    rate: Rate,
}

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path).map_err(|err| AppError::Document {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?))
}

impl GroupDocument {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_reader(open(path)?)?)
    }

    /// Builds the group, then replays expenses and settlements in file order.
    pub fn load_into(self, engine: &mut Engine) -> Result<Uuid> {
        let currency = self.home_currency;
        let mut group = Group::new(&self.name, currency, self.members.iter().map(String::as_str))?;
        if let Some(split) = self.default_split {
            group = group.with_default_split(split);
        }
        if let Some(trip) = self.trip {
            group = group.with_trip(trip.into_plan(currency)?)?;
        }
        let group_id = engine.import_group(group)?;

        for draft in self.expenses {
            engine.submit(group_id, draft)?;
        }
        for record in self.settlements {
            let group = engine.group(group_id)?;
            let transfer = Transfer {
                from: group.resolve_member(&record.from)?,
                to: group.resolve_member(&record.to)?,
                amount: Money::parse(&record.amount, currency)?,
            };
            engine.record_settlement(group_id, &transfer, record.date)?;
        }

        tracing::debug!(group = %group_id, "group document loaded");
        Ok(group_id)
    }
}

impl TripDocument {
    fn into_plan(self, currency: Currency) -> Result<TripPlan> {
        let mut plan = TripPlan::new(Money::parse(&self.estimated_cost, currency)?, self.start_date);
        if let Some(end) = self.end_date {
            plan = plan.ending(end);
        }
        for (category, limit) in self.budgets {
            plan = plan.with_budget(Category::new(&category)?, Money::parse(&limit, currency)?);
        }
        Ok(plan)
    }
}

/// Loads `[{from, to, date, rate}]` quotes.
pub fn load_rates(path: &Path) -> Result<RateTable> {
    let records: Vec<RateRecord> = serde_json::from_reader(open(path)?)?;
    let count = records.len();
    let table = records
        .into_iter()
        .fold(RateTable::new(), |table, r| table.with_rate(r.from, r.to, r.date, r.rate));
    tracing::debug!(path = %path.display(), quotes = count, "rates loaded");
    Ok(table)
}
