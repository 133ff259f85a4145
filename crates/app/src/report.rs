//! Plain-text reports and the CSV ledger export.

use std::io::Write;

use engine::{Balances, BudgetLine, Category, Group, LedgerRow, Money, Transfer, TripOutlook};
use serde::Serialize;

use crate::error::Result;

fn name<'a>(group: &'a Group, id: &'a engine::MemberId) -> &'a str {
    group.display_name(id).unwrap_or(id.as_str())
}

pub fn write_balances(out: &mut impl Write, group: &Group, balances: &Balances) -> Result<()> {
    writeln!(out, "Balances for {} ({})", group.name, group.home_currency)?;
    for (member, balance) in balances {
        let state = if balance.is_positive() {
            "is owed"
        } else if balance.is_negative() {
            "owes"
        } else {
            "is settled"
        };
        writeln!(out, "  {:<20} {:>16}  {state}", name(group, member), balance.to_string())?;
    }
    Ok(())
}

pub fn write_transfers(out: &mut impl Write, group: &Group, transfers: &[Transfer]) -> Result<()> {
    if transfers.is_empty() {
        writeln!(out, "Everyone is settled up.")?;
        return Ok(());
    }
    for transfer in transfers {
        writeln!(
            out,
            "{} pays {} {}",
            name(group, &transfer.from),
            name(group, &transfer.to),
            transfer.amount
        )?;
    }
    Ok(())
}

pub fn write_budget(
    out: &mut impl Write,
    totals: &std::collections::BTreeMap<Category, Money>,
    budget: &[BudgetLine],
) -> Result<()> {
    writeln!(out, "Spending by category")?;
    for (category, total) in totals {
        writeln!(out, "  {:<20} {:>16}", category.name(), total.to_string())?;
    }
    if !budget.is_empty() {
        writeln!(out, "Budgets")?;
        for line in budget {
            let flag = if line.remaining.is_negative() { "  over budget" } else { "" };
            writeln!(
                out,
                "  {:<20} {:>16} of {:>16}, {} left{flag}",
                line.category.name(),
                line.spent.to_string(),
                line.budget.to_string(),
                line.remaining
            )?;
        }
    }
    Ok(())
}

pub fn write_outlook(out: &mut impl Write, group: &Group, outlook: &TripOutlook) -> Result<()> {
    let verdict = match outlook.verdict {
        engine::TripVerdict::Comfortable => "savings cover the trip",
        engine::TripVerdict::Tight => "tight, savings cover at least 70% of the estimate",
        engine::TripVerdict::Over => "over budget, savings fall short",
        engine::TripVerdict::Today => "the trip starts today",
        engine::TripVerdict::Past => "the trip has already started",
    };
    writeln!(out, "{}: {verdict}", group.name)?;
    if outlook.days_until > 0 {
        writeln!(out, "  days until start:    {}", outlook.days_until)?;
        writeln!(out, "  daily saving needed: {}", outlook.daily_saving_needed)?;
        writeln!(out, "  projected savings:   {}", outlook.projected_savings)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: String,
    date: String,
    kind: &'a str,
    description: &'a str,
    category: Option<&'a str>,
    payer: &'a str,
    amount_minor: i64,
    currency: &'a str,
    shares: String,
}

/// Writes the ledger as CSV, shares flattened as `member=minor;...`.
pub fn export_csv(out: impl Write, rows: &[LedgerRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        let shares = row
            .shares
            .iter()
            .map(|(member, share)| format!("{member}={}", share.minor()))
            .collect::<Vec<_>>()
            .join(";");
        writer.serialize(ExportRow {
            id: row.expense_id.to_string(),
            date: row.date.to_string(),
            kind: &row.kind,
            description: &row.description,
            category: row.category.as_deref(),
            payer: row.payer.as_str(),
            amount_minor: row.amount.minor(),
            currency: row.currency.code(),
            shares,
        })?;
    }
    writer.flush()?;
    Ok(())
}
