use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use engine::{Engine, Money};

use document::{GroupDocument, load_rates};
use error::Result;
use settings::Settings;

mod document;
mod error;
mod report;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "finsplit")]
#[command(about = "Split shared expenses across currencies and settle up")]
struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Rate table (JSON); overrides `rates.path` from the config.
    #[arg(long, global = true)]
    rates: Option<PathBuf>,
    /// Override log level.
    #[arg(long, global = true)]
    level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Net balance of every member.
    Balances(AsOfArgs),
    /// Transfers that settle the group.
    Settle(AsOfArgs),
    /// Write the ledger as CSV.
    Export(ExportArgs),
    /// Category spending and remaining trip budgets.
    Budget(AsOfArgs),
    /// Whether monthly savings cover a planned trip.
    Outlook(OutlookArgs),
}

#[derive(Args, Debug)]
struct AsOfArgs {
    /// Group document (JSON).
    group: PathBuf,
    /// Only consider entries dated on or before this day.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    group: PathBuf,
    /// Output file; stdout when omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct OutlookArgs {
    group: PathBuf,
    /// Amount saved per month, in the group's home currency.
    #[arg(long)]
    monthly_savings: String,
    #[arg(long)]
    today: Option<NaiveDate>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match Settings::new(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("finsplit: {err}");
            return ExitCode::FAILURE;
        }
    };

    let level = cli.level.as_deref().unwrap_or(&settings.app.level);
    tracing_subscriber::fmt()
        .with_env_filter(format!("finsplit={level},engine={level}"))
        .with_writer(io::stderr)
        .init();

    match run(cli, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.is_integrity_violation() {
                tracing::error!("ledger integrity violation: {err}");
            } else {
                tracing::debug!("command failed: {err}");
            }
            eprintln!("finsplit: {err}");
            ExitCode::FAILURE
        }
    }
}

fn build_engine(rates: Option<&Path>, settings: &Settings) -> Result<Engine> {
    let builder = Engine::builder().policy(settings.engine.conversion_policy);
    let builder = match rates.or(settings.rates.path.as_deref().map(Path::new)) {
        Some(path) => builder.rate_source(load_rates(path)?),
        None => builder,
    };
    Ok(builder.build())
}

fn run(cli: Cli, settings: &Settings) -> Result<()> {
    let mut engine = build_engine(cli.rates.as_deref(), settings)?;
    let today = Local::now().date_naive();
    let mut stdout = io::stdout().lock();

    match cli.command {
        Command::Balances(args) => {
            let group = GroupDocument::load(&args.group)?.load_into(&mut engine)?;
            let balances = match args.as_of {
                Some(as_of) => engine.compute_balances_as_of(group, as_of)?,
                None => engine.compute_balances(group)?,
            };
            report::write_balances(&mut stdout, engine.group(group)?, &balances)?;
        }
        Command::Settle(args) => {
            let group = GroupDocument::load(&args.group)?.load_into(&mut engine)?;
            let transfers = engine.settle(group, args.as_of.unwrap_or(today))?;
            report::write_transfers(&mut stdout, engine.group(group)?, &transfers)?;
        }
        Command::Export(args) => {
            let group = GroupDocument::load(&args.group)?.load_into(&mut engine)?;
            let rows = engine.export_ledger(group)?;
            match args.output {
                Some(path) => report::export_csv(BufWriter::new(File::create(&path)?), &rows)?,
                None => report::export_csv(&mut stdout, &rows)?,
            }
            tracing::info!(rows = rows.len(), "ledger exported");
        }
        Command::Budget(args) => {
            let group = GroupDocument::load(&args.group)?.load_into(&mut engine)?;
            let totals = engine.category_totals(group, args.as_of)?;
            let budget = if engine.group(group)?.is_trip() {
                engine.budget_report(group, args.as_of)?
            } else {
                Vec::new()
            };
            report::write_budget(&mut stdout, &totals, &budget)?;
        }
        Command::Outlook(args) => {
            let group = GroupDocument::load(&args.group)?.load_into(&mut engine)?;
            let currency = engine.group(group)?.home_currency;
            let monthly = Money::parse(&args.monthly_savings, currency)?;
            let outlook = engine.trip_outlook(group, args.today.unwrap_or(today), monthly)?;
            report::write_outlook(&mut stdout, engine.group(group)?, &outlook)?;
        }
    }
    Ok(())
}
