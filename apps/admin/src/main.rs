//! # Tillbook Admin CLI
//!
//! Back-office jobs from the terminal: product imports and report exports.
//!
//! ## Usage
//! ```bash
//! # Print the product CSV template
//! tillbook-admin template > products.csv
//!
//! # Import a product sheet
//! tillbook-admin import products.csv
//!
//! # Daily income for October, UPI payments only, as CSV
//! tillbook-admin report daily --from 2026-10-01 --to 2026-10-31 --method UPI --csv
//!
//! # Inventory report as JSON, acting as a staff member
//! tillbook-admin --as meera@shop.in report inventory
//! ```
//!
//! Without `--as` the CLI acts as the local store owner with full access.

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use tillbook_admin::commands::{catalog, report, staff};
use tillbook_admin::state::AdminConfig;
use tillbook_admin::{init_tracing, AppState};
use tillbook_core::report::{DailyIncomeFilter, MethodGroup};
use tillbook_core::AccessProfile;

const LOCAL_OWNER: &str = "local-owner";

#[derive(Debug, Parser)]
#[command(name = "tillbook-admin", version)]
#[command(about = "Tillbook back office: product imports and report exports")]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Act as this staff member instead of the local owner
    #[arg(long = "as", global = true, value_name = "EMAIL")]
    acting_as: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the product CSV template
    Template,
    /// Import products from a CSV sheet
    Import {
        /// Sheet in the template's layout
        file: PathBuf,
    },
    /// Run a report
    Report {
        #[command(subcommand)]
        report: ReportCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ReportCommand {
    /// Payments per day, with invoiced and outstanding totals
    Daily {
        #[command(flatten)]
        range: DateRange,
        /// UPI, CASH, BANK or OTHER
        #[arg(long, value_parser = parse_method)]
        method: Option<MethodGroup>,
        /// CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },
    /// Sold units, revenue and available stock per product
    Inventory {
        #[command(flatten)]
        range: DateRange,
        /// CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },
}

#[derive(Debug, Clone, Copy, Args)]
struct DateRange {
    /// First day, inclusive
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Last day, inclusive
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    to: Option<NaiveDate>,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| format!("`{}` is not a YYYY-MM-DD date", value))
}

fn parse_method(value: &str) -> Result<MethodGroup, String> {
    value.parse().map_err(|e: tillbook_core::ValidationError| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Template needs no database
    if let Command::Template = cli.command {
        print!("{}", catalog::product_template());
        return Ok(());
    }

    let config = AdminConfig::load(cli.config).context("Failed to load configuration")?;
    info!(store = %config.store.name, "Configuration loaded");

    let state = AppState::open(config).await?;
    let access = match cli.acting_as {
        Some(email) => staff::sign_in(&state, &email).await?,
        None => AccessProfile::admin(LOCAL_OWNER),
    };

    match cli.command {
        Command::Template => {}
        Command::Import { file } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("Cannot read {}", file.display()))?;

            let outcome = catalog::import_products(&state, &access, &text).await?;
            print_json(&outcome)?;
        }
        Command::Report {
            report: ReportCommand::Daily { range, method, csv },
        } => {
            let filter = DailyIncomeFilter {
                from: range.from,
                to: range.to,
                method,
            };
            if csv {
                println!("{}", report::daily_income_export(&state, &access, &filter).await?);
            } else {
                print_json(&report::daily_income(&state, &access, &filter).await?)?;
            }
        }
        Command::Report {
            report: ReportCommand::Inventory { range, csv },
        } => {
            if csv {
                println!("{}", report::inventory_export(&state, &access, range.from, range.to).await?);
            } else {
                print_json(&report::inventory(&state, &access, range.from, range.to).await?)?;
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
