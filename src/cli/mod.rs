pub mod categories;
pub mod init;
pub mod process;
pub mod project;
pub mod rates;
pub mod recurring;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use crate::clock::SystemClock;
use crate::currency::{RateCache, StoredRates};
use crate::db::get_connection;
use crate::engine::RecurrenceEngine;
use crate::error::{BurnwiseError, Result};
use crate::ledger::{SqliteCategories, SqliteLedger};
use crate::settings::{load_settings, Settings};

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| BurnwiseError::Validation(format!("invalid date '{s}', expected YYYY-MM-DD")))
}

pub(crate) fn parse_date_opt(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(parse_date).transpose()
}

pub(crate) fn open_db() -> Result<(Settings, Connection)> {
    let settings = load_settings();
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(BurnwiseError::Settings(format!(
            "No database found at {}\nRun `burnwise init` to create one.",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    Ok((settings, conn))
}

/// Wire the SQLite-backed collaborators into an engine for one command.
pub(crate) fn with_engine<T>(
    f: impl FnOnce(&RecurrenceEngine<'_>, &Connection, &Settings) -> Result<T>,
) -> Result<T> {
    let (settings, conn) = open_db()?;
    let rates = RateCache::new(
        StoredRates::new(&conn),
        settings.fixed_rates.clone(),
        settings.rate_ttl(),
    );
    let categories = SqliteCategories::new(&conn);
    let engine = RecurrenceEngine::new(&conn, &SqliteLedger, &rates, &categories, &SystemClock)
        .with_max_iterations(settings.max_catch_up_iterations);
    f(&engine, &conn, &settings)
}

#[derive(Parser)]
#[command(name = "burnwise", about = "Recurring income and expense tracker with catch-up posting.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for burnwise data (default: ~/.local/share/burnwise)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Show transaction categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Manage recurring income and expenses.
    Recurring {
        #[command(subcommand)]
        command: RecurringCommands,
    },
    /// Post every due occurrence up to a date (default: today).
    Process {
        /// Evaluation date: YYYY-MM-DD
        #[arg(long = "as-of")]
        as_of: Option<String>,
    },
    /// Project net recurring cash flow over a window.
    Project {
        /// Window start: YYYY-MM-DD (default: today)
        #[arg(long)]
        from: Option<String>,
        /// Window end: YYYY-MM-DD
        #[arg(long, conflicts_with = "months")]
        to: Option<String>,
        /// Window length in months when --to is not given
        #[arg(long, default_value_t = 3)]
        months: u32,
    },
    /// Manage exchange rates (units of currency per USD).
    Rates {
        #[command(subcommand)]
        command: RatesCommands,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List all categories.
    List,
}

#[derive(Subcommand)]
pub enum RecurringCommands {
    /// Add a recurring transaction.
    Add(AddArgs),
    /// Change fields of a recurring transaction.
    Update(UpdateArgs),
    /// List recurring transactions.
    List {
        /// Only active ones
        #[arg(long)]
        active: bool,
    },
    /// Show one recurring transaction with its overrides and recent history.
    Show { id: i64 },
    /// List items due on or before a date (default: today).
    Due {
        #[arg(long = "as-of")]
        as_of: Option<String>,
    },
    /// List items coming due in the next N days.
    Upcoming {
        #[arg(long, default_value_t = 30)]
        days: u64,
    },
    /// List items whose end date falls in the next N days.
    Expiring {
        #[arg(long, default_value_t = 30)]
        days: u64,
    },
    /// Transactions generated from a recurring item.
    History { id: i64 },
    /// Stop generating occurrences.
    Pause { id: i64 },
    /// Start again from the next future occurrence.
    Resume { id: i64 },
    /// Delete, or deactivate if transactions were already generated.
    Delete { id: i64 },
    /// Skip a single occurrence.
    Skip {
        id: i64,
        /// Occurrence date: YYYY-MM-DD
        date: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Change the amount or description of a single occurrence.
    Modify {
        id: i64,
        /// Occurrence date: YYYY-MM-DD
        date: String,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List skip/modify overrides for an item.
    Overrides { id: i64 },
}

#[derive(Subcommand)]
pub enum RatesCommands {
    /// Store a rate, e.g. `rates set EUR 0.92`.
    Set { currency: String, rate: f64 },
    /// List stored and fixed rates.
    List,
}

#[derive(Args)]
pub struct AddArgs {
    /// Description, e.g. 'Office rent'
    pub description: String,
    /// Amount per occurrence, in its own currency
    #[arg(long)]
    pub amount: f64,
    /// Category name
    #[arg(long)]
    pub category: String,
    /// income or expense
    #[arg(long = "type", default_value = "expense")]
    pub txn_type: String,
    /// 3-letter currency code (default from settings)
    #[arg(long)]
    pub currency: Option<String>,
    /// daily, weekly, monthly, yearly
    #[arg(long, default_value = "monthly")]
    pub frequency: String,
    /// Repeat every N periods
    #[arg(long, default_value_t = 1)]
    pub every: u32,
    /// First occurrence: YYYY-MM-DD (default: today)
    #[arg(long)]
    pub start: Option<String>,
    /// Last possible occurrence: YYYY-MM-DD
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    pub id: i64,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub amount: Option<f64>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long = "type")]
    pub txn_type: Option<String>,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long)]
    pub frequency: Option<String>,
    #[arg(long)]
    pub every: Option<u32>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long, conflicts_with = "no_end")]
    pub end: Option<String>,
    /// Remove the end date
    #[arg(long = "no-end")]
    pub no_end: bool,
}
