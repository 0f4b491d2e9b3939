pub mod events;
pub mod holdings;
pub mod schema;
pub mod summary;

use crate::core::{self, DateRange, FinancialYear, Portfolio, Transaction};
use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Read normalized transactions (JSON or CSV) from a file, or stdin with "-"
pub fn read_transactions(path: &Path) -> anyhow::Result<Vec<Transaction>> {
    if path.as_os_str() == "-" {
        read_from_stdin()
    } else {
        read_from_file(path)
    }
}

fn read_from_file(path: &Path) -> anyhow::Result<Vec<Transaction>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let transactions = if is_csv {
        core::read_transactions_csv(reader)
    } else {
        core::read_transactions_json(reader)
    };
    transactions.with_context(|| format!("reading transactions from {}", path.display()))
}

fn read_from_stdin() -> anyhow::Result<Vec<Transaction>> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    // JSON input is an object, anything else is treated as CSV
    let is_json = buffer
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');
    let cursor = io::Cursor::new(buffer);
    if is_json {
        core::read_transactions_json(cursor)
    } else {
        core::read_transactions_csv(cursor)
    }
}

/// Replay the transaction stream into a fresh portfolio
pub fn replay(transactions: &[Transaction]) -> anyhow::Result<Portfolio> {
    let mut portfolio = Portfolio::new();
    portfolio.replay(transactions)?;
    log::info!(
        "Replayed {} transactions: {} tax events, {} open lots",
        transactions.len(),
        portfolio.tax_events().len(),
        portfolio.ledger().len()
    );
    Ok(portfolio)
}

/// Reporting period selection shared by the event commands
#[derive(Args, Debug)]
pub struct PeriodArgs {
    /// Financial year to report (e.g., 2024 or 2023/24 for 1 July 2023 to 30 June 2024)
    #[arg(short, long)]
    year: Option<FinancialYear>,

    /// First event date to include (YYYY-MM-DD); overrides --year
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last event date to include (YYYY-MM-DD); overrides --year
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl PeriodArgs {
    pub fn range(&self) -> Option<DateRange> {
        if self.from.is_some() || self.to.is_some() {
            Some(DateRange::new(
                self.from.unwrap_or(NaiveDate::MIN),
                self.to.unwrap_or(NaiveDate::MAX),
            ))
        } else {
            self.year.map(|y| y.date_range())
        }
    }

    pub fn describe(&self) -> String {
        match (self.from, self.to, self.year) {
            (None, None, Some(year)) => format!("FY {}", year),
            (None, None, None) => "All Dates".to_string(),
            (from, to, _) => format!(
                "{} to {}",
                from.map_or("start".to_string(), |d| d.to_string()),
                to.map_or("end".to_string(), |d| d.to_string())
            ),
        }
    }
}

/// Common input flag
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Transactions file (JSON or CSV). Reads from stdin if "-".
    #[arg(short, long, default_value = "-")]
    transactions: PathBuf,
}

impl InputArgs {
    pub fn load(&self) -> anyhow::Result<Portfolio> {
        let transactions = read_transactions(&self.transactions)?;
        replay(&transactions)
    }

    pub fn read(&self) -> anyhow::Result<Vec<Transaction>> {
        read_transactions(&self.transactions)
    }
}

pub(crate) fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
