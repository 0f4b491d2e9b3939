//! Holdings command - open parcels at a date

use super::{format_amount, format_date, replay, InputArgs};
use crate::core::{consolidate, Holding};
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct HoldingsCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Report date (YYYY-MM-DD); transactions after it are ignored. Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Filter by asset identifier (e.g., BHP)
    #[arg(short, long)]
    asset: Option<String>,

    /// Output as CSV instead of formatted table
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

impl HoldingsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let as_of = self
            .as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        let transactions: Vec<_> = self
            .input
            .read()?
            .into_iter()
            .filter(|tx| tx.date <= as_of)
            .collect();
        let portfolio = replay(&transactions)?;
        if portfolio.ledger().is_empty() {
            log::info!("No open lots at {}", format_date(as_of));
        }

        let holdings: Vec<Holding> = consolidate(portfolio.ledger(), as_of)
            .into_iter()
            .filter(|h| {
                self.asset
                    .as_deref()
                    .is_none_or(|a| h.asset_identifier.eq_ignore_ascii_case(a))
            })
            .collect();

        if self.json {
            self.print_json(&holdings, as_of)
        } else if self.csv {
            self.write_csv(&holdings)
        } else {
            self.print_table(&holdings, as_of);
            Ok(())
        }
    }

    fn print_table(&self, holdings: &[Holding], as_of: NaiveDate) {
        if holdings.is_empty() {
            println!("No open holdings at {}", format_date(as_of));
            return;
        }

        println!();
        println!("HOLDINGS AT {}", format_date(as_of));
        println!();

        let mut rows: Vec<HoldingRow> = holdings.iter().map(HoldingRow::from).collect();
        let quantity: u64 = holdings.iter().map(|h| h.quantity).sum();
        let cost_base: Decimal = holdings.iter().map(|h| h.cost_base).sum();
        rows.push(HoldingRow {
            asset: "Total".to_string(),
            asset_kind: String::new(),
            option_id: String::new(),
            acquisition_date: String::new(),
            quantity: quantity.to_string(),
            cost_base: format_amount(cost_base),
            unit_cost: String::new(),
            discountable: String::new(),
        });

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    fn write_csv(&self, holdings: &[Holding]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for holding in holdings {
            wtr.serialize(holding)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn print_json(&self, holdings: &[Holding], as_of: NaiveDate) -> anyhow::Result<()> {
        let output = HoldingsOutput { as_of, holdings };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct HoldingsOutput<'a> {
    as_of: NaiveDate,
    holdings: &'a [Holding],
}

#[derive(Debug, Clone, Tabled)]
struct HoldingRow {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Kind")]
    asset_kind: String,
    #[tabled(rename = "Option ID")]
    option_id: String,
    #[tabled(rename = "Acquired")]
    acquisition_date: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Cost Base")]
    cost_base: String,
    #[tabled(rename = "Unit Cost")]
    unit_cost: String,
    #[tabled(rename = "Discountable")]
    discountable: String,
}

impl From<&Holding> for HoldingRow {
    fn from(h: &Holding) -> Self {
        HoldingRow {
            asset: h.asset_identifier.clone(),
            asset_kind: h.asset_kind.to_string(),
            option_id: h.option_id.clone().unwrap_or_default(),
            acquisition_date: format_date(h.acquisition_date),
            quantity: h.quantity.to_string(),
            cost_base: format_amount(h.cost_base),
            unit_cost: format_amount(unit_cost(h.quantity, h.cost_base)),
            discountable: if h.discountable { "Yes" } else { "No" }.to_string(),
        }
    }
}

fn unit_cost(quantity: u64, cost_base: Decimal) -> Decimal {
    if quantity == 0 {
        Decimal::ZERO
    } else {
        cost_base / Decimal::from(quantity)
    }
}
