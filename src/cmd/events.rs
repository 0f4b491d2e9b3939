//! Events command - realised gains and losses with period filtering and grouping

use super::{format_amount, format_date, InputArgs, PeriodArgs};
use crate::core::{
    filter_and_aggregate, AggregatedEvent, FinancialYear, GroupLevel, TaxEvent, TaxEventView,
    Totals,
};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct EventsCommand {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    period: PeriodArgs,

    /// Aggregate events by date and asset, or by asset only
    #[arg(short, long, value_enum)]
    group: Option<GroupBy>,

    /// Output as CSV instead of formatted table
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GroupBy {
    /// One row per event date, asset and discountability
    Date,
    /// One row per asset and discountability
    Asset,
}

impl From<GroupBy> for GroupLevel {
    fn from(arg: GroupBy) -> Self {
        match arg {
            GroupBy::Date => GroupLevel::DateAssetDiscount,
            GroupBy::Asset => GroupLevel::AssetDiscount,
        }
    }
}

impl EventsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let portfolio = self.input.load()?;
        let view = filter_and_aggregate(
            portfolio.tax_events(),
            self.period.range(),
            self.group.map(GroupLevel::from),
        );

        if self.json {
            self.print_json(&view)
        } else if self.csv {
            self.write_csv(&view)
        } else {
            self.print_table(&view);
            Ok(())
        }
    }

    fn print_table(&self, view: &TaxEventView) {
        if view.is_empty() {
            println!("No tax events found ({})", self.period.describe());
            return;
        }

        println!();
        println!("TAX EVENTS ({})", self.period.describe());
        println!();

        let totals = view.totals();
        let table = match view {
            TaxEventView::Events(events) => {
                let mut rows: Vec<EventRow> = events.iter().map(EventRow::from).collect();
                rows.push(EventRow::totals(&totals));
                Table::new(rows)
            }
            TaxEventView::Grouped(groups) => {
                let mut rows: Vec<GroupRow> = groups.iter().map(GroupRow::from).collect();
                rows.push(GroupRow::totals(&totals));
                Table::new(rows)
            }
        }
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
        println!("{}", table);
    }

    fn write_csv(&self, view: &TaxEventView) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        match view {
            TaxEventView::Events(events) => {
                for event in events {
                    wtr.serialize(event)?;
                }
            }
            TaxEventView::Grouped(groups) => {
                for group in groups {
                    wtr.serialize(group)?;
                }
            }
        }
        wtr.flush()?;
        Ok(())
    }

    fn print_json(&self, view: &TaxEventView) -> anyhow::Result<()> {
        let output = match view {
            TaxEventView::Events(events) => EventsOutput {
                period: self.period.describe(),
                events: Some(events.as_slice()),
                groups: None,
                totals: view.totals(),
            },
            TaxEventView::Grouped(groups) => EventsOutput {
                period: self.period.describe(),
                events: None,
                groups: Some(groups.as_slice()),
                totals: view.totals(),
            },
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct EventsOutput<'a> {
    period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<&'a [TaxEvent]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<&'a [AggregatedEvent]>,
    totals: Totals,
}

/// Row for the ungrouped events table
#[derive(Debug, Clone, Tabled)]
struct EventRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "FY")]
    financial_year: String,
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Kind")]
    asset_kind: String,
    #[tabled(rename = "Type")]
    event_kind: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Acquired")]
    acquisition_date: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Cost Base")]
    cost_base: String,
    #[tabled(rename = "Gross")]
    gross_value: String,
    #[tabled(rename = "Discountable")]
    discountable: String,
}

impl From<&TaxEvent> for EventRow {
    fn from(e: &TaxEvent) -> Self {
        EventRow {
            date: format_date(e.event_date),
            financial_year: FinancialYear::from_date(e.event_date).display(),
            asset: e.asset_identifier.clone(),
            asset_kind: e.asset_kind.to_string(),
            event_kind: e.event_kind.to_string(),
            quantity: e.quantity.to_string(),
            acquisition_date: format_date(e.acquisition_date),
            proceeds: format_amount(e.proceeds),
            cost_base: format_amount(e.cost_base),
            gross_value: format_amount(e.gross_value),
            discountable: e.discountability.to_string(),
        }
    }
}

impl EventRow {
    fn totals(t: &Totals) -> Self {
        EventRow {
            date: "Total".to_string(),
            financial_year: String::new(),
            asset: String::new(),
            asset_kind: String::new(),
            event_kind: String::new(),
            quantity: t.quantity.to_string(),
            acquisition_date: String::new(),
            proceeds: format_amount(t.proceeds),
            cost_base: format_amount(t.cost_base),
            gross_value: format_amount(t.gross_value),
            discountable: String::new(),
        }
    }
}

/// Row for the grouped events table
#[derive(Debug, Clone, Tabled)]
struct GroupRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Kind")]
    asset_kind: String,
    #[tabled(rename = "Discountable")]
    discountable: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Cost Base")]
    cost_base: String,
    #[tabled(rename = "Gross")]
    gross_value: String,
}

impl From<&AggregatedEvent> for GroupRow {
    fn from(g: &AggregatedEvent) -> Self {
        GroupRow {
            date: g.date.map(format_date).unwrap_or_default(),
            asset: g.asset_identifier.clone(),
            asset_kind: g.asset_kind.to_string(),
            discountable: g.discountability.to_string(),
            quantity: g.quantity.to_string(),
            proceeds: format_amount(g.proceeds),
            cost_base: format_amount(g.cost_base),
            gross_value: format_amount(g.gross_value),
        }
    }
}

impl GroupRow {
    fn totals(t: &Totals) -> Self {
        GroupRow {
            date: "Total".to_string(),
            asset: String::new(),
            asset_kind: String::new(),
            discountable: String::new(),
            quantity: t.quantity.to_string(),
            proceeds: format_amount(t.proceeds),
            cost_base: format_amount(t.cost_base),
            gross_value: format_amount(t.gross_value),
        }
    }
}
