//! Summary command - totals per discountability and net capital gain

use super::{format_amount, InputArgs, PeriodArgs};
use crate::core::{report, summarise, Summary, Totals};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    period: PeriodArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct SummaryOutput<'a> {
    period: String,
    #[serde(flatten)]
    summary: &'a Summary,
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let portfolio = self.input.load()?;
        let events = report::filter_events(portfolio.tax_events(), self.period.range());
        let summary = summarise(&events);

        if self.json {
            let output = SummaryOutput {
                period: self.period.describe(),
                summary: &summary,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            self.print_summary(&summary);
        }
        Ok(())
    }

    fn print_summary(&self, summary: &Summary) {
        println!();
        println!("CAPITAL GAINS SUMMARY ({})", self.period.describe());
        println!();
        println!("  Tax events: {}", summary.events);
        print_bucket("Non-discountable gains", &summary.ineligible);
        print_bucket("Discountable gains", &summary.eligible);
        print_bucket("Losses", &summary.losses);
        println!();
        println!(
            "NET CAPITAL GAIN: {} (after 50% discount)",
            format_amount(summary.net_capital_gain)
        );
        println!();
    }
}

fn print_bucket(label: &str, totals: &Totals) {
    println!(
        "  {:<24} Qty: {} | Proceeds: {} | Cost: {} | Gross: {}",
        format!("{}:", label),
        totals.quantity,
        format_amount(totals.proceeds),
        format_amount(totals.cost_base),
        format_amount(totals.gross_value)
    );
}
