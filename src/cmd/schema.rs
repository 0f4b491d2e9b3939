//! Schema command - print expected input formats

use crate::core::{TransactionInput, TransactionKind};
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema or csv-header
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the input format
    JsonSchema,
    /// CSV header row with column names
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => self.print_json_schema(),
            SchemaFormat::CsvHeader => self.print_csv_header(),
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
    }

    fn print_json_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(TransactionInput);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_header(&self) -> anyhow::Result<()> {
        println!("{}", CSV_COLUMNS.join(","));
        Ok(())
    }

    fn print_csv_fields(&self) -> anyhow::Result<()> {
        println!("CSV Input Format");
        println!("================");
        println!();
        for (name, required, description) in CSV_FIELD_DESCRIPTIONS {
            let req = if *required { "required" } else { "optional" };
            println!("{:20} ({:8})  {}", name, req, description);
        }
        println!();
        let kinds: Vec<_> = TransactionKind::ALL.iter().map(|k| k.display()).collect();
        println!("Transaction kinds: {}", kinds.join(", "));
        println!("Rows are replayed in file order.");
        Ok(())
    }
}

const CSV_COLUMNS: &[&str] = &[
    "date",
    "asset_kind",
    "asset_identifier",
    "transaction_kind",
    "quantity",
    "value",
    "option_id",
    "split_option_id",
];

const CSV_FIELD_DESCRIPTIONS: &[(&str, bool, &str)] = &[
    ("date", true, "Trade or effective date (YYYY-MM-DD)"),
    ("asset_kind", true, "Share or Option"),
    ("asset_identifier", true, "Ticker or symbol (e.g., BHP)"),
    ("transaction_kind", true, "One of the transaction kinds below"),
    (
        "quantity",
        true,
        "Whole units traded; the ratio for Split and Merge",
    ),
    (
        "value",
        true,
        "Total cost, proceeds or exercise price paid",
    ),
    (
        "option_id",
        false,
        "Option series (required for Option rows and both Exercise legs)",
    ),
    (
        "split_option_id",
        false,
        "New option series created by a Split or Merge",
    ),
];
