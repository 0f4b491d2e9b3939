mod cmd;
mod core;

use clap::{Parser, Subcommand};

/// Capital gains cost-base tracking for shares and options
#[derive(Parser, Debug)]
#[command(name = "costbase", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Realised gains and losses, optionally filtered and grouped
    Events(cmd::events::EventsCommand),
    /// Open parcels with cost base and discount eligibility
    Holdings(cmd::holdings::HoldingsCommand),
    /// Totals per discountability and net capital gain
    Summary(cmd::summary::SummaryCommand),
    /// Print the transaction input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Events(c) => c.exec(),
        Command::Holdings(c) => c.exec(),
        Command::Summary(c) => c.exec(),
        Command::Schema(c) => c.exec(),
    }
}
