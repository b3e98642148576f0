//! taxau - Australian Capital Gains Tax calculator
//!
//! Matches disposals against acquisition lots strictly first-in-first-out,
//! applies the 12-month CGT discount per lot, and reports per financial
//! year (1 July - 30 June).

mod cmd;
mod core;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "taxau",
    version,
    about = "Calculate Australian Capital Gains Tax (CGT) with FIFO lot matching"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Per-financial-year CGT summaries with ending holdings
    Report(cmd::report::ReportCommand),
    /// Individual CGT events with per-lot drill-down
    Events(cmd::events::EventsCommand),
    /// Ending holdings snapshot
    Holdings(cmd::holdings::HoldingsCommand),
    /// Cost-basis portfolio metrics and per-asset performance
    Portfolio(cmd::portfolio::PortfolioCommand),
    /// Print expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Report(cmd) => cmd.exec(),
        Command::Events(cmd) => cmd.exec(),
        Command::Holdings(cmd) => cmd.exec(),
        Command::Portfolio(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
    }
}
