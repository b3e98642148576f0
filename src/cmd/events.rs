//! Events command - disposal-level view with per-lot drill-down

use crate::cmd::{format_aud, format_aud_signed, format_quantity, parse_year_filter, InputArgs};
use crate::core::{discount_eligible_detail, CgtEvent, FinancialYear};
use clap::Args;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct EventsCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Financial year to filter (e.g., FY2023-24 or 2023)
    #[arg(short, long)]
    year: Option<String>,

    /// Filter by asset (e.g., BTC, BHP.AX)
    #[arg(short, long)]
    asset: Option<String>,

    /// Show the per-lot acquisition breakdown under each event
    #[arg(long)]
    detailed: bool,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

impl EventsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let report = self.input.load_report()?;
        let year = parse_year_filter(&self.year)?;

        let events: Vec<&CgtEvent> = report
            .events()
            .filter(|e| year.is_none_or(|y| e.financial_year == y))
            .filter(|e| {
                self.asset
                    .as_deref()
                    .is_none_or(|a| e.asset.eq_ignore_ascii_case(a))
            })
            .collect();

        if self.csv {
            write_csv(&events, io::stdout())
        } else {
            self.print_events(&events, year);
            Ok(())
        }
    }

    fn print_events(&self, events: &[&CgtEvent], year: Option<FinancialYear>) {
        let year_str = year.map_or("All Years".to_string(), |y| y.label());
        if events.is_empty() {
            println!("No CGT events found matching filters ({})", year_str);
            return;
        }

        println!();
        println!("CGT EVENTS ({})", year_str);
        println!();

        let rows: Vec<EventRow> = events
            .iter()
            .enumerate()
            .map(|(i, e)| EventRow {
                num: i + 1,
                date: e.disposed.date().format("%d/%m/%Y").to_string(),
                financial_year: e.financial_year.label(),
                asset: e.asset.clone(),
                quantity: format_quantity(e.quantity),
                proceeds: format_aud(e.proceeds),
                cost_base: format_aud(e.cost_base),
                gain: format_aud_signed(e.gross_gain),
                held_days: e.holding_days.to_string(),
                term: if e.is_long_term { "LT" } else { "ST" }.to_string(),
                discount: format_aud(e.discount),
                net_gain: format_aud_signed(e.net_gain),
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);

        if self.detailed {
            for (i, event) in events.iter().enumerate() {
                println!();
                println!(
                    "Event #{}: {} x {} sold {} (discount-eligible {}%)",
                    i + 1,
                    format_quantity(event.quantity),
                    event.asset,
                    event.disposed.date().format("%d/%m/%Y"),
                    (event.discount_fraction * dec!(100)).round_dp(2),
                );
                if event.acquisitions.is_empty() {
                    println!("  (no matched acquisitions)");
                    continue;
                }
                let rows: Vec<AcquisitionRow> = event
                    .acquisitions
                    .iter()
                    .map(|d| AcquisitionRow {
                        acquired: d.acquired.date().format("%d/%m/%Y").to_string(),
                        quantity: format_quantity(d.quantity),
                        cost: format_aud(d.cost),
                        held_days: d.holding_days.to_string(),
                        eligible: if discount_eligible_detail(d) { "yes" } else { "no" }
                            .to_string(),
                    })
                    .collect();
                let table = Table::new(rows)
                    .with(Style::rounded())
                    .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
                    .to_string();
                println!("{}", table);
            }
        }
        println!();
    }
}

/// Write events to CSV
fn write_csv<'a, E, W>(events: E, writer: W) -> anyhow::Result<()>
where
    E: IntoIterator<Item = &'a &'a CgtEvent>,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for event in events {
        let record: EventCsvRecord = (*event).into();
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Tabled)]
struct EventRow {
    #[tabled(rename = "#")]
    num: usize,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "FY")]
    financial_year: String,
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Cost Base")]
    cost_base: String,
    #[tabled(rename = "Gain/Loss")]
    gain: String,
    #[tabled(rename = "Held (d)")]
    held_days: String,
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Discount")]
    discount: String,
    #[tabled(rename = "Net Gain")]
    net_gain: String,
}

#[derive(Debug, Clone, Tabled)]
struct AcquisitionRow {
    #[tabled(rename = "Acquired")]
    acquired: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Held (d)")]
    held_days: String,
    #[tabled(rename = "Discount?")]
    eligible: String,
}

/// CSV record for event output
#[derive(Debug, Serialize, Deserialize)]
struct EventCsvRecord {
    disposal_date: String,
    acquisition_date: String,
    financial_year: String,
    asset: String,
    quantity: String,
    proceeds: String,
    cost_base: String,
    gross_gain: String,
    holding_days: i64,
    is_long_term: bool,
    discount_percent: String,
    discount: String,
    net_gain: String,
}

impl From<&CgtEvent> for EventCsvRecord {
    fn from(event: &CgtEvent) -> Self {
        EventCsvRecord {
            disposal_date: event.disposed.date().format("%Y-%m-%d").to_string(),
            acquisition_date: event.acquired.date().format("%Y-%m-%d").to_string(),
            financial_year: event.financial_year.label(),
            asset: event.asset.clone(),
            quantity: event.quantity.to_string(),
            proceeds: event.proceeds.round_dp(2).to_string(),
            cost_base: event.cost_base.round_dp(2).to_string(),
            gross_gain: event.gross_gain.round_dp(2).to_string(),
            holding_days: event.holding_days,
            is_long_term: event.is_long_term,
            discount_percent: (event.discount_fraction * dec!(100)).round_dp(2).to_string(),
            discount: event.discount.round_dp(2).to_string(),
            net_gain: event.net_gain.round_dp(2).to_string(),
        }
    }
}
