//! Holdings command - ending inventory snapshot

use crate::cmd::{format_aud, format_quantity, InputArgs};
use clap::Args;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct HoldingsCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

impl HoldingsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let report = self.input.load_report()?;

        if self.json {
            let output = HoldingsOutput {
                holdings: report
                    .holdings
                    .iter()
                    .map(|h| HoldingData {
                        asset: h.asset.clone(),
                        name: h.name.clone(),
                        asset_class: h.asset_class.to_string(),
                        quantity: h.quantity.to_string(),
                        cost_base: format!("{:.2}", h.cost_base),
                        avg_cost: format!("{:.2}", h.avg_cost),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        if report.holdings.is_empty() {
            println!("No holdings remain");
            return Ok(());
        }

        println!();
        println!("HOLDINGS ({})", report.scope);
        println!();

        let rows: Vec<HoldingRow> = report
            .holdings
            .iter()
            .map(|h| HoldingRow {
                asset: h.asset.clone(),
                name: h.name.clone().unwrap_or_default(),
                quantity: format_quantity(h.quantity),
                cost_base: format_aud(h.cost_base),
                avg_cost: format_aud(h.avg_cost),
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        println!();
        Ok(())
    }
}

#[derive(Debug, Clone, Tabled)]
struct HoldingRow {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Cost Base")]
    cost_base: String,
    #[tabled(rename = "Avg Cost")]
    avg_cost: String,
}

#[derive(Debug, Serialize)]
struct HoldingsOutput {
    holdings: Vec<HoldingData>,
}

#[derive(Debug, Serialize)]
struct HoldingData {
    asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    asset_class: String,
    quantity: String,
    cost_base: String,
    avg_cost: String,
}
