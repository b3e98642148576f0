//! Report command - per-financial-year CGT summaries and ending holdings

use crate::cmd::{format_aud, format_aud_signed, format_quantity, parse_year_filter, InputArgs};
use crate::core::{FySummary, FinancialYear, TaxReport};
use clap::Args;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Financial year to report (e.g., FY2023-24 or 2023)
    #[arg(short, long)]
    year: Option<String>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let report = self.input.load_report()?;
        let year = parse_year_filter(&self.year)?;

        if self.json {
            self.print_json(&report, year)
        } else {
            self.print_report(&report, year);
            Ok(())
        }
    }

    fn print_report(&self, report: &TaxReport, year: Option<FinancialYear>) {
        let year_str = year.map_or("All Years".to_string(), |y| y.label());

        println!();
        println!(
            "CGT REPORT ({}) - {} | {} transactions, {} to {}",
            year_str,
            report.scope,
            report.transaction_count,
            report.date_range.start.date().format("%d/%m/%Y"),
            report.date_range.end.date().format("%d/%m/%Y"),
        );
        println!();

        let summaries: Vec<&FySummary> = report
            .summaries
            .iter()
            .filter(|s| year.is_none_or(|y| s.financial_year == y))
            .collect();

        if summaries.is_empty() {
            println!("No financial years found matching filters ({})", year_str);
        }

        for summary in summaries {
            println!(
                "FINANCIAL YEAR {} ({} - {})",
                summary.financial_year,
                summary.financial_year.start().format("%d/%m/%Y"),
                summary.financial_year.end().format("%d/%m/%Y"),
            );
            println!("  Disposals: {}", summary.disposal_count());
            println!(
                "  Proceeds: {} | Cost base: {} | Gross gain: {}",
                format_aud(summary.total_proceeds),
                format_aud(summary.total_cost_base),
                format_aud_signed(summary.gross_capital_gain),
            );
            println!(
                "  Short-term gains: {} | losses: {}",
                format_aud(summary.short_term_gains),
                format_aud_signed(summary.short_term_losses),
            );
            println!(
                "  Long-term gains: {} | losses: {}",
                format_aud(summary.long_term_gains),
                format_aud_signed(summary.long_term_losses),
            );
            println!("  CGT discount: {}", format_aud(summary.total_discount));
            println!(
                "  Net capital gain: {}",
                format_aud_signed(summary.net_capital_gain)
            );
            println!();
        }

        println!("HOLDINGS");
        if report.holdings.is_empty() {
            println!("  (none)");
        } else {
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
        }

        if !report.warnings.is_empty() {
            println!();
            println!("WARNINGS");
            for warning in &report.warnings {
                println!("  - {}", warning);
            }
        }
        println!();
    }

    fn print_json(&self, report: &TaxReport, year: Option<FinancialYear>) -> anyhow::Result<()> {
        let data = ReportData {
            scope: report.scope.to_string(),
            transaction_count: report.transaction_count,
            date_start: report.date_range.start.to_string(),
            date_end: report.date_range.end.to_string(),
            years: report
                .summaries
                .iter()
                .filter(|s| year.is_none_or(|y| s.financial_year == y))
                .map(|s| YearData {
                    financial_year: s.financial_year.label(),
                    disposals: s.disposal_count(),
                    total_proceeds: format!("{:.2}", s.total_proceeds),
                    total_cost_base: format!("{:.2}", s.total_cost_base),
                    short_term_gains: format!("{:.2}", s.short_term_gains),
                    short_term_losses: format!("{:.2}", s.short_term_losses),
                    long_term_gains: format!("{:.2}", s.long_term_gains),
                    long_term_losses: format!("{:.2}", s.long_term_losses),
                    gross_capital_gain: format!("{:.2}", s.gross_capital_gain),
                    total_discount: format!("{:.2}", s.total_discount),
                    net_capital_gain: format!("{:.2}", s.net_capital_gain),
                })
                .collect(),
            holdings: report
                .holdings
                .iter()
                .map(|h| HoldingData {
                    asset: h.asset.clone(),
                    name: h.name.clone(),
                    quantity: h.quantity.to_string(),
                    cost_base: format!("{:.2}", h.cost_base),
                    avg_cost: format!("{:.2}", h.avg_cost),
                })
                .collect(),
            warnings: report.warnings.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&data)?);
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

/// Report data for JSON output
#[derive(Debug, Serialize)]
struct ReportData {
    scope: String,
    transaction_count: usize,
    date_start: String,
    date_end: String,
    years: Vec<YearData>,
    holdings: Vec<HoldingData>,
    warnings: Vec<crate::core::Warning>,
}

#[derive(Debug, Serialize)]
struct YearData {
    financial_year: String,
    disposals: usize,
    total_proceeds: String,
    total_cost_base: String,
    short_term_gains: String,
    short_term_losses: String,
    long_term_gains: String,
    long_term_losses: String,
    gross_capital_gain: String,
    total_discount: String,
    net_capital_gain: String,
}

#[derive(Debug, Serialize)]
struct HoldingData {
    asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    quantity: String,
    cost_base: String,
    avg_cost: String,
}
