//! Portfolio command - cost-basis metrics and per-asset performance

use crate::cmd::{format_aud, format_aud_signed, format_quantity, InputArgs};
use crate::core::{portfolio_view, PortfolioScope, PortfolioView};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct PortfolioCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Slice of the portfolio to show
    #[arg(short, long, value_enum, default_value_t = ScopeArg::Combined)]
    scope: ScopeArg,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ScopeArg {
    #[default]
    Combined,
    Crypto,
    Equity,
}

impl From<ScopeArg> for PortfolioScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Combined => PortfolioScope::Combined,
            ScopeArg::Crypto => PortfolioScope::Crypto,
            ScopeArg::Equity => PortfolioScope::Equity,
        }
    }
}

impl PortfolioCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let report = self.input.load_report()?;
        let view = portfolio_view(&report, self.scope.into());

        if self.json {
            self.print_json(&view)
        } else {
            self.print_view(&view);
            Ok(())
        }
    }

    fn print_view(&self, view: &PortfolioView) {
        let metrics = &view.metrics;

        println!();
        println!("PORTFOLIO ({})", view.scope);
        println!();
        println!(
            "  Invested (at cost): {} across {} holdings",
            format_aud(metrics.total_invested),
            metrics.holdings_count
        );
        println!(
            "  Realized gain: {} | CGT discount received: {}",
            format_aud_signed(metrics.total_realized_gain),
            format_aud(metrics.total_discount)
        );
        println!(
            "  Disposals: {} ({} long-term, {} short-term, {:.0}% long-term)",
            metrics.sell_event_count,
            metrics.long_term_event_count,
            metrics.short_term_event_count,
            metrics.long_term_percent
        );
        println!(
            "  Average holding period: {} days | Transactions: {}",
            metrics.avg_holding_days, metrics.transaction_count
        );
        println!();

        if !view.breakdown.is_empty() {
            println!("ALLOCATION (by cost base)");
            let rows: Vec<BreakdownRow> = view
                .breakdown
                .iter()
                .map(|b| BreakdownRow {
                    asset: b.asset.clone(),
                    quantity: format_quantity(b.quantity),
                    cost_base: format_aud(b.cost_base),
                    percent: format!("{:.1}%", b.percent_of_portfolio),
                })
                .collect();
            let table = Table::new(rows)
                .with(Style::rounded())
                .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
                .to_string();
            println!("{}", table);
            println!();
        }

        if !view.performance.is_empty() {
            println!("REALIZED PERFORMANCE (by asset)");
            let rows: Vec<PerformanceRow> = view
                .performance
                .iter()
                .map(|p| PerformanceRow {
                    asset: p.asset.clone(),
                    sold: format_quantity(p.total_sold),
                    events: p.event_count,
                    realized: format_aud_signed(p.realized_gain),
                    discount: format_aud(p.discount),
                    held_days: p.avg_holding_days.to_string(),
                })
                .collect();
            let table = Table::new(rows)
                .with(Style::rounded())
                .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
                .to_string();
            println!("{}", table);
            println!();
        }
    }

    fn print_json(&self, view: &PortfolioView) -> anyhow::Result<()> {
        let data = PortfolioData {
            scope: view.scope.to_string(),
            total_invested: format!("{:.2}", view.metrics.total_invested),
            total_realized_gain: format!("{:.2}", view.metrics.total_realized_gain),
            total_discount: format!("{:.2}", view.metrics.total_discount),
            holdings_count: view.metrics.holdings_count,
            transaction_count: view.metrics.transaction_count,
            sell_event_count: view.metrics.sell_event_count,
            long_term_event_count: view.metrics.long_term_event_count,
            short_term_event_count: view.metrics.short_term_event_count,
            long_term_percent: format!("{:.1}", view.metrics.long_term_percent),
            avg_holding_days: view.metrics.avg_holding_days,
            allocation: view
                .breakdown
                .iter()
                .map(|b| AllocationData {
                    asset: b.asset.clone(),
                    name: b.name.clone(),
                    quantity: b.quantity.to_string(),
                    cost_base: format!("{:.2}", b.cost_base),
                    percent_of_portfolio: format!("{:.2}", b.percent_of_portfolio),
                })
                .collect(),
            performance: view
                .performance
                .iter()
                .map(|p| PerformanceData {
                    asset: p.asset.clone(),
                    name: p.name.clone(),
                    total_sold: p.total_sold.to_string(),
                    realized_gain: format!("{:.2}", p.realized_gain),
                    discount: format!("{:.2}", p.discount),
                    event_count: p.event_count,
                    avg_holding_days: p.avg_holding_days,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&data)?);
        Ok(())
    }
}

#[derive(Debug, Clone, Tabled)]
struct BreakdownRow {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Cost Base")]
    cost_base: String,
    #[tabled(rename = "% of Portfolio")]
    percent: String,
}

#[derive(Debug, Clone, Tabled)]
struct PerformanceRow {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Sold")]
    sold: String,
    #[tabled(rename = "Events")]
    events: usize,
    #[tabled(rename = "Realized")]
    realized: String,
    #[tabled(rename = "Discount")]
    discount: String,
    #[tabled(rename = "Avg Held (d)")]
    held_days: String,
}

/// Portfolio data for JSON output
#[derive(Debug, Serialize)]
struct PortfolioData {
    scope: String,
    total_invested: String,
    total_realized_gain: String,
    total_discount: String,
    holdings_count: usize,
    transaction_count: usize,
    sell_event_count: usize,
    long_term_event_count: usize,
    short_term_event_count: usize,
    long_term_percent: String,
    avg_holding_days: i64,
    allocation: Vec<AllocationData>,
    performance: Vec<PerformanceData>,
}

#[derive(Debug, Serialize)]
struct AllocationData {
    asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    quantity: String,
    cost_base: String,
    percent_of_portfolio: String,
}

#[derive(Debug, Serialize)]
struct PerformanceData {
    asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    total_sold: String,
    realized_gain: String,
    discount: String,
    event_count: usize,
    avg_holding_days: i64,
}
