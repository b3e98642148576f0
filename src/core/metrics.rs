use super::cgt::CgtEvent;
use super::portfolio::{Holding, PortfolioScope, TaxReport};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Cost-basis portfolio metrics derived from a finished report.
/// No market prices are involved; everything is realized or at-cost.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioMetrics {
    /// Sum of holding cost bases
    pub total_invested: Decimal,
    /// Sum of net capital gains across all years in scope
    pub total_realized_gain: Decimal,
    pub holdings_count: usize,
    /// All transactions behind the report, both sides
    pub transaction_count: usize,
    pub sell_event_count: usize,
    pub long_term_event_count: usize,
    pub short_term_event_count: usize,
    /// Long-term events as a percentage of all events
    pub long_term_percent: Decimal,
    pub total_discount: Decimal,
    /// Proceeds-weighted average holding period, whole days
    pub avg_holding_days: i64,
}

/// One held asset's share of the invested cost base
#[derive(Debug, Clone, PartialEq)]
pub struct AssetBreakdown {
    pub asset: String,
    pub name: Option<String>,
    pub quantity: Decimal,
    pub cost_base: Decimal,
    pub percent_of_portfolio: Decimal,
}

/// Realized performance of one asset across all its disposals
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPerformance {
    pub asset: String,
    pub name: Option<String>,
    pub total_sold: Decimal,
    pub realized_gain: Decimal,
    pub discount: Decimal,
    pub event_count: usize,
    pub avg_holding_days: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioView {
    pub scope: PortfolioScope,
    pub holdings: Vec<Holding>,
    pub metrics: PortfolioMetrics,
    pub breakdown: Vec<AssetBreakdown>,
    pub performance: Vec<AssetPerformance>,
}

/// Build the portfolio view for one scope of a report.
///
/// Scope filtering keys off the asset-class tag carried by every event and
/// holding, so a combined report can be sliced back into its classes.
pub fn portfolio_view(report: &TaxReport, scope: PortfolioScope) -> PortfolioView {
    let holdings: Vec<Holding> = report
        .holdings
        .iter()
        .filter(|h| scope.includes(h.asset_class))
        .cloned()
        .collect();
    let events: Vec<&CgtEvent> = report
        .events()
        .filter(|e| scope.includes(e.asset_class))
        .collect();

    let metrics = build_metrics(report, &holdings, &events);
    let breakdown = build_breakdown(&holdings);
    let performance = build_performance(&events);

    PortfolioView {
        scope,
        holdings,
        metrics,
        breakdown,
        performance,
    }
}

fn build_metrics(
    report: &TaxReport,
    holdings: &[Holding],
    events: &[&CgtEvent],
) -> PortfolioMetrics {
    let total_invested: Decimal = holdings.iter().map(|h| h.cost_base).sum();
    let total_realized_gain: Decimal = events.iter().map(|e| e.net_gain).sum();
    let total_discount: Decimal = events.iter().map(|e| e.discount).sum();

    let long_term_event_count = events.iter().filter(|e| e.is_long_term).count();
    let short_term_event_count = events.len() - long_term_event_count;
    let long_term_percent = if events.is_empty() {
        Decimal::ZERO
    } else {
        Decimal::from(long_term_event_count) / Decimal::from(events.len()) * dec!(100)
    };

    PortfolioMetrics {
        total_invested,
        total_realized_gain,
        holdings_count: holdings.len(),
        transaction_count: report.transaction_count,
        sell_event_count: events.len(),
        long_term_event_count,
        short_term_event_count,
        long_term_percent,
        total_discount,
        avg_holding_days: weighted_holding_days(events.iter().copied()),
    }
}

fn build_breakdown(holdings: &[Holding]) -> Vec<AssetBreakdown> {
    let total_invested: Decimal = holdings.iter().map(|h| h.cost_base).sum();
    let mut breakdown: Vec<AssetBreakdown> = holdings
        .iter()
        .map(|holding| AssetBreakdown {
            asset: holding.asset.clone(),
            name: holding.name.clone(),
            quantity: holding.quantity,
            cost_base: holding.cost_base,
            percent_of_portfolio: if total_invested > Decimal::ZERO {
                holding.cost_base / total_invested * dec!(100)
            } else {
                Decimal::ZERO
            },
        })
        .collect();
    breakdown.sort_by(|a, b| {
        b.cost_base
            .cmp(&a.cost_base)
            .then_with(|| a.asset.cmp(&b.asset))
    });
    breakdown
}

fn build_performance(events: &[&CgtEvent]) -> Vec<AssetPerformance> {
    let mut by_asset: BTreeMap<&str, Vec<&CgtEvent>> = BTreeMap::new();
    for event in events {
        by_asset.entry(event.asset.as_str()).or_default().push(event);
    }

    let mut performance: Vec<AssetPerformance> = by_asset
        .into_iter()
        .map(|(asset, events)| AssetPerformance {
            asset: asset.to_string(),
            name: events.iter().find_map(|e| e.name.clone()),
            total_sold: events.iter().map(|e| e.quantity).sum(),
            realized_gain: events.iter().map(|e| e.net_gain).sum(),
            discount: events.iter().map(|e| e.discount).sum(),
            event_count: events.len(),
            avg_holding_days: weighted_holding_days(events.iter().copied()),
        })
        .collect();

    performance.sort_by(|a, b| {
        b.realized_gain
            .cmp(&a.realized_gain)
            .then_with(|| a.asset.cmp(&b.asset))
    });
    performance
}

/// Average holding period weighted by proceeds, rounded to whole days
fn weighted_holding_days<'a>(events: impl Iterator<Item = &'a CgtEvent>) -> i64 {
    let mut weighted = Decimal::ZERO;
    let mut total_proceeds = Decimal::ZERO;
    for event in events {
        weighted += Decimal::from(event.holding_days) * event.proceeds;
        total_proceeds += event.proceeds;
    }
    if total_proceeds > Decimal::ZERO {
        (weighted / total_proceeds).round().to_i64().unwrap_or(0)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::portfolio::{calculate, merge};
    use crate::core::transaction::{AssetClass, Side, Transaction};
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn tx(
        date: NaiveDateTime,
        side: Side,
        asset: &str,
        quantity: Decimal,
        total: Decimal,
    ) -> Transaction {
        Transaction::new(date, side, asset, None, quantity, total)
    }

    fn combined_report() -> TaxReport {
        let crypto = calculate(
            AssetClass::Crypto,
            &[
                tx(dt(2021, 7, 1), Side::Buy, "BTC", dec!(2), dec!(60000)),
                tx(dt(2023, 8, 1), Side::Sell, "BTC", dec!(1), dec!(50000)),
            ],
        )
        .unwrap();
        let equities = calculate(
            AssetClass::Equity,
            &[
                tx(dt(2023, 7, 1), Side::Buy, "BHP.AX", dec!(100), dec!(4000)),
                tx(dt(2023, 9, 1), Side::Sell, "BHP.AX", dec!(50), dec!(1900)),
            ],
        )
        .unwrap();
        merge(crypto, equities)
    }

    #[test]
    fn metrics_totals_for_combined_scope() {
        let report = combined_report();
        let view = portfolio_view(&report, PortfolioScope::Combined);

        assert_eq!(view.metrics.holdings_count, 2);
        assert_eq!(view.metrics.sell_event_count, 2);
        assert_eq!(view.metrics.transaction_count, 4);
        assert_eq!(view.metrics.long_term_event_count, 1);
        assert_eq!(view.metrics.short_term_event_count, 1);
        assert_eq!(view.metrics.long_term_percent, dec!(50));
        // Remaining: 1 BTC at 30000 + 50 BHP at 2000
        assert_eq!(view.metrics.total_invested, dec!(32000));
        // BTC: gross 20000 long-term, discount 10000, net 10000;
        // BHP: gross -100, net -100
        assert_eq!(view.metrics.total_discount, dec!(10000));
        assert_eq!(view.metrics.total_realized_gain, dec!(9900));
    }

    #[test]
    fn scope_filter_slices_by_asset_class() {
        let report = combined_report();

        let crypto_view = portfolio_view(&report, PortfolioScope::Crypto);
        assert_eq!(crypto_view.holdings.len(), 1);
        assert_eq!(crypto_view.holdings[0].asset, "BTC");
        assert_eq!(crypto_view.metrics.sell_event_count, 1);
        assert_eq!(crypto_view.metrics.total_realized_gain, dec!(10000));

        let equity_view = portfolio_view(&report, PortfolioScope::Equity);
        assert_eq!(equity_view.holdings.len(), 1);
        assert_eq!(equity_view.holdings[0].asset, "BHP.AX");
        assert_eq!(equity_view.metrics.total_realized_gain, dec!(-100));
    }

    #[test]
    fn breakdown_percentages_sum_to_hundred() {
        let report = combined_report();
        let view = portfolio_view(&report, PortfolioScope::Combined);

        let total: Decimal = view
            .breakdown
            .iter()
            .map(|b| b.percent_of_portfolio)
            .sum();
        assert_eq!(total.round_dp(6), dec!(100));
        // Largest position first
        assert_eq!(view.breakdown[0].asset, "BTC");
    }

    #[test]
    fn performance_sorted_by_realized_gain() {
        let report = combined_report();
        let view = portfolio_view(&report, PortfolioScope::Combined);

        assert_eq!(view.performance.len(), 2);
        assert_eq!(view.performance[0].asset, "BTC");
        assert_eq!(view.performance[0].realized_gain, dec!(10000));
        assert_eq!(view.performance[1].asset, "BHP.AX");
        assert_eq!(view.performance[1].realized_gain, dec!(-100));
    }

    #[test]
    fn empty_scope_yields_zeroed_metrics() {
        let crypto_only = calculate(
            AssetClass::Crypto,
            &[tx(dt(2023, 7, 1), Side::Buy, "BTC", dec!(1), dec!(30000))],
        )
        .unwrap();
        let view = portfolio_view(&crypto_only, PortfolioScope::Equity);

        assert!(view.holdings.is_empty());
        assert_eq!(view.metrics.total_invested, Decimal::ZERO);
        assert_eq!(view.metrics.long_term_percent, Decimal::ZERO);
        assert_eq!(view.metrics.avg_holding_days, 0);
        assert!(view.performance.is_empty());
    }
}
