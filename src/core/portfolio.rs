use super::cgt::{derive_event, CgtEvent};
use super::fy::FinancialYear;
use super::inventory::Inventory;
use super::transaction::{AssetClass, Side, Transaction};
use super::warnings::Warning;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalcError {
    #[error("no {asset_class} transactions to process")]
    NoTransactions { asset_class: AssetClass },
}

/// Which asset classes a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortfolioScope {
    Crypto,
    Equity,
    Combined,
}

impl PortfolioScope {
    fn combine(a: PortfolioScope, b: PortfolioScope) -> PortfolioScope {
        match (a, b) {
            (PortfolioScope::Crypto, PortfolioScope::Crypto) => PortfolioScope::Crypto,
            (PortfolioScope::Equity, PortfolioScope::Equity) => PortfolioScope::Equity,
            (PortfolioScope::Crypto, _)
            | (PortfolioScope::Equity, _)
            | (PortfolioScope::Combined, _) => PortfolioScope::Combined,
        }
    }

    /// Whether events/holdings of `class` belong to this scope
    pub fn includes(&self, class: AssetClass) -> bool {
        match self {
            PortfolioScope::Combined => true,
            PortfolioScope::Crypto => class == AssetClass::Crypto,
            PortfolioScope::Equity => class == AssetClass::Equity,
        }
    }
}

impl From<AssetClass> for PortfolioScope {
    fn from(class: AssetClass) -> Self {
        match class {
            AssetClass::Crypto => PortfolioScope::Crypto,
            AssetClass::Equity => PortfolioScope::Equity,
        }
    }
}

impl std::fmt::Display for PortfolioScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortfolioScope::Crypto => write!(f, "crypto"),
            PortfolioScope::Equity => write!(f, "equity"),
            PortfolioScope::Combined => write!(f, "combined"),
        }
    }
}

/// Aggregated CGT position for one financial year.
///
/// Built once per calculation and never mutated afterwards (the merger
/// produces fresh summaries rather than editing either input).
#[derive(Debug, Clone, PartialEq)]
pub struct FySummary {
    pub financial_year: FinancialYear,
    pub events: Vec<CgtEvent>,
    pub total_proceeds: Decimal,
    pub total_cost_base: Decimal,
    pub short_term_gains: Decimal,
    pub short_term_losses: Decimal,
    pub long_term_gains: Decimal,
    pub long_term_losses: Decimal,
    pub gross_capital_gain: Decimal,
    pub total_discount: Decimal,
    pub net_capital_gain: Decimal,
}

impl FySummary {
    fn from_events(financial_year: FinancialYear, events: Vec<CgtEvent>) -> Self {
        let mut summary = FySummary {
            financial_year,
            events: Vec::new(),
            total_proceeds: Decimal::ZERO,
            total_cost_base: Decimal::ZERO,
            short_term_gains: Decimal::ZERO,
            short_term_losses: Decimal::ZERO,
            long_term_gains: Decimal::ZERO,
            long_term_losses: Decimal::ZERO,
            gross_capital_gain: Decimal::ZERO,
            total_discount: Decimal::ZERO,
            net_capital_gain: Decimal::ZERO,
        };
        for event in &events {
            summary.total_proceeds += event.proceeds;
            summary.total_cost_base += event.cost_base;
            summary.gross_capital_gain += event.gross_gain;
            summary.total_discount += event.discount;
            summary.net_capital_gain += event.net_gain;
            match (event.is_long_term, event.is_gain()) {
                (false, true) => summary.short_term_gains += event.gross_gain,
                (true, true) => summary.long_term_gains += event.gross_gain,
                (false, false) if event.gross_gain < Decimal::ZERO => {
                    summary.short_term_losses += event.gross_gain
                }
                (true, false) if event.gross_gain < Decimal::ZERO => {
                    summary.long_term_losses += event.gross_gain
                }
                // Break-even events contribute to totals only
                _ => {}
            }
        }
        summary.events = events;
        summary
    }

    /// Fold another year's figures into this one (merge of two reports)
    fn absorb(&mut self, other: FySummary) {
        self.events.extend(other.events);
        self.total_proceeds += other.total_proceeds;
        self.total_cost_base += other.total_cost_base;
        self.short_term_gains += other.short_term_gains;
        self.short_term_losses += other.short_term_losses;
        self.long_term_gains += other.long_term_gains;
        self.long_term_losses += other.long_term_losses;
        self.gross_capital_gain += other.gross_capital_gain;
        self.total_discount += other.total_discount;
        self.net_capital_gain += other.net_capital_gain;
    }

    pub fn disposal_count(&self) -> usize {
        self.events.len()
    }
}

/// Remaining position in one asset after all disposals
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub asset: String,
    pub name: Option<String>,
    pub asset_class: AssetClass,
    pub quantity: Decimal,
    pub cost_base: Decimal,
    pub avg_cost: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Full output of one calculation pass (or a merge of two).
#[derive(Debug, Clone, PartialEq)]
pub struct TaxReport {
    pub scope: PortfolioScope,
    /// One summary per financial year seen in the input, ascending,
    /// including years with buys but no disposals
    pub summaries: Vec<FySummary>,
    /// Ending holdings, descending by cost base
    pub holdings: Vec<Holding>,
    pub transaction_count: usize,
    pub date_range: DateRange,
    pub warnings: Vec<Warning>,
}

impl TaxReport {
    pub fn events(&self) -> impl Iterator<Item = &CgtEvent> {
        self.summaries.iter().flat_map(|s| s.events.iter())
    }

    pub fn summary_for(&self, fy: FinancialYear) -> Option<&FySummary> {
        self.summaries.iter().find(|s| s.financial_year == fy)
    }
}

/// Run the FIFO engine over one asset class's transaction list.
///
/// Precondition: `transactions` are sorted ascending by timestamp (the
/// ingestion readers guarantee this). Ordering is not re-verified here;
/// an unsorted list silently corrupts the FIFO matching.
pub fn calculate(
    asset_class: AssetClass,
    transactions: &[Transaction],
) -> Result<TaxReport, CalcError> {
    if transactions.is_empty() {
        return Err(CalcError::NoTransactions { asset_class });
    }

    // Owned by this call alone; dropped on return
    let mut inventory = Inventory::new(asset_class.quantity_tolerance());
    let mut events_by_fy: HashMap<FinancialYear, Vec<CgtEvent>> = HashMap::new();
    let mut warnings = Vec::new();

    for transaction in transactions {
        match transaction.side {
            Side::Buy => inventory.acquire(
                &transaction.asset,
                transaction.datetime,
                transaction.quantity,
                transaction.consideration,
                transaction.financial_year,
            ),
            Side::Sell => {
                let consumption = inventory.consume(
                    &transaction.asset,
                    transaction.datetime,
                    transaction.quantity,
                );
                if consumption.shortfall > Decimal::ZERO {
                    let available = transaction.quantity - consumption.shortfall;
                    log::warn!(
                        "{}: disposal of {} on {} exceeds recorded holdings of {}",
                        transaction.asset,
                        transaction.quantity,
                        transaction.datetime.date(),
                        available
                    );
                    warnings.push(Warning::InsufficientInventory {
                        asset: transaction.asset.clone(),
                        date: transaction.datetime,
                        available,
                        required: transaction.quantity,
                    });
                }
                let event = derive_event(transaction, asset_class, consumption);
                events_by_fy
                    .entry(transaction.financial_year)
                    .or_default()
                    .push(event);
            }
        }
    }

    // Every FY with any activity gets a summary, disposals or not
    let all_years: BTreeSet<FinancialYear> =
        transactions.iter().map(|t| t.financial_year).collect();
    let summaries = all_years
        .into_iter()
        .map(|fy| FySummary::from_events(fy, events_by_fy.remove(&fy).unwrap_or_default()))
        .collect();

    let holdings = build_holdings(&inventory, asset_class, transactions);

    let start = transactions.iter().map(|t| t.datetime).min();
    let end = transactions.iter().map(|t| t.datetime).max();
    let date_range = DateRange {
        // Non-empty input checked above
        start: start.expect("non-empty transactions"),
        end: end.expect("non-empty transactions"),
    };

    Ok(TaxReport {
        scope: asset_class.into(),
        summaries,
        holdings,
        transaction_count: transactions.len(),
        date_range,
        warnings,
    })
}

fn build_holdings(
    inventory: &Inventory,
    asset_class: AssetClass,
    transactions: &[Transaction],
) -> Vec<Holding> {
    // Last seen display name wins, as with the source exports
    let mut names: HashMap<&str, &str> = HashMap::new();
    for transaction in transactions {
        if let Some(name) = &transaction.name {
            names.insert(transaction.asset.as_str(), name.as_str());
        }
    }

    let mut holdings: Vec<Holding> = inventory
        .iter()
        .filter_map(|(asset, lots)| {
            let quantity: Decimal = lots.iter().map(|lot| lot.remaining).sum();
            let cost_base: Decimal = lots
                .iter()
                .map(|lot| lot.remaining * lot.cost_per_unit)
                .sum();
            if quantity <= inventory.tolerance() {
                return None;
            }
            Some(Holding {
                asset: asset.clone(),
                name: names.get(asset.as_str()).map(|n| n.to_string()),
                asset_class,
                quantity,
                cost_base,
                avg_cost: cost_base / quantity,
            })
        })
        .collect();

    sort_holdings(&mut holdings);
    holdings
}

/// Descending by cost base, asset id as a deterministic tie-break
fn sort_holdings(holdings: &mut [Holding]) {
    holdings.sort_by(|a, b| {
        b.cost_base
            .cmp(&a.cost_base)
            .then_with(|| a.asset.cmp(&b.asset))
    });
}

/// Combine two independently calculated reports into one.
///
/// Purely structural: FY summaries are unioned by year (summing figures and
/// concatenating events), holdings concatenated and re-sorted. No FIFO
/// recomputation happens because the two inputs never share lots.
pub fn merge(a: TaxReport, b: TaxReport) -> TaxReport {
    let scope = PortfolioScope::combine(a.scope, b.scope);

    let mut by_year: BTreeMap<FinancialYear, FySummary> = a
        .summaries
        .into_iter()
        .map(|summary| (summary.financial_year, summary))
        .collect();
    for summary in b.summaries {
        match by_year.entry(summary.financial_year) {
            std::collections::btree_map::Entry::Occupied(mut entry) => {
                entry.get_mut().absorb(summary)
            }
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(summary);
            }
        }
    }
    let summaries: Vec<FySummary> = by_year.into_values().collect();

    let mut holdings = a.holdings;
    holdings.extend(b.holdings);
    sort_holdings(&mut holdings);

    let date_range = DateRange {
        start: a.date_range.start.min(b.date_range.start),
        end: a.date_range.end.max(b.date_range.end),
    };

    let mut warnings = a.warnings;
    warnings.extend(b.warnings);

    TaxReport {
        scope,
        summaries,
        holdings,
        transaction_count: a.transaction_count + b.transaction_count,
        date_range,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn buy(date: NaiveDateTime, asset: &str, quantity: Decimal, total: Decimal) -> Transaction {
        Transaction::new(date, Side::Buy, asset, None, quantity, total)
    }

    fn sell(date: NaiveDateTime, asset: &str, quantity: Decimal, total: Decimal) -> Transaction {
        Transaction::new(date, Side::Sell, asset, None, quantity, total)
    }

    #[test]
    fn empty_input_is_an_explicit_failure() {
        let result = calculate(AssetClass::Crypto, &[]);
        assert_eq!(
            result.unwrap_err(),
            CalcError::NoTransactions {
                asset_class: AssetClass::Crypto
            }
        );
    }

    #[test]
    fn buys_without_disposals_succeed_with_zero_events() {
        let transactions = vec![buy(dt(2023, 8, 1), "BTC", dec!(1), dec!(30000))];
        let report = calculate(AssetClass::Crypto, &transactions).unwrap();

        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.summaries[0].disposal_count(), 0);
        assert_eq!(report.summaries[0].net_capital_gain, Decimal::ZERO);
        assert_eq!(report.holdings.len(), 1);
    }

    #[test]
    fn buy_only_years_still_get_a_summary() {
        let transactions = vec![
            buy(dt(2022, 8, 1), "BTC", dec!(1), dec!(30000)),
            sell(dt(2023, 9, 1), "BTC", dec!(1), dec!(40000)),
        ];
        let report = calculate(AssetClass::Crypto, &transactions).unwrap();

        let years: Vec<FinancialYear> =
            report.summaries.iter().map(|s| s.financial_year).collect();
        assert_eq!(years, vec![FinancialYear(2022), FinancialYear(2023)]);
        assert_eq!(report.summaries[0].disposal_count(), 0);
        assert_eq!(report.summaries[1].disposal_count(), 1);
    }

    #[test]
    fn events_bucketed_by_disposal_year() {
        // Bought in FY2022-23, sold in FY2023-24: the event lands in the
        // disposal's year
        let transactions = vec![
            buy(dt(2023, 1, 1), "BTC", dec!(1), dec!(30000)),
            sell(dt(2023, 8, 1), "BTC", dec!(1), dec!(40000)),
        ];
        let report = calculate(AssetClass::Crypto, &transactions).unwrap();

        let fy2023 = report.summary_for(FinancialYear(2023)).unwrap();
        assert_eq!(fy2023.disposal_count(), 1);
        assert_eq!(
            report.summary_for(FinancialYear(2022)).unwrap().disposal_count(),
            0
        );
    }

    #[test]
    fn summary_partitions_gains_by_term() {
        let transactions = vec![
            // Long-term gain: held ~2 years, +10000
            buy(dt(2021, 7, 1), "BTC", dec!(1), dec!(30000)),
            // Short-term loss: held ~3 months, -2000
            buy(dt(2023, 4, 1), "ETH", dec!(10), dec!(20000)),
            sell(dt(2023, 7, 10), "BTC", dec!(1), dec!(40000)),
            sell(dt(2023, 7, 20), "ETH", dec!(10), dec!(18000)),
        ];
        let report = calculate(AssetClass::Crypto, &transactions).unwrap();
        let summary = report.summary_for(FinancialYear(2023)).unwrap();

        assert_eq!(summary.long_term_gains, dec!(10000));
        assert_eq!(summary.short_term_losses, dec!(-2000));
        assert_eq!(summary.short_term_gains, Decimal::ZERO);
        assert_eq!(summary.long_term_losses, Decimal::ZERO);
        assert_eq!(summary.gross_capital_gain, dec!(8000));
        // Discount halves the eligible long-term gain
        assert_eq!(summary.total_discount, dec!(5000));
        assert_eq!(summary.net_capital_gain, dec!(3000));
    }

    #[test]
    fn fully_disposed_assets_absent_from_holdings() {
        let transactions = vec![
            buy(dt(2023, 1, 1), "BTC", dec!(1), dec!(30000)),
            buy(dt(2023, 2, 1), "ETH", dec!(5), dec!(10000)),
            sell(dt(2023, 3, 1), "BTC", dec!(1), dec!(35000)),
        ];
        let report = calculate(AssetClass::Crypto, &transactions).unwrap();

        assert_eq!(report.holdings.len(), 1);
        assert_eq!(report.holdings[0].asset, "ETH");
        assert!(report.holdings.iter().all(|h| h.quantity > Decimal::ZERO));
        assert!(report.holdings.iter().all(|h| h.cost_base > Decimal::ZERO));
    }

    #[test]
    fn holdings_sorted_by_cost_base_descending() {
        let transactions = vec![
            buy(dt(2023, 1, 1), "ADA", dec!(100), dec!(50)),
            buy(dt(2023, 1, 2), "BTC", dec!(1), dec!(30000)),
            buy(dt(2023, 1, 3), "ETH", dec!(5), dec!(10000)),
        ];
        let report = calculate(AssetClass::Crypto, &transactions).unwrap();

        let assets: Vec<&str> = report.holdings.iter().map(|h| h.asset.as_str()).collect();
        assert_eq!(assets, vec!["BTC", "ETH", "ADA"]);
    }

    #[test]
    fn holding_aggregates_remaining_lots() {
        let transactions = vec![
            buy(dt(2023, 1, 1), "BTC", dec!(1), dec!(20000)),
            buy(dt(2023, 2, 1), "BTC", dec!(1), dec!(40000)),
            sell(dt(2023, 3, 1), "BTC", dec!(0.5), dec!(15000)),
        ];
        let report = calculate(AssetClass::Crypto, &transactions).unwrap();

        let holding = &report.holdings[0];
        assert_eq!(holding.quantity, dec!(1.5));
        // 0.5 left of the first lot at 20000/unit plus the whole second lot
        assert_eq!(holding.cost_base, dec!(50000));
        assert_eq!(holding.avg_cost, holding.cost_base / holding.quantity);
    }

    #[test]
    fn oversell_emits_warning_and_still_produces_event() {
        let transactions = vec![
            buy(dt(2023, 1, 1), "BTC", dec!(1), dec!(30000)),
            sell(dt(2023, 2, 1), "BTC", dec!(2), dec!(80000)),
        ];
        let report = calculate(AssetClass::Crypto, &transactions).unwrap();

        assert_eq!(report.warnings.len(), 1);
        let Warning::InsufficientInventory {
            asset,
            available,
            required,
            ..
        } = &report.warnings[0];
        assert_eq!(asset, "BTC");
        assert_eq!(*available, dec!(1));
        assert_eq!(*required, dec!(2));

        // The event is still emitted, with cost base only for the matched lot
        let event = report.events().next().unwrap();
        assert_eq!(event.cost_base, dec!(30000));
        assert_eq!(event.gross_gain, dec!(50000));
    }

    #[test]
    fn determinism_of_repeated_runs() {
        let transactions = vec![
            buy(dt(2022, 7, 5), "BTC", dec!(2), dec!(50000)),
            buy(dt(2022, 9, 1), "ETH", dec!(10), dec!(20000)),
            sell(dt(2023, 8, 1), "BTC", dec!(1.5), dec!(60000)),
            sell(dt(2024, 2, 1), "ETH", dec!(4), dec!(9000)),
        ];
        let first = calculate(AssetClass::Crypto, &transactions).unwrap();
        let second = calculate(AssetClass::Crypto, &transactions).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn merge_sums_matching_years() {
        let crypto = calculate(
            AssetClass::Crypto,
            &[
                buy(dt(2023, 7, 1), "BTC", dec!(1), dec!(30000)),
                sell(dt(2023, 8, 1), "BTC", dec!(1), dec!(30100)),
            ],
        )
        .unwrap();
        let equities = calculate(
            AssetClass::Equity,
            &[
                buy(dt(2023, 7, 1), "BHP.AX", dec!(100), dec!(4000)),
                sell(dt(2023, 9, 1), "BHP.AX", dec!(100), dec!(4200)),
            ],
        )
        .unwrap();

        let merged = merge(crypto, equities);

        assert_eq!(merged.scope, PortfolioScope::Combined);
        assert_eq!(merged.summaries.len(), 1);
        let summary = merged.summary_for(FinancialYear(2023)).unwrap();
        assert_eq!(summary.net_capital_gain, dec!(300));
        assert_eq!(summary.disposal_count(), 2);
        assert_eq!(merged.transaction_count, 4);
    }

    #[test]
    fn merge_carries_one_sided_years_through() {
        let crypto = calculate(
            AssetClass::Crypto,
            &[
                buy(dt(2021, 8, 1), "BTC", dec!(1), dec!(30000)),
                sell(dt(2021, 9, 1), "BTC", dec!(1), dec!(31000)),
            ],
        )
        .unwrap();
        let equities = calculate(
            AssetClass::Equity,
            &[
                buy(dt(2023, 8, 1), "BHP.AX", dec!(10), dec!(400)),
                sell(dt(2023, 9, 1), "BHP.AX", dec!(10), dec!(500)),
            ],
        )
        .unwrap();

        let merged = merge(crypto, equities);

        let years: Vec<FinancialYear> =
            merged.summaries.iter().map(|s| s.financial_year).collect();
        assert_eq!(years, vec![FinancialYear(2021), FinancialYear(2023)]);
        assert_eq!(
            merged.summary_for(FinancialYear(2021)).unwrap().net_capital_gain,
            dec!(1000)
        );
        assert_eq!(
            merged.summary_for(FinancialYear(2023)).unwrap().net_capital_gain,
            dec!(100)
        );
    }

    #[test]
    fn merge_extends_date_range_and_holdings() {
        let crypto = calculate(
            AssetClass::Crypto,
            &[buy(dt(2021, 8, 1), "BTC", dec!(1), dec!(30000))],
        )
        .unwrap();
        let equities = calculate(
            AssetClass::Equity,
            &[buy(dt(2023, 8, 1), "BHP.AX", dec!(10), dec!(400))],
        )
        .unwrap();

        let merged = merge(crypto, equities);

        assert_eq!(merged.date_range.start, dt(2021, 8, 1));
        assert_eq!(merged.date_range.end, dt(2023, 8, 1));
        // Re-sorted by cost base across classes
        let assets: Vec<&str> = merged.holdings.iter().map(|h| h.asset.as_str()).collect();
        assert_eq!(assets, vec!["BTC", "BHP.AX"]);
    }

    #[test]
    fn merge_same_class_keeps_scope() {
        let a = calculate(
            AssetClass::Crypto,
            &[buy(dt(2021, 8, 1), "BTC", dec!(1), dec!(30000))],
        )
        .unwrap();
        let b = calculate(
            AssetClass::Crypto,
            &[buy(dt(2022, 8, 1), "ETH", dec!(1), dec!(3000))],
        )
        .unwrap();
        assert_eq!(merge(a, b).scope, PortfolioScope::Crypto);
    }
}
