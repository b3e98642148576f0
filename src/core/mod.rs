pub mod cgt;
pub mod fy;
pub mod inventory;
pub mod metrics;
pub mod portfolio;
pub mod transaction;
pub mod warnings;

// Flat public surface for domain types and functions.
pub use cgt::{derive_event, discount_eligible_detail, CgtEvent};
pub use fy::FinancialYear;
pub use inventory::{AcquisitionDetail, Consumption, Inventory, Lot};
pub use metrics::{
    portfolio_view, AssetBreakdown, AssetPerformance, PortfolioMetrics, PortfolioView,
};
pub use portfolio::{
    calculate, merge, CalcError, DateRange, FySummary, Holding, PortfolioScope, TaxReport,
};
pub use transaction::{
    classify_records, read_crypto_csv, read_equity_csv, read_transactions_json, AssetClass,
    ClassifiedTransactions, Side, TaxInput, Transaction, TransactionError, TransactionRecord,
};
pub use warnings::Warning;
