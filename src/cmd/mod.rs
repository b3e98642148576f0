pub mod events;
pub mod holdings;
pub mod portfolio;
pub mod report;
pub mod schema;

use crate::core::{
    calculate, classify_records, merge, read_crypto_csv, read_equity_csv, read_transactions_json,
    AssetClass, FinancialYear, TaxReport,
};
use clap::Args;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Input sources shared by the reporting commands.
///
/// Each CSV flag feeds one asset class; the JSON input can carry both.
/// Every loaded class is calculated independently and the results merged.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// CoinSpot-style crypto CSV export
    #[arg(long, value_name = "FILE")]
    crypto: Option<PathBuf>,

    /// CommSec-style equity CSV export
    #[arg(long, value_name = "FILE")]
    equities: Option<PathBuf>,

    /// JSON transaction file (see `taxau schema`)
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

impl InputArgs {
    /// Load every given input, run the engine per asset class, merge.
    pub fn load_report(&self) -> anyhow::Result<TaxReport> {
        let mut reports: Vec<TaxReport> = Vec::new();

        if let Some(path) = &self.crypto {
            let transactions = read_crypto_csv(open(path)?)?;
            reports.push(calculate(AssetClass::Crypto, &transactions)?);
        }
        if let Some(path) = &self.equities {
            let transactions = read_equity_csv(open(path)?)?;
            reports.push(calculate(AssetClass::Equity, &transactions)?);
        }
        if let Some(path) = &self.input {
            let classified = classify_records(read_transactions_json(open(path)?)?)?;
            if classified.is_empty() {
                anyhow::bail!("{}: no transactions found", path.display());
            }
            if !classified.crypto.is_empty() {
                reports.push(calculate(AssetClass::Crypto, &classified.crypto)?);
            }
            if !classified.equities.is_empty() {
                reports.push(calculate(AssetClass::Equity, &classified.equities)?);
            }
        }

        let mut reports = reports.into_iter();
        let Some(first) = reports.next() else {
            anyhow::bail!("no input given: provide --crypto, --equities or --input");
        };
        Ok(reports.fold(first, merge))
    }
}

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file =
        File::open(path).map_err(|err| anyhow::anyhow!("{}: {}", path.display(), err))?;
    Ok(BufReader::new(file))
}

/// Parse an optional `--year` argument ("FY2023-24" or "2023")
pub fn parse_year_filter(arg: &Option<String>) -> anyhow::Result<Option<FinancialYear>> {
    match arg {
        None => Ok(None),
        Some(s) => FinancialYear::parse(s)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("invalid financial year '{}'", s)),
    }
}

pub fn format_aud(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

pub fn format_aud_signed(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

pub fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
