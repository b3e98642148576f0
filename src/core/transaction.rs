use super::fy::FinancialYear;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("non-positive quantity {quantity} for {asset}")]
    NonPositiveQuantity { asset: String, quantity: Decimal },
    #[error("non-positive total {total} for {asset}")]
    NonPositiveTotal { asset: String, total: Decimal },
    #[error("no header row found (expected Code/Company/Date/Type columns)")]
    MissingHeader,
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transaction side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    fn parse(s: &str) -> Option<Side> {
        match s.trim() {
            "Buy" => Some(Side::Buy),
            "Sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Asset class, deciding ingestion conventions and lot tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum AssetClass {
    #[default]
    Crypto,
    Equity,
}

impl AssetClass {
    /// Threshold below which a lot quantity counts as exhausted.
    ///
    /// Crypto trades in tiny fractional units, share counts do not, so the
    /// tolerance scales with the class to avoid leaving dust lots behind.
    pub fn quantity_tolerance(&self) -> Decimal {
        match self {
            AssetClass::Crypto => dec!(0.000001),
            AssetClass::Equity => dec!(0.0001),
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetClass::Crypto => write!(f, "crypto"),
            AssetClass::Equity => write!(f, "equity"),
        }
    }
}

/// A validated trade ready for the FIFO engine.
///
/// `consideration` is the gross AUD amount that changed hands: fee-inclusive
/// cost for buys, fee-net proceeds for sells. The ingestion functions below
/// establish that convention (and ascending timestamp order) so the engine
/// never has to.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub datetime: NaiveDateTime,
    pub side: Side,
    pub asset: String,
    pub name: Option<String>,
    pub quantity: Decimal,
    pub consideration: Decimal,
    pub financial_year: FinancialYear,
}

impl Transaction {
    pub fn new(
        datetime: NaiveDateTime,
        side: Side,
        asset: impl Into<String>,
        name: Option<String>,
        quantity: Decimal,
        consideration: Decimal,
    ) -> Self {
        Transaction {
            datetime,
            side,
            asset: asset.into(),
            name,
            quantity,
            consideration,
            financial_year: FinancialYear::from_datetime(datetime),
        }
    }
}

/// Input root for transaction JSON
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TaxInput {
    pub transactions: Vec<TransactionRecord>,
}

/// One trade in the JSON input format
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TransactionRecord {
    /// When the trade executed (e.g., 2023-08-14T10:30:00)
    #[schemars(with = "String")]
    pub date: NaiveDateTime,
    pub side: Side,
    /// Coin symbol or ASX ticker (e.g., BTC, BHP)
    pub asset: String,
    #[serde(default)]
    pub asset_class: AssetClass,
    /// Display name (e.g., the listed company name)
    #[serde(default)]
    pub name: Option<String>,
    #[schemars(with = "f64")]
    pub quantity: Decimal,
    /// Gross AUD consideration: fee-inclusive cost for buys, fee-net
    /// proceeds for sells
    #[schemars(with = "f64")]
    pub total: Decimal,
}

/// Transactions split by asset class, each sorted ascending by timestamp
#[derive(Debug, Default)]
pub struct ClassifiedTransactions {
    pub crypto: Vec<Transaction>,
    pub equities: Vec<Transaction>,
}

impl ClassifiedTransactions {
    pub fn is_empty(&self) -> bool {
        self.crypto.is_empty() && self.equities.is_empty()
    }
}

/// Read the unified JSON input format
pub fn read_transactions_json<R: Read>(reader: R) -> Result<TaxInput, TransactionError> {
    let input: TaxInput = serde_json::from_reader(reader)?;
    Ok(input)
}

/// Validate JSON records and split them by asset class.
///
/// Unlike the CSV readers this is strict: brokerage exports are full of junk
/// rows, hand-written JSON is not, so a bad record here is an error.
pub fn classify_records(input: TaxInput) -> Result<ClassifiedTransactions, TransactionError> {
    let mut classified = ClassifiedTransactions::default();
    for record in input.transactions {
        if record.quantity <= Decimal::ZERO {
            return Err(TransactionError::NonPositiveQuantity {
                asset: record.asset,
                quantity: record.quantity,
            });
        }
        if record.total <= Decimal::ZERO {
            return Err(TransactionError::NonPositiveTotal {
                asset: record.asset,
                total: record.total,
            });
        }
        match record.asset_class {
            AssetClass::Crypto => classified.crypto.push(Transaction::new(
                record.date,
                record.side,
                record.asset,
                record.name,
                record.quantity,
                record.total,
            )),
            AssetClass::Equity => classified.equities.push(Transaction::new(
                record.date,
                record.side,
                equity_asset_id(&record.asset),
                record.name,
                record.quantity,
                record.total,
            )),
        }
    }
    classified.crypto.sort_by_key(|t| t.datetime);
    classified.equities.sort_by_key(|t| t.datetime);
    Ok(classified)
}

/// CoinSpot "Sells & Buys" CSV row
#[derive(Debug, Deserialize)]
struct CryptoCsvRow {
    #[serde(rename = "Transaction Date")]
    transaction_date: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Market")]
    market: String,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Total AUD")]
    total_aud: String,
    #[serde(rename = "Fee AUD (inc GST)", default)]
    #[allow(dead_code)]
    fee_aud: String,
}

/// Read a CoinSpot-style crypto CSV.
///
/// Rows that fail to parse are skipped with a warning rather than failing
/// the whole file - real exports carry footer junk and non-AUD markets.
/// The returned transactions are sorted ascending by timestamp.
pub fn read_crypto_csv<R: Read>(reader: R) -> Result<Vec<Transaction>, TransactionError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut transactions = Vec::new();

    for (row_num, row) in csv_reader.deserialize::<CryptoCsvRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                log::warn!("skipping crypto CSV row {}: {}", row_num + 2, err);
                continue;
            }
        };

        let Some(datetime) = parse_coinspot_datetime(&row.transaction_date) else {
            log::warn!(
                "skipping crypto CSV row {}: unparseable date '{}'",
                row_num + 2,
                row.transaction_date
            );
            continue;
        };

        let mut parts = row.market.split('/');
        let coin = parts.next().unwrap_or("").trim().to_string();
        let quote = parts.next().unwrap_or("").trim();
        if coin.is_empty() || quote != "AUD" {
            log::warn!(
                "skipping crypto CSV row {}: market '{}' is not an AUD pair",
                row_num + 2,
                row.market
            );
            continue;
        }

        let Some(side) = Side::parse(&row.kind) else {
            log::warn!(
                "skipping crypto CSV row {}: unknown type '{}'",
                row_num + 2,
                row.kind
            );
            continue;
        };

        let quantity = parse_amount(&row.amount).unwrap_or(Decimal::ZERO);
        let total = parse_amount(&row.total_aud).unwrap_or(Decimal::ZERO);
        if quantity <= Decimal::ZERO || total <= Decimal::ZERO {
            log::warn!(
                "skipping crypto CSV row {}: non-positive amount or total",
                row_num + 2
            );
            continue;
        }

        transactions.push(Transaction::new(datetime, side, coin, None, quantity, total));
    }

    transactions.sort_by_key(|t| t.datetime);
    Ok(transactions)
}

/// CommSec transactions CSV row
#[derive(Debug, Deserialize)]
struct EquityCsvRow {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Company", default)]
    company: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Quantity")]
    quantity: String,
    #[serde(rename = "Trade Value ($)")]
    trade_value: String,
    #[serde(rename = "Brokerage+GST ($)", default)]
    brokerage: String,
}

/// Read a CommSec-style equity CSV.
///
/// CommSec exports wrap the data in preamble and disclaimer text, so the
/// header row is located first and everything above it discarded. Brokerage
/// is capitalized into the cost base on buys and deducted from proceeds on
/// sells; the engine only ever sees the gross consideration.
/// The returned transactions are sorted ascending by timestamp.
pub fn read_equity_csv<R: Read>(mut reader: R) -> Result<Vec<Transaction>, TransactionError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let header_offset = text
        .lines()
        .position(|line| {
            line.contains("Code")
                && line.contains("Company")
                && line.contains("Date")
                && line.contains("Type")
        })
        .ok_or(TransactionError::MissingHeader)?;
    let data: String = text
        .lines()
        .skip(header_offset)
        .collect::<Vec<_>>()
        .join("\n");

    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(data.as_bytes());
    let mut transactions = Vec::new();

    for (row_num, row) in csv_reader.deserialize::<EquityCsvRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                log::warn!("skipping equity CSV row {}: {}", row_num + 2, err);
                continue;
            }
        };

        let code = row.code.trim().trim_matches('"').to_string();
        let lowered = code.to_lowercase();
        if code.is_empty() || lowered.contains("total") || lowered.contains("glossary") {
            continue;
        }

        let Some(date) = parse_commsec_date(&row.date) else {
            log::warn!(
                "skipping equity CSV row {}: unparseable date '{}'",
                row_num + 2,
                row.date
            );
            continue;
        };

        let Some(side) = Side::parse(&row.kind) else {
            log::warn!(
                "skipping equity CSV row {}: unknown type '{}'",
                row_num + 2,
                row.kind
            );
            continue;
        };

        // Sell rows carry negative quantities in some exports
        let quantity = parse_amount(&row.quantity).unwrap_or(Decimal::ZERO).abs();
        let trade_value = parse_amount(&row.trade_value).unwrap_or(Decimal::ZERO).abs();
        let brokerage = parse_amount(&row.brokerage).unwrap_or(Decimal::ZERO).abs();
        if quantity <= Decimal::ZERO {
            log::warn!("skipping equity CSV row {}: non-positive quantity", row_num + 2);
            continue;
        }

        let consideration = match side {
            Side::Buy => trade_value + brokerage,
            Side::Sell => trade_value - brokerage,
        };
        if consideration <= Decimal::ZERO {
            log::warn!(
                "skipping equity CSV row {}: non-positive consideration",
                row_num + 2
            );
            continue;
        }

        let name = if row.company.trim().is_empty() {
            code.clone()
        } else {
            row.company.trim().trim_matches('"').to_string()
        };

        transactions.push(Transaction::new(
            date.and_hms_opt(0, 0, 0).unwrap(),
            side,
            equity_asset_id(&code),
            Some(name),
            quantity,
            consideration,
        ));
    }

    transactions.sort_by_key(|t| t.datetime);
    Ok(transactions)
}

/// ASX holdings are identified with the exchange suffix, e.g. "BHP.AX"
fn equity_asset_id(code: &str) -> String {
    if code.ends_with(".AX") {
        code.to_string()
    } else {
        format!("{}.AX", code)
    }
}

/// Parse CoinSpot timestamps: "DD/MM/YYYY HH:MM AM/PM", 24h, or date-only
fn parse_coinspot_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%d/%m/%Y %I:%M %p") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%d/%m/%Y %H:%M") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse CommSec dates: "DD/MM/YYYY"
fn parse_commsec_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y").ok()
}

/// Parse an AUD amount, stripping currency decorations ("$1,234.56 AUD")
fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .replace("AUD", "")
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '"'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRYPTO_CSV: &str = "\
Transaction Date,Type,Market,Amount,Rate inc. fee,Total AUD,Fee AUD (inc GST)
15/08/2022 10:30 AM,Buy,BTC/AUD,0.5,34000.00,17000.00 AUD,170.00 AUD
20/12/2023 02:15 PM,Sell,BTC/AUD,0.25,64000.00,16000.00 AUD,160.00 AUD
01/02/2023 09:00 AM,Buy,ETH/AUD,2.0,2500.00,5000.00 AUD,50.00 AUD
05/03/2023 11:00 AM,Buy,BTC/USDT,0.1,50000,5000.00,50.00
";

    const EQUITY_CSV: &str = "\
Account,12345678
,
\"Transactions from 01/07/2022 to 30/06/2024\"
Code,Company,Date,Type,Quantity,Unit Price ($),Trade Value ($),Brokerage+GST ($),Total Value ($)
BHP,\"BHP Group Ltd\",15/08/2022,Buy,100,40.00,\"4,000.00\",19.95,\"4,019.95\"
BHP,\"BHP Group Ltd\",20/12/2023,Sell,-50,45.00,\"2,250.00\",19.95,\"2,230.05\"
Total,,,,,,,,
\"The transaction summary above is provided for your convenience.\"
";

    #[test]
    fn crypto_csv_parses_aud_markets_only() {
        let transactions = read_crypto_csv(CRYPTO_CSV.as_bytes()).unwrap();
        // BTC/USDT row is skipped
        assert_eq!(transactions.len(), 3);
        assert!(transactions.iter().all(|t| t.asset == "BTC" || t.asset == "ETH"));
    }

    #[test]
    fn crypto_csv_sorted_ascending() {
        let transactions = read_crypto_csv(CRYPTO_CSV.as_bytes()).unwrap();
        let mut sorted = transactions.clone();
        sorted.sort_by_key(|t| t.datetime);
        assert_eq!(transactions, sorted);
        assert_eq!(transactions[0].asset, "BTC");
        assert_eq!(transactions[0].side, Side::Buy);
    }

    #[test]
    fn crypto_csv_parses_pm_times() {
        let transactions = read_crypto_csv(CRYPTO_CSV.as_bytes()).unwrap();
        let sell = transactions.iter().find(|t| t.side == Side::Sell).unwrap();
        assert_eq!(
            sell.datetime,
            NaiveDate::from_ymd_opt(2023, 12, 20)
                .unwrap()
                .and_hms_opt(14, 15, 0)
                .unwrap()
        );
    }

    #[test]
    fn crypto_total_used_as_recorded() {
        let transactions = read_crypto_csv(CRYPTO_CSV.as_bytes()).unwrap();
        let buy = &transactions[0];
        assert_eq!(buy.consideration, dec!(17000));
        assert_eq!(buy.financial_year, FinancialYear(2022));
    }

    #[test]
    fn equity_csv_skips_preamble_and_footer() {
        let transactions = read_equity_csv(EQUITY_CSV.as_bytes()).unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].asset, "BHP.AX");
        assert_eq!(transactions[0].name.as_deref(), Some("BHP Group Ltd"));
    }

    #[test]
    fn equity_buy_capitalizes_brokerage() {
        let transactions = read_equity_csv(EQUITY_CSV.as_bytes()).unwrap();
        let buy = &transactions[0];
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.consideration, dec!(4019.95));
    }

    #[test]
    fn equity_sell_deducts_brokerage_and_abs_quantity() {
        let transactions = read_equity_csv(EQUITY_CSV.as_bytes()).unwrap();
        let sell = &transactions[1];
        assert_eq!(sell.side, Side::Sell);
        assert_eq!(sell.quantity, dec!(50));
        assert_eq!(sell.consideration, dec!(2230.05));
    }

    #[test]
    fn equity_csv_without_header_errors() {
        let result = read_equity_csv("just,some,random\ncsv,data,here\n".as_bytes());
        assert!(matches!(result, Err(TransactionError::MissingHeader)));
    }

    #[test]
    fn json_records_classified_and_sorted() {
        let json = r#"{
            "transactions": [
                {"date": "2023-12-20T14:15:00", "side": "Sell", "asset": "BTC", "quantity": 0.25, "total": 16000.0},
                {"date": "2022-08-15T10:30:00", "side": "Buy", "asset": "BTC", "quantity": 0.5, "total": 17000.0},
                {"date": "2022-08-15T00:00:00", "side": "Buy", "asset": "BHP", "asset_class": "Equity", "name": "BHP Group Ltd", "quantity": 100, "total": 4019.95}
            ]
        }"#;
        let input = read_transactions_json(json.as_bytes()).unwrap();
        let classified = classify_records(input).unwrap();
        assert_eq!(classified.crypto.len(), 2);
        assert_eq!(classified.equities.len(), 1);
        assert_eq!(classified.crypto[0].side, Side::Buy);
        assert_eq!(classified.equities[0].asset, "BHP.AX");
    }

    #[test]
    fn json_rejects_non_positive_quantity() {
        let json = r#"{
            "transactions": [
                {"date": "2023-12-20T14:15:00", "side": "Sell", "asset": "BTC", "quantity": 0.0, "total": 16000.0}
            ]
        }"#;
        let input = read_transactions_json(json.as_bytes()).unwrap();
        let result = classify_records(input);
        assert!(matches!(
            result,
            Err(TransactionError::NonPositiveQuantity { .. })
        ));
    }

    #[test]
    fn json_rejects_non_positive_total() {
        let json = r#"{
            "transactions": [
                {"date": "2023-12-20T14:15:00", "side": "Sell", "asset": "BTC", "quantity": 1.0, "total": -5.0}
            ]
        }"#;
        let input = read_transactions_json(json.as_bytes()).unwrap();
        assert!(matches!(
            classify_records(input),
            Err(TransactionError::NonPositiveTotal { .. })
        ));
    }

    #[test]
    fn tolerance_scales_with_asset_class() {
        assert_eq!(AssetClass::Crypto.quantity_tolerance(), dec!(0.000001));
        assert_eq!(AssetClass::Equity.quantity_tolerance(), dec!(0.0001));
    }

    #[test]
    fn amount_parsing_strips_decorations() {
        assert_eq!(parse_amount("$1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("16000.00 AUD"), Some(dec!(16000)));
        assert_eq!(parse_amount("-50"), Some(dec!(-50)));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
    }
}
