//! Schema command - print expected input formats

use crate::core::TaxInput;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the JSON input format
    JsonSchema,
    /// CSV header rows for both supported exports
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => self.print_json_schema(),
            SchemaFormat::CsvHeader => self.print_csv_header(),
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
    }

    fn print_json_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(TaxInput);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_header(&self) -> anyhow::Result<()> {
        println!("crypto (CoinSpot): {}", CRYPTO_CSV_COLUMNS.join(","));
        println!("equities (CommSec): {}", EQUITY_CSV_COLUMNS.join(","));
        Ok(())
    }

    fn print_csv_fields(&self) -> anyhow::Result<()> {
        println!("Crypto CSV (CoinSpot \"Sells & Buys\" export)");
        println!("===========================================");
        println!();
        for (name, required, description) in CRYPTO_CSV_FIELDS {
            let req = if *required { "required" } else { "optional" };
            println!("{:24} ({:8})  {}", name, req, description);
        }
        println!();
        println!("Equity CSV (CommSec transactions export)");
        println!("========================================");
        println!();
        for (name, required, description) in EQUITY_CSV_FIELDS {
            let req = if *required { "required" } else { "optional" };
            println!("{:24} ({:8})  {}", name, req, description);
        }
        println!();
        println!("Amounts may carry $ signs, commas and an AUD suffix.");
        println!("Buy brokerage is capitalized into cost base; sell brokerage reduces proceeds.");
        Ok(())
    }
}

const CRYPTO_CSV_COLUMNS: &[&str] = &[
    "Transaction Date",
    "Type",
    "Market",
    "Amount",
    "Rate inc. fee",
    "Total AUD",
    "Fee AUD (inc GST)",
];

const CRYPTO_CSV_FIELDS: &[(&str, bool, &str)] = &[
    (
        "Transaction Date",
        true,
        "DD/MM/YYYY with optional HH:MM AM/PM time",
    ),
    ("Type", true, "Buy or Sell"),
    ("Market", true, "Traded pair; only AUD quotes are used (e.g., BTC/AUD)"),
    ("Amount", true, "Quantity of the coin"),
    ("Rate inc. fee", false, "Unit rate, informational only"),
    ("Total AUD", true, "Gross AUD total, already fee-inclusive"),
    ("Fee AUD (inc GST)", false, "Fee, informational only"),
];

const EQUITY_CSV_COLUMNS: &[&str] = &[
    "Code",
    "Company",
    "Date",
    "Type",
    "Quantity",
    "Unit Price ($)",
    "Trade Value ($)",
    "Brokerage+GST ($)",
    "Total Value ($)",
];

const EQUITY_CSV_FIELDS: &[(&str, bool, &str)] = &[
    ("Code", true, "ASX ticker (reported as CODE.AX)"),
    ("Company", false, "Listed company name"),
    ("Date", true, "DD/MM/YYYY"),
    ("Type", true, "Buy or Sell"),
    ("Quantity", true, "Share count; sells may be negative"),
    ("Unit Price ($)", false, "Unit price, informational only"),
    ("Trade Value ($)", true, "Trade value before brokerage"),
    ("Brokerage+GST ($)", false, "Brokerage including GST"),
    ("Total Value ($)", false, "Settlement total, informational only"),
];
