use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Warnings emitted during a calculation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum Warning {
    /// Inventory had insufficient quantity to cover a disposal.
    /// The unmatched portion was treated as zero cost base, so the
    /// event's gain is overstated.
    InsufficientInventory {
        asset: String,
        #[schemars(with = "String")]
        date: NaiveDateTime,
        #[schemars(with = "f64")]
        available: Decimal,
        #[schemars(with = "f64")]
        required: Decimal,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::InsufficientInventory {
                asset,
                date,
                available,
                required,
            } => write!(
                f,
                "{}: sold {} on {} but only {} was held; shortfall has zero cost base",
                asset,
                required,
                date.date(),
                available
            ),
        }
    }
}
