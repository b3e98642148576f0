use super::fy::FinancialYear;
use super::inventory::{AcquisitionDetail, Consumption};
use super::transaction::{AssetClass, Transaction};
use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Holding period beyond which the 50% CGT discount applies (strictly more
/// than 12 months).
const LONG_TERM_DAYS: i64 = 365;

/// Fraction of the eligible gain waived by the individual CGT discount.
const DISCOUNT_RATE: Decimal = dec!(0.5);

/// Whether a consumed lot qualifies for the CGT discount on its own.
pub fn discount_eligible_detail(detail: &AcquisitionDetail) -> bool {
    detail.holding_days > LONG_TERM_DAYS
}

/// A realized disposal with its gain/loss and discount treatment.
#[derive(Debug, Clone, PartialEq)]
pub struct CgtEvent {
    pub disposed: NaiveDateTime,
    /// Earliest acquisition date among consumed lots, kept for disclosure
    pub acquired: NaiveDateTime,
    pub asset: String,
    pub name: Option<String>,
    pub asset_class: AssetClass,
    /// Financial year of the disposal (not of any acquisition)
    pub financial_year: FinancialYear,
    pub quantity: Decimal,
    pub proceeds: Decimal,
    pub cost_base: Decimal,
    pub gross_gain: Decimal,
    /// Quantity-weighted average holding period, rounded to whole days
    pub holding_days: i64,
    /// Whether the weighted average holding period exceeds 12 months
    pub is_long_term: bool,
    /// Share of the disposed quantity drawn from lots held over 12 months.
    /// Computed per lot, so it can disagree with `is_long_term` when a sale
    /// straddles the boundary.
    pub discount_fraction: Decimal,
    pub discount: Decimal,
    pub net_gain: Decimal,
    pub acquisitions: Vec<AcquisitionDetail>,
}

impl CgtEvent {
    pub fn discount_eligible(&self) -> bool {
        self.discount_fraction > Decimal::ZERO
    }

    pub fn is_gain(&self) -> bool {
        self.gross_gain > Decimal::ZERO
    }
}

/// Derive a CGT event from a sell transaction and the lots it consumed.
///
/// Pure: every figure is a function of the transaction and the consumption.
/// If the consumption fell short, the cost base only covers the matched
/// portion and the gain is correspondingly overstated; the caller surfaces
/// that as a warning.
pub fn derive_event(
    transaction: &Transaction,
    asset_class: AssetClass,
    consumption: Consumption,
) -> CgtEvent {
    let proceeds = transaction.consideration;
    let cost_base = consumption.cost_base;
    let gross_gain = proceeds - cost_base;

    let matched = consumption.matched_quantity();

    let avg_holding_days = if matched > Decimal::ZERO {
        let weighted: Decimal = consumption
            .details
            .iter()
            .map(|d| Decimal::from(d.holding_days) * d.quantity)
            .sum();
        weighted / matched
    } else {
        Decimal::ZERO
    };
    let is_long_term = avg_holding_days > Decimal::from(LONG_TERM_DAYS);

    let eligible_quantity: Decimal = consumption
        .details
        .iter()
        .filter(|d| discount_eligible_detail(d))
        .map(|d| d.quantity)
        .sum();
    let discount_fraction = if matched > Decimal::ZERO {
        eligible_quantity / matched
    } else {
        Decimal::ZERO
    };

    // The discount only ever reduces a gain; losses pass through untouched
    let discount = if gross_gain > Decimal::ZERO && discount_fraction > Decimal::ZERO {
        gross_gain * discount_fraction * DISCOUNT_RATE
    } else {
        Decimal::ZERO
    };
    let net_gain = gross_gain - discount;

    let acquired = consumption
        .details
        .iter()
        .map(|d| d.acquired)
        .min()
        .unwrap_or(transaction.datetime);

    CgtEvent {
        disposed: transaction.datetime,
        acquired,
        asset: transaction.asset.clone(),
        name: transaction.name.clone(),
        asset_class,
        financial_year: transaction.financial_year,
        quantity: transaction.quantity,
        proceeds,
        cost_base,
        gross_gain,
        holding_days: avg_holding_days.round().to_i64().unwrap_or(0),
        is_long_term,
        discount_fraction,
        discount,
        net_gain,
        acquisitions: consumption.details,
    }
}
