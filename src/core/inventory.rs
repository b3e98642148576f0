use super::fy::FinancialYear;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};

/// One acquisition batch, tracked until fully consumed by disposals.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub acquired: NaiveDateTime,
    pub original_quantity: Decimal,
    pub remaining: Decimal,
    pub cost_per_unit: Decimal,
    pub total_cost: Decimal,
    pub financial_year: FinancialYear,
}

/// The share of one lot consumed by a disposal.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionDetail {
    pub acquired: NaiveDateTime,
    pub quantity: Decimal,
    pub cost: Decimal,
    pub holding_days: i64,
}

/// Result of matching a disposal against the lot queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Consumption {
    /// Cost attributed to the matched quantity
    pub cost_base: Decimal,
    /// Per-lot breakdown, oldest lot first
    pub details: Vec<AcquisitionDetail>,
    /// Quantity the queue could not cover; zero when fully matched
    pub shortfall: Decimal,
}

impl Consumption {
    /// Quantity actually drawn from lots
    pub fn matched_quantity(&self) -> Decimal {
        self.details.iter().map(|d| d.quantity).sum()
    }
}

/// Per-asset FIFO queues of acquisition lots.
///
/// Owned by a single calculation pass; constructed at its start and
/// discarded at return. Lots are appended on acquisition, consumed oldest
/// first on disposal, and never reordered.
#[derive(Debug)]
pub struct Inventory {
    lots: HashMap<String, VecDeque<Lot>>,
    tolerance: Decimal,
}

impl Inventory {
    /// `tolerance` is the quantity below which a lot counts as exhausted;
    /// see `AssetClass::quantity_tolerance`.
    pub fn new(tolerance: Decimal) -> Self {
        Inventory {
            lots: HashMap::new(),
            tolerance,
        }
    }

    /// Append a new lot to the tail of the asset's queue.
    pub fn acquire(
        &mut self,
        asset: &str,
        acquired: NaiveDateTime,
        quantity: Decimal,
        total_cost: Decimal,
        financial_year: FinancialYear,
    ) {
        let cost_per_unit = total_cost / quantity;
        log::debug!(
            "{} ACQUIRE: qty={}, cost={}, unit={}",
            asset,
            quantity,
            total_cost,
            cost_per_unit
        );
        self.lots
            .entry(asset.to_string())
            .or_default()
            .push_back(Lot {
                acquired,
                original_quantity: quantity,
                remaining: quantity,
                cost_per_unit,
                total_cost,
                financial_year,
            });
    }

    /// Consume `quantity` from the head of the asset's queue, oldest lot
    /// first, splitting lots where the disposal only partially covers them.
    ///
    /// If the queue empties first, the remainder is reported as `shortfall`
    /// and carries zero cost base; the caller decides how loudly to warn.
    pub fn consume(&mut self, asset: &str, disposed: NaiveDateTime, quantity: Decimal) -> Consumption {
        let mut needed = quantity;
        let mut cost_base = Decimal::ZERO;
        let mut details = Vec::new();

        let queue = self.lots.entry(asset.to_string()).or_default();

        while needed > self.tolerance {
            let Some(lot) = queue.front_mut() else {
                break;
            };

            // Exhausted lots are cleaned up lazily
            if lot.remaining <= self.tolerance {
                queue.pop_front();
                continue;
            }

            let taken = needed.min(lot.remaining);
            let cost = taken * lot.cost_per_unit;
            let holding_days = (disposed - lot.acquired).num_days();

            log::debug!(
                "{} CONSUME: took {} from lot acquired {} (held {} days, cost {})",
                asset,
                taken,
                lot.acquired.date(),
                holding_days,
                cost
            );

            details.push(AcquisitionDetail {
                acquired: lot.acquired,
                quantity: taken,
                cost,
                holding_days,
            });

            cost_base += cost;
            lot.remaining -= taken;
            needed -= taken;

            if lot.remaining <= self.tolerance {
                queue.pop_front();
            }
        }

        let shortfall = if needed > self.tolerance {
            needed
        } else {
            Decimal::ZERO
        };

        Consumption {
            cost_base,
            details,
            shortfall,
        }
    }

    /// Assets with their remaining lot queues (any order; callers sort).
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VecDeque<Lot>)> {
        self.lots.iter()
    }

    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }
}
