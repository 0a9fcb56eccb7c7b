//! Live price resolution
//!
//! The displayed "live price" can come from the batch row's `current_price`
//! column or from a fixed configured value. Public panels and the admin
//! status view each pick a source independently.

use serde::{Deserialize, Serialize};

use crate::store::InvestmentBatch;

/// Static price used when nothing is configured, in GBP
pub const DEFAULT_STATIC_PRICE: f64 = 1.00;

/// Where the live price comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PriceSource {
    /// Read `current_price` from the active batch
    Stored,
    /// Always show this price
    Static { price: f64 },
}

impl Default for PriceSource {
    fn default() -> Self {
        PriceSource::Static {
            price: DEFAULT_STATIC_PRICE,
        }
    }
}

impl PriceSource {
    /// Price to display for `batch`
    ///
    /// Falls back to the static default when the stored source is selected
    /// but no batch is loaded.
    pub fn resolve(&self, batch: Option<&InvestmentBatch>) -> f64 {
        match (self, batch) {
            (PriceSource::Stored, Some(batch)) => batch.current_price,
            (PriceSource::Stored, None) => DEFAULT_STATIC_PRICE,
            (PriceSource::Static { price }, _) => *price,
        }
    }
}

/// Format a GBP amount with two decimals, e.g. `£1.00`
pub fn format_gbp(amount: f64) -> String {
    format!("£{:.2}", amount)
}
