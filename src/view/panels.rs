//! Public panel view models
//!
//! Derived, display-ready values computed from the stored rows and the
//! configured [`PriceSource`]. Numbers use `en-GB` grouping; dates render as
//! `dd/mm/yyyy @ HH:MM` in UTC.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pricing::{format_gbp, PriceSource};
use crate::store::{Document, InvestmentBatch, InvestmentDetails};

/// Progress label is only drawn inside the bar above this percentage
pub const PROGRESS_LABEL_THRESHOLD: f64 = 10.0;

/// Live entry demand panel
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DemandPanel {
    pub heading: String,
    pub batch_number: i64,
    pub secured_applicants: i64,
    pub total_positions: i64,
    pub remaining: i64,
    pub progress_percentage: f64,
    /// `None` while the bar is too narrow to hold a label
    pub progress_label: Option<String>,
    pub live_price: f64,
    pub live_price_label: String,
    pub last_updated: DateTime<Utc>,
}

impl DemandPanel {
    pub fn new(batch: &InvestmentBatch, price: PriceSource) -> Self {
        let percentage = batch.progress_percentage();
        let live_price = price.resolve(Some(batch));
        Self {
            heading: format!(
                "Live Entry Demand (Batch {} – {} Positions)",
                batch.batch_number, batch.total_positions
            ),
            batch_number: batch.batch_number,
            secured_applicants: batch.secured_applicants,
            total_positions: batch.total_positions,
            remaining: batch.remaining(),
            progress_percentage: percentage,
            progress_label: (percentage > PROGRESS_LABEL_THRESHOLD)
                .then(|| batch.progress_label()),
            live_price,
            live_price_label: format_gbp(live_price),
            last_updated: batch.last_updated,
        }
    }
}

/// Investment and sponsorship details panel
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DetailsPanel {
    pub total_micro_shares: i64,
    pub total_micro_shares_label: String,
    pub current_price: f64,
    pub current_price_label: String,
    pub post_launch_price_label: String,
    pub minimum_to_qualify: i64,
    pub minimum_to_qualify_label: String,
    /// `minimum_to_qualify` priced at the live price
    pub calculated_minimum_amount: f64,
    pub calculated_minimum_amount_label: String,
    pub holding_period_years: i64,
    pub launch_date_label: String,
    pub withdrawal_date_label: String,
    pub withdrawal_guarantee: String,
    pub partners: Vec<String>,
    pub partners_label: String,
    pub call_to_action: String,
}

impl DetailsPanel {
    pub fn new(details: &InvestmentDetails, price: PriceSource, batch: Option<&InvestmentBatch>) -> Self {
        let current_price = price.resolve(batch);
        let calculated = details.minimum_to_qualify as f64 * current_price;
        let minimum_label = format_grouped(details.minimum_to_qualify);

        Self {
            total_micro_shares: details.total_micro_shares,
            total_micro_shares_label: format_grouped(details.total_micro_shares),
            current_price,
            current_price_label: format_gbp(current_price),
            post_launch_price_label: format_gbp(details.post_launch_price),
            minimum_to_qualify: details.minimum_to_qualify,
            calculated_minimum_amount: calculated,
            calculated_minimum_amount_label: format_gbp(calculated),
            call_to_action: format!(
                "Buy {} Shares ({}) & Secure Your Position",
                minimum_label,
                format_gbp(calculated)
            ),
            minimum_to_qualify_label: minimum_label,
            holding_period_years: details.holding_period_years,
            launch_date_label: format_date(&details.launch_date),
            withdrawal_date_label: format_date(&details.withdrawal_date),
            withdrawal_guarantee: details.withdrawal_guarantee.clone(),
            partners_label: details.partners.join(" | "),
            partners: details.partners.clone(),
        }
    }
}

/// Downloadable documents panel
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentsPanel {
    pub documents: Vec<Document>,
    pub is_empty: bool,
}

impl DocumentsPanel {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            is_empty: documents.is_empty(),
            documents,
        }
    }
}

/// Integer with comma thousands separators, e.g. `1,000,000`
pub fn format_grouped(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `dd/mm/yyyy @ HH:MM`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%d/%m/%Y @ %H:%M").to_string()
}
