//! Row types for the table store
//!
//! - `InvestmentBatch`: the live demand counter for the current batch
//! - `InvestmentDetails`: share counts, prices, dates and partners
//! - `Document`: a downloadable document shown on the site
//! - `Table`: the three watched tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// File name used when a document URL has no usable last segment
pub const DEFAULT_FILE_NAME: &str = "document.pdf";

/// Tables held by the store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    InvestmentBatches,
    InvestmentDetails,
    Documents,
}

impl Table {
    pub fn all() -> &'static [Table] {
        &[
            Table::InvestmentBatches,
            Table::InvestmentDetails,
            Table::Documents,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::InvestmentBatches => "investment_batches",
            Table::InvestmentDetails => "investment_details",
            Table::Documents => "documents",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown table: {}", s))
    }
}

/// The live demand counter for one batch of positions
///
/// Invariant: `0 <= secured_applicants <= total_positions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestmentBatch {
    pub id: i64,
    pub secured_applicants: i64,
    pub total_positions: i64,
    pub base_price: f64,
    pub current_price: f64,
    pub batch_number: i64,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
}

impl InvestmentBatch {
    /// Positions still open in this batch
    pub fn remaining(&self) -> i64 {
        self.total_positions - self.secured_applicants
    }

    /// Share of positions secured, 0-100
    pub fn progress_percentage(&self) -> f64 {
        if self.total_positions <= 0 {
            return 0.0;
        }
        self.secured_applicants as f64 / self.total_positions as f64 * 100.0
    }

    /// Percentage formatted for display, e.g. `63.0%`
    pub fn progress_label(&self) -> String {
        format!("{:.1}%", self.progress_percentage())
    }

    /// Whether `count` is an acceptable value for `secured_applicants`
    pub fn accepts_count(&self, count: i64) -> bool {
        (0..=self.total_positions).contains(&count)
    }

    /// `secured_applicants + amount`, clamped to `total_positions`
    pub fn clamped_increment(&self, amount: i64) -> i64 {
        self.secured_applicants
            .saturating_add(amount)
            .min(self.total_positions)
    }
}

/// Offering details shown in the investment section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestmentDetails {
    pub id: i64,
    pub total_micro_shares: i64,
    pub current_share_price: f64,
    pub post_launch_price: f64,
    pub minimum_to_qualify: i64,
    pub minimum_investment_amount: f64,
    pub holding_period_years: i64,
    pub launch_date: DateTime<Utc>,
    pub withdrawal_date: DateTime<Utc>,
    /// Partner names in display order
    #[serde(default)]
    pub partners: Vec<String>,
    pub withdrawal_guarantee: String,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
}

/// A downloadable document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub file_url: String,
    pub file_name: String,
    /// Rendering sequence among active documents, ascending
    pub display_order: i64,
    /// `false` marks a soft-deleted document
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a document
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub file_name: String,
    pub display_order: i64,
    pub is_active: bool,
}

impl NewDocument {
    /// Build an insert payload from raw form input
    ///
    /// Trims every field, maps a blank description to `None` and derives the
    /// file name from the URL.
    pub fn from_input(
        title: &str,
        description: Option<&str>,
        file_url: &str,
        display_order: i64,
    ) -> Self {
        let file_url = file_url.trim().to_string();
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Self {
            title: title.trim().to_string(),
            description,
            file_name: file_name_from_url(&file_url),
            file_url,
            display_order,
            is_active: true,
        }
    }
}

/// Last `/`-separated segment of a URL, or [`DEFAULT_FILE_NAME`]
pub fn file_name_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(DEFAULT_FILE_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(secured: i64, total: i64) -> InvestmentBatch {
        InvestmentBatch {
            id: 1,
            secured_applicants: secured,
            total_positions: total,
            base_price: 1.0,
            current_price: 1.0,
            batch_number: 1,
            is_active: true,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_remaining_and_percentage() {
        let b = batch(63, 100);
        assert_eq!(b.remaining(), 37);
        assert_eq!(b.progress_label(), "63.0%");
    }

    #[test]
    fn test_percentage_with_zero_total() {
        let b = batch(0, 0);
        assert_eq!(b.progress_percentage(), 0.0);
        assert_eq!(b.progress_label(), "0.0%");
    }

    #[test]
    fn test_accepts_count_bounds() {
        let b = batch(10, 100);
        assert!(b.accepts_count(0));
        assert!(b.accepts_count(100));
        assert!(!b.accepts_count(-1));
        assert!(!b.accepts_count(101));
    }

    #[test]
    fn test_clamped_increment_never_exceeds_total() {
        let b = batch(95, 100);
        assert_eq!(b.clamped_increment(1), 96);
        assert_eq!(b.clamped_increment(10), 100);
        assert_eq!(b.clamped_increment(i64::MAX), 100);
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://cdn.example.com/docs/prospectus.pdf"),
            "prospectus.pdf"
        );
        assert_eq!(file_name_from_url("https://cdn.example.com/docs/"), DEFAULT_FILE_NAME);
        assert_eq!(file_name_from_url(""), DEFAULT_FILE_NAME);
    }

    #[test]
    fn test_new_document_from_input() {
        let doc = NewDocument::from_input(
            "  Prospectus ",
            Some("   "),
            " https://example.com/a/terms.pdf ",
            3,
        );
        assert_eq!(doc.title, "Prospectus");
        assert_eq!(doc.description, None);
        assert_eq!(doc.file_url, "https://example.com/a/terms.pdf");
        assert_eq!(doc.file_name, "terms.pdf");
        assert_eq!(doc.display_order, 3);
        assert!(doc.is_active);
    }

    #[test]
    fn test_table_round_trip_names() {
        for table in Table::all() {
            assert_eq!(table.as_str().parse::<Table>().unwrap(), *table);
        }
        assert!("users".parse::<Table>().is_err());
    }
}
