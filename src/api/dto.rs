//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::admin::{Direction, Flash};
use crate::session::SessionToken;
use crate::store::{Document, InvestmentBatch};

// ============================================
// SESSION DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for the admin endpoints
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<SessionToken> for SessionResponse {
    fn from(token: SessionToken) -> Self {
        Self {
            authenticated: true,
            issued_at: ms_to_datetime(token.issued_at_ms),
            expires_at: ms_to_datetime(token.expires_at_ms()),
        }
    }
}

/// Millisecond timestamp as a UTC datetime, clamped to the epoch when out of range
pub fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_default()
}

// ============================================
// ADMIN DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct UpdateCountRequest {
    pub count: i64,
}

/// Batch as seen on the admin page
#[derive(Debug, Serialize)]
pub struct AdminBatchResponse {
    pub batch: InvestmentBatch,
    pub remaining: i64,
    pub progress_percentage: f64,
    pub live_price: f64,
    pub live_price_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveDocumentRequest {
    pub direction: Direction,
}

/// Result of a document write, with the refreshed list
#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    /// Whether the action changed anything
    pub changed: bool,
    pub documents: Vec<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

// ============================================
// HEALTH DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub store_backend: String,
    pub feed_subscribers: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
