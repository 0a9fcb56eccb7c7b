//! Batchboard Table Store
//!
//! The store is the sole source of truth. Views and admin mutators treat
//! their local copies as caches and refetch from here.
//!
//! - **types**: Row types (InvestmentBatch, InvestmentDetails, Document)
//! - **sqlite**: Local SQLite-backed store
//! - **rest**: Hosted PostgREST-style table API over HTTP
//! - **publishing**: Decorator that emits change events after writes
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use batchboard::store::{SqliteStore, Store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open_in_memory()?;
//!     store.seed_defaults()?;
//!
//!     let batch = store.active_batch().await?;
//!     println!("{} of {} positions secured", batch.secured_applicants, batch.total_positions);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod publishing;
pub mod rest;
pub mod sqlite;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use publishing::PublishingStore;
pub use rest::{RestStore, RestStoreConfig};
pub use sqlite::SqliteStore;
pub use types::{
    file_name_from_url, Document, InvestmentBatch, InvestmentDetails, NewDocument, Table,
};

use async_trait::async_trait;
use std::sync::Arc;

/// Point-query / point-update interface over the three tables
///
/// Every read selects rows with `is_active = true`; documents are ordered by
/// `display_order` ascending. Writes address a single row by id and return
/// the row as stored after the write.
#[async_trait]
pub trait Store: Send + Sync {
    /// Backend name for logs and health output
    fn name(&self) -> &str;

    /// Cheap reachability check
    async fn ping(&self) -> StoreResult<()>;

    /// The single active investment batch
    async fn active_batch(&self) -> StoreResult<InvestmentBatch>;

    /// The single active investment details row
    async fn active_details(&self) -> StoreResult<InvestmentDetails>;

    /// All active documents in display order
    async fn active_documents(&self) -> StoreResult<Vec<Document>>;

    /// A document by id, active or not
    async fn document(&self, id: i64) -> StoreResult<Document>;

    /// Set `secured_applicants` on a batch
    async fn update_secured_applicants(
        &self,
        batch_id: i64,
        count: i64,
    ) -> StoreResult<InvestmentBatch>;

    /// Insert a document
    async fn insert_document(&self, document: &NewDocument) -> StoreResult<Document>;

    /// Flip a document's active flag (soft delete / restore)
    async fn set_document_active(&self, id: i64, active: bool) -> StoreResult<Document>;

    /// Set a document's display order
    async fn set_display_order(&self, id: i64, display_order: i64) -> StoreResult<Document>;

    /// Exchange the display orders of two documents
    ///
    /// The default issues two sequential single-row updates and is not
    /// atomic. Backends with transactions override it.
    async fn swap_display_orders(
        &self,
        first: &Document,
        second: &Document,
    ) -> StoreResult<(Document, Document)> {
        let a = self.set_display_order(first.id, second.display_order).await?;
        let b = self.set_display_order(second.id, first.display_order).await?;
        Ok((a, b))
    }
}

/// Reduce a filtered result set to its single row
pub(crate) fn single_row<T>(mut rows: Vec<T>, what: &str) -> StoreResult<T> {
    match rows.len() {
        0 => Err(StoreError::NotFound(what.to_string())),
        1 => Ok(rows.remove(0)),
        _ => Err(StoreError::Ambiguous(format!("more than one {}", what))),
    }
}

/// Shared store handle
pub type SharedStore = Arc<dyn Store>;
