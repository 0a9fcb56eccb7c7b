//! # Batchboard
//!
//! Backend for an investment marketing site: a live counter of secured
//! positions in the current batch, the offering details, a downloadable
//! document list, a payment page and a password-protected admin panel.
//!
//! ## Modules
//!
//! - [`store`]: Table store trait with SQLite and hosted REST backends
//! - [`feed`]: In-process change feed and its websocket bridge
//! - [`view`]: Fetch-subscribe-refetch live views and panel view models
//! - [`admin`]: Counter editor and document manager with flash messages
//! - [`session`]: Admin credentials and 24 hour sessions
//! - [`pricing`]: Live price source selection
//! - [`payment`]: Payment reference generation
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batchboard::feed::ChangeFeed;
//! use batchboard::store::{PublishingStore, SqliteStore, Store};
//! use batchboard::view::{ActiveBatch, LiveView};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let feed = Arc::new(ChangeFeed::default());
//!     let sqlite = SqliteStore::open_in_memory()?;
//!     sqlite.seed_defaults()?;
//!     let store = Arc::new(PublishingStore::new(sqlite, Arc::clone(&feed)));
//!
//!     let mut view = LiveView::activate(store.clone(), &feed, ActiveBatch)?;
//!     store.update_secured_applicants(1, 63).await?;
//!
//!     while view.changed().await {
//!         if let Some(batch) = view.state().ready() {
//!             println!("{} remaining", batch.remaining());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod api;
pub mod clock;
pub mod config;
pub mod feed;
pub mod payment;
pub mod pricing;
pub mod session;
pub mod store;
pub mod view;

// Re-export top-level types for convenience
pub use store::{
    Document, InvestmentBatch, InvestmentDetails, NewDocument, SharedStore, SqliteStore, Store,
    StoreError, StoreResult, Table,
};

pub use feed::{ChangeEvent, ChangeFeed, ChangeKind, EventMask, Subscription};

pub use view::{LiveView, ViewState};

pub use admin::{AdminError, CounterEditor, Direction, DocumentManager, Flash, ReorderMode};

pub use session::{AdminCredentials, SessionGate, SessionRegistry, SessionToken};

pub use pricing::PriceSource;

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};
