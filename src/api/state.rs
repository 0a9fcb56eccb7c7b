//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::clock::{system_clock, SharedClock};
use crate::config::{Config, StoreBackend};
use crate::feed::{ChangeFeed, FeedConfig};
use crate::session::{AdminCredentials, SessionRegistry};
use crate::store::{PublishingStore, RestStore, SharedStore, SqliteStore, StoreResult};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Table store; writes publish to `feed`
    pub store: SharedStore,
    /// Change feed for live views and websocket clients
    pub feed: Arc<ChangeFeed>,
    /// Open admin sessions
    pub sessions: Arc<SessionRegistry>,
    pub credentials: Arc<AdminCredentials>,
    pub config: Arc<Config>,
    pub clock: SharedClock,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Build state around an existing store and feed
    ///
    /// The store should already publish its writes to `feed`.
    pub fn new(store: SharedStore, feed: Arc<ChangeFeed>, config: Config) -> Self {
        Self::with_clock(store, feed, config, system_clock())
    }

    pub fn with_clock(
        store: SharedStore,
        feed: Arc<ChangeFeed>,
        config: Config,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            feed,
            sessions: Arc::new(SessionRegistry::new()),
            credentials: Arc::new(config.admin.credentials()),
            config: Arc::new(config),
            clock,
            start_time: Instant::now(),
        }
    }

    /// Open the configured store and wire it to a fresh change feed
    pub fn from_config(config: Config) -> StoreResult<Self> {
        let feed = Arc::new(ChangeFeed::new(FeedConfig::from(&config.feed)));

        let store: SharedStore = match config.store.backend {
            StoreBackend::Sqlite => {
                let sqlite = SqliteStore::open(Path::new(&config.store.sqlite_path))?;
                if config.store.seed_on_open && sqlite.seed_defaults()? {
                    tracing::info!(path = %config.store.sqlite_path, "Seeded empty store");
                }
                Arc::new(PublishingStore::new(sqlite, Arc::clone(&feed)))
            }
            StoreBackend::Rest => {
                let rest = RestStore::new(config.store.rest())?;
                Arc::new(PublishingStore::new(rest, Arc::clone(&feed)))
            }
        };

        tracing::info!(backend = store.name(), "Store opened");
        Ok(Self::new(store, feed, config))
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}
