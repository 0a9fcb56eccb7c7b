//! Server-side session table
//!
//! Each successful login gets an opaque id mapped to its [`SessionToken`].
//! Lookups of expired sessions remove them, every login sweeps the table,
//! and [`SessionRegistry::start_sweeper`] purges it on a timer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::gate::SessionToken;
use crate::clock::SharedClock;

/// Default period of the background purge
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Active admin sessions keyed by bearer id
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionToken>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session at `now_ms`, returning its id
    pub async fn open(&self, now_ms: i64) -> (String, SessionToken) {
        let id = Uuid::new_v4().to_string();
        let token = SessionToken::issue(now_ms);
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, existing| !existing.is_expired(now_ms));
        sessions.insert(id.clone(), token);
        tracing::info!(session = %short_id(&id), open = sessions.len(), "Admin session opened");
        (id, token)
    }

    /// The token for `id` if it exists and has not expired
    pub async fn check(&self, id: &str, now_ms: i64) -> Option<SessionToken> {
        let token = self.sessions.read().await.get(id).copied()?;
        if token.is_expired(now_ms) {
            self.sessions.write().await.remove(id);
            tracing::info!(session = %short_id(id), "Admin session expired");
            return None;
        }
        Some(token)
    }

    /// Close `id`; returns whether it existed
    pub async fn close(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session = %short_id(id), "Admin session closed");
        }
        removed
    }

    /// Drop every expired session, returning how many were removed
    pub async fn purge_expired(&self, now_ms: i64) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, token| !token.is_expired(now_ms));
        before - sessions.len()
    }

    /// Spawn a task that purges expired sessions every `period`
    pub fn start_sweeper(
        self: Arc<Self>,
        clock: SharedClock,
        period: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let removed = self.purge_expired(clock.now_ms()).await;
                if removed > 0 {
                    tracing::debug!(removed, "Purged expired admin sessions");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
