//! Change Feed Hub
//!
//! Fan-out of store change events to subscribers. Each subscriber gets its
//! own unbounded channel; the [`Subscription`] handle owns the receiving end
//! and removes itself from the hub when dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

use super::messages::{ChangeEvent, EventMask};
use crate::store::Table;

/// Unique identifier for a subscription
pub type SubscriptionId = u64;

type Registry = Arc<RwLock<HashMap<SubscriptionId, Subscriber>>>;

/// Configuration for the change feed
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Maximum number of live subscriptions
    pub max_subscribers: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_subscribers: 1000,
        }
    }
}

struct Subscriber {
    table: Table,
    mask: EventMask,
    sender: mpsc::UnboundedSender<ChangeEvent>,
}

/// In-process change feed
pub struct ChangeFeed {
    subscribers: Registry,
    next_id: AtomicU64,
    config: FeedConfig,
}

impl ChangeFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Subscribe to changes on `table` whose kind is in `mask`
    pub fn subscribe(&self, table: Table, mask: EventMask) -> Result<Subscription, FeedError> {
        let mut subs = self
            .subscribers
            .write()
            .map_err(|_| FeedError::Poisoned)?;
        if subs.len() >= self.config.max_subscribers {
            return Err(FeedError::TooManySubscribers(self.config.max_subscribers));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        subs.insert(id, Subscriber { table, mask, sender });

        tracing::debug!(subscription_id = id, table = %table, "Change feed subscription opened");

        Ok(Subscription {
            id,
            table,
            receiver,
            registry: Arc::clone(&self.subscribers),
        })
    }

    /// Deliver an event to every matching subscriber
    ///
    /// Returns the number of subscribers the event was handed to.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        match self.subscribers.read() {
            Ok(subs) => {
                for (id, sub) in subs.iter() {
                    if sub.table != event.table || !sub.mask.matches(event.kind) {
                        continue;
                    }
                    if sub.sender.send(event.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        closed.push(*id);
                    }
                }
            }
            Err(_) => {
                tracing::error!(table = %event.table, "Change feed registry poisoned, event dropped");
                return 0;
            }
        }

        if !closed.is_empty() {
            if let Ok(mut subs) = self.subscribers.write() {
                for id in &closed {
                    subs.remove(id);
                }
            }
        }

        tracing::trace!(
            table = %event.table,
            kind = ?event.kind,
            subscribers = delivered,
            "Published change event"
        );
        delivered
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Number of live subscriptions on one table
    pub fn subscriber_count_for(&self, table: Table) -> usize {
        self.subscribers
            .read()
            .map(|s| s.values().filter(|sub| sub.table == table).count())
            .unwrap_or(0)
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(FeedConfig::default())
    }
}

/// Handle for one change feed subscription
///
/// Released when dropped.
pub struct Subscription {
    id: SubscriptionId,
    table: Table,
    receiver: mpsc::UnboundedReceiver<ChangeEvent>,
    registry: Registry,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Wait for the next change event
    ///
    /// Returns `None` once the feed has dropped this subscriber.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// Next change event if one is already queued
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut subs) = self.registry.write() {
            subs.remove(&self.id);
        }
        tracing::debug!(subscription_id = self.id, table = %self.table, "Change feed subscription released");
    }
}

/// Errors that can occur in the change feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Too many subscriptions (limit: {0})")]
    TooManySubscribers(usize),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Subscriber registry poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::messages::ChangeKind;

    #[test]
    fn test_default_config() {
        assert_eq!(FeedConfig::default().max_subscribers, 1000);
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_table_only() {
        let feed = ChangeFeed::default();
        let mut docs = feed.subscribe(Table::Documents, EventMask::ALL).unwrap();
        let mut batches = feed
            .subscribe(Table::InvestmentBatches, EventMask::ALL)
            .unwrap();

        let delivered = feed.publish(ChangeEvent::bare(Table::Documents, ChangeKind::Insert));
        assert_eq!(delivered, 1);

        let event = docs.recv().await.unwrap();
        assert_eq!(event.table, Table::Documents);
        assert!(batches.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_mask_filters_kinds() {
        let feed = ChangeFeed::default();
        let mut updates = feed
            .subscribe(Table::Documents, EventMask::only(ChangeKind::Update))
            .unwrap();

        feed.publish(ChangeEvent::bare(Table::Documents, ChangeKind::Insert));
        feed.publish(ChangeEvent::bare(Table::Documents, ChangeKind::Update));

        let event = updates.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
        assert!(updates.try_recv().is_none());
    }

    #[test]
    fn test_drop_releases_subscription() {
        let feed = ChangeFeed::default();
        let sub = feed.subscribe(Table::Documents, EventMask::ALL).unwrap();
        assert_eq!(feed.subscriber_count(), 1);
        assert_eq!(feed.subscriber_count_for(Table::Documents), 1);

        drop(sub);
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(
            feed.publish(ChangeEvent::bare(Table::Documents, ChangeKind::Update)),
            0
        );
    }

    #[test]
    fn test_subscriber_limit() {
        let feed = ChangeFeed::new(FeedConfig { max_subscribers: 2 });
        let _a = feed.subscribe(Table::Documents, EventMask::ALL).unwrap();
        let _b = feed.subscribe(Table::Documents, EventMask::ALL).unwrap();

        let result = feed.subscribe(Table::Documents, EventMask::ALL);
        assert!(matches!(result, Err(FeedError::TooManySubscribers(2))));
    }
}
