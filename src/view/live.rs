//! Fetch, subscribe, refetch
//!
//! A [`LiveView`] keeps one point query fresh. It subscribes to the query's
//! table, fetches once, then refetches on every change notification and
//! replaces its state wholesale. State is published through a
//! `tokio::sync::watch` channel owned by a background task; dropping the view
//! aborts the task, which also releases the feed subscription.

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::feed::{ChangeFeed, EventMask, FeedError, Subscription};
use crate::store::{
    Document, InvestmentBatch, InvestmentDetails, SharedStore, Store, StoreResult, Table,
};

/// A point query a [`LiveView`] can keep fresh
#[async_trait]
pub trait ViewQuery: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Table whose changes invalidate the result
    fn table(&self) -> Table;

    async fn fetch(&self, store: &dyn Store) -> StoreResult<Self::Output>;
}

/// The active investment batch
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveBatch;

#[async_trait]
impl ViewQuery for ActiveBatch {
    type Output = InvestmentBatch;

    fn table(&self) -> Table {
        Table::InvestmentBatches
    }

    async fn fetch(&self, store: &dyn Store) -> StoreResult<InvestmentBatch> {
        store.active_batch().await
    }
}

/// The active investment details
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveDetails;

#[async_trait]
impl ViewQuery for ActiveDetails {
    type Output = InvestmentDetails;

    fn table(&self) -> Table {
        Table::InvestmentDetails
    }

    async fn fetch(&self, store: &dyn Store) -> StoreResult<InvestmentDetails> {
        store.active_details().await
    }
}

/// Active documents in display order
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveDocuments;

#[async_trait]
impl ViewQuery for ActiveDocuments {
    type Output = Vec<Document>;

    fn table(&self) -> Table {
        Table::Documents
    }

    async fn fetch(&self, store: &dyn Store) -> StoreResult<Vec<Document>> {
        store.active_documents().await
    }
}

/// What a view currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    /// No response yet
    Loading,
    /// Last successful result
    Ready(T),
    /// The first fetch failed
    Unavailable(String),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Handle to a running view
///
/// Dropping it tears the view down.
pub struct LiveView<T> {
    table: Table,
    state: watch::Receiver<ViewState<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone + Send + Sync + 'static> LiveView<T> {
    /// Subscribe to the query's table and start fetching
    ///
    /// The subscription is taken before the first fetch so a change landing
    /// between the two still triggers a refetch.
    pub fn activate<Q>(store: SharedStore, feed: &ChangeFeed, query: Q) -> Result<Self, FeedError>
    where
        Q: ViewQuery<Output = T>,
    {
        let table = query.table();
        let subscription = feed.subscribe(table, EventMask::ALL)?;
        let (tx, rx) = watch::channel(ViewState::Loading);

        let task = tokio::spawn(run(store, query, subscription, tx));
        tracing::debug!(table = %table, "Live view activated");

        Ok(Self {
            table,
            state: rx,
            task,
        })
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ViewState<T> {
        self.state.borrow().clone()
    }

    /// Wait until the state is replaced
    ///
    /// Returns `false` once the view has stopped.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Independent receiver for the state stream
    pub fn watch(&self) -> watch::Receiver<ViewState<T>> {
        self.state.clone()
    }

    /// Stop refetching and release the subscription
    pub fn deactivate(self) {}
}

impl<T> Drop for LiveView<T> {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!(table = %self.table, "Live view deactivated");
    }
}

async fn run<Q: ViewQuery>(
    store: SharedStore,
    query: Q,
    mut subscription: Subscription,
    tx: watch::Sender<ViewState<Q::Output>>,
) {
    let mut has_value = false;
    refresh(&store, &query, &tx, &mut has_value).await;

    while let Some(event) = subscription.recv().await {
        tracing::debug!(table = %event.table, kind = ?event.kind, "Change received, refetching");
        refresh(&store, &query, &tx, &mut has_value).await;
    }
}

async fn refresh<Q: ViewQuery>(
    store: &SharedStore,
    query: &Q,
    tx: &watch::Sender<ViewState<Q::Output>>,
    has_value: &mut bool,
) {
    match query.fetch(store.as_ref()).await {
        Ok(value) => {
            *has_value = true;
            tx.send_replace(ViewState::Ready(value));
        }
        Err(e) if *has_value => {
            tracing::warn!(table = %query.table(), error = %e, "Refetch failed, keeping last result");
        }
        Err(e) => {
            tracing::error!(table = %query.table(), error = %e, "Initial fetch failed");
            tx.send_replace(ViewState::Unavailable(e.to_string()));
        }
    }
}
