//! Publishing Store - emits change events after writes
//!
//! Wraps any [`Store`] and publishes a [`ChangeEvent`] on the change feed
//! after every successful write, carrying the row as stored. Reads pass
//! straight through.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::StoreResult;
use super::types::{Document, InvestmentBatch, InvestmentDetails, NewDocument, Table};
use super::Store;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind};

/// Store decorator that feeds the change feed
pub struct PublishingStore<S> {
    inner: S,
    feed: Arc<ChangeFeed>,
}

impl<S: Store> PublishingStore<S> {
    pub fn new(inner: S, feed: Arc<ChangeFeed>) -> Self {
        Self { inner, feed }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn emit(&self, table: Table, kind: ChangeKind, row: &impl serde::Serialize) {
        let delivered = self.feed.publish(ChangeEvent::new(table, kind, row));
        tracing::debug!(table = %table, kind = ?kind, subscribers = delivered, "Change published");
    }
}

#[async_trait]
impl<S: Store> Store for PublishingStore<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn active_batch(&self) -> StoreResult<InvestmentBatch> {
        self.inner.active_batch().await
    }

    async fn active_details(&self) -> StoreResult<InvestmentDetails> {
        self.inner.active_details().await
    }

    async fn active_documents(&self) -> StoreResult<Vec<Document>> {
        self.inner.active_documents().await
    }

    async fn document(&self, id: i64) -> StoreResult<Document> {
        self.inner.document(id).await
    }

    async fn update_secured_applicants(
        &self,
        batch_id: i64,
        count: i64,
    ) -> StoreResult<InvestmentBatch> {
        let batch = self.inner.update_secured_applicants(batch_id, count).await?;
        self.emit(Table::InvestmentBatches, ChangeKind::Update, &batch);
        Ok(batch)
    }

    async fn insert_document(&self, document: &NewDocument) -> StoreResult<Document> {
        let doc = self.inner.insert_document(document).await?;
        self.emit(Table::Documents, ChangeKind::Insert, &doc);
        Ok(doc)
    }

    async fn set_document_active(&self, id: i64, active: bool) -> StoreResult<Document> {
        let doc = self.inner.set_document_active(id, active).await?;
        self.emit(Table::Documents, ChangeKind::Update, &doc);
        Ok(doc)
    }

    async fn set_display_order(&self, id: i64, display_order: i64) -> StoreResult<Document> {
        let doc = self.inner.set_display_order(id, display_order).await?;
        self.emit(Table::Documents, ChangeKind::Update, &doc);
        Ok(doc)
    }

    async fn swap_display_orders(
        &self,
        first: &Document,
        second: &Document,
    ) -> StoreResult<(Document, Document)> {
        let (a, b) = self.inner.swap_display_orders(first, second).await?;
        self.emit(Table::Documents, ChangeKind::Update, &a);
        self.emit(Table::Documents, ChangeKind::Update, &b);
        Ok((a, b))
    }
}
