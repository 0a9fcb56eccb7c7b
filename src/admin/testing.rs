//! Store fake for exercising admin error paths

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::store::{
    Document, InvestmentBatch, InvestmentDetails, NewDocument, SqliteStore, Store, StoreError,
    StoreResult,
};

/// Seeded in-memory store that counts writes and fails on demand
pub(crate) struct FlakyStore {
    pub inner: SqliteStore,
    writes: AtomicUsize,
    fail_from_write: AtomicUsize,
    fail_reads: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        let inner = SqliteStore::open_in_memory().unwrap();
        inner.seed_defaults().unwrap();
        Self {
            inner,
            writes: AtomicUsize::new(0),
            fail_from_write: AtomicUsize::new(usize::MAX),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Number of write calls seen so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Fail the `n`th write (1-based, counted from now on) and every later one
    pub fn fail_from_write(&self, n: usize) {
        let base = self.writes();
        self.fail_from_write.store(base + n, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn write(&self) -> StoreResult<()> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= self.fail_from_write.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("injected write failure".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.read()
    }

    async fn active_batch(&self) -> StoreResult<InvestmentBatch> {
        self.read()?;
        self.inner.active_batch().await
    }

    async fn active_details(&self) -> StoreResult<InvestmentDetails> {
        self.read()?;
        self.inner.active_details().await
    }

    async fn active_documents(&self) -> StoreResult<Vec<Document>> {
        self.read()?;
        self.inner.active_documents().await
    }

    async fn document(&self, id: i64) -> StoreResult<Document> {
        self.read()?;
        self.inner.document(id).await
    }

    async fn update_secured_applicants(
        &self,
        batch_id: i64,
        count: i64,
    ) -> StoreResult<InvestmentBatch> {
        self.write()?;
        self.inner.update_secured_applicants(batch_id, count).await
    }

    async fn insert_document(&self, document: &NewDocument) -> StoreResult<Document> {
        self.write()?;
        self.inner.insert_document(document).await
    }

    async fn set_document_active(&self, id: i64, active: bool) -> StoreResult<Document> {
        self.write()?;
        self.inner.set_document_active(id, active).await
    }

    async fn set_display_order(&self, id: i64, display_order: i64) -> StoreResult<Document> {
        self.write()?;
        self.inner.set_display_order(id, display_order).await
    }

    async fn swap_display_orders(
        &self,
        first: &Document,
        second: &Document,
    ) -> StoreResult<(Document, Document)> {
        self.write()?;
        self.inner.swap_display_orders(first, second).await
    }
}
