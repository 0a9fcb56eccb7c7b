//! Secured-applicant counter editor
//!
//! Holds a cached copy of the active batch and a proposed count. Proposals
//! are range-checked locally; a valid one is written by batch id and the
//! batch is then refetched whether or not anything else changed.

use crate::clock::SharedClock;
use crate::store::{InvestmentBatch, SharedStore};

use super::error::{AdminError, AdminResult};
use super::flash::{Flash, FlashSlot};

pub const MSG_LOAD_FAILED: &str = "Failed to load data";
pub const MSG_UPDATED: &str = "Successfully updated applicant count!";
pub const MSG_UPDATE_FAILED: &str = "Failed to update count";

/// Admin editor for `secured_applicants`
pub struct CounterEditor {
    store: SharedStore,
    clock: SharedClock,
    batch: Option<InvestmentBatch>,
    pending: i64,
    submitting: bool,
    flash: FlashSlot,
}

impl CounterEditor {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            batch: None,
            pending: 0,
            submitting: false,
            flash: FlashSlot::default(),
        }
    }

    /// Fetch the active batch and reset the proposal to its stored count
    pub async fn load(&mut self) -> AdminResult<&InvestmentBatch> {
        match self.store.active_batch().await {
            Ok(batch) => {
                self.pending = batch.secured_applicants;
                Ok(self.batch.insert(batch))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load investment batch");
                self.flash_error(MSG_LOAD_FAILED);
                Err(e.into())
            }
        }
    }

    pub fn batch(&self) -> Option<&InvestmentBatch> {
        self.batch.as_ref()
    }

    pub fn pending(&self) -> i64 {
        self.pending
    }

    /// Propose `secured_applicants + amount`, never above `total_positions`
    ///
    /// Ignored until a batch is loaded.
    pub fn increment(&mut self, amount: i64) {
        if let Some(batch) = &self.batch {
            self.pending = batch.clamped_increment(amount);
        }
    }

    pub fn reset(&mut self) {
        self.pending = 0;
    }

    pub fn set_pending(&mut self, value: i64) {
        self.pending = value;
    }

    /// Whether the proposal can be submitted
    pub fn is_submit_enabled(&self) -> bool {
        match &self.batch {
            Some(batch) => !self.submitting && self.pending != batch.secured_applicants,
            None => false,
        }
    }

    /// Write the proposed count
    ///
    /// Out-of-range proposals are rejected without a store call. A failed
    /// write leaves both the cached batch and the proposal as they were.
    pub async fn submit(&mut self) -> AdminResult<InvestmentBatch> {
        let (batch_id, total) = match &self.batch {
            Some(batch) => (batch.id, batch.total_positions),
            None => return Err(AdminError::NotLoaded),
        };

        let value = self.pending;
        if value < 0 || value > total {
            let err = AdminError::OutOfRange { value, total };
            self.flash_error(err.to_string());
            return Err(err);
        }

        self.submitting = true;
        let result = self.store.update_secured_applicants(batch_id, value).await;
        self.submitting = false;

        let updated = match result {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!(batch_id, value, error = %e, "Failed to update applicant count");
                self.flash_error(MSG_UPDATE_FAILED);
                return Err(e.into());
            }
        };

        tracing::info!(batch_id, secured_applicants = value, "Applicant count updated");
        self.flash_success(MSG_UPDATED);
        self.batch = Some(updated.clone());
        self.pending = updated.secured_applicants;

        match self.store.active_batch().await {
            Ok(fresh) => {
                self.pending = fresh.secured_applicants;
                self.batch = Some(fresh.clone());
                Ok(fresh)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Refetch after update failed");
                Ok(updated)
            }
        }
    }

    /// The current flash, if still visible
    pub fn current_flash(&self) -> Option<&Flash> {
        self.flash.current(self.clock.now_ms())
    }

    fn flash_success(&mut self, text: impl Into<String>) {
        let now = self.clock.now_ms();
        self.flash.show(Flash::success(text, now));
    }

    fn flash_error(&mut self, text: impl Into<String>) {
        let now = self.clock.now_ms();
        self.flash.show(Flash::error(text, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::testing::FlakyStore;
    use crate::clock::ManualClock;
    use crate::store::Store;
    use std::sync::Arc;

    fn editor(store: Arc<FlakyStore>, clock: &ManualClock) -> CounterEditor {
        CounterEditor::new(store, Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn test_load_sets_pending() {
        let store = Arc::new(FlakyStore::new());
        store.inner.update_secured_applicants(1, 63).await.unwrap();
        let clock = ManualClock::new(0);
        let mut editor = editor(store, &clock);

        let batch = editor.load().await.unwrap();
        assert_eq!(batch.remaining(), 37);
        assert_eq!(batch.progress_label(), "63.0%");
        assert_eq!(editor.pending(), 63);
        assert!(!editor.is_submit_enabled());
    }

    #[tokio::test]
    async fn test_load_failure_flashes() {
        let store = Arc::new(FlakyStore::new());
        store.fail_reads(true);
        let clock = ManualClock::new(0);
        let mut editor = editor(store, &clock);

        assert!(editor.load().await.is_err());
        let flash = editor.current_flash().unwrap();
        assert!(flash.is_error());
        assert_eq!(flash.text, MSG_LOAD_FAILED);
    }

    #[tokio::test]
    async fn test_out_of_range_rejected_without_store_call() {
        let store = Arc::new(FlakyStore::new());
        let clock = ManualClock::new(0);
        let mut editor = editor(store.clone(), &clock);
        editor.load().await.unwrap();

        for value in [-1, 101, i64::MAX] {
            editor.set_pending(value);
            let err = editor.submit().await.unwrap_err();
            assert!(err.is_validation());
            assert_eq!(
                editor.current_flash().unwrap().text,
                "Count must be between 0 and 100"
            );
        }
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_boundaries_accepted() {
        let store = Arc::new(FlakyStore::new());
        let clock = ManualClock::new(0);
        let mut editor = editor(store.clone(), &clock);
        editor.load().await.unwrap();

        editor.set_pending(100);
        assert_eq!(editor.submit().await.unwrap().secured_applicants, 100);
        editor.reset();
        assert_eq!(editor.submit().await.unwrap().secured_applicants, 0);
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_increment_clamps_to_total() {
        let store = Arc::new(FlakyStore::new());
        store.inner.update_secured_applicants(1, 95).await.unwrap();
        let clock = ManualClock::new(0);
        let mut editor = editor(store, &clock);
        editor.load().await.unwrap();

        editor.increment(1);
        assert_eq!(editor.pending(), 96);
        editor.increment(10);
        assert_eq!(editor.pending(), 100);
        editor.increment(i64::MAX);
        assert_eq!(editor.pending(), 100);
    }

    #[tokio::test]
    async fn test_submit_success_refetches_and_flashes() {
        let store = Arc::new(FlakyStore::new());
        let clock = ManualClock::new(1_000);
        let mut editor = editor(store.clone(), &clock);
        editor.load().await.unwrap();

        editor.increment(5);
        assert!(editor.is_submit_enabled());
        let batch = editor.submit().await.unwrap();
        assert_eq!(batch.secured_applicants, 5);
        assert_eq!(editor.batch().unwrap().secured_applicants, 5);
        assert!(!editor.is_submit_enabled());

        let flash = editor.current_flash().unwrap();
        assert!(!flash.is_error());
        assert_eq!(flash.text, MSG_UPDATED);

        clock.advance(3_000);
        assert!(editor.current_flash().is_none());
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_state() {
        let store = Arc::new(FlakyStore::new());
        let clock = ManualClock::new(0);
        let mut editor = editor(store.clone(), &clock);
        editor.load().await.unwrap();

        store.fail_from_write(1);
        editor.set_pending(40);
        assert!(editor.submit().await.is_err());

        assert_eq!(editor.pending(), 40);
        assert_eq!(editor.batch().unwrap().secured_applicants, 0);
        assert_eq!(editor.current_flash().unwrap().text, MSG_UPDATE_FAILED);
        assert_eq!(store.inner.active_batch().await.unwrap().secured_applicants, 0);
    }

    #[tokio::test]
    async fn test_submit_before_load() {
        let store = Arc::new(FlakyStore::new());
        let clock = ManualClock::new(0);
        let mut editor = editor(store.clone(), &clock);
        assert!(matches!(editor.submit().await, Err(AdminError::NotLoaded)));
        assert!(!editor.is_submit_enabled());
        assert_eq!(store.writes(), 0);
    }
}
