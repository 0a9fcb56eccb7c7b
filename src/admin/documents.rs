//! Document list management
//!
//! Adds, soft-deletes and reorders documents. The cached list is replaced
//! wholesale after every write by refetching the active documents.

use serde::{Deserialize, Serialize};

use crate::clock::SharedClock;
use crate::store::{Document, NewDocument, SharedStore, StoreResult};

use super::error::{AdminError, AdminResult};
use super::flash::{Flash, FlashSlot};

pub const MSG_LOAD_FAILED: &str = "Failed to load documents";
pub const MSG_ADDED: &str = "Document added successfully!";
pub const MSG_ADD_FAILED: &str = "Failed to add document";
pub const MSG_DELETED: &str = "Document deleted successfully!";
pub const MSG_DELETE_FAILED: &str = "Failed to delete document";
pub const MSG_REORDER_FAILED: &str = "Failed to reorder document";

/// Direction to move a document in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// How a reorder swap is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderMode {
    /// Two independent single-row updates; a failure between them can leave
    /// duplicate order values
    #[default]
    Sequential,
    /// One call to [`Store::swap_display_orders`](crate::store::Store::swap_display_orders)
    Atomic,
}

pub struct DocumentManager {
    store: SharedStore,
    clock: SharedClock,
    mode: ReorderMode,
    documents: Vec<Document>,
    flash: FlashSlot,
}

impl DocumentManager {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self::with_mode(store, clock, ReorderMode::default())
    }

    pub fn with_mode(store: SharedStore, clock: SharedClock, mode: ReorderMode) -> Self {
        Self {
            store,
            clock,
            mode,
            documents: Vec::new(),
            flash: FlashSlot::default(),
        }
    }

    pub fn mode(&self) -> ReorderMode {
        self.mode
    }

    /// Cached active documents in display order
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Reload the active documents
    pub async fn refresh(&mut self) -> AdminResult<&[Document]> {
        match self.store.active_documents().await {
            Ok(documents) => {
                self.documents = documents;
                Ok(&self.documents)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load documents");
                self.flash_error(MSG_LOAD_FAILED);
                Err(e.into())
            }
        }
    }

    /// Add a document at the end of the list
    ///
    /// Title and URL are required after trimming. The new document's
    /// `display_order` is the current list length.
    pub async fn add(
        &mut self,
        title: &str,
        description: Option<&str>,
        file_url: &str,
    ) -> AdminResult<Document> {
        if title.trim().is_empty() || file_url.trim().is_empty() {
            let err = AdminError::MissingField;
            self.flash_error(err.to_string());
            return Err(err);
        }

        let new = NewDocument::from_input(
            title,
            description,
            file_url,
            self.documents.len() as i64,
        );

        match self.store.insert_document(&new).await {
            Ok(document) => {
                tracing::info!(id = document.id, title = %document.title, "Document added");
                self.flash_success(MSG_ADDED);
                self.refetch().await;
                Ok(document)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to add document");
                self.flash_error(MSG_ADD_FAILED);
                Err(e.into())
            }
        }
    }

    /// Soft delete: mark the document inactive, keeping its row
    pub async fn delete(&mut self, id: i64) -> AdminResult<Document> {
        match self.store.set_document_active(id, false).await {
            Ok(document) => {
                tracing::info!(id, "Document deleted");
                self.flash_success(MSG_DELETED);
                self.refetch().await;
                Ok(document)
            }
            Err(e) => {
                tracing::error!(id, error = %e, "Failed to delete document");
                self.flash_error(MSG_DELETE_FAILED);
                Err(e.into())
            }
        }
    }

    /// Swap a document with its neighbour in `direction`
    ///
    /// Returns `false` without touching the store when the id is not in the
    /// cached list or the document is already first (up) or last (down).
    pub async fn move_document(&mut self, id: i64, direction: Direction) -> AdminResult<bool> {
        let Some(index) = self.documents.iter().position(|d| d.id == id) else {
            return Ok(false);
        };
        let swap_index = match direction {
            Direction::Up if index == 0 => return Ok(false),
            Direction::Up => index - 1,
            Direction::Down if index + 1 >= self.documents.len() => return Ok(false),
            Direction::Down => index + 1,
        };

        let result = match self.distinct_orders(index, swap_index).await {
            Ok(()) => self.swap(index, swap_index).await,
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(()) => {
                tracing::debug!(id, ?direction, "Document moved");
                Ok(true)
            }
            Err(e) => {
                tracing::error!(id, ?direction, error = %e, "Failed to reorder document");
                self.flash_error(MSG_REORDER_FAILED);
                Err(e.into())
            }
        };

        self.refetch().await;
        outcome
    }

    /// Renumber the cached list to its positions when the pair shares a
    /// `display_order`
    async fn distinct_orders(&mut self, index: usize, swap_index: usize) -> StoreResult<()> {
        if self.documents[index].display_order != self.documents[swap_index].display_order {
            return Ok(());
        }

        tracing::debug!(count = self.documents.len(), "Renumbering duplicate display orders");
        for (position, document) in self.documents.iter_mut().enumerate() {
            let position = position as i64;
            if document.display_order != position {
                *document = self.store.set_display_order(document.id, position).await?;
            }
        }
        Ok(())
    }

    async fn swap(&self, index: usize, swap_index: usize) -> StoreResult<()> {
        let first = &self.documents[index];
        let second = &self.documents[swap_index];

        match self.mode {
            ReorderMode::Sequential => {
                match self
                    .store
                    .set_display_order(first.id, second.display_order)
                    .await
                {
                    Ok(_) => self
                        .store
                        .set_display_order(second.id, first.display_order)
                        .await
                        .map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            ReorderMode::Atomic => self
                .store
                .swap_display_orders(first, second)
                .await
                .map(|_| ()),
        }
    }

    pub fn current_flash(&self) -> Option<&Flash> {
        self.flash.current(self.clock.now_ms())
    }

    async fn refetch(&mut self) {
        match self.store.active_documents().await {
            Ok(documents) => self.documents = documents,
            Err(e) => tracing::warn!(error = %e, "Document refetch failed"),
        }
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
