//! Admin mutators
//!
//! - [`CounterEditor`]: range-checked edits of the secured applicant count
//! - [`DocumentManager`]: add, soft delete and reorder documents
//! - [`Flash`]: status message that disappears after three seconds
//!
//! Both mutators validate locally first, write through the store, then
//! refetch so their cached state always reflects what was stored.

pub mod counter;
pub mod documents;
pub mod error;
pub mod flash;

#[cfg(test)]
pub(crate) mod testing;

pub use counter::CounterEditor;
pub use documents::{Direction, DocumentManager, ReorderMode};
pub use error::{AdminError, AdminResult};
pub use flash::{Flash, FlashKind, FlashSlot, FLASH_DURATION_MS};
