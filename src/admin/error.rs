//! Admin action errors

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by admin actions
///
/// The validation variants are produced before any store call.
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Count must be between 0 and {total}")]
    OutOfRange { value: i64, total: i64 },

    #[error("Title and file URL are required")]
    MissingField,

    #[error("Nothing loaded yet")]
    NotLoaded,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdminError {
    /// Whether the action was rejected locally without touching the store
    pub fn is_validation(&self) -> bool {
        matches!(self, AdminError::OutOfRange { .. } | AdminError::MissingField)
    }
}

pub type AdminResult<T> = Result<T, AdminError>;
