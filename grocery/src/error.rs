//! Error types for the grocery list.

use crate::types::ListName;
use basket_runtime::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to the UI layer by list operations.
///
/// Cloneable and serializable so the error can live in [`ListState`](crate::ListState)
/// as the banner the UI renders.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListError {
    /// An index-based operation referenced a position outside the named list.
    #[error("index {index} is out of range for the {list} list (length {len})")]
    PreconditionViolation {
        /// List the index was applied to
        list: ListName,
        /// Offending index
        index: usize,
        /// Length of the list at the time
        len: usize,
    },

    /// The list is still being restored from storage.
    #[error("the list is still loading")]
    NotReady,

    /// A restore would discard edits made since the previous restore failed.
    #[error("the list has unsaved edits; reset or save it before restoring again")]
    UnsavedEdits,

    /// Reading or writing the persisted record failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The persisted record could not be decoded or failed validation.
    #[error("invalid persisted list: {0}")]
    Snapshot(String),

    /// The runtime refused the operation (e.g. it is shutting down).
    #[error("store unavailable: {0}")]
    Store(String),
}

impl ListError {
    /// Whether this error came from rejecting a command rather than from storage.
    #[must_use]
    pub const fn is_command_error(&self) -> bool {
        matches!(
            self,
            Self::PreconditionViolation { .. } | Self::NotReady | Self::UnsavedEdits
        )
    }
}

impl From<StoreError> for ListError {
    fn from(error: StoreError) -> Self {
        Self::Store(error.to_string())
    }
}

impl From<SnapshotError> for ListError {
    fn from(error: SnapshotError) -> Self {
        Self::Snapshot(error.to_string())
    }
}

/// Reasons a persisted record is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The stored text is not a list record.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// The record could not be rendered to JSON.
    #[error("failed to encode record: {0}")]
    Encode(String),

    /// An item has an empty id.
    #[error("item with empty id")]
    EmptyId,

    /// The same id appears more than once across the pending and completed lists.
    #[error("duplicate item id {0}")]
    DuplicateId(String),

    /// The record claims to be mid-load.
    #[error("record was persisted with loading = true")]
    LoadingPersisted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_message_names_list_and_bounds() {
        let error = ListError::PreconditionViolation {
            list: ListName::Completed,
            index: 3,
            len: 1,
        };
        assert_eq!(
            error.to_string(),
            "index 3 is out of range for the completed list (length 1)"
        );
        assert!(error.is_command_error());
        assert!(!ListError::Storage("disk".into()).is_command_error());
        assert!(ListError::UnsavedEdits.is_command_error());
    }

    #[test]
    fn store_errors_convert() {
        let error: ListError = StoreError::ShutdownInProgress.into();
        assert_eq!(error, ListError::Store("Store is shutting down".to_string()));
    }
}
