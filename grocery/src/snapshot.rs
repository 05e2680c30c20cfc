//! The persisted record.
//!
//! The whole list is stored as one JSON object under a fixed key:
//!
//! ```json
//! {
//!   "items": [{ "id": "…", "name": "Milk", "favorite": false }],
//!   "completedItems": [],
//!   "favoriteItems": [],
//!   "nextItem": "",
//!   "loading": false
//! }
//! ```
//!
//! Records written by older versions may lack `favoriteItems`, `nextItem` and `loading`,
//! or carry extra fields such as `listId`. Those are accepted. Anything that would break
//! the list invariants is rejected so a damaged record never replaces good state.

use crate::error::SnapshotError;
use crate::types::{Item, ListState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Serialized form of a [`ListState`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedList {
    /// Pending items
    pub items: Vec<Item>,
    /// Completed items
    pub completed_items: Vec<Item>,
    /// Favorites log
    #[serde(default)]
    pub favorite_items: Vec<Item>,
    /// Draft text, omitted when draft persistence is off
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_item: Option<String>,
    /// Always written as `false`
    #[serde(default)]
    pub loading: bool,
}

impl PersistedList {
    /// Captures the persistent part of `state`
    ///
    /// `loading` is written as `false` whatever its in-memory value.
    #[must_use]
    pub fn from_state(state: &ListState, include_draft: bool) -> Self {
        Self {
            items: state.pending.clone(),
            completed_items: state.completed.clone(),
            favorite_items: state.favorites.clone(),
            next_item: include_draft.then(|| state.draft_text.clone()),
            loading: false,
        }
    }

    /// Renders the record as JSON
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Encode`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Parses and validates a stored record
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] when the text is not a record or the record is invalid.
    pub fn decode(raw: &str) -> Result<Self, SnapshotError> {
        let record: Self =
            serde_json::from_str(raw).map_err(|e| SnapshotError::Malformed(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Checks the invariants a restored list must satisfy
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::LoadingPersisted`] if `loading` is true
    /// - [`SnapshotError::EmptyId`] if any item has an empty id
    /// - [`SnapshotError::DuplicateId`] if an id repeats across pending and completed
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.loading {
            return Err(SnapshotError::LoadingPersisted);
        }

        let empty_id = self
            .items
            .iter()
            .chain(&self.completed_items)
            .chain(&self.favorite_items)
            .any(|item| item.id.as_str().is_empty());
        if empty_id {
            return Err(SnapshotError::EmptyId);
        }

        let mut seen = HashSet::new();
        for item in self.items.iter().chain(&self.completed_items) {
            if !seen.insert(&item.id) {
                return Err(SnapshotError::DuplicateId(item.id.to_string()));
            }
        }

        Ok(())
    }
}
