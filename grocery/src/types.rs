//! Domain types for the grocery list.
//!
//! A list is two ordered sequences of items, "to get" (pending) and "in the cart"
//! (completed), plus an append-only log of items that were ever favorited and the
//! text the user is currently typing.

use crate::error::ListError;
use crate::snapshot::PersistedList;
use basket_macros::Action;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an item
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wraps an identifier produced by an id generator
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single grocery item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier, fixed at creation
    pub id: ItemId,
    /// What to buy
    pub name: String,
    /// Whether the item is starred
    pub favorite: bool,
}

impl Item {
    /// Creates a non-favorite item
    #[must_use]
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            favorite: false,
        }
    }

    /// Returns a copy with the favorite flag flipped
    #[must_use]
    pub fn toggled_favorite(&self) -> Self {
        Self {
            favorite: !self.favorite,
            ..self.clone()
        }
    }
}

/// Which of the two visible lists an index refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListName {
    /// Items still to get
    Pending,
    /// Items already in the cart
    Completed,
}

impl ListName {
    /// The list an item moves to when its completion is toggled
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }
}

impl std::fmt::Display for ListName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Where the current list contents came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RehydrationStatus {
    /// `Initialize` has not been sent yet; only `Initialize` is accepted
    #[default]
    NotStarted,
    /// Waiting for the storage read
    InProgress,
    /// Contents were restored from the persisted record
    Restored,
    /// No record existed, or the list was reset; contents come from the seed
    Fresh,
    /// The persisted record could not be read or was invalid; writes are withheld
    Failed,
}

/// State of the grocery list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListState {
    /// Items still to get, newest first
    pub pending: Vec<Item>,
    /// Items in the cart, most recently completed first
    pub completed: Vec<Item>,
    /// Append-only log of items at the moment they were favorited
    pub favorites: Vec<Item>,
    /// Text typed but not yet added
    pub draft_text: String,
    /// True only while the persisted record is being read
    pub loading: bool,
    /// Error the UI should show, if any
    pub last_error: Option<ListError>,
    /// Why the most recent command was rejected
    pub rejection: Option<ListError>,
    /// Where the contents came from
    pub rehydration: RehydrationStatus,
    /// When the last write was acknowledged by storage
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Edits were applied while writes were withheld after a failed restore
    #[serde(default)]
    pub held_edits: bool,
}

impl ListState {
    /// Creates a state whose pending list is `seed`
    #[must_use]
    pub const fn new(seed: Vec<Item>) -> Self {
        Self {
            pending: seed,
            completed: Vec::new(),
            favorites: Vec::new(),
            draft_text: String::new(),
            loading: false,
            last_error: None,
            rejection: None,
            rehydration: RehydrationStatus::NotStarted,
            last_saved_at: None,
            held_edits: false,
        }
    }

    /// Creates the first-run state from the built-in template
    #[must_use]
    pub fn seeded() -> Self {
        Self::new(crate::seed::template())
    }

    /// The named list
    #[must_use]
    pub fn list(&self, name: ListName) -> &[Item] {
        match name {
            ListName::Pending => &self.pending,
            ListName::Completed => &self.completed,
        }
    }

    pub(crate) fn list_mut(&mut self, name: ListName) -> &mut Vec<Item> {
        match name {
            ListName::Pending => &mut self.pending,
            ListName::Completed => &mut self.completed,
        }
    }

    /// Locates an item in the pending or completed list
    #[must_use]
    pub fn find(&self, id: &ItemId) -> Option<(ListName, usize)> {
        [ListName::Pending, ListName::Completed]
            .into_iter()
            .find_map(|name| {
                self.list(name)
                    .iter()
                    .position(|item| &item.id == id)
                    .map(|index| (name, index))
            })
    }

    /// Whether an item with this id is pending or completed
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.find(id).is_some()
    }

    /// True when there is nothing left to get and nothing in the cart
    #[must_use]
    pub fn is_empty_list(&self) -> bool {
        self.pending.is_empty() && self.completed.is_empty()
    }

    /// Whether the UI should offer to start a new list
    ///
    /// Offered once everything has been picked up and the cart holds more than one item.
    #[must_use]
    pub fn can_offer_new_list(&self) -> bool {
        self.pending.is_empty() && self.completed.len() > 1
    }

    /// Whether commands are accepted
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        !self.loading
    }
}

/// Actions representing commands and events for the list
///
/// Commands come from the UI. Events are fed back by effects (storage reads and writes).
#[derive(Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ListAction {
    // ========== Commands ==========
    /// Command: Restore the persisted list
    #[command]
    Initialize,

    /// Command: Replace the text being typed
    #[command]
    SetDraftText {
        /// New draft text
        text: String,
    },

    /// Command: Add the draft text as a new pending item
    #[command]
    AddItem,

    /// Command: Star or unstar an item
    #[command]
    ToggleFavorite {
        /// List holding the item
        list: ListName,
        /// Position in that list
        index: usize,
    },

    /// Command: Move an item between the pending and completed lists
    #[command]
    ToggleComplete {
        /// List holding the item
        list: ListName,
        /// Position in that list
        index: usize,
    },

    /// Command: Remove an item permanently
    #[command]
    DeleteItem {
        /// List holding the item
        list: ListName,
        /// Position in that list
        index: usize,
    },

    /// Command: Start a new list
    #[command]
    ResetList {
        /// Seed the new list from favorites instead of leaving it empty
        from_favorites: bool,
    },

    /// Command: Write the current list now instead of after the debounce window
    #[command]
    Flush,

    // ========== Events ==========
    /// Event: The storage read finished
    #[event]
    Rehydrated {
        /// The validated record, or `None` on first run
        snapshot: Option<PersistedList>,
    },

    /// Event: The storage read failed or returned an invalid record
    #[event]
    RehydrationFailed {
        /// What went wrong
        error: ListError,
    },

    /// Event: A write was acknowledged
    #[event]
    Persisted,

    /// Event: A write failed after retries
    #[event]
    PersistFailed {
        /// Storage error message
        error: String,
    },
}
