//! Next-state functions for every list operation.
//!
//! Each function takes the previous state and returns the next one without touching
//! its input, so an operation either applies completely or not at all. The reducer
//! decides which one to call and which effects follow.

use crate::error::ListError;
use crate::snapshot::PersistedList;
use crate::types::{Item, ItemId, ListName, ListState, RehydrationStatus};
use std::collections::HashSet;

fn check_index(state: &ListState, list: ListName, index: usize) -> Result<(), ListError> {
    let len = state.list(list).len();
    if index < len {
        Ok(())
    } else {
        Err(ListError::PreconditionViolation { list, index, len })
    }
}

/// Replaces the draft text
#[must_use]
pub fn set_draft_text(prev: &ListState, text: String) -> ListState {
    ListState {
        draft_text: text,
        ..prev.clone()
    }
}

/// Prepends the draft as a new item with `id` and clears the draft
///
/// Returns `None` when the draft is empty. Whitespace counts as text.
#[must_use]
pub fn add_item(prev: &ListState, id: ItemId) -> Option<ListState> {
    if prev.draft_text.is_empty() {
        return None;
    }

    let mut next = prev.clone();
    let name = std::mem::take(&mut next.draft_text);
    next.pending.insert(0, Item::new(id, name));
    Some(next)
}

/// Flips the favorite flag of one item, logging it in favorites when it becomes true
///
/// # Errors
///
/// Returns [`ListError::PreconditionViolation`] when `index` is out of range.
pub fn toggle_favorite(
    prev: &ListState,
    list: ListName,
    index: usize,
) -> Result<ListState, ListError> {
    check_index(prev, list, index)?;

    let mut next = prev.clone();
    let toggled = next.list(list)[index].toggled_favorite();
    if toggled.favorite {
        next.favorites.push(toggled.clone());
    }
    next.list_mut(list)[index] = toggled;
    Ok(next)
}

/// Moves one item to the front of the other list
///
/// # Errors
///
/// Returns [`ListError::PreconditionViolation`] when `index` is out of range.
pub fn toggle_complete(
    prev: &ListState,
    list: ListName,
    index: usize,
) -> Result<ListState, ListError> {
    check_index(prev, list, index)?;

    let mut next = prev.clone();
    let item = next.list_mut(list).remove(index);
    next.list_mut(list.other()).insert(0, item);
    Ok(next)
}

/// Removes one item; favorites are untouched
///
/// # Errors
///
/// Returns [`ListError::PreconditionViolation`] when `index` is out of range.
pub fn delete_item(
    prev: &ListState,
    list: ListName,
    index: usize,
) -> Result<ListState, ListError> {
    check_index(prev, list, index)?;

    let mut next = prev.clone();
    next.list_mut(list).remove(index);
    Ok(next)
}

/// Starts a new list, optionally pre-filled from favorites
///
/// Favorites are kept. When several favorites share an id only the first is copied.
#[must_use]
pub fn reset_list(prev: &ListState, from_favorites: bool) -> ListState {
    let pending = if from_favorites {
        let mut seen = HashSet::new();
        prev.favorites
            .iter()
            .filter(|item| seen.insert(item.id.clone()))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    ListState {
        pending,
        completed: Vec::new(),
        favorites: prev.favorites.clone(),
        draft_text: String::new(),
        loading: false,
        ..prev.clone()
    }
}

/// Replaces the list contents with a restored record and ends loading
#[must_use]
pub fn rehydrate(prev: &ListState, record: PersistedList) -> ListState {
    ListState {
        pending: record.items,
        completed: record.completed_items,
        favorites: record.favorite_items,
        draft_text: record.next_item.unwrap_or_default(),
        loading: false,
        rehydration: RehydrationStatus::Restored,
        last_error: None,
        ..prev.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str) -> Item {
        Item::new(ItemId::new(id), name)
    }

    fn state() -> ListState {
        ListState::new(vec![item("a", "Milk"), item("b", "Eggs")])
    }

    #[test]
    fn add_prepends_and_clears_draft() {
        let prev = set_draft_text(&state(), "Bread".to_string());
        let next = add_item(&prev, ItemId::new("c")).unwrap();

        assert_eq!(next.pending[0], item("c", "Bread"));
        assert_eq!(next.pending.len(), 3);
        assert!(next.draft_text.is_empty());
        assert_eq!(prev.pending.len(), 2);
    }

    #[test]
    fn add_with_empty_draft_is_none() {
        assert!(add_item(&state(), ItemId::new("c")).is_none());
    }

    #[test]
    fn whitespace_draft_is_added_verbatim() {
        let prev = set_draft_text(&state(), "  ".to_string());
        let next = add_item(&prev, ItemId::new("c")).unwrap();
        assert_eq!(next.pending[0].name, "  ");
    }

    #[test]
    fn favorite_logged_only_on_false_to_true() {
        let once = toggle_favorite(&state(), ListName::Pending, 1).unwrap();
        assert!(once.pending[1].favorite);
        assert_eq!(once.favorites, vec![once.pending[1].clone()]);

        let twice = toggle_favorite(&once, ListName::Pending, 1).unwrap();
        assert!(!twice.pending[1].favorite);
        assert_eq!(twice.favorites.len(), 1);
        assert!(twice.favorites[0].favorite);
    }

    #[test]
    fn complete_moves_to_front_of_other_list() {
        let prev = toggle_complete(&state(), ListName::Pending, 0).unwrap();
        let next = toggle_complete(&prev, ListName::Pending, 0).unwrap();

        assert!(next.pending.is_empty());
        assert_eq!(next.completed, vec![item("b", "Eggs"), item("a", "Milk")]);

        let back = toggle_complete(&next, ListName::Completed, 1).unwrap();
        assert_eq!(back.pending, vec![item("a", "Milk")]);
    }

    #[test]
    fn out_of_range_index_is_a_precondition_violation() {
        let err = delete_item(&state(), ListName::Completed, 0).unwrap_err();
        assert_eq!(
            err,
            ListError::PreconditionViolation {
                list: ListName::Completed,
                index: 0,
                len: 0
            }
        );
        assert!(toggle_favorite(&state(), ListName::Pending, 2).is_err());
        assert!(toggle_complete(&state(), ListName::Pending, 9).is_err());
    }

    #[test]
    fn delete_keeps_favorites() {
        let starred = toggle_favorite(&state(), ListName::Pending, 0).unwrap();
        let next = delete_item(&starred, ListName::Pending, 0).unwrap();

        assert_eq!(next.pending, vec![item("b", "Eggs")]);
        assert_eq!(next.favorites.len(), 1);
    }

    #[test]
    fn reset_from_favorites_deduplicates_ids() {
        let mut prev = state();
        prev = toggle_favorite(&prev, ListName::Pending, 0).unwrap();
        prev = toggle_favorite(&prev, ListName::Pending, 0).unwrap();
        prev = toggle_favorite(&prev, ListName::Pending, 0).unwrap();
        assert_eq!(prev.favorites.len(), 2);
        prev.draft_text = "half typed".to_string();

        let next = reset_list(&prev, true);
        assert_eq!(next.pending.len(), 1);
        assert_eq!(next.pending[0].id.as_str(), "a");
        assert!(next.completed.is_empty());
        assert_eq!(next.favorites.len(), 2);
        assert!(next.draft_text.is_empty());

        assert!(reset_list(&prev, false).pending.is_empty());
    }

    #[test]
    fn rehydrate_ends_loading() {
        let mut prev = state();
        prev.loading = true;
        let record = PersistedList {
            items: vec![item("x", "Tea")],
            completed_items: Vec::new(),
            favorite_items: Vec::new(),
            next_item: None,
            loading: false,
        };

        let next = rehydrate(&prev, record);
        assert!(!next.loading);
        assert_eq!(next.pending, vec![item("x", "Tea")]);
        assert_eq!(next.rehydration, RehydrationStatus::Restored);
    }
}
