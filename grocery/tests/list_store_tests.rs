//! Integration tests for the list store: rehydration, debounced persistence and the
//! operations the UI calls.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use basket_core::kv_store::KvStoreError;
use basket_runtime::{RetryPolicy, StoreConfig};
use basket_testing::{InMemoryKeyValueStore, SequentialIdGenerator, test_clock};
use grocery_list::{
    Item, ItemId, ListAction, ListConfig, ListError, ListName, ListStore, PersistedList,
    RehydrationStatus,
};
use std::sync::Arc;
use std::time::Duration;

const KEY: &str = "GROCERY_LIST";

fn config() -> ListConfig {
    ListConfig::default()
        .with_store_config(StoreConfig::default().with_retry_policy(RetryPolicy::no_retry()))
}

fn milk() -> Vec<Item> {
    vec![Item::new(ItemId::new("a"), "Milk")]
}

fn store_with(storage: &InMemoryKeyValueStore, seed: Vec<Item>) -> ListStore {
    ListStore::with_seed(
        config(),
        Arc::new(storage.clone()),
        Arc::new(SequentialIdGenerator::new("item")),
        Arc::new(test_clock()),
        seed,
    )
}

/// Lets the debounce window elapse
async fn settle() {
    tokio::time::sleep(Duration::from_millis(600)).await;
}

fn names(items: &[Item]) -> Vec<&str> {
    items.iter().map(|item| item.name.as_str()).collect()
}

fn stored(storage: &InMemoryKeyValueStore) -> PersistedList {
    PersistedList::decode(&storage.value(KEY).expect("record written")).unwrap()
}

#[tokio::test(start_paused = true)]
async fn shopping_trip_scenario() {
    let storage = InMemoryKeyValueStore::new();
    let store = store_with(&storage, milk());
    store.initialize().await.unwrap();

    store.set_draft_text("Eggs").await.unwrap();
    let state = store.add_item().await.unwrap();
    assert_eq!(names(&state.pending), vec!["Eggs", "Milk"]);
    assert!(state.draft_text.is_empty());

    let state = store.toggle_complete(ListName::Pending, 1).await.unwrap();
    assert_eq!(names(&state.pending), vec!["Eggs"]);
    assert_eq!(names(&state.completed), vec!["Milk"]);

    let state = store.toggle_favorite(ListName::Completed, 0).await.unwrap();
    assert!(state.completed[0].favorite);
    assert_eq!(state.favorites.len(), 1);
    assert_eq!(state.favorites[0].name, "Milk");
    assert!(state.favorites[0].favorite);

    let state = store.delete_item(ListName::Pending, 0).await.unwrap();
    assert!(state.pending.is_empty());

    let state = store.reset_list(true).await.unwrap();
    assert_eq!(names(&state.pending), vec!["Milk"]);
    assert!(state.pending[0].favorite);
    assert!(state.completed.is_empty());

    settle().await;
    assert_eq!(storage.write_count(), 1);
    let record = stored(&storage);
    assert_eq!(record, PersistedList::from_state(&state, true));
}

#[tokio::test(start_paused = true)]
async fn rapid_operations_coalesce_into_one_write() {
    let storage = InMemoryKeyValueStore::new();
    let store = store_with(&storage, milk());
    store.initialize().await.unwrap();

    for name in ["Eggs", "Bread", "Tea", "Jam"] {
        store.set_draft_text(name).await.unwrap();
        store.add_item().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    store.toggle_complete(ListName::Pending, 0).await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(storage.write_count(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(storage.write_count(), 1);

    let record = stored(&storage);
    assert_eq!(names(&record.items), vec!["Tea", "Bread", "Eggs", "Milk"]);
    assert_eq!(names(&record.completed_items), vec!["Jam"]);
    assert_eq!(storage.max_concurrent_writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn restores_persisted_list() {
    let raw = r#"{
        "items": [{"id": "x1", "name": "Tea", "favorite": true}],
        "completedItems": [{"id": "x2", "name": "Jam", "favorite": false}],
        "favoriteItems": [{"id": "x1", "name": "Tea", "favorite": true}],
        "nextItem": "Bre",
        "loading": false
    }"#;
    let storage = InMemoryKeyValueStore::new().with_entry(KEY, raw);
    let store = store_with(&storage, milk());

    store.initialize().await.unwrap();

    let state = store.snapshot().await;
    assert!(!state.loading);
    assert_eq!(state.rehydration, RehydrationStatus::Restored);
    assert_eq!(names(&state.pending), vec!["Tea"]);
    assert_eq!(names(&state.completed), vec!["Jam"]);
    assert_eq!(state.favorites.len(), 1);
    assert_eq!(state.draft_text, "Bre");
}

#[tokio::test(start_paused = true)]
async fn first_run_keeps_template_without_writing() {
    let storage = InMemoryKeyValueStore::new();
    let store = store_with(&storage, milk());

    store.initialize().await.unwrap();
    settle().await;

    let state = store.snapshot().await;
    assert_eq!(state.pending, milk());
    assert_eq!(state.rehydration, RehydrationStatus::Fresh);
    assert_eq!(storage.read_count(), 1);
    assert_eq!(storage.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn initialize_twice_reads_once() {
    let storage = InMemoryKeyValueStore::new();
    let store = store_with(&storage, milk());

    store.initialize().await.unwrap();
    store.initialize().await.unwrap();
    assert_eq!(storage.read_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn corrupted_record_falls_back_and_is_not_overwritten() {
    let storage = InMemoryKeyValueStore::new().with_entry(KEY, "{not json");
    let store = store_with(&storage, milk());

    let error = store.initialize().await.unwrap_err();
    assert!(matches!(error, ListError::Snapshot(_)));

    let state = store.snapshot().await;
    assert!(!state.loading);
    assert_eq!(state.pending, milk());
    assert_eq!(state.rehydration, RehydrationStatus::Failed);

    let state = store.toggle_complete(ListName::Pending, 0).await.unwrap();
    assert_eq!(names(&state.completed), vec!["Milk"]);
    settle().await;
    assert_eq!(storage.write_count(), 0);
    assert_eq!(storage.value(KEY).as_deref(), Some("{not json"));

    store.flush().await.unwrap();
    assert_eq!(storage.write_count(), 1);
    assert_eq!(names(&stored(&storage).completed_items), vec!["Milk"]);
    assert_eq!(store.snapshot().await.rehydration, RehydrationStatus::Fresh);
}

#[tokio::test(start_paused = true)]
async fn duplicate_ids_in_record_are_rejected() {
    let raw = r#"{
        "items": [{"id": "x1", "name": "Tea", "favorite": false}],
        "completedItems": [{"id": "x1", "name": "Tea", "favorite": false}]
    }"#;
    let storage = InMemoryKeyValueStore::new().with_entry(KEY, raw);
    let store = store_with(&storage, milk());

    assert!(matches!(
        store.initialize().await,
        Err(ListError::Snapshot(_))
    ));
    assert_eq!(store.snapshot().await.pending, milk());
}

#[tokio::test(start_paused = true)]
async fn read_failure_surfaces_and_can_be_retried() {
    let storage = InMemoryKeyValueStore::new();
    storage.fail_gets_with(KvStoreError::Io("disk offline".to_string()));
    let store = store_with(&storage, milk());

    let error = store.initialize().await.unwrap_err();
    assert!(matches!(error, ListError::Storage(_)));
    assert_eq!(store.snapshot().await.last_error, Some(error));

    storage.clear_get_failure();
    store.initialize().await.unwrap();

    let state = store.snapshot().await;
    assert_eq!(state.rehydration, RehydrationStatus::Fresh);
    assert_eq!(state.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn operations_are_rejected_while_loading() {
    let storage = InMemoryKeyValueStore::new().with_latency(Duration::from_secs(1));
    let store = Arc::new(store_with(&storage, milk()));

    let init = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.initialize().await })
    };
    while !store.snapshot().await.loading {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        store.set_draft_text("Eggs").await.unwrap_err(),
        ListError::NotReady
    );
    assert_eq!(store.add_item().await.unwrap_err(), ListError::NotReady);
    assert_eq!(
        store
            .toggle_complete(ListName::Pending, 0)
            .await
            .unwrap_err(),
        ListError::NotReady
    );

    init.await.unwrap().unwrap();

    let state = store.snapshot().await;
    assert!(!state.loading);
    assert_eq!(state.pending, milk());
    assert!(state.draft_text.is_empty());

    let state = store.toggle_complete(ListName::Pending, 0).await.unwrap();
    assert_eq!(names(&state.completed), vec!["Milk"]);
    assert_eq!(state.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn mutations_before_initialize_never_reach_storage() {
    let saved = PersistedList {
        items: vec![Item::new(ItemId::new("u1"), "Saffron")],
        completed_items: Vec::new(),
        favorite_items: Vec::new(),
        next_item: None,
        loading: false,
    };
    let storage =
        InMemoryKeyValueStore::new().with_entry(KEY, saved.to_json().unwrap());
    let store = store_with(&storage, milk());

    assert_eq!(
        store.delete_item(ListName::Pending, 0).await.unwrap_err(),
        ListError::NotReady
    );
    assert_eq!(
        store.set_draft_text("Eggs").await.unwrap_err(),
        ListError::NotReady
    );
    assert_eq!(store.flush().await.unwrap_err(), ListError::NotReady);
    settle().await;
    assert_eq!(storage.write_count(), 0);
    assert_eq!(store.snapshot().await.pending, milk());

    store.initialize().await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(names(&state.pending), vec!["Saffron"]);
    assert_eq!(state.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn retry_after_failed_read_keeps_edits() {
    let saved = PersistedList {
        items: vec![Item::new(ItemId::new("u1"), "Saffron")],
        completed_items: Vec::new(),
        favorite_items: Vec::new(),
        next_item: None,
        loading: false,
    };
    let storage =
        InMemoryKeyValueStore::new().with_entry(KEY, saved.to_json().unwrap());
    storage.fail_gets_with(KvStoreError::Io("disk offline".to_string()));
    let store = store_with(&storage, milk());

    assert!(matches!(
        store.initialize().await,
        Err(ListError::Storage(_))
    ));
    store.toggle_complete(ListName::Pending, 0).await.unwrap();

    storage.clear_get_failure();
    assert_eq!(
        store.initialize().await.unwrap_err(),
        ListError::UnsavedEdits
    );

    let state = store.snapshot().await;
    assert_eq!(names(&state.completed), vec!["Milk"]);
    assert!(state.pending.is_empty());
    assert_eq!(state.rehydration, RehydrationStatus::Failed);
    assert_eq!(storage.read_count(), 1);

    settle().await;
    assert_eq!(names(&stored(&storage).items), vec!["Saffron"]);

    store.flush().await.unwrap();
    assert_eq!(names(&stored(&storage).completed_items), vec!["Milk"]);
    assert!(!store.snapshot().await.held_edits);
}

#[tokio::test(start_paused = true)]
async fn bad_index_fails_without_touching_state() {
    let storage = InMemoryKeyValueStore::new();
    let store = store_with(&storage, milk());
    store.initialize().await.unwrap();

    let error = store
        .toggle_favorite(ListName::Completed, 0)
        .await
        .unwrap_err();
    assert_eq!(
        error,
        ListError::PreconditionViolation {
            list: ListName::Completed,
            index: 0,
            len: 0
        }
    );

    let state = store.snapshot().await;
    assert_eq!(state.pending, milk());
    assert!(state.favorites.is_empty());

    settle().await;
    assert_eq!(storage.write_count(), 0);

    let state = store.toggle_favorite(ListName::Pending, 0).await.unwrap();
    assert_eq!(state.rejection, None);
    assert_eq!(state.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn empty_add_is_ignored() {
    let storage = InMemoryKeyValueStore::new();
    let store = store_with(&storage, milk());
    store.initialize().await.unwrap();

    let state = store.add_item().await.unwrap();
    assert_eq!(state.pending, milk());

    settle().await;
    assert_eq!(storage.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn loading_is_never_persisted_true() {
    let storage = InMemoryKeyValueStore::new();
    let store = store_with(&storage, milk());
    store.initialize().await.unwrap();

    store.reset_list(false).await.unwrap();
    settle().await;

    let raw = storage.value(KEY).unwrap();
    assert!(raw.contains("\"loading\":false"));
    assert!(!raw.contains("\"loading\":true"));
}

#[tokio::test(start_paused = true)]
async fn close_writes_pending_change_then_stops() {
    let storage = InMemoryKeyValueStore::new();
    let store = store_with(&storage, milk());
    store.initialize().await.unwrap();

    store.set_draft_text("Eggs").await.unwrap();
    store.add_item().await.unwrap();
    assert_eq!(storage.write_count(), 0);

    store.close(Duration::from_secs(1)).await.unwrap();
    assert_eq!(storage.write_count(), 1);
    assert_eq!(names(&stored(&storage).items), vec!["Eggs", "Milk"]);

    assert!(matches!(store.add_item().await, Err(ListError::Store(_))));

    settle().await;
    assert_eq!(storage.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_write_is_surfaced_and_superseded() {
    let storage = InMemoryKeyValueStore::new();
    storage.fail_next_sets(
        1,
        KvStoreError::QuotaExceeded {
            needed: 128,
            available: 0,
        },
    );
    let store = store_with(&storage, milk());
    store.initialize().await.unwrap();

    store.toggle_complete(ListName::Pending, 0).await.unwrap();
    settle().await;

    let state = store.snapshot().await;
    assert!(matches!(state.last_error, Some(ListError::Storage(_))));
    assert_eq!(storage.write_count(), 0);
    assert!(store
        .health()
        .metadata
        .contains(&("dlq_size".to_string(), "1".to_string())));

    store.flush().await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.last_error, None);
    assert_eq!(state.last_saved_at, Some(basket_core::environment::Clock::now(&test_clock())));
    assert_eq!(storage.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn storage_events_are_observable() {
    let storage = InMemoryKeyValueStore::new();
    let store = store_with(&storage, milk());
    store.initialize().await.unwrap();

    let mut events = store.subscribe();
    store.delete_item(ListName::Pending, 0).await.unwrap();
    settle().await;

    assert_eq!(events.try_recv().unwrap(), ListAction::Persisted);
}

#[tokio::test(start_paused = true)]
async fn draft_survives_restart() {
    let storage = InMemoryKeyValueStore::new();
    {
        let store = store_with(&storage, milk());
        store.initialize().await.unwrap();
        store.set_draft_text("Jam").await.unwrap();
        settle().await;
        assert_eq!(stored(&storage).next_item.as_deref(), Some("Jam"));
    }

    let store = store_with(&storage, Vec::new());
    store.initialize().await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.draft_text, "Jam");
    assert_eq!(state.pending, milk());
}

#[tokio::test(start_paused = true)]
async fn draft_is_private_when_persistence_disabled() {
    let storage = InMemoryKeyValueStore::new();
    let store = ListStore::with_seed(
        config().with_persist_draft(false),
        Arc::new(storage.clone()),
        Arc::new(SequentialIdGenerator::new("item")),
        Arc::new(test_clock()),
        milk(),
    );
    store.initialize().await.unwrap();

    store.set_draft_text("secret").await.unwrap();
    settle().await;
    assert_eq!(storage.write_count(), 0);

    store.reset_list(false).await.unwrap();
    settle().await;
    assert!(!storage.value(KEY).unwrap().contains("nextItem"));
}
