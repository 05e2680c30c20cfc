//! Scripted grocery session.
//!
//! Restores the list from disk, runs through a short shopping trip and writes the
//! result back. Run it twice to see the list survive a restart.

use anyhow::Context;
use basket_core::environment::SystemClock;
use basket_runtime::metrics::MetricsRecorder;
use grocery_list::{
    JsonFileStore, ListConfig, ListName, ListState, ListStore, SwipeOutcome, Swipeable,
    UuidGenerator,
};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Row in the "to get" list; remembers that the user swiped it away
#[derive(Default)]
struct Row {
    swiped_away: bool,
}

impl Swipeable for Row {
    fn on_delete_intent(&mut self) {
        self.swiped_away = true;
    }
}

fn print_lists(state: &ListState) {
    println!("  To get:");
    for item in &state.pending {
        let star = if item.favorite { "*" } else { " " };
        println!("    [ ] {star} {}", item.name);
    }
    println!("  In the cart:");
    for item in &state.completed {
        let star = if item.favorite { "*" } else { " " };
        println!("    [x] {star} {}", item.name);
    }
    if state.can_offer_new_list() {
        println!("  (everything picked up, a new list can be started)");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("grocery_list=debug,basket_runtime=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ListConfig::from_env().context("invalid configuration")?;
    let mut metrics = MetricsRecorder::new();
    metrics.install().context("failed to install metrics recorder")?;

    tracing::info!(
        dir = %config.data_dir.display(),
        key = %config.storage_key,
        "Starting grocery list"
    );

    let storage = Arc::new(JsonFileStore::new(&config.data_dir));
    let store = ListStore::new(
        config.clone(),
        storage,
        Arc::new(UuidGenerator),
        Arc::new(SystemClock),
    );

    if let Err(error) = store.initialize().await {
        tracing::warn!(error = %error, "Continuing with the template list");
    }

    println!("=== Grocery List ===\n");
    print_lists(&store.snapshot().await);

    println!("\nAdding Eggs...");
    store.set_draft_text("Eggs").await?;
    let state = store.add_item().await?;

    if let Some(last) = state.pending.len().checked_sub(1) {
        println!("Putting '{}' in the cart...", state.pending[last].name);
        store.toggle_complete(ListName::Pending, last).await?;
        println!("Starring it...");
        store.toggle_favorite(ListName::Completed, 0).await?;
    }

    if let Some(first) = store.snapshot().await.pending.first() {
        println!("Swiping '{}' away...", first.name);
        let mut row = Row::default();
        let mut swipe = store.swipe_gesture();
        let distance = -config.swipe.viewport_width * 0.6;
        swipe.begin();
        if swipe.should_capture(distance) {
            swipe.drag(distance);
        }
        if swipe.release(distance) == SwipeOutcome::Delete
            && swipe.drive(&mut row)
            && row.swiped_away
        {
            store.delete_item(ListName::Pending, 0).await?;
        }
    }

    println!();
    print_lists(&store.snapshot().await);

    println!("\nStarting a new list from favorites...");
    let state = store.reset_list(true).await?;
    print_lists(&state);

    store
        .close(config.store.default_shutdown_timeout)
        .await
        .context("failed to save the list")?;

    let health = store.health();
    tracing::info!(status = %health.status, "Store closed");
    if let Some(text) = metrics.render() {
        tracing::debug!(bytes = text.len(), "metrics rendered");
    }

    Ok(())
}
