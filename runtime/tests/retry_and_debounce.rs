//! Integration tests for retry backoff bounds and debounce coalescing through the public API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use basket_core::effect::{Effect, EffectId};
use basket_core::reducer::Reducer;
use basket_core::{smallvec, SmallVec};
use basket_runtime::{RetryPolicy, Store};
use proptest::prelude::*;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("basket_runtime=trace")
        .try_init();
}

proptest! {
    #[test]
    fn delay_never_exceeds_max_delay(attempt in 0u32..20, initial_ms in 1u64..500, max_ms in 1u64..5_000) {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(initial_ms))
            .with_max_delay(Duration::from_millis(max_ms));

        let delay = policy.delay_for_attempt(attempt);
        prop_assert!(delay <= Duration::from_millis(max_ms));
    }

    #[test]
    fn delay_keeps_at_least_half_of_base(attempt in 0u32..4) {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(60));

        let base = 0.1 * 2f64.powi(i32::try_from(attempt).unwrap());
        let delay = policy.delay_for_attempt(attempt).as_secs_f64();
        prop_assert!(delay >= base * 0.5 - 1e-9);
        prop_assert!(delay <= base + 1e-9);
    }
}

#[test]
fn should_retry_respects_max_attempts() {
    let policy = RetryPolicy::new().with_max_attempts(3);
    assert!(policy.should_retry(1));
    assert!(policy.should_retry(2));
    assert!(!policy.should_retry(3));
    assert!(!RetryPolicy::no_retry().should_retry(1));
}

#[derive(Clone)]
struct Recorder;

#[derive(Clone, Debug)]
enum Msg {
    Edit(u32),
    Write(u32),
}

impl Reducer for Recorder {
    type State = Vec<u32>;
    type Action = Msg;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Vec<u32>,
        action: Msg,
        _env: &(),
    ) -> SmallVec<[Effect<Msg>; 4]> {
        match action {
            Msg::Edit(n) => smallvec![Effect::Delay {
                duration: Duration::ZERO,
                action: Box::new(Msg::Write(n)),
            }
            .debounced(EffectId::new("write"), Duration::from_millis(500))],
            Msg::Write(n) => {
                state.push(n);
                SmallVec::new()
            },
        }
    }
}

#[tokio::test(start_paused = true)]
async fn debounce_writes_only_latest_value() {
    init_tracing();
    let store = Store::new(Vec::new(), Recorder, ());

    for n in 1..=4 {
        store.send(Msg::Edit(n)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(store.state(Vec::clone).await, vec![4]);
}

#[tokio::test(start_paused = true)]
async fn flush_all_then_shutdown_loses_nothing() {
    init_tracing();
    let store = Store::new(Vec::new(), Recorder, ());

    let mut handle = store.send(Msg::Edit(7)).await.unwrap();
    assert_eq!(store.flush_all_debounced(), 1);
    handle.wait().await;
    store.shutdown(Duration::from_secs(1)).await.unwrap();

    assert_eq!(store.state(Vec::clone).await, vec![7]);
}

#[test]
fn store_works_under_block_on() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let _guard = rt.enter();
    let store = Store::new(Vec::new(), Recorder, ());

    tokio_test::block_on(async {
        store.send(Msg::Write(1)).await.unwrap();
    });
    let state = tokio_test::block_on(store.state(Vec::clone));
    assert_eq!(state, vec![1]);
}
