//! Timers fire every N seconds while the engine runs and die with it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use qk_runtime::{Engine, TradingEngine};
use qk_testkit::{PaperBackend, RecordingRunner};

#[tokio::test(flavor = "multi_thread")]
async fn runner_timer_fires_only_after_start() {
    let engine = TradingEngine::builder("timers", Arc::new(PaperBackend::new()))
        .build()
        .unwrap();
    engine
        .register_runner(RecordingRunner::new("ticker").with_timer(1).boxed(), BTreeMap::new())
        .unwrap();
    assert_eq!(engine.active_timers(), 1);
    let params = engine.runner_params("ticker").unwrap();

    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(params.get_int("timer_hits"), 0, "engine not started");

    engine.start();
    tokio::time::sleep(Duration::from_millis(2400)).await;
    let hits = params.get_int("timer_hits");
    assert!(hits >= 1, "expected at least one firing, got {hits}");

    engine.stop();
    assert_eq!(engine.active_timers(), 0);
    let frozen = params.get_int("timer_hits");
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(params.get_int("timer_hits"), frozen);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_or_late_timers_are_ignored() {
    let engine = TradingEngine::builder("bad-timers", Arc::new(PaperBackend::new()))
        .build()
        .unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let bump = |hits: &Arc<AtomicUsize>| {
        let hits = hits.clone();
        Box::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    };

    engine.add_timer(0, bump(&hits));
    engine.add_timer(-5, bump(&hits));
    assert_eq!(engine.active_timers(), 0);

    engine.stop();
    engine.add_timer(1, bump(&hits));
    assert_eq!(engine.active_timers(), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
