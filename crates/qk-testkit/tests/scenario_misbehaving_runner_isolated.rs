//! A runner whose callback panics loses its worker; the others keep going.

use std::collections::BTreeMap;
use std::sync::Arc;

use qk_events::names;
use qk_runtime::{Engine, RunnerState, TradingEngine};
use qk_testkit::{candle, PaperBackend, RecordingRunner};

#[tokio::test(flavor = "multi_thread")]
async fn panicking_runner_is_stopped_and_others_still_receive() {
    let engine = TradingEngine::builder("isolation", Arc::new(PaperBackend::new()))
        .build()
        .unwrap();
    let healthy = RecordingRunner::new("healthy");
    let log = healthy.log();
    engine
        .register_runner(RecordingRunner::new("faulty").panic_on_candle().boxed(), BTreeMap::new())
        .unwrap();
    engine.register_runner(healthy.boxed(), BTreeMap::new()).unwrap();
    engine.start();

    let publish = |ts| {
        let c = candle("BTC_USDT", ts, 1.0, 2.0);
        engine
            .publish(names::EVENT_CANDLE, serde_json::to_value(&c).unwrap())
            .unwrap();
    };

    publish(60);
    engine.flush().await;
    publish(120);
    engine.flush().await;

    assert_eq!(log.candles().len(), 2);
    assert_eq!(engine.runner_state("faulty"), Some(RunnerState::Stopped));
    assert_eq!(engine.runner_state("healthy"), Some(RunnerState::Running));

    engine.stop();
}
