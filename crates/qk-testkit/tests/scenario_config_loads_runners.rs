//! Engine config -> runner registry -> registered runners.

use std::sync::Arc;

use qk_config::EngineConfig;
use qk_model::{Param, ParamKind};
use qk_runtime::{Engine, HostError, RunnerMeta, RunnerRegistry, RunnerState, TradingEngine};
use qk_testkit::{PaperBackend, RecordingRunner};

const CONFIG: &str = r#"
engine:
  name: "desk-1"
  tags:
    exchange: "binance"
runners:
  - name: "grid-btc"
    strategy: "recording"
    params:
      symbol: "BTC_USDT"
      lever: 3
  - name: "grid-eth"
    strategy: "recording"
    enabled: false
    params:
      symbol: "ETH_USDT"
"#;

fn registry() -> RunnerRegistry {
    let mut reg = RunnerRegistry::new();
    reg.register(
        RunnerMeta::new("recording", "1.0.0", "records callbacks")
            .with_param(Param::new("symbol", ParamKind::String, "traded symbol"))
            .with_param(Param::new("lever", ParamKind::Int, "leverage")),
        |name| RecordingRunner::new(name).require_param("symbol").boxed(),
    )
    .unwrap();
    reg
}

#[tokio::test(flavor = "multi_thread")]
async fn enabled_runners_are_registered_with_their_params() {
    let loaded = EngineConfig::from_yaml_strings(&[CONFIG]).unwrap();
    let engine = TradingEngine::builder_from_config(&loaded.config, Arc::new(PaperBackend::new()))
        .build()
        .unwrap();
    assert_eq!(engine.name(), "desk-1");
    assert!(engine.check("exchange", "binance"));

    let names = engine.load_runners(&loaded.config, &registry()).unwrap();
    assert_eq!(names, ["grid-btc"]);
    assert_eq!(engine.runner_names(), ["grid-btc"]);
    assert_eq!(engine.runner_state("grid-btc"), Some(RunnerState::Initialized));

    let params = engine.runner_params("grid-btc").unwrap();
    assert_eq!(params.get_string("symbol"), "BTC_USDT");
    assert_eq!(params.get_int("lever"), 3);

    engine.start();
    assert_eq!(engine.runner_state("grid-btc"), Some(RunnerState::Running));
    engine.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_strategy_and_failed_init_abort_loading() {
    let overlay = r#"
runners:
  - name: "mystery"
    strategy: "does-not-exist"
"#;
    let loaded = EngineConfig::from_yaml_strings(&[CONFIG, overlay]).unwrap();
    let engine = TradingEngine::builder_from_config(&loaded.config, Arc::new(PaperBackend::new()))
        .build()
        .unwrap();
    let err = engine.load_runners(&loaded.config, &registry()).unwrap_err();
    assert!(matches!(
        err,
        HostError::UnknownStrategy { ref runner, ref strategy }
            if runner == "mystery" && strategy == "does-not-exist"
    ));

    let no_symbol = r#"
runners:
  - name: "bare"
    strategy: "recording"
"#;
    let loaded = EngineConfig::from_yaml_strings(&[CONFIG, no_symbol]).unwrap();
    let err = engine.load_runners(&loaded.config, &registry()).unwrap_err();
    assert!(matches!(err, HostError::RunnerInit { .. }));
    assert!(engine.runner_names().is_empty());
    engine.stop();
}
