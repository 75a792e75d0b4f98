//! Runner primitives and control events reach the collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use qk_events::names;
use qk_model::{OrderStatus, ParamValue, TradeAction, TradeIntent};
use qk_runtime::{Engine, TradingEngine};
use qk_testkit::{
    candle, sym, PaperBackend, RecordingFeed, RecordingNotifier, RecordingRunner, SmaLibrary,
};
use serde_json::json;

#[tokio::test(flavor = "multi_thread")]
async fn runner_orders_go_to_the_backend() {
    let paper = Arc::new(PaperBackend::new());
    let engine = TradingEngine::builder("orders", paper.clone()).build().unwrap();

    let mut init = BTreeMap::new();
    init.insert("amount".to_string(), ParamValue::Float(0.25));
    engine
        .register_runner(RecordingRunner::new("buyer").open_long_on_candle().boxed(), init)
        .unwrap();
    engine.start();

    engine.on_candle(&candle("BTC_USDT", 60, 100.0, 101.0));
    engine.flush().await;

    let orders = paper.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, "ORD-000001");
    assert_eq!(orders[0].price, 101.0);
    assert_eq!(orders[0].amount, 0.25);
    assert_eq!(
        engine.runner_params("buyer").unwrap().get_string("last_order_id"),
        "ORD-000001"
    );
    assert_eq!(paper.submissions()[0].0, TradeIntent::OpenLong);

    engine.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn trade_action_and_cancel_events() {
    let paper = Arc::new(PaperBackend::new());
    let engine = TradingEngine::builder("control", paper.clone()).build().unwrap();

    engine
        .publish(
            names::EVENT_TRADE_ACTION,
            json!({"symbol": "BTC_USDT", "price": 99.0, "amount": 1.0, "intent": "close_long"}),
        )
        .unwrap();
    engine
        .publish(
            names::EVENT_TRADE_ACTION,
            json!({"symbol": "ETH_USDT", "price": 10.0, "amount": 2.0, "intent": "open_short"}),
        )
        .unwrap();
    // no intent: ignored
    engine
        .publish(names::EVENT_TRADE_ACTION, json!({"symbol": "BTC_USDT", "amount": 1.0}))
        .unwrap();

    let intents: Vec<TradeIntent> = paper.submissions().iter().map(|(i, _)| *i).collect();
    assert_eq!(intents, [TradeIntent::CloseLong, TradeIntent::OpenShort]);

    engine
        .publish(
            names::EVENT_ORDER_CANCEL,
            json!({"symbol": "BTC_USDT", "order_id": "ORD-000001"}),
        )
        .unwrap();
    assert_eq!(paper.order("ORD-000001").unwrap().status, OrderStatus::Canceled);
    assert_eq!(paper.order("ORD-000002").unwrap().status, OrderStatus::New);

    engine
        .publish(names::EVENT_ORDER_CANCEL_ALL, json!({"symbol": ""}))
        .unwrap();
    assert_eq!(paper.cancel_all_calls(), 1);
    assert_eq!(paper.order("ORD-000002").unwrap().status, OrderStatus::Canceled);

    // direct primitives
    let btc = sym("BTC_USDT");
    assert!(engine.get_order(&TradeAction::for_order(btc.clone(), "ORD-000002")).is_some());
    assert!(engine.get_order(&TradeAction::for_order(btc.clone(), "ORD-404")).is_none());
    assert!(!engine.cancel_order(&TradeAction::for_order(btc.clone(), "ORD-404")));
    assert!(engine.stop_short(&TradeAction::new(btc.clone(), 1.0, 0.0)).is_none(), "zero amount");
    assert!(engine.close_short(&TradeAction::new(btc, 1.0, 1.0)).is_some());

    engine.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn risk_limits_notify_and_watch() {
    let notifier = Arc::new(RecordingNotifier::new());
    let feed = Arc::new(RecordingFeed::new().rejecting("orderbook_l3"));
    let engine = TradingEngine::builder("ops", Arc::new(PaperBackend::new()))
        .with_notifier(notifier.clone())
        .with_feed(feed.clone())
        .build()
        .unwrap();

    for limit in [
        json!({"code": "BTC_USDT", "lever": 3.0, "max_lost_ratio": 0.1}),
        json!({"code": "BTC_USDT", "lever": 3.0, "max_lost_ratio": 0.2}),
        json!({"lever": 1.0, "max_lost_ratio": 0.05}),
    ] {
        engine.publish(names::EVENT_RISK_LIMIT, limit).unwrap();
    }
    assert_eq!(engine.risk_limits().len(), 2, "same code+lever replaces");
    assert_eq!(engine.risk_limit("BTC_USDT-3.00").unwrap().max_lost_ratio, 0.2);
    assert!(engine.risk_limit("-1.00").unwrap().is_global());

    engine
        .publish(names::EVENT_NOTIFY, json!({"content": "hello"}))
        .unwrap();
    engine.send_notify("**bold**", "markdown");
    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].content_type, "text");
    assert_eq!(sent[1].content_type, "markdown");

    engine
        .publish(names::EVENT_WATCH, json!({"type": "depth", "param": {"level": 20}}))
        .unwrap();
    engine.watch("trades");
    engine.watch("orderbook_l3");
    let watched: Vec<String> = engine.watches().into_iter().map(|w| w.watch_type).collect();
    assert_eq!(watched, ["depth", "trades"]);
    assert_eq!(feed.subscribed().len(), 2);

    // candle history queries are logged only
    engine
        .publish(
            names::EVENT_CANDLE_PARAM,
            json!({
                "start": "2024-01-01T00:00:00Z", "end": "2024-01-02T00:00:00Z",
                "exchange": "binance", "bin_size": "1h", "symbol": "BTC_USDT"
            }),
        )
        .unwrap();
    // an unparseable bin size is still a well-formed event; it is only logged
    engine
        .publish(
            names::EVENT_CANDLE_PARAM,
            json!({
                "start": "2024-01-01T00:00:00Z", "end": "2024-01-02T00:00:00Z",
                "exchange": "binance", "bin_size": "fortnight", "symbol": "BTC_USDT"
            }),
        )
        .unwrap();
    assert_eq!(engine.risk_limits().len(), 2);

    engine.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn indicators_and_tags() {
    let engine = TradingEngine::builder("ind", Arc::new(PaperBackend::new()))
        .with_indicators(Arc::new(SmaLibrary))
        .with_tag("exchange", "binance")
        .build()
        .unwrap();

    let mut sma = engine.add_indicator("SMA", &[2]).unwrap();
    sma.update(1.0);
    sma.update(3.0);
    assert_eq!(sma.value(), 2.0);
    assert!(engine.add_indicator("EMA", &[2]).is_none());

    assert!(engine.filter("exchange", "binance"));
    assert!(!engine.filter("exchange", "okx"));
    assert!(engine.filter("region", "anything"), "absent tag passes filter");
    assert!(engine.check("exchange", "binance"));
    assert!(!engine.check("region", "anything"), "absent tag fails check");

    engine.log(format_args!("indicator ready: {}", sma.value()));
    engine.stop();

    let bare = TradingEngine::builder("bare", Arc::new(PaperBackend::new()))
        .build()
        .unwrap();
    assert!(bare.add_indicator("SMA", &[2]).is_none());
    bare.send_notify("dropped", "text");
    bare.stop();
}
