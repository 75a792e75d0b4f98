//! `TradingEngine`: the concrete [`Engine`].
//!
//! Responsibilities:
//! - decode incoming `(name, payload)` pairs through the [`EventRegistry`];
//!   unknown names and bad payloads are logged and dropped;
//! - fan market events out to runner workers (see `dispatch`);
//! - handle control events (notify, action, watch, cancel, trade_action,
//!   risk_limit, candle_param) itself;
//! - forward runner primitives to the configured collaborators.
//!
//! Runners hold an `Arc<dyn Engine>` back to the engine, so the engine stays
//! alive until `stop()` closes the runner queues.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use qk_config::EngineConfig;
use qk_events::{names, DecodeError, Event, EventPayload, EventRegistry};
use qk_model::{
    Candle, CandleParam, EngineAction, NotifyEvent, Order, ParamData, ParamValue, RiskLimit,
    TradeAction, TradeIntent, WatchParam,
};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::boundary::{
    ExecutionBackend, FeedSubscriber, Indicator, IndicatorLibrary, Notifier, ParamSink,
};
use crate::dispatch::{run_worker, Delivery, Dispatcher};
use crate::engine::{Engine, TimerFn};
use crate::registry::RunnerRegistry;
use crate::runner::{Runner, RunnerState};
use crate::timer::TimerSet;
use crate::HostError;

pub const ACTION_START: &str = "start";
pub const ACTION_STOP: &str = "stop";
pub const ACTION_SAVE_PARAMS: &str = "save_params";

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct TradingEngineBuilder {
    name: String,
    backend: Arc<dyn ExecutionBackend>,
    notifier: Option<Arc<dyn Notifier>>,
    param_sink: Option<Arc<dyn ParamSink>>,
    feed: Option<Arc<dyn FeedSubscriber>>,
    indicators: Option<Arc<dyn IndicatorLibrary>>,
    tags: BTreeMap<String, String>,
    registry: Option<EventRegistry>,
    span: Option<Span>,
}

impl TradingEngineBuilder {
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_param_sink(mut self, sink: Arc<dyn ParamSink>) -> Self {
        self.param_sink = Some(sink);
        self
    }

    pub fn with_feed(mut self, feed: Arc<dyn FeedSubscriber>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_indicators(mut self, library: Arc<dyn IndicatorLibrary>) -> Self {
        self.indicators = Some(library);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Replace the standard event registry.
    pub fn with_registry(mut self, registry: EventRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Parent span for everything the engine logs. Defaults to
    /// `engine{module="quant/runtime", engine=<name>}`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Must be called inside a tokio runtime; workers and timers are spawned
    /// on it.
    pub fn build(self) -> Result<Arc<TradingEngine>, HostError> {
        let runtime = Handle::try_current().map_err(|_| HostError::NoRuntime)?;
        let span = self.span.unwrap_or_else(|| {
            info_span!("engine", module = "quant/runtime", engine = %self.name)
        });
        let registry = self.registry.unwrap_or_default();

        Ok(Arc::new_cyclic(|me| TradingEngine {
            me: me.clone(),
            name: self.name,
            runtime,
            span,
            registry,
            tags: self.tags,
            backend: self.backend,
            notifier: self.notifier,
            param_sink: self.param_sink,
            feed: self.feed,
            indicators: self.indicators,
            dispatcher: Dispatcher::default(),
            timers: TimerSet::default(),
            running: Arc::new(AtomicBool::new(false)),
            stopped: AtomicBool::new(false),
            risk_limits: RwLock::new(BTreeMap::new()),
            watches: RwLock::new(Vec::new()),
        }))
    }
}

// ---------------------------------------------------------------------------
// TradingEngine
// ---------------------------------------------------------------------------

pub struct TradingEngine {
    me: Weak<TradingEngine>,
    name: String,
    runtime: Handle,
    span: Span,
    registry: EventRegistry,
    tags: BTreeMap<String, String>,
    backend: Arc<dyn ExecutionBackend>,
    notifier: Option<Arc<dyn Notifier>>,
    param_sink: Option<Arc<dyn ParamSink>>,
    feed: Option<Arc<dyn FeedSubscriber>>,
    indicators: Option<Arc<dyn IndicatorLibrary>>,
    dispatcher: Dispatcher,
    timers: TimerSet,
    running: Arc<AtomicBool>,
    stopped: AtomicBool,
    /// Keyed by `RiskLimit::key()`.
    risk_limits: RwLock<BTreeMap<String, RiskLimit>>,
    watches: RwLock<Vec<WatchParam>>,
}

impl TradingEngine {
    pub fn builder(name: impl Into<String>, backend: Arc<dyn ExecutionBackend>) -> TradingEngineBuilder {
        TradingEngineBuilder {
            name: name.into(),
            backend,
            notifier: None,
            param_sink: None,
            feed: None,
            indicators: None,
            tags: BTreeMap::new(),
            registry: None,
            span: None,
        }
    }

    /// Builder seeded with the `engine:` section (name and tags).
    pub fn builder_from_config(
        config: &EngineConfig,
        backend: Arc<dyn ExecutionBackend>,
    ) -> TradingEngineBuilder {
        Self::builder(config.engine.name.clone(), backend).with_tags(config.engine.tags.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Runner management
    // -----------------------------------------------------------------------

    /// Initialize `runner` with `params` and give it a worker. The runner is
    /// `Initialized` until `start`, or `Running` at once if the engine
    /// already runs.
    pub fn register_runner(
        &self,
        mut runner: Box<dyn Runner>,
        params: BTreeMap<String, ParamValue>,
    ) -> Result<(), HostError> {
        let name = runner.name().to_string();
        if self.is_stopped() {
            return Err(HostError::EngineStopped);
        }
        if self.dispatcher.contains(&name) {
            return Err(HostError::DuplicateRunner { name });
        }
        let engine: Arc<dyn Engine> = self.me.upgrade().ok_or(HostError::EngineStopped)?;

        if let Err(source) = runner.init(engine, params) {
            error!(parent: &self.span, runner = %name, error = %source, "runner init failed");
            return Err(HostError::RunnerInit { name, source });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let state = self
            .dispatcher
            .insert(&name, runner.param(), tx, &self.running)?;
        let initial = *state.lock();
        self.runtime
            .spawn(run_worker(runner, state, rx).instrument(self.span.clone()));

        info!(parent: &self.span, runner = %name, state = %initial, "runner registered");
        Ok(())
    }

    /// Instantiate and register every enabled runner in `config`. Returns
    /// the names registered, in config order. Stops at the first failure.
    pub fn load_runners(
        &self,
        config: &EngineConfig,
        runners: &RunnerRegistry,
    ) -> Result<Vec<String>, HostError> {
        let mut loaded = Vec::new();
        for rc in &config.runners {
            if !rc.enabled {
                info!(parent: &self.span, runner = %rc.name, "runner disabled in config; skipped");
                continue;
            }
            let unknown = || HostError::UnknownStrategy {
                runner: rc.name.clone(),
                strategy: rc.strategy.clone(),
            };
            let meta = runners.lookup(&rc.strategy).map_err(|_| unknown())?;

            let missing = meta.missing_params(&rc.params);
            if !missing.is_empty() {
                warn!(parent: &self.span, runner = %rc.name, ?missing, "declared params missing");
            }
            let mistyped = meta.mistyped_params(&rc.params);
            if !mistyped.is_empty() {
                warn!(parent: &self.span, runner = %rc.name, ?mistyped, "declared params have unexpected kind");
            }

            let runner = runners
                .instantiate(&rc.strategy, &rc.name)
                .map_err(|_| unknown())?;
            self.register_runner(runner, rc.params.clone())?;
            loaded.push(rc.name.clone());
        }
        Ok(loaded)
    }

    /// Apply a live parameter change through the runner's `update_params`,
    /// in order with its queued events. Resolves once applied.
    pub async fn update_params(
        &self,
        runner: &str,
        values: BTreeMap<String, ParamValue>,
    ) -> Result<(), HostError> {
        let (ack, applied) = oneshot::channel();
        self.dispatcher
            .send_to(runner, Delivery::UpdateParams { values, ack })?;
        applied.await.map_err(|_| HostError::RunnerStopped {
            name: runner.to_string(),
        })?;
        info!(parent: &self.span, runner, "runner params updated");
        Ok(())
    }

    /// Wait until every live runner has processed everything enqueued
    /// before this call.
    pub async fn flush(&self) {
        for barrier in self.dispatcher.barriers() {
            let _ = barrier.await;
        }
    }

    pub fn runner_params(&self, runner: &str) -> Option<Arc<ParamData>> {
        self.dispatcher.params(runner)
    }

    pub fn runner_state(&self, runner: &str) -> Option<RunnerState> {
        self.dispatcher.state(runner)
    }

    /// Registration order.
    pub fn runner_names(&self) -> Vec<String> {
        self.dispatcher.names()
    }

    pub fn risk_limits(&self) -> Vec<RiskLimit> {
        self.risk_limits.read().values().cloned().collect()
    }

    pub fn risk_limit(&self, key: &str) -> Option<RiskLimit> {
        self.risk_limits.read().get(key).cloned()
    }

    pub fn watches(&self) -> Vec<WatchParam> {
        self.watches.read().clone()
    }

    pub fn active_timers(&self) -> usize {
        self.timers.active()
    }

    // -----------------------------------------------------------------------
    // Inbound events
    // -----------------------------------------------------------------------

    /// Decode `payload` as event `name` and handle it. Failures are logged
    /// and dropped; the error is returned for callers that count them.
    pub fn publish(&self, name: &str, payload: Value) -> Result<(), DecodeError> {
        match self.registry.decode(name, payload) {
            Ok(event) => {
                self.handle_event(event);
                Ok(())
            }
            Err(err) => Err(self.drop_undecodable(err)),
        }
    }

    /// As [`publish`](Self::publish), from raw JSON text.
    pub fn publish_str(&self, name: &str, raw: &str) -> Result<(), DecodeError> {
        match self.registry.decode_str(name, raw) {
            Ok(event) => {
                self.handle_event(event);
                Ok(())
            }
            Err(err) => Err(self.drop_undecodable(err)),
        }
    }

    fn drop_undecodable(&self, err: DecodeError) -> DecodeError {
        match &err {
            DecodeError::UnknownEvent { name } => {
                warn!(parent: &self.span, event = %name, "unknown event; dropped")
            }
            DecodeError::Payload { name, shape, source } => warn!(
                parent: &self.span,
                event = %name,
                shape = %shape,
                error = %source,
                "payload does not decode; dropped"
            ),
        }
        err
    }

    /// Route an already-decoded event. The name must be registered with the
    /// event's payload shape; otherwise the event is logged and dropped and
    /// `false` is returned.
    pub fn handle_event(&self, event: Event) -> bool {
        let shape = event.payload.shape();
        match self.registry.lookup(&event.name) {
            Ok(registered) if registered == shape => {}
            Ok(registered) => {
                warn!(
                    parent: &self.span,
                    event = %event.name,
                    registered = %registered,
                    shape = %shape,
                    "payload shape does not match registered shape; dropped"
                );
                return false;
            }
            Err(_) => {
                warn!(parent: &self.span, event = %event.name, "unknown event; dropped");
                return false;
            }
        }

        match &event.payload {
            EventPayload::Candle(_)
            | EventPayload::Ticker(_)
            | EventPayload::Order(_)
            | EventPayload::Trade(_)
            | EventPayload::Position(_)
            | EventPayload::Depth(_)
            | EventPayload::Account(_) => {
                self.dispatcher.broadcast(Arc::new(event));
            }
            EventPayload::Notify(notify) => self.notify(notify),
            EventPayload::EngineAction(action) => self.apply_action(action),
            EventPayload::WatchParam(watch) => self.add_watch(watch.clone()),
            EventPayload::TradeAction(action) => self.apply_trade_action(&event.name, action),
            EventPayload::RiskLimit(limit) => self.store_risk_limit(limit),
            EventPayload::CandleParam(query) => self.log_candle_query(query),
        }
        true
    }

    fn apply_action(&self, action: &EngineAction) {
        match action.action.as_str() {
            ACTION_START => self.start(),
            ACTION_STOP => self.stop(),
            ACTION_SAVE_PARAMS => self.save_params(),
            other => warn!(parent: &self.span, action = other, "unknown engine action; ignored"),
        }
    }

    fn apply_trade_action(&self, name: &str, action: &TradeAction) {
        match name {
            names::EVENT_ORDER_CANCEL => {
                self.cancel_order(action);
            }
            names::EVENT_ORDER_CANCEL_ALL => self.cancel_all_order(action),
            _ => match action.intent {
                Some(intent) => {
                    self.execute(intent, action);
                }
                None => warn!(
                    parent: &self.span,
                    event = name,
                    symbol = %action.symbol,
                    "trade action without intent; ignored"
                ),
            },
        }
    }

    fn store_risk_limit(&self, limit: &RiskLimit) {
        let key = limit.key();
        let previous = self.risk_limits.write().insert(key.clone(), limit.clone());
        info!(
            parent: &self.span,
            key = %key,
            global = limit.is_global(),
            lever = limit.lever,
            max_lost_ratio = limit.max_lost_ratio,
            replaced = previous.is_some_and(|p| p.same_scope(limit)),
            "risk limit updated"
        );
    }

    fn log_candle_query(&self, query: &CandleParam) {
        match query.expected_bins() {
            Ok(bins) => {
                info!(
                    parent: &self.span,
                    symbol = %query.symbol,
                    exchange = %query.exchange,
                    bin_size = %query.bin_size,
                    start = %query.start,
                    end = %query.end,
                    bins,
                    "candle history requested"
                );
            }
            Err(e) => {
                warn!(
                    parent: &self.span,
                    symbol = %query.symbol,
                    bin_size = %query.bin_size,
                    error = %e,
                    "candle history request has a bad bin size; ignored"
                );
            }
        }
    }

    fn add_watch(&self, watch: WatchParam) {
        if let Some(feed) = &self.feed {
            if let Err(e) = feed.subscribe(&watch) {
                warn!(parent: &self.span, watch = %watch.watch_type, error = %e, "feed subscribe failed");
                return;
            }
        }
        info!(parent: &self.span, watch = %watch.watch_type, "watch added");
        self.watches.write().push(watch);
    }

    fn notify(&self, event: &NotifyEvent) {
        let Some(notifier) = &self.notifier else {
            warn!(parent: &self.span, "no notifier configured; notification dropped");
            return;
        };
        if let Err(e) = notifier.notify(event) {
            warn!(parent: &self.span, content_type = %event.content_type, error = %e, "notify failed");
        }
    }

    fn execute(&self, intent: TradeIntent, action: &TradeAction) -> Option<Order> {
        match self.backend.submit(intent, action) {
            Ok(order) => {
                info!(
                    parent: &self.span,
                    intent = %intent,
                    exit = intent.is_exit(),
                    symbol = %action.symbol,
                    price = action.price,
                    amount = action.amount,
                    order_id = %order.id,
                    "order submitted"
                );
                Some(order)
            }
            Err(e) => {
                error!(
                    parent: &self.span,
                    intent = %intent,
                    symbol = %action.symbol,
                    error = %e,
                    "order submit failed"
                );
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Engine impl
// ---------------------------------------------------------------------------

impl Engine for TradingEngine {
    fn open_long(&self, action: &TradeAction) -> Option<Order> {
        self.execute(TradeIntent::OpenLong, action)
    }

    fn close_long(&self, action: &TradeAction) -> Option<Order> {
        self.execute(TradeIntent::CloseLong, action)
    }

    fn open_short(&self, action: &TradeAction) -> Option<Order> {
        self.execute(TradeIntent::OpenShort, action)
    }

    fn close_short(&self, action: &TradeAction) -> Option<Order> {
        self.execute(TradeIntent::CloseShort, action)
    }

    fn stop_long(&self, action: &TradeAction) -> Option<Order> {
        self.execute(TradeIntent::StopLong, action)
    }

    fn stop_short(&self, action: &TradeAction) -> Option<Order> {
        self.execute(TradeIntent::StopShort, action)
    }

    fn get_order(&self, action: &TradeAction) -> Option<Order> {
        match self.backend.get_order(action) {
            Ok(order) => Some(order),
            Err(e) => {
                warn!(parent: &self.span, order_id = ?action.order_id, error = %e, "get order failed");
                None
            }
        }
    }

    fn cancel_all_order(&self, action: &TradeAction) {
        match self.backend.cancel_all(action) {
            Ok(()) => info!(parent: &self.span, symbol = %action.symbol, "cancel all orders"),
            Err(e) => error!(parent: &self.span, symbol = %action.symbol, error = %e, "cancel all failed"),
        }
    }

    fn cancel_order(&self, action: &TradeAction) -> bool {
        match self.backend.cancel_order(action) {
            Ok(cancelled) => {
                info!(parent: &self.span, order_id = ?action.order_id, cancelled, "cancel order");
                cancelled
            }
            Err(e) => {
                error!(parent: &self.span, order_id = ?action.order_id, error = %e, "cancel order failed");
                false
            }
        }
    }

    fn add_indicator(&self, name: &str, params: &[i64]) -> Option<Box<dyn Indicator>> {
        let Some(library) = &self.indicators else {
            warn!(parent: &self.span, indicator = name, "no indicator library configured");
            return None;
        };
        match library.build(name, params) {
            Ok(indicator) => Some(indicator),
            Err(e) => {
                warn!(parent: &self.span, indicator = name, ?params, error = %e, "indicator build failed");
                None
            }
        }
    }

    fn log(&self, args: fmt::Arguments<'_>) {
        info!(parent: &self.span, "{}", args);
    }

    fn watch(&self, watch_type: &str) {
        self.add_watch(WatchParam::new(watch_type));
    }

    fn send_notify(&self, content: &str, content_type: &str) {
        self.notify(&NotifyEvent::new(content, content_type));
    }

    fn start(&self) {
        if self.is_stopped() {
            warn!(parent: &self.span, "engine already stopped; start ignored");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            debug!(parent: &self.span, "engine already running");
            return;
        }
        self.dispatcher.start_all();
        info!(parent: &self.span, runners = self.dispatcher.names().len(), "engine started");
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.running.store(false, Ordering::SeqCst);
        self.dispatcher.stop_all();
        self.timers.close();
        info!(parent: &self.span, "engine stopped");
    }

    fn save_params(&self) {
        let Some(sink) = &self.param_sink else {
            warn!(parent: &self.span, "no param sink configured; save skipped");
            return;
        };
        for (runner, params) in self.dispatcher.param_stores() {
            let packed = params.pack();
            if packed.is_empty() {
                warn!(parent: &self.span, runner = %runner, "params not representable as JSON; save skipped");
                continue;
            }
            match sink.save(&runner, &packed) {
                Ok(()) => debug!(parent: &self.span, runner = %runner, "params saved"),
                Err(e) => warn!(parent: &self.span, runner = %runner, error = %e, "params save failed"),
            }
        }
    }

    fn add_timer(&self, secs: i64, timer: TimerFn) {
        if secs <= 0 {
            warn!(parent: &self.span, secs, "timer interval must be positive; ignored");
            return;
        }
        let spawned = self.timers.spawn(
            &self.runtime,
            Duration::from_secs(secs.unsigned_abs()),
            timer,
            self.running.clone(),
            self.span.clone(),
        );
        if spawned {
            debug!(parent: &self.span, secs, "timer added");
        } else {
            warn!(parent: &self.span, secs, "engine stopped; timer ignored");
        }
    }

    fn on_candle(&self, candle: &Candle) {
        self.handle_event(Event::candle(candle.clone()));
    }

    fn filter(&self, key: &str, value: &str) -> bool {
        self.tags.get(key).map_or(true, |v| v == value)
    }

    fn check(&self, key: &str, value: &str) -> bool {
        self.tags.get(key).is_some_and(|v| v == value)
    }
}

impl fmt::Debug for TradingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradingEngine")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("running", &self.is_running())
            .field("stopped", &self.is_stopped())
            .field("runners", &self.dispatcher.names())
            .finish()
    }
}
