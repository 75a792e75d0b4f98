use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use qk_model::{
    Account, Candle, Depth, Order, ParamData, ParamValue, Position, Ticker, Trade, TradeAction,
};
use qk_runtime::{Engine, Runner, RunnerError};

/// One callback as observed by a [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Tick(Ticker),
    Candle(Candle),
    Position(Position),
    Trade(Trade),
    Trades(Trade),
    Depth(Depth),
    Account(Account),
    Order(Order),
    Params(BTreeMap<String, ParamValue>),
}

/// Shared view of what a runner saw; clone it before handing the runner to
/// the engine.
#[derive(Debug, Clone, Default)]
pub struct RunnerLog(Arc<Mutex<Vec<Seen>>>);

impl RunnerLog {
    pub fn entries(&self) -> Vec<Seen> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn candles(&self) -> Vec<Candle> {
        self.0
            .lock()
            .iter()
            .filter_map(|s| match s {
                Seen::Candle(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, seen: Seen) {
        self.0.lock().push(seen);
    }
}

/// Configurable runner for scenarios.
///
/// Params it understands:
/// - `amount` (float): size used by `open_long_on_candle`, default 1.
///
/// Keys it writes into its own `ParamData`:
/// - `last_order_id`, `timer_hits`.
pub struct RecordingRunner {
    name: String,
    params: Arc<ParamData>,
    log: RunnerLog,
    engine: Option<Arc<dyn Engine>>,
    only_symbol: Option<String>,
    required: Vec<String>,
    open_long_on_candle: bool,
    panic_on_candle: bool,
    timer_secs: Option<i64>,
}

impl RecordingRunner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Arc::new(ParamData::new()),
            log: RunnerLog::default(),
            engine: None,
            only_symbol: None,
            required: Vec::new(),
            open_long_on_candle: false,
            panic_on_candle: false,
            timer_secs: None,
        }
    }

    pub fn log(&self) -> RunnerLog {
        self.log.clone()
    }

    /// Accept only events whose key is `symbol`.
    pub fn only_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.only_symbol = Some(symbol.into());
        self
    }

    /// Fail `init` unless `key` is among the initial params.
    pub fn require_param(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }

    /// Call `Engine::open_long` at the candle close for every candle.
    pub fn open_long_on_candle(mut self) -> Self {
        self.open_long_on_candle = true;
        self
    }

    /// Panic inside `on_candle`, killing the worker.
    pub fn panic_on_candle(mut self) -> Self {
        self.panic_on_candle = true;
        self
    }

    /// Register a timer in `init` that bumps `timer_hits`.
    pub fn with_timer(mut self, secs: i64) -> Self {
        self.timer_secs = Some(secs);
        self
    }

    pub fn boxed(self) -> Box<dyn Runner> {
        Box::new(self)
    }
}

impl Runner for RecordingRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(
        &mut self,
        engine: Arc<dyn Engine>,
        params: BTreeMap<String, ParamValue>,
    ) -> Result<(), RunnerError> {
        if let Some(missing) = self.required.iter().find(|k| !params.contains_key(*k)) {
            return Err(RunnerError::MissingParam {
                name: missing.clone(),
            });
        }
        self.params.extend(params);

        if let Some(secs) = self.timer_secs {
            let params = self.params.clone();
            engine.add_timer(
                secs,
                Box::new(move || {
                    let hits = params.get_int("timer_hits");
                    params.set("timer_hits", hits + 1);
                }),
            );
        }
        self.engine = Some(engine);
        Ok(())
    }

    fn param(&self) -> Arc<ParamData> {
        self.params.clone()
    }

    fn filter(&self, _name: &str, key: &str) -> bool {
        self.only_symbol.as_deref().map_or(true, |s| s == key)
    }

    fn on_tick(&mut self, tick: &Ticker) {
        self.log.push(Seen::Tick(tick.clone()));
    }

    fn on_candle(&mut self, candle: &Candle) {
        if self.panic_on_candle {
            panic!("{} refuses candles", self.name);
        }
        self.log.push(Seen::Candle(candle.clone()));

        if self.open_long_on_candle {
            let Some(engine) = &self.engine else {
                return;
            };
            let amount = match self.params.get_float("amount") {
                a if a > 0.0 => a,
                _ => 1.0,
            };
            let action = TradeAction::new(candle.symbol.clone(), candle.close, amount);
            if let Some(order) = engine.open_long(&action) {
                self.params.set("last_order_id", order.id);
            }
        }
    }

    fn on_position(&mut self, position: &Position) {
        self.log.push(Seen::Position(position.clone()));
    }

    fn on_trade(&mut self, trade: &Trade) {
        self.log.push(Seen::Trade(trade.clone()));
    }

    fn on_trades(&mut self, trade: &Trade) {
        self.log.push(Seen::Trades(trade.clone()));
    }

    fn on_depth(&mut self, depth: &Depth) {
        self.log.push(Seen::Depth(depth.clone()));
    }

    fn on_account(&mut self, account: &Account) {
        self.log.push(Seen::Account(account.clone()));
    }

    fn on_order(&mut self, order: &Order) {
        self.log.push(Seen::Order(order.clone()));
    }

    fn update_params(&mut self, values: BTreeMap<String, ParamValue>) {
        self.log.push(Seen::Params(values.clone()));
        self.params.extend(values);
    }
}
