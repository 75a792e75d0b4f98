use std::fmt;

use qk_model::{Candle, Order, TradeAction};

use crate::boundary::Indicator;

/// Timer callback registered through [`Engine::add_timer`].
pub type TimerFn = Box<dyn Fn() + Send + Sync + 'static>;

/// Capabilities a host exposes to its runners.
///
/// Runners receive an `Arc<dyn Engine>` in `Runner::init` and may call any
/// method from inside their callbacks or timers. Nothing here returns an
/// error: failures are logged by the engine and surface as `None` / `false`.
pub trait Engine: Send + Sync {
    fn open_long(&self, action: &TradeAction) -> Option<Order>;
    fn close_long(&self, action: &TradeAction) -> Option<Order>;
    fn open_short(&self, action: &TradeAction) -> Option<Order>;
    fn close_short(&self, action: &TradeAction) -> Option<Order>;
    fn stop_long(&self, action: &TradeAction) -> Option<Order>;
    fn stop_short(&self, action: &TradeAction) -> Option<Order>;

    fn get_order(&self, action: &TradeAction) -> Option<Order>;
    fn cancel_all_order(&self, action: &TradeAction);
    fn cancel_order(&self, action: &TradeAction) -> bool;

    /// Build a named indicator, e.g. `add_indicator("SMA", &[20])`.
    fn add_indicator(&self, name: &str, params: &[i64]) -> Option<Box<dyn Indicator>>;

    /// Log through the engine's span. Use with `format_args!`.
    fn log(&self, args: fmt::Arguments<'_>);

    /// Subscribe to an extra feed type.
    fn watch(&self, watch_type: &str);
    fn send_notify(&self, content: &str, content_type: &str);

    fn start(&self);
    fn stop(&self);
    fn save_params(&self);

    /// Call `timer` every `secs` seconds while the engine is running. The
    /// first call happens `secs` after registration.
    fn add_timer(&self, secs: i64, timer: TimerFn);

    /// Feed a candle into the engine as if it arrived on `event.candle`.
    fn on_candle(&self, candle: &Candle);

    /// `true` unless tag `key` is set to something other than `value`.
    fn filter(&self, key: &str, value: &str) -> bool;

    /// `true` only if tag `key` is set and equals `value`.
    fn check(&self, key: &str, value: &str) -> bool;
}
