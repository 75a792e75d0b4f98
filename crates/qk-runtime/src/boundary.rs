//! Seams to the collaborators the engine drives but does not implement:
//! order execution, notification transport, parameter persistence, feed
//! subscription and the indicator library.
//!
//! Every trait is object safe and `Send + Sync`; the engine holds them as
//! `Arc<dyn ...>` and calls them from runner workers and timer tasks.

use qk_model::{NotifyEvent, Order, TradeAction, TradeIntent, WatchParam};

use crate::BackendError;

/// Order execution.
pub trait ExecutionBackend: Send + Sync {
    /// Submit one position primitive. Returns the order as acknowledged.
    fn submit(&self, intent: TradeIntent, action: &TradeAction) -> Result<Order, BackendError>;

    /// Look up an order by `action.order_id`.
    fn get_order(&self, action: &TradeAction) -> Result<Order, BackendError>;

    /// Cancel the order named by `action.order_id`. `Ok(false)` when the
    /// order exists but was no longer cancellable.
    fn cancel_order(&self, action: &TradeAction) -> Result<bool, BackendError>;

    /// Cancel every open order for `action.symbol` (all symbols when empty).
    fn cancel_all(&self, action: &TradeAction) -> Result<(), BackendError>;
}

/// Operator notification transport.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &NotifyEvent) -> Result<(), BackendError>;
}

/// Parameter persistence. `packed` is a `ParamData::pack` snapshot.
pub trait ParamSink: Send + Sync {
    fn save(&self, runner: &str, packed: &str) -> Result<(), BackendError>;
}

/// Market-data feed subscription (`Engine::watch`, `event.watch`).
pub trait FeedSubscriber: Send + Sync {
    fn subscribe(&self, watch: &WatchParam) -> Result<(), BackendError>;
}

/// A stateful computation over a price series.
pub trait Indicator: Send {
    fn update(&mut self, price: f64);

    /// Current output; `0.0` until enough samples were seen.
    fn value(&self) -> f64;
}

/// Builds indicators by name with integer parameters (e.g. `("SMA", [20])`).
pub trait IndicatorLibrary: Send + Sync {
    fn build(&self, name: &str, params: &[i64]) -> Result<Box<dyn Indicator>, BackendError>;
}
