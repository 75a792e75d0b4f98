//! Deterministic in-memory execution backend.
//!
//! - Order ids are sequential: `ORD-000001`, `ORD-000002`, ...
//! - Orders are accepted as `New` and never fill on their own; call
//!   [`PaperBackend::fill`] to simulate a fill.
//! - No randomness, no clock: `timestamp` is the submission sequence number.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use qk_model::{Order, OrderStatus, Side, TradeAction, TradeIntent};
use qk_runtime::{BackendError, ExecutionBackend};

#[derive(Debug, Default)]
struct PaperState {
    seq: u64,
    /// Keyed by order id; BTreeMap keeps listings stable.
    orders: BTreeMap<String, Order>,
    submissions: Vec<(TradeIntent, TradeAction)>,
    cancel_all_calls: usize,
}

#[derive(Debug, Default)]
pub struct PaperBackend {
    state: Mutex<PaperState>,
}

impl PaperBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.state.lock().orders.values().cloned().collect()
    }

    pub fn order(&self, id: &str) -> Option<Order> {
        self.state.lock().orders.get(id).cloned()
    }

    /// Every accepted submission, in order.
    pub fn submissions(&self) -> Vec<(TradeIntent, TradeAction)> {
        self.state.lock().submissions.clone()
    }

    pub fn cancel_all_calls(&self) -> usize {
        self.state.lock().cancel_all_calls
    }

    /// Mark an open order fully filled. Returns `false` if unknown or closed.
    pub fn fill(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        match state.orders.get_mut(id) {
            Some(order) if order.is_open() => {
                order.filled = order.amount;
                order.status = OrderStatus::Filled;
                true
            }
            _ => false,
        }
    }
}

fn side_of(intent: TradeIntent) -> Side {
    match intent {
        TradeIntent::OpenLong | TradeIntent::CloseShort | TradeIntent::StopShort => Side::Buy,
        TradeIntent::OpenShort | TradeIntent::CloseLong | TradeIntent::StopLong => Side::Sell,
    }
}

fn order_id_of(action: &TradeAction) -> Result<&str, BackendError> {
    action
        .order_id
        .as_deref()
        .ok_or_else(|| BackendError::Rejected("order_id is required".to_string()))
}

impl ExecutionBackend for PaperBackend {
    fn submit(&self, intent: TradeIntent, action: &TradeAction) -> Result<Order, BackendError> {
        if action.symbol.is_empty() {
            return Err(BackendError::Rejected("symbol is empty".to_string()));
        }
        if action.amount.is_nan() || action.amount <= 0.0 {
            return Err(BackendError::Rejected(format!(
                "amount must be positive, got {}",
                action.amount
            )));
        }

        let mut state = self.state.lock();
        state.seq += 1;
        let order = Order {
            id: format!("ORD-{:06}", state.seq),
            symbol: action.symbol.clone(),
            side: side_of(intent),
            price: action.price,
            amount: action.amount,
            filled: 0.0,
            status: OrderStatus::New,
            timestamp: state.seq as i64,
        };
        state.orders.insert(order.id.clone(), order.clone());
        state.submissions.push((intent, action.clone()));
        Ok(order)
    }

    fn get_order(&self, action: &TradeAction) -> Result<Order, BackendError> {
        let id = order_id_of(action)?;
        self.order(id)
            .ok_or_else(|| BackendError::NotFound(format!("order {id}")))
    }

    fn cancel_order(&self, action: &TradeAction) -> Result<bool, BackendError> {
        let id = order_id_of(action)?;
        let mut state = self.state.lock();
        let order = state
            .orders
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(format!("order {id}")))?;
        if !order.is_open() {
            return Ok(false);
        }
        order.status = OrderStatus::Canceled;
        Ok(true)
    }

    fn cancel_all(&self, action: &TradeAction) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.cancel_all_calls += 1;
        for order in state.orders.values_mut() {
            let in_scope = action.symbol.is_empty() || order.symbol == action.symbol;
            if in_scope && order.is_open() {
                order.status = OrderStatus::Canceled;
            }
        }
        Ok(())
    }
}
