//! Fan-out of decoded events to runner workers.
//!
//! Each registered runner gets a slot (state, params, queue sender) and a
//! worker task that owns the runner and drains an unbounded FIFO queue.
//! Delivery order per runner is enqueue order; runners run in parallel.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use qk_events::{names, Event, EventPayload};
use qk_model::{ParamData, ParamValue};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::runner::{Runner, RunnerState};
use crate::HostError;

pub(crate) type SharedState = Arc<Mutex<RunnerState>>;

pub(crate) enum Delivery {
    Event(Arc<Event>),
    UpdateParams {
        values: BTreeMap<String, ParamValue>,
        ack: oneshot::Sender<()>,
    },
    /// Acknowledged once everything queued before it was processed.
    Barrier(oneshot::Sender<()>),
}

struct RunnerSlot {
    name: String,
    state: SharedState,
    params: Arc<ParamData>,
    tx: Option<mpsc::UnboundedSender<Delivery>>,
}

impl RunnerSlot {
    fn mark_stopped(&self) {
        let mut state = self.state.lock();
        if let Ok(next) = state.transition(RunnerState::Stopped) {
            *state = next;
        }
    }

    /// Enqueue for the worker. A closed queue means the worker died; the
    /// slot is stopped so later deliveries are dropped up front.
    fn send(&self, delivery: Delivery) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        if tx.send(delivery).is_err() {
            warn!(runner = %self.name, "runner worker is gone; marking runner stopped");
            self.mark_stopped();
            return false;
        }
        true
    }
}

#[derive(Default)]
pub(crate) struct Dispatcher {
    /// Registration order.
    slots: RwLock<Vec<RunnerSlot>>,
}

impl Dispatcher {
    pub fn contains(&self, name: &str) -> bool {
        self.slots.read().iter().any(|s| s.name == name)
    }

    /// Add a slot for an initialized runner. The runner starts `Running`
    /// right away if the engine is already running.
    pub fn insert(
        &self,
        name: &str,
        params: Arc<ParamData>,
        tx: mpsc::UnboundedSender<Delivery>,
        engine_running: &AtomicBool,
    ) -> Result<SharedState, HostError> {
        let mut slots = self.slots.write();
        if slots.iter().any(|s| s.name == name) {
            return Err(HostError::DuplicateRunner {
                name: name.to_string(),
            });
        }

        let mut state = RunnerState::Uninitialized.transition(RunnerState::Initialized)?;
        if engine_running.load(Ordering::SeqCst) {
            state = state.transition(RunnerState::Running)?;
        }
        let state = Arc::new(Mutex::new(state));
        slots.push(RunnerSlot {
            name: name.to_string(),
            state: state.clone(),
            params,
            tx: Some(tx),
        });
        Ok(state)
    }

    /// Enqueue `event` for every running runner. Returns how many accepted it.
    pub fn broadcast(&self, event: Arc<Event>) -> usize {
        let slots = self.slots.read();
        let mut accepted = 0;
        for slot in slots.iter() {
            let state = *slot.state.lock();
            if !state.is_running() {
                warn!(
                    runner = %slot.name,
                    event = %event.name,
                    state = %state,
                    "runner not running; event dropped"
                );
                continue;
            }
            if slot.send(Delivery::Event(event.clone())) {
                accepted += 1;
            }
        }
        trace!(event = %event.name, runners = accepted, "event enqueued");
        accepted
    }

    pub fn send_to(&self, name: &str, delivery: Delivery) -> Result<(), HostError> {
        let slots = self.slots.read();
        let slot = slots
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| HostError::UnknownRunner {
                name: name.to_string(),
            })?;
        let stopped = slot.state.lock().is_terminal();
        if stopped || !slot.send(delivery) {
            return Err(HostError::RunnerStopped {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Initialized -> Running for every slot.
    pub fn start_all(&self) {
        for slot in self.slots.read().iter() {
            let mut state = slot.state.lock();
            if let Ok(next) = state.transition(RunnerState::Running) {
                *state = next;
            }
        }
    }

    /// Every slot -> Stopped; queues are closed so workers exit once they
    /// have dropped whatever was still queued.
    pub fn stop_all(&self) {
        for slot in self.slots.write().iter_mut() {
            slot.mark_stopped();
            slot.tx = None;
        }
    }

    /// One barrier per live worker.
    pub fn barriers(&self) -> Vec<oneshot::Receiver<()>> {
        let slots = self.slots.read();
        let mut out = Vec::with_capacity(slots.len());
        for slot in slots.iter() {
            let (ack, wait) = oneshot::channel();
            if slot.send(Delivery::Barrier(ack)) {
                out.push(wait);
            }
        }
        out
    }

    pub fn state(&self, name: &str) -> Option<RunnerState> {
        self.slots
            .read()
            .iter()
            .find(|s| s.name == name)
            .map(|s| *s.state.lock())
    }

    pub fn params(&self, name: &str) -> Option<Arc<ParamData>> {
        self.slots
            .read()
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.params.clone())
    }

    pub fn param_stores(&self) -> Vec<(String, Arc<ParamData>)> {
        self.slots
            .read()
            .iter()
            .map(|s| (s.name.clone(), s.params.clone()))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.slots.read().iter().map(|s| s.name.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Owns one runner until its queue closes.
pub(crate) async fn run_worker(
    mut runner: Box<dyn Runner>,
    state: SharedState,
    mut rx: mpsc::UnboundedReceiver<Delivery>,
) {
    let name = runner.name().to_string();
    while let Some(delivery) = rx.recv().await {
        match delivery {
            Delivery::Event(event) => {
                let current = *state.lock();
                if !current.is_running() {
                    warn!(
                        runner = %name,
                        event = %event.name,
                        state = %current,
                        "runner not running; event dropped"
                    );
                    continue;
                }
                if !runner.filter(&event.name, &event.key()) {
                    trace!(runner = %name, event = %event.name, "filtered out");
                    continue;
                }
                deliver(runner.as_mut(), &event);
            }
            Delivery::UpdateParams { values, ack } => {
                if state.lock().is_terminal() {
                    continue;
                }
                runner.update_params(values);
                let _ = ack.send(());
            }
            Delivery::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!(runner = %name, "runner worker exited");
}

fn deliver(runner: &mut dyn Runner, event: &Event) {
    match &event.payload {
        EventPayload::Candle(c) => runner.on_candle(c),
        EventPayload::Ticker(t) => runner.on_tick(t),
        EventPayload::Order(o) => runner.on_order(o),
        EventPayload::Trade(t) if event.name == names::EVENT_TRADES => runner.on_trades(t),
        EventPayload::Trade(t) => runner.on_trade(t),
        EventPayload::Position(p) => runner.on_position(p),
        EventPayload::Depth(d) => runner.on_depth(d),
        EventPayload::Account(a) => runner.on_account(a),
        other => {
            debug!(event = %event.name, shape = %other.shape(), "no runner callback for payload")
        }
    }
}
