use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use qk_model::{Account, Candle, Depth, Order, ParamData, ParamValue, Position, Ticker, Trade};

use crate::engine::Engine;
use crate::{RunnerError, StateError};

// ---------------------------------------------------------------------------
// Runner trait
// ---------------------------------------------------------------------------

/// A pluggable strategy driven by an [`Engine`].
///
/// The engine owns each runner on a dedicated worker task and never calls
/// two of its methods concurrently. Callbacks only arrive while the runner is
/// [`RunnerState::Running`].
pub trait Runner: Send {
    fn name(&self) -> &str;

    /// Called once at registration with the engine handle and the initial
    /// parameters. An error aborts the registration.
    fn init(
        &mut self,
        engine: Arc<dyn Engine>,
        params: BTreeMap<String, ParamValue>,
    ) -> Result<(), RunnerError>;

    /// The runner's live parameter store. Must return the same `Arc` on
    /// every call; the engine caches it after `init`.
    fn param(&self) -> Arc<ParamData>;

    /// Per-event subscription filter: `name` is the event name and `key` its
    /// routing key (usually the symbol). Defaults to accepting everything.
    fn filter(&self, _name: &str, _key: &str) -> bool {
        true
    }

    fn on_tick(&mut self, _tick: &Ticker) {}
    fn on_candle(&mut self, _candle: &Candle) {}
    fn on_position(&mut self, _position: &Position) {}
    /// Own fills (`event.trade`).
    fn on_trade(&mut self, _trade: &Trade) {}
    /// Public market trades (`event.trades`).
    fn on_trades(&mut self, _trade: &Trade) {}
    fn on_depth(&mut self, _depth: &Depth) {}
    fn on_account(&mut self, _account: &Account) {}
    fn on_order(&mut self, _order: &Order) {}

    /// Apply a live configuration change.
    fn update_params(&mut self, values: BTreeMap<String, ParamValue>) {
        self.param().extend(values);
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RunnerState {
    #[default]
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

impl RunnerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerState::Uninitialized => "uninitialized",
            RunnerState::Initialized => "initialized",
            RunnerState::Running => "running",
            RunnerState::Stopped => "stopped",
        }
    }

    /// Legal moves:
    ///
    /// | from          | to                   |
    /// |---------------|----------------------|
    /// | Uninitialized | Initialized, Stopped |
    /// | Initialized   | Running, Stopped     |
    /// | Running       | Stopped              |
    /// | Stopped       | (terminal)           |
    pub fn can_transition_to(&self, to: RunnerState) -> bool {
        use RunnerState::*;
        matches!(
            (self, to),
            (Uninitialized, Initialized)
                | (Uninitialized, Stopped)
                | (Initialized, Running)
                | (Initialized, Stopped)
                | (Running, Stopped)
        )
    }

    pub fn transition(self, to: RunnerState) -> Result<RunnerState, StateError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(StateError { from: self, to })
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunnerState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunnerState::Stopped)
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::RunnerState::*;
    use super::*;

    #[test]
    fn happy_path() {
        let s = Uninitialized.transition(Initialized).unwrap();
        let s = s.transition(Running).unwrap();
        assert!(s.is_running());
        let s = s.transition(Stopped).unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn illegal_moves_rejected() {
        assert_eq!(
            Uninitialized.transition(Running),
            Err(StateError { from: Uninitialized, to: Running })
        );
        assert!(Running.transition(Initialized).is_err());
        assert!(Running.transition(Running).is_err());
        for to in [Uninitialized, Initialized, Running, Stopped] {
            assert!(Stopped.transition(to).is_err(), "stopped -> {to} must fail");
        }
    }

    #[test]
    fn error_message_names_both_states() {
        let err = Stopped.transition(Running).unwrap_err();
        assert_eq!(err.to_string(), "illegal runner transition stopped -> running");
    }
}
