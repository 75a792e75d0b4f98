use std::fmt;

use crate::runner::RunnerState;

// ---------------------------------------------------------------------------
// RunnerError
// ---------------------------------------------------------------------------

/// Returned by `Runner::init` when a runner refuses its initial parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunnerError {
    MissingParam { name: String },
    InvalidParam { name: String, reason: String },
    Other(String),
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParam { name } => write!(f, "missing required param '{name}'"),
            Self::InvalidParam { name, reason } => write!(f, "invalid param '{name}': {reason}"),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for RunnerError {}

// ---------------------------------------------------------------------------
// StateError
// ---------------------------------------------------------------------------

/// An illegal [`RunnerState`] transition was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateError {
    pub from: RunnerState,
    pub to: RunnerState,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal runner transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for StateError {}

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Failure reported by an external collaborator (execution backend,
/// notifier, param sink, feed subscriber, indicator library).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// The collaborator rejected the request (bad symbol, zero amount, ...).
    Rejected(String),
    /// Referenced order / feed / indicator does not exist.
    NotFound(String),
    /// Transport or I/O failure.
    Unavailable(String),
    /// The operation is not supported by this collaborator.
    Unsupported(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(msg) => write!(f, "rejected: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Unavailable(msg) => write!(f, "unavailable: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

// ---------------------------------------------------------------------------
// HostError
// ---------------------------------------------------------------------------

/// Errors returned by `TradingEngine` management operations.
#[derive(Debug)]
pub enum HostError {
    /// The engine was built outside a tokio runtime.
    NoRuntime,
    /// A runner with this name is already registered.
    DuplicateRunner { name: String },
    /// No runner with this name is registered.
    UnknownRunner { name: String },
    /// The runner has stopped (engine stopped, or its worker died).
    RunnerStopped { name: String },
    /// The engine was stopped; it cannot accept new runners.
    EngineStopped,
    /// `Runner::init` failed.
    RunnerInit { name: String, source: RunnerError },
    /// A configured strategy is not in the runner registry.
    UnknownStrategy { runner: String, strategy: String },
    State(StateError),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuntime => write!(f, "trading engine requires a tokio runtime"),
            Self::DuplicateRunner { name } => write!(f, "runner '{name}' is already registered"),
            Self::UnknownRunner { name } => write!(f, "no runner named '{name}' is registered"),
            Self::RunnerStopped { name } => write!(f, "runner '{name}' is stopped"),
            Self::EngineStopped => write!(f, "engine is stopped"),
            Self::RunnerInit { name, source } => {
                write!(f, "runner '{name}' failed to initialize: {source}")
            }
            Self::UnknownStrategy { runner, strategy } => {
                write!(f, "runner '{runner}': no strategy named '{strategy}' is registered")
            }
            Self::State(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RunnerInit { source, .. } => Some(source),
            Self::State(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StateError> for HostError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}
