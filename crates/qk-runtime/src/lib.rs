//! qk-runtime
//!
//! The Engine/Runner contract and the engine that hosts runners.
//!
//! - [`Engine`]: primitives a runner may call (orders, indicators, timers,
//!   notifications, lifecycle).
//! - [`Runner`]: callbacks an engine delivers to a strategy, plus its
//!   lifecycle ([`RunnerState`]).
//! - [`TradingEngine`]: decodes events through `qk-events`, fans them out to
//!   one worker task per runner and forwards primitives to the boundary
//!   collaborators in [`boundary`].
//! - [`RunnerRegistry`]: strategy catalogue used to build runners from an
//!   `EngineConfig`.
//!
//! Availability over strictness: unknown events, undecodable payloads,
//! out-of-state deliveries and collaborator failures are logged and dropped.

pub mod boundary;
mod dispatch;
mod engine;
mod error;
mod host;
mod registry;
mod runner;
pub mod telemetry;
mod timer;

pub use boundary::{
    ExecutionBackend, FeedSubscriber, Indicator, IndicatorLibrary, Notifier, ParamSink,
};
pub use engine::{Engine, TimerFn};
pub use error::{BackendError, HostError, RunnerError, StateError};
pub use host::{
    TradingEngine, TradingEngineBuilder, ACTION_SAVE_PARAMS, ACTION_START, ACTION_STOP,
};
pub use registry::{RunnerFactory, RunnerMeta, RunnerRegistry, RunnerRegistryError};
pub use runner::{Runner, RunnerState};
