//! qk-model
//!
//! Shared vocabulary exchanged between the trading engine and its runners.
//!
//! - Market data records: [`Candle`], [`Ticker`], [`Depth`], [`Trade`].
//! - Trading records: [`Order`], [`Position`], [`Account`].
//! - Command/event envelopes: [`TradeAction`], [`EngineAction`], [`WatchParam`],
//!   [`NotifyEvent`], [`CandleParam`], [`RiskLimit`].
//! - The per-runner dynamic parameter store: [`ParamData`].
//! - Candle aggregation: [`CandleList::merge`].
//!
//! Records are value objects. Nothing here performs IO; the only shared mutable
//! state is [`ParamData`], which synchronizes internally.

mod actions;
mod candle;
mod error;
mod params;
mod symbol;
mod trading;

pub use actions::*;
pub use candle::*;
pub use error::ModelError;
pub use params::*;
pub use symbol::*;
pub use trading::*;
