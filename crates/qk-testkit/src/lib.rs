//! qk-testkit
//!
//! In-memory collaborators for exercising `TradingEngine` end to end:
//!
//! - [`PaperBackend`]: deterministic execution backend (`ORD-000001`, ...).
//! - [`RecordingNotifier`], [`MemoryParamSink`], [`RecordingFeed`]: capture
//!   what the engine sends out.
//! - [`SmaLibrary`]: a one-indicator library.
//! - [`RecordingRunner`]: a configurable runner that logs every callback.
//!
//! Scenario tests live under `tests/`.

mod collaborators;
mod indicators;
mod paper;
mod runner;

pub use collaborators::{MemoryParamSink, RecordingFeed, RecordingNotifier};
pub use indicators::{Sma, SmaLibrary};
pub use paper::PaperBackend;
pub use runner::{RecordingRunner, RunnerLog, Seen};

use qk_model::{Candle, CurrencyPair};

/// Parse a symbol literal. Panics on malformed input; test use only.
pub fn sym(raw: &str) -> CurrencyPair {
    match raw.parse() {
        Ok(pair) => pair,
        Err(e) => panic!("bad test symbol {raw:?}: {e}"),
    }
}

/// One-minute candle with `high`/`low` spanning open and close.
pub fn candle(symbol: &str, timestamp: i64, open: f64, close: f64) -> Candle {
    Candle {
        symbol: sym(symbol),
        timestamp,
        interval: 60,
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        base_vol: 1.0,
        quote_vol: close,
    }
}
