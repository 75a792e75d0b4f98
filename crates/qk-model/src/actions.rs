//! Command and control envelopes: what runners and operators ask the engine to do.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{parse_interval, CurrencyPair, ModelError};

/// The six position primitives an engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeIntent {
    OpenLong,
    CloseLong,
    OpenShort,
    CloseShort,
    StopLong,
    StopShort,
}

impl TradeIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeIntent::OpenLong => "open_long",
            TradeIntent::CloseLong => "close_long",
            TradeIntent::OpenShort => "open_short",
            TradeIntent::CloseShort => "close_short",
            TradeIntent::StopLong => "stop_long",
            TradeIntent::StopShort => "stop_short",
        }
    }

    /// `true` for intents that reduce or exit exposure.
    pub fn is_exit(&self) -> bool {
        !matches!(self, TradeIntent::OpenLong | TradeIntent::OpenShort)
    }
}

impl fmt::Display for TradeIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of a trading primitive.
///
/// `intent` is only read when the action arrives as an `event.trade_action`
/// command; the engine's typed methods (`open_long`, ...) ignore it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeAction {
    pub symbol: CurrencyPair,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<TradeIntent>,
    #[serde(default)]
    pub remark: String,
}

impl TradeAction {
    pub fn new(symbol: CurrencyPair, price: f64, amount: f64) -> Self {
        Self {
            symbol,
            price,
            amount,
            ..Self::default()
        }
    }

    pub fn for_order(symbol: CurrencyPair, order_id: impl Into<String>) -> Self {
        Self {
            symbol,
            order_id: Some(order_id.into()),
            ..Self::default()
        }
    }

    pub fn with_intent(mut self, intent: TradeIntent) -> Self {
        self.intent = Some(intent);
        self
    }
}

/// Operator / control command addressed to the engine (`start`, `stop`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineAction {
    pub action: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<CurrencyPair>,
}

/// Request to subscribe to an additional feed type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchParam {
    #[serde(rename = "type")]
    pub watch_type: String,
    #[serde(default)]
    pub param: BTreeMap<String, Value>,
}

impl WatchParam {
    pub fn new(watch_type: impl Into<String>) -> Self {
        Self {
            watch_type: watch_type.into(),
            param: BTreeMap::new(),
        }
    }
}

fn default_content_type() -> String {
    "text".to_string()
}

/// Operator notification; `content_type` is `"text"` or `"markdown"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyEvent {
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,
    pub content: String,
}

impl NotifyEvent {
    pub fn new(content: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(content, "text")
    }

    pub fn markdown(content: impl Into<String>) -> Self {
        Self::new(content, "markdown")
    }
}

/// Query for historical candles from an external data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleParam {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub exchange: String,
    /// Feed interval text, e.g. `"1m"`.
    pub bin_size: String,
    pub symbol: String,
}

impl CandleParam {
    pub fn bin_secs(&self) -> Result<i64, ModelError> {
        parse_interval(&self.bin_size)
    }

    /// Number of whole bins in `[start, end)`; 0 for an inverted range.
    pub fn expected_bins(&self) -> Result<i64, ModelError> {
        let span = (self.end - self.start).num_seconds();
        Ok((span / self.bin_secs()?).max(0))
    }
}

/// Leverage / loss-ratio constraint. An empty `code` scopes it globally.
///
/// Identity is `code + lever` ([`RiskLimit::key`]); `max_lost_ratio` is
/// payload, not identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskLimit {
    #[serde(default)]
    pub code: String,
    pub lever: f64,
    pub max_lost_ratio: f64,
}

impl RiskLimit {
    pub fn key(&self) -> String {
        format!("{}-{:.2}", self.code, self.lever)
    }

    pub fn is_global(&self) -> bool {
        self.code.is_empty()
    }

    pub fn same_scope(&self, other: &RiskLimit) -> bool {
        self.code == other.code && self.lever == other.lever
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn risk_limit_identity() {
        let a = RiskLimit {
            code: "BTC_USDT".into(),
            lever: 3.0,
            max_lost_ratio: 0.1,
        };
        let b = RiskLimit {
            max_lost_ratio: 0.5,
            ..a.clone()
        };
        let c = RiskLimit {
            lever: 5.0,
            ..a.clone()
        };
        assert!(a.same_scope(&b));
        assert!(!a.same_scope(&c));
        assert_eq!(a.key(), "BTC_USDT-3.00");
        assert_eq!(a.key(), b.key());

        let global = RiskLimit {
            code: String::new(),
            lever: 1.0,
            max_lost_ratio: 0.2,
        };
        assert!(global.is_global());
        assert_eq!(global.key(), "-1.00");
    }

    #[test]
    fn trade_action_intent_wire_form() {
        let a: TradeAction = serde_json::from_value(json!({
            "symbol": "BTC_USDT", "price": 100.0, "amount": 1.0, "intent": "close_short"
        }))
        .unwrap();
        assert_eq!(a.intent, Some(TradeIntent::CloseShort));
        assert!(a.intent.unwrap().is_exit());
        assert!(!TradeIntent::OpenLong.is_exit());
    }

    #[test]
    fn notify_defaults_to_text() {
        let n: NotifyEvent = serde_json::from_value(json!({"content": "hi"})).unwrap();
        assert_eq!(n, NotifyEvent::text("hi"));
    }

    #[test]
    fn candle_param_bins() {
        let p: CandleParam = serde_json::from_value(json!({
            "start": "2024-01-01T00:00:00Z",
            "end": "2024-01-01T01:00:00Z",
            "exchange": "binance",
            "bin_size": "5m",
            "symbol": "BTC_USDT"
        }))
        .unwrap();
        assert_eq!(p.bin_secs().unwrap(), 300);
        assert_eq!(p.expected_bins().unwrap(), 12);
    }
}
