use std::fmt;

use qk_model::{
    Account, Candle, CandleParam, Depth, EngineAction, MsgCandle, NotifyEvent, Order, Position,
    RiskLimit, Ticker, Trade, TradeAction, WatchParam,
};
use serde::de::Error as _;
use serde_json::Value;

use crate::names;

// ---------------------------------------------------------------------------
// Shape (decode target)
// ---------------------------------------------------------------------------

/// The payload type an event name decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadShape {
    CandleParam,
    Candle,
    Ticker,
    Order,
    TradeAction,
    Trade,
    Position,
    RiskLimit,
    Depth,
    Account,
    EngineAction,
    WatchParam,
    Notify,
}

impl PayloadShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadShape::CandleParam => "CandleParam",
            PayloadShape::Candle => "Candle",
            PayloadShape::Ticker => "Ticker",
            PayloadShape::Order => "Order",
            PayloadShape::TradeAction => "TradeAction",
            PayloadShape::Trade => "Trade",
            PayloadShape::Position => "Position",
            PayloadShape::RiskLimit => "RiskLimit",
            PayloadShape::Depth => "Depth",
            PayloadShape::Account => "Account",
            PayloadShape::EngineAction => "EngineAction",
            PayloadShape::WatchParam => "WatchParam",
            PayloadShape::Notify => "NotifyEvent",
        }
    }

    /// Decode a generic JSON value into this shape.
    ///
    /// `Candle` also accepts the wire form ([`MsgCandle`], text interval);
    /// if both forms fail, the internal-form error is returned.
    pub fn decode(&self, value: Value) -> Result<EventPayload, serde_json::Error> {
        Ok(match self {
            PayloadShape::CandleParam => EventPayload::CandleParam(serde_json::from_value(value)?),
            PayloadShape::Candle => EventPayload::Candle(decode_candle(value)?),
            PayloadShape::Ticker => EventPayload::Ticker(serde_json::from_value(value)?),
            PayloadShape::Order => EventPayload::Order(serde_json::from_value(value)?),
            PayloadShape::TradeAction => EventPayload::TradeAction(serde_json::from_value(value)?),
            PayloadShape::Trade => EventPayload::Trade(serde_json::from_value(value)?),
            PayloadShape::Position => EventPayload::Position(serde_json::from_value(value)?),
            PayloadShape::RiskLimit => EventPayload::RiskLimit(serde_json::from_value(value)?),
            PayloadShape::Depth => EventPayload::Depth(serde_json::from_value(value)?),
            PayloadShape::Account => EventPayload::Account(serde_json::from_value(value)?),
            PayloadShape::EngineAction => {
                EventPayload::EngineAction(serde_json::from_value(value)?)
            }
            PayloadShape::WatchParam => EventPayload::WatchParam(serde_json::from_value(value)?),
            PayloadShape::Notify => EventPayload::Notify(serde_json::from_value(value)?),
        })
    }
}

impl fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decode_candle(value: Value) -> Result<Candle, serde_json::Error> {
    let internal_err = match serde_json::from_value::<Candle>(value.clone()) {
        Ok(candle) => return Ok(candle),
        Err(err) => err,
    };
    match serde_json::from_value::<MsgCandle>(value) {
        Ok(msg) => Candle::try_from(msg).map_err(serde_json::Error::custom),
        Err(_) => Err(internal_err),
    }
}

// ---------------------------------------------------------------------------
// Decoded payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    CandleParam(CandleParam),
    Candle(Candle),
    Ticker(Ticker),
    Order(Order),
    TradeAction(TradeAction),
    Trade(Trade),
    Position(Position),
    RiskLimit(RiskLimit),
    Depth(Depth),
    Account(Account),
    EngineAction(EngineAction),
    WatchParam(WatchParam),
    Notify(NotifyEvent),
}

impl EventPayload {
    pub fn shape(&self) -> PayloadShape {
        match self {
            EventPayload::CandleParam(_) => PayloadShape::CandleParam,
            EventPayload::Candle(_) => PayloadShape::Candle,
            EventPayload::Ticker(_) => PayloadShape::Ticker,
            EventPayload::Order(_) => PayloadShape::Order,
            EventPayload::TradeAction(_) => PayloadShape::TradeAction,
            EventPayload::Trade(_) => PayloadShape::Trade,
            EventPayload::Position(_) => PayloadShape::Position,
            EventPayload::RiskLimit(_) => PayloadShape::RiskLimit,
            EventPayload::Depth(_) => PayloadShape::Depth,
            EventPayload::Account(_) => PayloadShape::Account,
            EventPayload::EngineAction(_) => PayloadShape::EngineAction,
            EventPayload::WatchParam(_) => PayloadShape::WatchParam,
            EventPayload::Notify(_) => PayloadShape::Notify,
        }
    }

    /// Routing key used by runner filters: the symbol (or currency for
    /// accounts, code for risk limits), empty when the payload has none.
    pub fn key(&self) -> String {
        match self {
            EventPayload::CandleParam(p) => p.symbol.clone(),
            EventPayload::Candle(c) => c.symbol.to_string(),
            EventPayload::Ticker(t) => t.symbol.to_string(),
            EventPayload::Order(o) => o.symbol.to_string(),
            EventPayload::TradeAction(a) => a.symbol.to_string(),
            EventPayload::Trade(t) => t.symbol.to_string(),
            EventPayload::Position(p) => p.symbol.to_string(),
            EventPayload::RiskLimit(r) => r.code.clone(),
            EventPayload::Depth(d) => d.symbol.to_string(),
            EventPayload::Account(a) => a.currency.clone(),
            EventPayload::EngineAction(a) => {
                a.symbol.as_ref().map(|s| s.to_string()).unwrap_or_default()
            }
            EventPayload::WatchParam(_) | EventPayload::Notify(_) => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A decoded event: routing name plus typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    pub fn key(&self) -> String {
        self.payload.key()
    }

    pub fn candle(candle: Candle) -> Self {
        Self::new(names::EVENT_CANDLE, EventPayload::Candle(candle))
    }

    pub fn ticker(ticker: Ticker) -> Self {
        Self::new(names::EVENT_TICKER, EventPayload::Ticker(ticker))
    }

    pub fn order(order: Order) -> Self {
        Self::new(names::EVENT_ORDER, EventPayload::Order(order))
    }

    pub fn trade(trade: Trade) -> Self {
        Self::new(names::EVENT_TRADE, EventPayload::Trade(trade))
    }

    pub fn trades(trade: Trade) -> Self {
        Self::new(names::EVENT_TRADES, EventPayload::Trade(trade))
    }

    pub fn position(position: Position) -> Self {
        Self::new(names::EVENT_POSITION, EventPayload::Position(position))
    }

    pub fn depth(depth: Depth) -> Self {
        Self::new(names::EVENT_DEPTH, EventPayload::Depth(depth))
    }

    pub fn account(account: Account) -> Self {
        Self::new(names::EVENT_ACCOUNT, EventPayload::Account(account))
    }

    pub fn notify(notify: NotifyEvent) -> Self {
        Self::new(names::EVENT_NOTIFY, EventPayload::Notify(notify))
    }

    pub fn action(action: EngineAction) -> Self {
        Self::new(names::EVENT_ACTION, EventPayload::EngineAction(action))
    }
}
