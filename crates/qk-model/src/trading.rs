use serde::{Deserialize, Serialize};

use crate::CurrencyPair;

/// Order / trade direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    #[default]
    Long,
    Short,
}

/// Best bid/ask snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: CurrencyPair,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub last: f64,
    #[serde(default)]
    pub bid: f64,
    #[serde(default)]
    pub ask: f64,
    #[serde(default)]
    pub volume: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: CurrencyPair,
    pub side: Side,
    pub price: f64,
    pub amount: f64,
    #[serde(default)]
    pub filled: f64,
    #[serde(default)]
    pub status: OrderStatus,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

impl Order {
    /// New or partially filled.
    pub fn is_open(&self) -> bool {
        matches!(self.status, OrderStatus::New | OrderStatus::PartiallyFilled)
    }

    pub fn remaining(&self) -> f64 {
        (self.amount - self.filled).max(0.0)
    }
}

/// A fill, either one of ours (`event.trade`) or a public print (`event.trades`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    #[serde(default)]
    pub order_id: String,
    pub symbol: CurrencyPair,
    pub side: Side,
    pub price: f64,
    pub amount: f64,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub remark: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: CurrencyPair,
    pub side: PositionSide,
    /// Held quantity (always >= 0; direction is `side`).
    pub hold: f64,
    /// Average entry price.
    pub price: f64,
    #[serde(default)]
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: f64,
    pub amount: f64,
}

/// Order book snapshot; bids descending, asks ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Depth {
    pub symbol: CurrencyPair,
    pub timestamp: i64,
    #[serde(default)]
    pub bids: Vec<DepthLevel>,
    #[serde(default)]
    pub asks: Vec<DepthLevel>,
}

impl Depth {
    pub fn best_bid(&self) -> Option<DepthLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<DepthLevel> {
        self.asks.first().copied()
    }

    pub fn mid_price(&self) -> Option<f64> {
        Some((self.best_bid()?.price + self.best_ask()?.price) / 2.0)
    }
}

/// Balance of one currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub currency: String,
    pub balance: f64,
    #[serde(default)]
    pub available: f64,
    #[serde(default)]
    pub frozen: f64,
}
