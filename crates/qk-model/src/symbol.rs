use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ModelError;

// ---------------------------------------------------------------------------
// Market kind
// ---------------------------------------------------------------------------

/// Contract family a symbol trades in.
///
/// Each kind has a one-letter market code used as the suffix of a symbol's
/// string form (`BTC_USDT.S` is the BTC/USDT perpetual swap).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarketKind {
    #[default]
    Spot,
    Swap,
    Future,
    Option,
    /// American-style option.
    AOption,
    /// Isolated-margin spot.
    Isolated,
    /// Cross-margin spot.
    Margin,
}

impl MarketKind {
    pub const ALL: [MarketKind; 7] = [
        MarketKind::Spot,
        MarketKind::Swap,
        MarketKind::Future,
        MarketKind::Option,
        MarketKind::AOption,
        MarketKind::Isolated,
        MarketKind::Margin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketKind::Spot => "spot",
            MarketKind::Swap => "swap",
            MarketKind::Future => "future",
            MarketKind::Option => "option",
            MarketKind::AOption => "aoption",
            MarketKind::Isolated => "isolated",
            MarketKind::Margin => "margin",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            MarketKind::Spot => "C",
            MarketKind::Swap => "S",
            MarketKind::Future => "F",
            MarketKind::Option => "O",
            MarketKind::AOption => "A",
            MarketKind::Isolated => "I",
            MarketKind::Margin => "M",
        }
    }

    /// Case-insensitive lookup by name (`"SWAP"`, `"swap"`).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }
}

/// Market code for a market name, e.g. `market_code("future") == Some("F")`.
pub fn market_code(name: &str) -> Option<&'static str> {
    MarketKind::from_name(name).map(|k| k.code())
}

// ---------------------------------------------------------------------------
// Currency pair
// ---------------------------------------------------------------------------

/// Trading symbol: base/quote plus market kind.
///
/// String form is `BASE_QUOTE` for spot and `BASE_QUOTE.<code>` otherwise.
/// The empty pair (`CurrencyPair::default()`) renders as `""` and is what a
/// failed lenient decode leaves behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
    pub market: MarketKind,
}

impl CurrencyPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_ascii_uppercase(),
            quote: quote.into().to_ascii_uppercase(),
            market: MarketKind::Spot,
        }
    }

    pub fn with_market(mut self, market: MarketKind) -> Self {
        self.market = market;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.quote.is_empty()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "{}_{}", self.base, self.quote)?;
        if self.market != MarketKind::Spot {
            write!(f, ".{}", self.market.code())?;
        }
        Ok(())
    }
}

impl FromStr for CurrencyPair {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(CurrencyPair::default());
        }

        let (pair, market) = match s.rsplit_once('.') {
            Some((pair, code)) => {
                let market = MarketKind::from_code(&code.to_ascii_uppercase()).ok_or_else(|| {
                    ModelError::UnknownMarket {
                        raw: code.to_string(),
                    }
                })?;
                (pair, market)
            }
            None => (s, MarketKind::Spot),
        };

        let (base, quote) = pair
            .split_once(['_', '-', '/'])
            .filter(|(b, q)| !b.is_empty() && !q.is_empty())
            .ok_or_else(|| ModelError::InvalidSymbol { raw: s.to_string() })?;

        Ok(CurrencyPair::new(base, quote).with_market(market))
    }
}

impl Serialize for CurrencyPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CurrencyPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
