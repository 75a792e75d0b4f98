//! OHLCV candles and candle aggregation.
//!
//! [`Candle`] is the internal record; [`MsgCandle`] is what market-data feeds
//! put on the wire (text interval such as `"1m"`). [`CandleList::merge`]
//! folds an ordered run of sub-interval candles into one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CurrencyPair, ModelError};

// ---------------------------------------------------------------------------
// Candle
// ---------------------------------------------------------------------------

/// One OHLCV sample for a symbol over a fixed interval.
///
/// `timestamp` is the interval start (UTC epoch seconds); `interval` is the
/// interval length in seconds. When volume is non-zero, `low <= open, close <= high`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: CurrencyPair,
    pub timestamp: i64,
    pub interval: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub base_vol: f64,
    #[serde(default)]
    pub quote_vol: f64,
}

impl Candle {
    /// Interval start as a UTC datetime (epoch when out of range).
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.timestamp, 0).unwrap_or_default()
    }

    /// Lenient decode from an arbitrary JSON value.
    ///
    /// Never fails: an undecodable value is logged and yields
    /// `Candle::default()`.
    pub fn from_value(value: &Value) -> Candle {
        match serde_json::from_value::<Candle>(value.clone()) {
            Ok(candle) => candle,
            Err(err) => {
                tracing::error!(input = %value, error = %err, "candle decode failed");
                Candle::default()
            }
        }
    }
}

impl fmt::Display for Candle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timestamp {}, {} open:{:.6} close:{:.6} low:{:.6} high:{:.6} quotvol:{:.6} basevol:{:.6}",
            self.timestamp,
            self.datetime(),
            self.open,
            self.close,
            self.low,
            self.high,
            self.quote_vol,
            self.base_vol
        )
    }
}

// ---------------------------------------------------------------------------
// Wire candle
// ---------------------------------------------------------------------------

/// Candle as published by a market-data feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MsgCandle {
    pub symbol: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub method: String,
    pub timestamp: i64,
    /// Feed-specific interval text, e.g. `"1m"`, `"4h"`, `"1d"`.
    pub interval: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub base_vol: f64,
    #[serde(default)]
    pub quote_vol: f64,
}

impl TryFrom<MsgCandle> for Candle {
    type Error = ModelError;

    fn try_from(msg: MsgCandle) -> Result<Self, Self::Error> {
        Ok(Candle {
            symbol: msg.symbol.parse()?,
            timestamp: msg.timestamp,
            interval: parse_interval(&msg.interval)?,
            open: msg.open,
            high: msg.high,
            low: msg.low,
            close: msg.close,
            base_vol: msg.base_vol,
            quote_vol: msg.quote_vol,
        })
    }
}

/// Convert feed interval text into seconds.
///
/// Accepts bare seconds (`"300"`) or a positive count followed by a unit:
/// `s`/`sec`, `m`/`min`, `h`/`hour`, `d`/`day`, `w`/`week` (case-insensitive,
/// plural allowed).
pub fn parse_interval(raw: &str) -> Result<i64, ModelError> {
    let err = || ModelError::InvalidInterval {
        raw: raw.to_string(),
    };

    let text = raw.trim().to_ascii_lowercase();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (count, unit) = text.split_at(split);

    let count: i64 = count.parse().map_err(|_| err())?;
    if count <= 0 {
        return Err(err());
    }

    let unit_secs = match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hour" | "hours" => 3_600,
        "d" | "day" | "days" => 86_400,
        "w" | "week" | "weeks" => 604_800,
        _ => return Err(err()),
    };

    count.checked_mul(unit_secs).ok_or_else(err)
}

// ---------------------------------------------------------------------------
// Candle list + aggregation
// ---------------------------------------------------------------------------

/// Ordered run of candles (ascending timestamp, gaps allowed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandleList(pub Vec<Candle>);

impl CandleList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, candle: Candle) {
        self.0.push(candle);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.0.iter()
    }

    /// `true` when timestamps are non-decreasing.
    pub fn is_ordered(&self) -> bool {
        self.0.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
    }

    /// Highest high, starting from 0.
    pub fn high(&self) -> f64 {
        self.0.iter().fold(0.0, |acc, c| if acc < c.high { c.high } else { acc })
    }

    /// Lowest low, where an accumulator of exactly 0 counts as unset.
    ///
    /// A zero accumulator is replaced by the next candle's low instead of being
    /// compared, so a zero low is only kept when it is the last one seen.
    pub fn low(&self) -> f64 {
        let mut acc = 0.0;
        for c in &self.0 {
            if acc == 0.0 {
                acc = c.low;
                continue;
            }
            if acc > c.low {
                acc = c.low;
            }
        }
        acc
    }

    /// Merge the run into one candle; `None` for an empty list.
    ///
    /// Symbol, timestamp and open come from the first candle, close from the
    /// last; the interval is the sum of intervals and volumes are summed.
    /// Gaps and overlaps are not detected.
    pub fn merge(&self) -> Option<Candle> {
        let first = self.0.first()?;
        let last = self.0.last()?;
        if !self.is_ordered() {
            tracing::warn!(symbol = %first.symbol, len = self.0.len(), "merging candles out of timestamp order");
        }

        let mut out = Candle {
            symbol: first.symbol.clone(),
            timestamp: first.timestamp,
            interval: 0,
            open: first.open,
            high: self.high(),
            low: self.low(),
            close: last.close,
            base_vol: 0.0,
            quote_vol: 0.0,
        };
        for c in &self.0 {
            out.interval += c.interval;
            out.base_vol += c.base_vol;
            out.quote_vol += c.quote_vol;
        }
        Some(out)
    }
}

impl From<Vec<Candle>> for CandleList {
    fn from(candles: Vec<Candle>) -> Self {
        Self(candles)
    }
}

impl FromIterator<Candle> for CandleList {
    fn from_iter<I: IntoIterator<Item = Candle>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CandleList {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
