//! Event type registry: event name -> payload shape.
//!
//! # Lifecycle
//! Entries are added through [`EventRegistryBuilder`] before the registry is
//! built; a built [`EventRegistry`] is immutable and can be shared freely.
//!
//! # Failure policy
//! [`EventRegistry::decode`] reports unknown names and payload mismatches as
//! [`DecodeError`]; the dispatcher logs and drops them. Nothing here panics
//! on bad input.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::names::*;
use crate::{Event, PayloadShape};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from registry construction and lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// An entry with this name already exists.
    DuplicateName { name: String },
    /// The event name is empty or whitespace.
    EmptyName,
    /// No entry with this name.
    NotFound { name: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { name } => write!(f, "event '{name}' is already registered"),
            Self::EmptyName => write!(f, "event name must not be empty"),
            Self::NotFound { name } => write!(f, "no event named '{name}' is registered"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Why an incoming payload could not be turned into an [`Event`].
#[derive(Debug)]
pub enum DecodeError {
    UnknownEvent {
        name: String,
    },
    /// The name is known but the payload does not fit its shape.
    Payload {
        name: String,
        shape: PayloadShape,
        source: serde_json::Error,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEvent { name } => write!(f, "unknown event '{name}'"),
            Self::Payload {
                name,
                shape,
                source,
            } => write!(f, "event '{name}': payload is not a valid {shape}: {source}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnknownEvent { .. } => None,
            Self::Payload { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects entries before the registry is frozen.
#[derive(Debug, Default)]
pub struct EventRegistryBuilder {
    shapes: HashMap<String, PayloadShape>,
}

impl EventRegistryBuilder {
    /// Start with the standard event set.
    pub fn with_standard(mut self) -> Self {
        self.shapes.extend(
            standard_entries()
                .into_iter()
                .map(|(name, shape)| (name.to_string(), shape)),
        );
        self
    }

    /// Add one entry.
    ///
    /// # Errors
    /// - [`RegistryError::EmptyName`] for an empty/whitespace name.
    /// - [`RegistryError::DuplicateName`] if the name is already present.
    pub fn register(
        mut self,
        name: impl Into<String>,
        shape: PayloadShape,
    ) -> Result<Self, RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.shapes.contains_key(&name) {
            return Err(RegistryError::DuplicateName { name });
        }
        self.shapes.insert(name, shape);
        Ok(self)
    }

    pub fn build(self) -> EventRegistry {
        EventRegistry {
            shapes: self.shapes,
        }
    }
}

fn standard_entries() -> [(&'static str, PayloadShape); 17] {
    [
        (EVENT_CANDLE_PARAM, PayloadShape::CandleParam),
        (EVENT_CANDLE, PayloadShape::Candle),
        (EVENT_TICKER, PayloadShape::Ticker),
        (EVENT_ORDER, PayloadShape::Order),
        (EVENT_ORDER_CANCEL_ALL, PayloadShape::TradeAction),
        (EVENT_ORDER_CANCEL, PayloadShape::TradeAction),
        (EVENT_TRADES, PayloadShape::Trade),
        (EVENT_TRADE_ACTION, PayloadShape::TradeAction),
        (EVENT_TRADE, PayloadShape::Trade),
        (EVENT_POSITION, PayloadShape::Position),
        (EVENT_CUR_POSITION, PayloadShape::Position),
        (EVENT_RISK_LIMIT, PayloadShape::RiskLimit),
        (EVENT_DEPTH, PayloadShape::Depth),
        (EVENT_ACCOUNT, PayloadShape::Account),
        (EVENT_ACTION, PayloadShape::EngineAction),
        (EVENT_WATCH, PayloadShape::WatchParam),
        (EVENT_NOTIFY, PayloadShape::Notify),
    ]
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable event name -> payload shape mapping.
#[derive(Debug, Clone)]
pub struct EventRegistry {
    shapes: HashMap<String, PayloadShape>,
}

impl EventRegistry {
    pub fn builder() -> EventRegistryBuilder {
        EventRegistryBuilder::default()
    }

    /// Registry holding exactly the standard event names.
    pub fn standard() -> Self {
        Self::builder().with_standard().build()
    }

    /// Shape registered under `name`.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] if the name is not registered.
    pub fn lookup(&self, name: &str) -> Result<PayloadShape, RegistryError> {
        self.shapes
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.shapes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up `name` and decode `payload` into its shape.
    pub fn decode(&self, name: &str, payload: Value) -> Result<Event, DecodeError> {
        let shape = self
            .lookup(name)
            .map_err(|_| DecodeError::UnknownEvent {
                name: name.to_string(),
            })?;
        let payload = shape.decode(payload).map_err(|source| DecodeError::Payload {
            name: name.to_string(),
            shape,
            source,
        })?;
        Ok(Event::new(name, payload))
    }

    /// [`decode`](Self::decode) from JSON text.
    pub fn decode_str(&self, name: &str, raw: &str) -> Result<Event, DecodeError> {
        let shape = self
            .lookup(name)
            .map_err(|_| DecodeError::UnknownEvent {
                name: name.to_string(),
            })?;
        let value: Value = serde_json::from_str(raw).map_err(|source| DecodeError::Payload {
            name: name.to_string(),
            shape,
            source,
        })?;
        self.decode(name, value)
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
