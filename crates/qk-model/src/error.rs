use std::fmt;

/// Errors produced while building model records from external text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A currency pair string had no recognizable `base<sep>quote` shape.
    InvalidSymbol { raw: String },
    /// A market suffix (e.g. `.S`) did not name a known market kind.
    UnknownMarket { raw: String },
    /// A feed interval (e.g. `"1m"`) could not be converted to seconds.
    InvalidInterval { raw: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidSymbol { raw } => {
                write!(f, "invalid currency pair '{raw}' (expected BASE_QUOTE)")
            }
            ModelError::UnknownMarket { raw } => write!(f, "unknown market kind '{raw}'"),
            ModelError::InvalidInterval { raw } => {
                write!(f, "invalid candle interval '{raw}'")
            }
        }
    }
}

impl std::error::Error for ModelError {}
