//! qk-events
//!
//! Event routing vocabulary shared by feeds, the engine and runners.
//!
//! - [`names`]: stable wire-level event name constants.
//! - [`PayloadShape`] / [`EventPayload`]: the closed set of payload types.
//! - [`EventRegistry`]: name -> shape mapping plus the decode boundary.
//!
//! The registry only decodes. Logging and dropping bad input is the caller's
//! job; see `qk-runtime`.

pub mod names;
mod payload;
mod registry;

pub use payload::{Event, EventPayload, PayloadShape};
pub use registry::{DecodeError, EventRegistry, EventRegistryBuilder, RegistryError};
