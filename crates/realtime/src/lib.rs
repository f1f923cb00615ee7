//! # Realtime Core
//!
//! Core modules shared by the position pipeline, the relay and the
//! personalisation engine.

mod error;
mod provider;

pub use crate::error::*;
pub use crate::provider::*;
