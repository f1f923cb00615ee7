//! # Companion
//!
//! Host for the realtime companion: live vehicle positions alongside
//! suggestions ranked against the user's preferences.

pub mod config;
mod provider;
mod session;

pub use self::provider::Provider;
pub use self::session::{Command, Dashboard, POLL_INTERVAL};
