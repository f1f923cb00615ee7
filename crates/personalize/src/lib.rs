//! # Personalisation
//!
//! User preferences, scenario context and the ranking of server-proposed
//! suggestions against them.

pub mod api;
mod coordinator;
mod debounce;
pub mod engine;
mod preferences;
mod store;
mod suggestion;

pub use self::coordinator::{ApplySuggestion, Notifier, confirmation};
pub use self::debounce::Debounce;
pub use self::preferences::*;
pub use self::store::{PERSIST_DELAY, PreferenceState, PreferenceStore};
pub use self::suggestion::{Delta, LocalizedText, Payload, Suggestion};
