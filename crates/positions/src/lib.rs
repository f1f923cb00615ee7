//! # Vehicle Positions
//!
//! Consumes the live position stream and keeps the latest known position of
//! every tracked trip.

pub mod beacon;
mod ingestor;
mod position;
mod reconnect;
pub mod sse;
mod store;

pub use self::beacon::Beacon;
pub use self::ingestor::{Events, StreamIngestor, Subscription};
pub use self::position::{Position, PositionEvent};
pub use self::reconnect::{DEFAULT_RETRY, Reconnect};
pub use self::store::PositionStore;
