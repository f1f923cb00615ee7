use std::sync::Arc;

use dashmap::DashMap;

use crate::Position;

/// Latest position per trip.
///
/// Cloning the store yields another handle onto the same positions.
#[derive(Clone, Debug, Default)]
pub struct PositionStore {
    positions: Arc<DashMap<String, Position>>,
}

impl PositionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholesale replace the position for `position.trip_id`,
    /// returning the replaced value.
    pub fn upsert(&self, position: Position) -> Option<Position> {
        self.positions.insert(position.trip_id.clone(), position)
    }

    #[must_use]
    pub fn get(&self, trip_id: &str) -> Option<Position> {
        self.positions.get(trip_id).map(|entry| entry.value().clone())
    }

    /// Current positions ordered by trip id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Position> {
        let mut positions =
            self.positions.iter().map(|entry| entry.value().clone()).collect::<Vec<_>>();
        positions.sort_by(|a, b| a.trip_id.cmp(&b.trip_id));
        positions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
