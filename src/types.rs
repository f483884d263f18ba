//! Shared identity types used across ingestion, the estimator, the
//! fitter and the writer. Kept together because nothing in this crate
//! owns just one of them — `TripStopKey` identifies a schedule slot,
//! `TerminalKey` identifies a physical trip run, and both are plain
//! value types with exact string-equality semantics (no normalization,
//! no case-folding: GTFS ids are opaque byte strings by convention).

use std::hash::Hash;

/// Unordered identity of a (trip_id, stop_id) pair. Equality and hashing
/// are exact string equality on both fields, matching the source GTFS
/// feed's own identifiers; this type performs no normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripStopKey {
    pub trip_id: String,
    pub stop_id: String,
}

impl TripStopKey {
    pub fn new(trip_id: impl Into<String>, stop_id: impl Into<String>) -> Self {
        Self {
            trip_id: trip_id.into(),
            stop_id: stop_id.into(),
        }
    }
}

/// Identifies a single run of a block on a single service day.
/// `vehicle_id` is part of the key because multiple vehicles may cover
/// the same block across different runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TerminalKey {
    pub vehicle_id: String,
    pub block_id: String,
    pub day_of_year: i64,
}

impl TerminalKey {
    pub fn new(vehicle_id: impl Into<String>, block_id: impl Into<String>, day_of_year: i64) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            block_id: block_id.into(),
            day_of_year,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_stop_key_equality_is_exact() {
        let a = TripStopKey::new("T1", "S1");
        let b = TripStopKey::new("T1", "S1");
        let c = TripStopKey::new("T1", "s1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn terminal_key_distinguishes_vehicles_on_same_block() {
        let a = TerminalKey::new("veh-1", "block-9", 2024032);
        let b = TerminalKey::new("veh-2", "block-9", 2024032);
        assert_ne!(a, b);
    }
}
