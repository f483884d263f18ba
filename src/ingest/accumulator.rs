use std::collections::HashMap;

use crate::types::TripStopKey;

/// Typical number of service days a stop is observed across in one
/// ingestion window; used to pre-size the per-key time vectors instead
/// of letting them grow from the default (near-empty) capacity one
/// push at a time, per the §5 resource-discipline requirement.
const EXPECTED_MULTIPLICITY: usize = 10;

/// A two-level mapping: route_id → (TripStopKey → ordered sequence of
/// integer seconds). One `Accumulator` exists per ingest pass (arrivals
/// and departures are accumulated separately, since the estimator needs
/// to compare each against a different original GTFS field).
#[derive(Default)]
pub struct Accumulator {
    routes: HashMap<String, HashMap<TripStopKey, Vec<i64>>>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub fn insert(&mut self, route_id: &str, key: TripStopKey, seconds: i64) {
        let stops = self.routes.entry(route_id.to_string()).or_insert_with(HashMap::new);
        let times = stops
            .entry(key)
            .or_insert_with(|| Vec::with_capacity(EXPECTED_MULTIPLICITY));
        times.push(seconds);
    }

    pub fn routes(&self) -> impl Iterator<Item = (&String, &HashMap<TripStopKey, Vec<i64>>)> {
        self.routes.iter()
    }

    pub fn route(&self, route_id: &str) -> Option<&HashMap<TripStopKey, Vec<i64>>> {
        self.routes.get(route_id)
    }

    pub fn route_ids(&self) -> impl Iterator<Item = &String> {
        self.routes.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved_within_a_key() {
        let mut acc = Accumulator::new();
        let key = TripStopKey::new("T1", "S1");
        acc.insert("R1", key.clone(), 10);
        acc.insert("R1", key.clone(), 20);
        acc.insert("R1", key.clone(), 5);
        let times = &acc.route("R1").unwrap()[&key];
        assert_eq!(times, &vec![10, 20, 5]);
    }

    #[test]
    fn routes_are_independent() {
        let mut acc = Accumulator::new();
        acc.insert("R1", TripStopKey::new("T1", "S1"), 10);
        acc.insert("R2", TripStopKey::new("T2", "S2"), 20);
        assert_eq!(acc.route("R1").unwrap().len(), 1);
        assert_eq!(acc.route("R2").unwrap().len(), 1);
        assert!(acc.route("R3").is_none());
    }
}
