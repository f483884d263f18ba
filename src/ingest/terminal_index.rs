use std::collections::HashMap;

use crate::types::TerminalKey;

/// Per frequency-trip run, remembers the measured first-stop departure
/// instant (as seconds-into-day), so that later observations for the
/// same run can be reframed relative to trip start. Process-local to one
/// `process()` invocation (spec §9: no module-level storage) and passed
/// explicitly between the two ingest passes.
#[derive(Default)]
pub struct TerminalDepartureIndex {
    departures: HashMap<TerminalKey, i64>,
}

impl TerminalDepartureIndex {
    pub fn new() -> Self {
        Self {
            departures: HashMap::new(),
        }
    }

    /// A later departure observation for the same key overwrites the
    /// earlier one, by contract: real data never has two legitimate
    /// first-stop departures for one physical run.
    pub fn record(&mut self, key: TerminalKey, seconds_into_day: i64) {
        self.departures.insert(key, seconds_into_day);
    }

    pub fn get(&self, key: &TerminalKey) -> Option<i64> {
        self.departures.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.departures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_record_overwrites_earlier() {
        let mut idx = TerminalDepartureIndex::new();
        let key = TerminalKey::new("veh-1", "block-1", 2024061);
        idx.record(key.clone(), 25380);
        idx.record(key.clone(), 25400);
        assert_eq!(idx.get(&key), Some(25400));
    }

    #[test]
    fn unknown_key_is_absent() {
        let idx = TerminalDepartureIndex::new();
        let key = TerminalKey::new("veh-1", "block-1", 2024061);
        assert_eq!(idx.get(&key), None);
    }
}
