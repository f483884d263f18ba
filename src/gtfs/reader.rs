use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use simple_error::bail;

use crate::error::{FnResult, GtfsError, OrError};
use crate::types::TripStopKey;

use super::StopTimeRow;

/// GTFS reader & ordering repair (spec §4.1). One of the four named
/// injected capabilities; `CsvGtfsReader` is the only implementation
/// shipped here, reading directly off the filesystem the way the
/// teacher's `gtfs::read_csv` does, but generalized to detect and repair
/// stop-sequence ordering violations before handing rows to the engine.
pub trait GtfsReader {
    fn read_stop_times(&self, path: &Path) -> FnResult<OrderedStopTimes>;
    fn read_frequency_trip_ids(&self, path: &Path) -> FnResult<HashSet<String>>;
}

pub struct CsvGtfsReader;

impl CsvGtfsReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvGtfsReader {
    fn default() -> Self {
        Self::new()
    }
}

impl GtfsReader for CsvGtfsReader {
    fn read_stop_times(&self, path: &Path) -> FnResult<OrderedStopTimes> {
        let file = File::open(path)
            .map_err(|e| GtfsError(format!("cannot open {}: {}", path.display(), e)))?;
        let mut rdr = csv::Reader::from_reader(file);
        let headers = rdr
            .headers()
            .map_err(|e| GtfsError(format!("cannot read header of {}: {}", path.display(), e)))?
            .clone();

        let column = |name: &str| -> FnResult<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| Box::new(GtfsError(format!("stop_times.txt is missing column {}", name))) as _)
        };
        let trip_idx = column("trip_id")?;
        let stop_idx = column("stop_id")?;
        let seq_idx = column("stop_sequence")?;
        let arr_idx = column("arrival_time")?;
        let dep_idx = column("departure_time")?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record: StringRecord = result
                .map_err(|e| GtfsError(format!("malformed row in stop_times.txt: {}", e)))?;
            let trip_id = record
                .get(trip_idx)
                .or_error("missing trip_id field")?
                .to_string();
            let stop_id = record
                .get(stop_idx)
                .or_error("missing stop_id field")?
                .to_string();
            let stop_sequence: u32 = record
                .get(seq_idx)
                .or_error("missing stop_sequence field")?
                .parse()
                .or_error("stop_sequence is not an integer")?;
            let arrival_sec = parse_gtfs_time(record.get(arr_idx).or_error("missing arrival_time")?)?;
            let departure_sec = parse_gtfs_time(record.get(dep_idx).or_error("missing departure_time")?)?;

            rows.push(StopTimeRow {
                trip_id,
                stop_id,
                stop_sequence,
                arrival_sec,
                departure_sec,
                raw: record,
            });
        }

        Ok(OrderedStopTimes::from_rows(rows, headers, arr_idx, dep_idx))
    }

    fn read_frequency_trip_ids(&self, path: &Path) -> FnResult<HashSet<String>> {
        let file = match File::open(path) {
            Ok(f) => f,
            // frequencies.txt is optional in a GTFS feed; absence just
            // means there are no frequency-based trips.
            Err(_) => return Ok(HashSet::new()),
        };
        let mut rdr = csv::Reader::from_reader(file);
        let headers = rdr
            .headers()
            .map_err(|e| GtfsError(format!("cannot read header of {}: {}", path.display(), e)))?
            .clone();
        let trip_idx = headers
            .iter()
            .position(|h| h == "trip_id")
            .ok_or_else(|| GtfsError("frequencies.txt is missing column trip_id".to_string()))?;

        let mut ids = HashSet::new();
        for result in rdr.records() {
            let record = result
                .map_err(|e| GtfsError(format!("malformed row in frequencies.txt: {}", e)))?;
            ids.insert(record.get(trip_idx).or_error("missing trip_id")?.to_string());
        }
        Ok(ids)
    }
}

fn parse_gtfs_time(s: &str) -> FnResult<i64> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != 3 {
        bail!("invalid GTFS time (expected HH:MM:SS): {}", s);
    }
    let h: i64 = parts[0].parse().or_error("invalid hour in GTFS time")?;
    let m: i64 = parts[1].parse().or_error("invalid minute in GTFS time")?;
    let sec: i64 = parts[2].parse().or_error("invalid second in GTFS time")?;
    Ok(h * 3600 + m * 60 + sec)
}

/// An ordered map from `TripStopKey` to `StopTimeRow`, where iteration
/// order equals output row order (spec §4.1). Backed by a `Vec` plus an
/// index rather than a crate like `indexmap`, since the teacher's
/// dependency stack has no ordered-map crate and this is a handful of
/// lines to get right directly.
pub struct OrderedStopTimes {
    rows: Vec<StopTimeRow>,
    index: HashMap<TripStopKey, usize>,
    pub headers: StringRecord,
    pub arrival_column: usize,
    pub departure_column: usize,
}

impl OrderedStopTimes {
    pub fn from_rows(
        mut rows: Vec<StopTimeRow>,
        headers: StringRecord,
        arrival_column: usize,
        departure_column: usize,
    ) -> Self {
        if has_order_violation(&rows) {
            rows.sort_by(|a, b| a.trip_id.cmp(&b.trip_id).then(a.stop_sequence.cmp(&b.stop_sequence)));
        }

        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            index.insert(row.key(), i);
        }

        Self {
            rows,
            index,
            headers,
            arrival_column,
            departure_column,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StopTimeRow> {
        self.rows.iter()
    }

    pub fn get(&self, key: &TripStopKey) -> Option<&StopTimeRow> {
        self.index.get(key).map(|&i| &self.rows[i])
    }
}

/// Detects either kind of order violation described in §4.1: a
/// stop_sequence that decreases within the current trip, or a trip_id
/// that reappears after a different trip_id has been seen in between.
fn has_order_violation(rows: &[StopTimeRow]) -> bool {
    let mut completed_trips: HashSet<&str> = HashSet::new();
    let mut current_trip: Option<&str> = None;
    let mut current_seq: Option<u32> = None;

    for row in rows {
        let trip_id: &str = &row.trip_id;
        match current_trip {
            Some(ct) if ct == trip_id => {
                if let Some(seq) = current_seq {
                    if row.stop_sequence < seq {
                        return true;
                    }
                }
            }
            _ => {
                if let Some(ct) = current_trip {
                    completed_trips.insert(ct);
                }
                if completed_trips.contains(trip_id) {
                    return true;
                }
                current_trip = Some(trip_id);
            }
        }
        current_seq = Some(row.stop_sequence);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(trip: &str, stop: &str, seq: u32) -> StopTimeRow {
        StopTimeRow {
            trip_id: trip.to_string(),
            stop_id: stop.to_string(),
            stop_sequence: seq,
            arrival_sec: 0,
            departure_sec: 0,
            raw: StringRecord::new(),
        }
    }

    #[test]
    fn no_violation_for_well_ordered_rows() {
        let rows = vec![row("T1", "A", 1), row("T1", "B", 2), row("T2", "A", 1)];
        assert!(!has_order_violation(&rows));
    }

    #[test]
    fn detects_decreasing_sequence_within_trip() {
        let rows = vec![row("T1", "A", 2), row("T1", "B", 1)];
        assert!(has_order_violation(&rows));
    }

    #[test]
    fn detects_reappearing_trip() {
        let rows = vec![row("T1", "A", 1), row("T2", "A", 1), row("T1", "B", 2)];
        assert!(has_order_violation(&rows));
    }

    #[test]
    fn repair_sorts_by_trip_then_sequence() {
        let headers = StringRecord::from(vec![
            "trip_id",
            "stop_id",
            "stop_sequence",
            "arrival_time",
            "departure_time",
        ]);
        let rows = vec![row("T2", "A", 1), row("T1", "B", 2), row("T1", "A", 1)];
        let ordered = OrderedStopTimes::from_rows(rows, headers, 3, 4);
        let trip_ids: Vec<&str> = ordered.iter().map(|r| r.trip_id.as_str()).collect();
        assert_eq!(trip_ids, vec!["T1", "T1", "T2"]);
    }

    #[test]
    fn preserves_input_order_when_no_violation() {
        let headers = StringRecord::from(vec![
            "trip_id",
            "stop_id",
            "stop_sequence",
            "arrival_time",
            "departure_time",
        ]);
        let rows = vec![row("T2", "A", 1), row("T1", "A", 1), row("T1", "B", 2)];
        let ordered = OrderedStopTimes::from_rows(rows, headers, 3, 4);
        let trip_ids: Vec<&str> = ordered.iter().map(|r| r.trip_id.as_str()).collect();
        assert_eq!(trip_ids, vec!["T2", "T1", "T1"]);
    }

    #[test]
    fn parses_after_midnight_time() {
        assert_eq!(parse_gtfs_time("25:03:10").unwrap(), 25 * 3600 + 3 * 60 + 10);
    }
}
