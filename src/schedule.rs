//! Schedule writer decision logic (spec §4.5): for each stop-time row,
//! decide whether to emit the original time or the fitter's
//! `best_value`, honoring `do_not_update_first_stop_of_trip`. Kept
//! separate from `gtfs::writer`, which only serializes whatever rows it
//! is handed — this module is the policy, the writer is the mechanism.

use std::collections::HashMap;

use crate::estimator::Stats;
use crate::gtfs::{DiagnosticStats, EmittedStopTime, OrderedStopTimes};
use crate::types::TripStopKey;

pub fn build_emission_rows(
    ordered: &OrderedStopTimes,
    departure_stats: &HashMap<TripStopKey, Stats>,
    arrival_stats: &HashMap<TripStopKey, Stats>,
    do_not_update_first_stop_of_trip: bool,
) -> Vec<EmittedStopTime> {
    let mut previous_trip_id: Option<String> = None;
    let mut rows = Vec::with_capacity(ordered.len());

    for row in ordered.iter() {
        let is_first_of_trip = previous_trip_id.as_deref() != Some(row.trip_id.as_str());
        previous_trip_id = Some(row.trip_id.clone());

        let preserve_original = do_not_update_first_stop_of_trip && is_first_of_trip;
        let key = row.key();

        let (arrival_value, arrival_diag) =
            resolve(row.arrival_sec, arrival_stats.get(&key), preserve_original);
        let (departure_value, departure_diag) =
            resolve(row.departure_sec, departure_stats.get(&key), preserve_original);

        rows.push(EmittedStopTime {
            raw: row.raw.clone(),
            arrival_value,
            departure_value,
            arrival_diag,
            departure_diag,
        });
    }

    rows
}

fn resolve(original: i64, stats: Option<&Stats>, preserve_original: bool) -> (i64, Option<DiagnosticStats>) {
    if preserve_original {
        return (original, stats.map(|s| diagnostic(s, original)));
    }
    match stats {
        Some(s) => (s.best_value.unwrap_or(original), Some(diagnostic(s, original))),
        None => (original, None),
    }
}

fn diagnostic(stats: &Stats, original: i64) -> DiagnosticStats {
    DiagnosticStats {
        original,
        min: stats.min,
        max: stats.max,
        mean: stats.mean,
        std_dev: stats.std_dev,
        n_filtered: stats.filtered_times.len(),
        n_unfiltered: stats.unfiltered_times.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::StringRecord;

    fn stats(mean: f64, best_value: i64) -> Stats {
        Stats {
            unfiltered_times: vec![mean as i64],
            filtered_times: vec![mean as i64],
            mean,
            std_dev: None,
            min: mean as i64,
            max: mean as i64,
            best_value: Some(best_value),
        }
    }

    fn row(trip: &str, stop: &str, seq: u32, arr: i64, dep: i64) -> crate::gtfs::StopTimeRow {
        crate::gtfs::StopTimeRow {
            trip_id: trip.to_string(),
            stop_id: stop.to_string(),
            stop_sequence: seq,
            arrival_sec: arr,
            departure_sec: dep,
            raw: StringRecord::from(vec![trip, stop, &seq.to_string(), "x", "y"]),
        }
    }

    #[test]
    fn first_stop_preserved_when_configured() {
        let headers = StringRecord::from(vec!["trip_id", "stop_id", "stop_sequence", "arrival_time", "departure_time"]);
        let rows = vec![
            row("T1", "s1", 1, 100, 110),
            row("T1", "s2", 2, 200, 210),
            row("T1", "s3", 3, 300, 310),
        ];
        let ordered = OrderedStopTimes::from_rows(rows, headers, 3, 4);

        let mut departure_stats = HashMap::new();
        let mut arrival_stats = HashMap::new();
        for (stop, best) in [("s1", 999), ("s2", 205), ("s3", 305)] {
            departure_stats.insert(TripStopKey::new("T1", stop), stats(200.0, best));
            arrival_stats.insert(TripStopKey::new("T1", stop), stats(200.0, best - 5));
        }

        let emitted = build_emission_rows(&ordered, &departure_stats, &arrival_stats, true);
        assert_eq!(emitted[0].arrival_value, 100);
        assert_eq!(emitted[0].departure_value, 110);
        assert_eq!(emitted[1].departure_value, 205);
        assert_eq!(emitted[2].departure_value, 305);
    }

    #[test]
    fn falls_back_to_original_when_no_stats() {
        let headers = StringRecord::from(vec!["trip_id", "stop_id", "stop_sequence", "arrival_time", "departure_time"]);
        let rows = vec![row("T1", "s1", 1, 100, 110)];
        let ordered = OrderedStopTimes::from_rows(rows, headers, 3, 4);

        let departure_stats = HashMap::new();
        let arrival_stats = HashMap::new();
        let emitted = build_emission_rows(&ordered, &departure_stats, &arrival_stats, false);
        assert_eq!(emitted[0].arrival_value, 100);
        assert_eq!(emitted[0].departure_value, 110);
        assert!(emitted[0].arrival_diag.is_none());
    }
}
