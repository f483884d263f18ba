//! Adherence reporter (spec §4.6): scores a schedule (original or
//! revised) against the raw unfiltered observations, using the
//! passenger-facing asymmetric early/late bands.

use std::collections::HashMap;

use itertools::Itertools;

use crate::estimator::Stats;
use crate::gtfs::OrderedStopTimes;
use crate::types::TripStopKey;

#[derive(Debug, Default, Clone, Copy)]
pub struct AdherenceCounts {
    pub total: usize,
    pub early: usize,
    pub late: usize,
    pub on_time: usize,
}

impl AdherenceCounts {
    pub fn on_time_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.on_time as f64 / self.total as f64
        }
    }

    pub fn merge(&mut self, other: &AdherenceCounts) {
        self.total += other.total;
        self.early += other.early;
        self.late += other.late;
        self.on_time += other.on_time;
    }
}

/// Scores `observations` against a single `reference` time (either the
/// original schedule time or the fitter's `best_value`). Early/late use
/// strict inequality against the allowable bands; a tie at exactly the
/// boundary counts as on time.
pub fn score(observations: &[i64], reference: i64, allowable_early_sec: i64, allowable_late_sec: i64) -> AdherenceCounts {
    let mut early = 0usize;
    let mut late = 0usize;
    for &t in observations {
        if t < reference - allowable_early_sec {
            early += 1;
        } else if t > reference + allowable_late_sec {
            late += 1;
        }
    }
    let total = observations.len();
    AdherenceCounts {
        total,
        early,
        late,
        on_time: total - early - late,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AdherenceReport {
    pub orig: AdherenceCounts,
    pub new: AdherenceCounts,
}

impl AdherenceReport {
    pub fn on_time_fraction_orig(&self) -> f64 {
        self.orig.on_time_fraction()
    }

    pub fn on_time_fraction_new(&self) -> f64 {
        self.new.on_time_fraction()
    }
}

/// Groups the ordered stop-time rows by trip (via `itertools::group_by`,
/// the way the teacher groups rows sharing a key before working through
/// them curve by curve) and decides, per row, whether the departure or
/// the arrival event should be scored: departure by default, switching
/// to arrival at the last stop of the trip.
pub fn evaluate_schedule(
    ordered: &OrderedStopTimes,
    departure_stats: &HashMap<TripStopKey, Stats>,
    arrival_stats: &HashMap<TripStopKey, Stats>,
    allowable_early_sec: i64,
    allowable_late_sec: i64,
) -> AdherenceReport {
    let mut report = AdherenceReport::default();

    for (_trip_id, group) in &ordered.iter().group_by(|row| row.trip_id.clone()) {
        let trip_rows: Vec<_> = group.collect();
        let last_index = trip_rows.len() - 1;

        for (i, current) in trip_rows.iter().enumerate() {
            let is_last_of_trip = i == last_index;
            let key = current.key();
            let (stats_map, original) = if is_last_of_trip {
                (arrival_stats, current.arrival_sec)
            } else {
                (departure_stats, current.departure_sec)
            };

            if let Some(stats) = stats_map.get(&key) {
                let best = stats.best_value.unwrap_or(original);
                report
                    .orig
                    .merge(&score(&stats.unfiltered_times, original, allowable_early_sec, allowable_late_sec));
                report
                    .new
                    .merge(&score(&stats.unfiltered_times, best, allowable_early_sec, allowable_late_sec));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_locked_counts_for_the_documented_scenario() {
        let observations = vec![480, 540, 600, 660, 720];
        let orig = score(&observations, 600, 60, 60);
        assert_eq!(orig.early, 1);
        assert_eq!(orig.late, 1);
        assert_eq!(orig.on_time, 3);

        let new = score(&observations, 540, 60, 60);
        assert_eq!(new.early, 0);
        assert_eq!(new.late, 2);
        assert_eq!(new.on_time, 3);
    }

    #[test]
    fn boundary_values_count_as_on_time() {
        let observations = vec![540, 660];
        let counts = score(&observations, 600, 60, 60);
        assert_eq!(counts.early, 0);
        assert_eq!(counts.late, 0);
        assert_eq!(counts.on_time, 2);
    }

    #[test]
    fn on_time_fraction_of_empty_is_zero() {
        let counts = AdherenceCounts::default();
        assert_eq!(counts.on_time_fraction(), 0.0);
    }
}
