//! Orchestration: wires the four injected capabilities (GTFS reader,
//! GTFS writer, observation source, clock) together into `process()`,
//! and owns the cancellation/fatality policy from spec §5/§7.

use std::collections::HashMap;

use crate::adherence::{self, AdherenceReport};
use crate::cancel::CancellationToken;
use crate::clock::Calendar;
use crate::config::RefinementConfig;
use crate::error::{DataAnomaly, FnResult};
use crate::estimator::{estimate, Stats};
use crate::fitter::fit_all_routes;
use crate::gtfs::{GtfsReader, GtfsWriter, OrderedStopTimes};
use crate::ingest::{self, Accumulator};
use crate::observation::{ObservationKind, ObservationSource};
use crate::schedule::build_emission_rows;
use crate::types::TripStopKey;

pub struct Engine<'a> {
    pub gtfs_reader: &'a dyn GtfsReader,
    pub gtfs_writer: &'a dyn GtfsWriter,
    pub observation_source: &'a dyn ObservationSource,
    pub calendar: &'a dyn Calendar,
}

/// Per-route σ-multiplier chosen by the fitter, for the diagnostic log.
#[derive(Debug, Default)]
pub struct RouteFitDiagnostics {
    pub departure_k: HashMap<String, f64>,
    pub arrival_k: HashMap<String, f64>,
}

pub enum ProcessOutcome {
    Completed {
        report: AdherenceReport,
        fit: RouteFitDiagnostics,
        row_count: usize,
    },
    /// The job was cancelled before output was written. Per spec §7, an
    /// aborted job never leaves partially-written output behind.
    Cancelled,
}

impl<'a> Engine<'a> {
    pub fn new(
        gtfs_reader: &'a dyn GtfsReader,
        gtfs_writer: &'a dyn GtfsWriter,
        observation_source: &'a dyn ObservationSource,
        calendar: &'a dyn Calendar,
    ) -> Self {
        Self {
            gtfs_reader,
            gtfs_writer,
            observation_source,
            calendar,
        }
    }

    pub fn process(&self, config: &RefinementConfig, cancel: &CancellationToken, verbose: bool) -> FnResult<ProcessOutcome> {
        config.validate()?;

        let stop_times_path = config.gtfs_dir.join("stop_times.txt");
        let frequencies_path = config.gtfs_dir.join("frequencies.txt");

        let ordered = self.gtfs_reader.read_stop_times(&stop_times_path)?;
        let frequency_trip_ids = self.gtfs_reader.read_frequency_trip_ids(&frequencies_path)?;
        if verbose {
            println!(
                "Loaded {} stop_times rows, {} frequency-based trip ids.",
                ordered.len(),
                frequency_trip_ids.len()
            );
        }

        let outcome = ingest::ingest(
            self.observation_source,
            self.calendar,
            &frequency_trip_ids,
            config,
            cancel,
            verbose,
        )?;

        if verbose {
            println!(
                "ingested {} departure-trip terminals, {} routes with departure observations, {} routes with arrival observations",
                outcome.terminal_index.len(),
                outcome.departure_accumulator.route_ids().count(),
                outcome.arrival_accumulator.route_ids().count(),
            );
        }

        if cancel.is_cancelled() {
            return Ok(ProcessOutcome::Cancelled);
        }

        let mut departure_routes = build_stats_per_route(
            &outcome.departure_accumulator,
            &ordered,
            ObservationKind::Departure,
            config,
            verbose,
        );
        let mut arrival_routes = build_stats_per_route(
            &outcome.arrival_accumulator,
            &ordered,
            ObservationKind::Arrival,
            config,
            verbose,
        );

        if cancel.is_cancelled() {
            return Ok(ProcessOutcome::Cancelled);
        }

        let departure_k = fit_all_routes(&mut departure_routes, config.desired_fraction_early, config.fit_iterations);
        let arrival_k = fit_all_routes(&mut arrival_routes, config.desired_fraction_early, config.fit_iterations);

        if cancel.is_cancelled() {
            return Ok(ProcessOutcome::Cancelled);
        }

        let departure_stats = flatten(departure_routes);
        let arrival_stats = flatten(arrival_routes);

        let report = adherence::evaluate_schedule(
            &ordered,
            &departure_stats,
            &arrival_stats,
            config.allowable_early_sec,
            config.allowable_late_sec,
        );

        let emitted = build_emission_rows(
            &ordered,
            &departure_stats,
            &arrival_stats,
            config.do_not_update_first_stop_of_trip,
        );

        self.gtfs_writer.write(
            &config.gtfs_dir,
            &ordered.headers,
            ordered.arrival_column,
            ordered.departure_column,
            &emitted,
        )?;

        Ok(ProcessOutcome::Completed {
            report,
            fit: RouteFitDiagnostics {
                departure_k,
                arrival_k,
            },
            row_count: ordered.len(),
        })
    }
}

fn build_stats_per_route(
    accumulator: &Accumulator,
    ordered: &OrderedStopTimes,
    kind: ObservationKind,
    config: &RefinementConfig,
    verbose: bool,
) -> HashMap<String, HashMap<TripStopKey, Stats>> {
    let mut per_route = HashMap::new();

    for (route_id, stops) in accumulator.routes() {
        let mut stats_by_key = HashMap::new();
        for (key, times) in stops {
            let original_row = match ordered.get(key) {
                Some(row) => row,
                None => {
                    // Open question, resolved: trip/stop unknown to the
                    // GTFS stop-times map is logged and dropped.
                    if verbose {
                        eprintln!(
                            "{}",
                            DataAnomaly(format!(
                                "trip/stop {:?} has observations but is absent from stop_times.txt; dropping",
                                key
                            ))
                        );
                    }
                    continue;
                }
            };
            let original = match kind {
                ObservationKind::Arrival => original_row.arrival_sec,
                ObservationKind::Departure => original_row.departure_sec,
            };
            if let Some(stats) = estimate(
                times,
                Some(original),
                config.allowable_deviation_from_mean_sec,
                config.allowable_deviation_from_original_sec,
            ) {
                stats_by_key.insert(key.clone(), stats);
            }
        }
        if !stats_by_key.is_empty() {
            per_route.insert(route_id.clone(), stats_by_key);
        }
    }

    per_route
}

fn flatten(routes: HashMap<String, HashMap<TripStopKey, Stats>>) -> HashMap<TripStopKey, Stats> {
    let mut flat = HashMap::new();
    for (_route_id, stats_by_key) in routes {
        flat.extend(stats_by_key);
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::LocalCalendar;
    use crate::gtfs::{CsvGtfsReader, CsvGtfsWriter};
    use crate::observation::{Observation, ObservationKind, VecObservationSource};
    use chrono::NaiveDate;
    use std::fs;
    use std::io::Write;

    fn t(h: u32, m: u32, s: u32) -> crate::clock::Instant {
        NaiveDate::from_ymd(2024, 6, 1).and_hms(h, m, s)
    }

    fn write_stop_times(dir: &std::path::Path) {
        let mut f = fs::File::create(dir.join("stop_times.txt")).unwrap();
        writeln!(f, "trip_id,stop_id,stop_sequence,arrival_time,departure_time").unwrap();
        writeln!(f, "T1,S1,1,07:00:00,07:00:00").unwrap();
        writeln!(f, "T1,S2,2,07:10:00,07:10:00").unwrap();
    }

    fn obs(trip: &str, stop: &str, idx: u32, h: u32, m: u32, s: u32, kind: ObservationKind) -> Observation {
        Observation {
            route_id: "R1".into(),
            trip_id: trip.into(),
            stop_id: stop.into(),
            stop_path_index: idx,
            vehicle_id: "V1".into(),
            block_id: "B1".into(),
            instant: t(h, m, s),
            kind,
        }
    }

    #[test]
    fn process_writes_both_output_files_and_reports_adherence() {
        let dir = tempfile::tempdir().unwrap();
        write_stop_times(dir.path());

        let observations = vec![
            obs("T1", "S1", 0, 7, 0, 5, ObservationKind::Departure),
            obs("T1", "S1", 0, 7, 0, 8, ObservationKind::Departure),
            obs("T1", "S1", 0, 6, 59, 55, ObservationKind::Departure),
            obs("T1", "S2", 1, 7, 10, 20, ObservationKind::Arrival),
            obs("T1", "S2", 1, 7, 10, 25, ObservationKind::Arrival),
            obs("T1", "S2", 1, 7, 9, 50, ObservationKind::Arrival),
        ];
        let source = VecObservationSource::new(observations);
        let reader = CsvGtfsReader::new();
        let writer = CsvGtfsWriter::new();
        let calendar = LocalCalendar;
        let engine = Engine::new(&reader, &writer, &source, &calendar);

        let mut config = RefinementConfig::default();
        config.gtfs_dir = dir.path().to_path_buf();
        config.begin_time = t(0, 0, 0);
        config.end_time = NaiveDate::from_ymd(2024, 6, 2).and_hms(0, 0, 0);
        let cancel = CancellationToken::new();

        let outcome = engine.process(&config, &cancel, false).unwrap();
        match outcome {
            ProcessOutcome::Completed { report, row_count, .. } => {
                assert_eq!(row_count, 2);
                assert!(report.orig.total > 0);
            }
            ProcessOutcome::Cancelled => panic!("should not be cancelled"),
        }

        assert!(dir.path().join("stop_times.txt_new").exists());
        assert!(dir.path().join("stop_times.txt_extended").exists());
        // The original file is never touched.
        let original = fs::read_to_string(dir.path().join("stop_times.txt")).unwrap();
        assert!(original.contains("07:00:00"));
    }

    #[test]
    fn cancellation_before_ingestion_skips_writing_output() {
        let dir = tempfile::tempdir().unwrap();
        write_stop_times(dir.path());

        let source = VecObservationSource::new(vec![]);
        let reader = CsvGtfsReader::new();
        let writer = CsvGtfsWriter::new();
        let calendar = LocalCalendar;
        let engine = Engine::new(&reader, &writer, &source, &calendar);

        let mut config = RefinementConfig::default();
        config.gtfs_dir = dir.path().to_path_buf();
        config.begin_time = t(0, 0, 0);
        config.end_time = NaiveDate::from_ymd(2024, 6, 2).and_hms(0, 0, 0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = engine.process(&config, &cancel, false).unwrap();
        assert!(matches!(outcome, ProcessOutcome::Cancelled));
        assert!(!dir.path().join("stop_times.txt_new").exists());
    }
}
