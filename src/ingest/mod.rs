//! Observation ingestion (spec §4.2): two-level batching (day-sized
//! windows, paged fetches within each) feeding the per-route
//! accumulators. Grounded on the teacher's `BatchedStatements` batching
//! discipline (`importer/batched_statements.rs`) and the two-pass shape
//! of `PerScheduleImporter::process_message` (record pass, then predict
//! pass) — here the two passes are departures-first, then arrivals,
//! because the arrivals pass depends on the terminal-departure index the
//! departures pass builds.

pub mod accumulator;
pub mod terminal_index;

pub use accumulator::Accumulator;
pub use terminal_index::TerminalDepartureIndex;

use std::collections::HashSet;

use chrono::Duration;

use crate::cancel::CancellationToken;
use crate::clock::Calendar;
use crate::config::RefinementConfig;
use crate::error::{DataAnomaly, FnResult};
use crate::observation::{Observation, ObservationKind, ObservationSource};
use crate::types::{TerminalKey, TripStopKey};

pub struct IngestOutcome {
    pub departure_accumulator: Accumulator,
    pub arrival_accumulator: Accumulator,
    pub terminal_index: TerminalDepartureIndex,
}

/// Runs both ingest passes in the order the terminal-index dependency
/// requires: departures, then arrivals.
pub fn ingest(
    source: &dyn ObservationSource,
    calendar: &dyn Calendar,
    frequency_trip_ids: &HashSet<String>,
    config: &RefinementConfig,
    cancel: &CancellationToken,
    verbose: bool,
) -> FnResult<IngestOutcome> {
    let mut terminal_index = TerminalDepartureIndex::new();

    let departure_accumulator = ingest_pass(
        source,
        calendar,
        ObservationKind::Departure,
        frequency_trip_ids,
        config,
        cancel,
        &mut terminal_index,
        verbose,
    )?;

    let arrival_accumulator = ingest_pass(
        source,
        calendar,
        ObservationKind::Arrival,
        frequency_trip_ids,
        config,
        cancel,
        &mut terminal_index,
        verbose,
    )?;

    Ok(IngestOutcome {
        departure_accumulator,
        arrival_accumulator,
        terminal_index,
    })
}

#[allow(clippy::too_many_arguments)]
fn ingest_pass(
    source: &dyn ObservationSource,
    calendar: &dyn Calendar,
    kind: ObservationKind,
    frequency_trip_ids: &HashSet<String>,
    config: &RefinementConfig,
    cancel: &CancellationToken,
    terminal_index: &mut TerminalDepartureIndex,
    verbose: bool,
) -> FnResult<Accumulator> {
    let mut acc = Accumulator::new();
    let mut window_start = config.begin_time;

    while window_start < config.end_time {
        if cancel.is_cancelled() {
            break;
        }
        let window_end = std::cmp::min(
            window_start + Duration::days(config.window_chunk_days),
            config.end_time,
        );

        if let Err(e) = ingest_window(
            source,
            calendar,
            kind,
            frequency_trip_ids,
            config.page_size,
            window_start,
            window_end,
            cancel,
            terminal_index,
            &mut acc,
            verbose,
        ) {
            // SourceError: logged, window abandoned, ingestion continues.
            eprintln!(
                "observation source error for window {}..{} ({:?}): {} — abandoning window",
                window_start, window_end, kind, e
            );
        }

        window_start = window_end;
    }

    Ok(acc)
}

#[allow(clippy::too_many_arguments)]
fn ingest_window(
    source: &dyn ObservationSource,
    calendar: &dyn Calendar,
    kind: ObservationKind,
    frequency_trip_ids: &HashSet<String>,
    page_size: usize,
    window_start: crate::clock::Instant,
    window_end: crate::clock::Instant,
    cancel: &CancellationToken,
    terminal_index: &mut TerminalDepartureIndex,
    acc: &mut Accumulator,
    verbose: bool,
) -> FnResult<()> {
    let mut offset = 0usize;
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }
        let page = source.fetch(window_start, window_end, kind, offset, page_size)?;
        let n = page.observations.len();
        for obs in page.observations {
            process_observation(obs, calendar, frequency_trip_ids, terminal_index, acc, verbose);
        }
        if page.is_last_page {
            return Ok(());
        }
        offset += n;
    }
}

fn process_observation(
    obs: Observation,
    calendar: &dyn Calendar,
    frequency_trip_ids: &HashSet<String>,
    terminal_index: &mut TerminalDepartureIndex,
    acc: &mut Accumulator,
    verbose: bool,
) {
    let is_frequency = frequency_trip_ids.contains(&obs.trip_id);
    let day = calendar.day_of_year(obs.instant);
    let seconds_into_day = calendar.seconds_into_day(obs.instant);

    if obs.kind == ObservationKind::Departure && obs.stop_path_index == 0 && is_frequency {
        let key = TerminalKey::new(obs.vehicle_id.clone(), obs.block_id.clone(), day);
        terminal_index.record(key, seconds_into_day);
    }

    let seconds = if is_frequency {
        let key = TerminalKey::new(obs.vehicle_id.clone(), obs.block_id.clone(), day);
        match terminal_index.get(&key) {
            None => {
                if verbose {
                    eprintln!(
                        "{}",
                        DataAnomaly(format!(
                            "frequency trip {} has no recorded terminal departure for this run, skipping observation",
                            obs.trip_id
                        ))
                    );
                }
                return;
            }
            Some(terminal) => {
                if terminal > seconds_into_day {
                    eprintln!(
                        "{}",
                        DataAnomaly(format!(
                            "observation for trip {} at {} precedes its recorded terminal departure, skipping",
                            obs.trip_id, obs.stop_id
                        ))
                    );
                    return;
                }
                seconds_into_day - terminal
            }
        }
    } else {
        seconds_into_day
    };

    let key = TripStopKey::new(obs.trip_id.clone(), obs.stop_id.clone());
    acc.insert(&obs.route_id, key, seconds);
    // `obs` is dropped here: its fields were only ever needed to compute
    // `seconds`, matching the single-use lifecycle in the data model.
}
