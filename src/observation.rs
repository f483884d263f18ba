//! Observation data model and the `ObservationSource` capability.
//!
//! `ObservationKind` mirrors the teacher's `EventType` (arrival vs.
//! departure is a tagged choice, not a class hierarchy): the two ingest
//! passes in `ingest` differ only in this tag and in which original GTFS
//! field they compare against.

use crate::clock::Instant;
use crate::error::FnResult;

#[derive(Hash, Eq, PartialEq, Debug, Clone, Copy)]
pub enum ObservationKind {
    Arrival,
    Departure,
}

/// A single AVL-style observation: a (vehicle, place, time) record.
/// Single-use by contract (§3 Lifecycles): callers extract the seconds
/// value and drop the observation immediately afterwards.
#[derive(Debug, Clone)]
pub struct Observation {
    pub route_id: String,
    pub trip_id: String,
    pub stop_id: String,
    pub stop_path_index: u32,
    pub vehicle_id: String,
    pub block_id: String,
    pub instant: Instant,
    pub kind: ObservationKind,
}

/// One page of observations plus whether more pages remain in this
/// window. `fetch` signals end-of-window by returning fewer than
/// `limit` observations, per the external interface contract; we make
/// that explicit as a field instead of asking every caller to compare
/// `observations.len() < limit` themselves.
pub struct ObservationPage {
    pub observations: Vec<Observation>,
    pub is_last_page: bool,
}

/// The observation source is one of the four named, dependency-injected
/// capabilities (GTFS reader, GTFS writer, observation source, clock).
/// Implementations own their own I/O and retry policy; the engine only
/// ever sees `FnResult`, so a failed page fetch is an ordinary
/// `SourceError` the orchestration layer can catch and log without the
/// whole job aborting.
pub trait ObservationSource {
    fn fetch(
        &self,
        window_start: Instant,
        window_end: Instant,
        kind: ObservationKind,
        offset: usize,
        limit: usize,
    ) -> FnResult<ObservationPage>;
}

/// An in-memory observation source used by tests and by small one-off
/// analyses where loading everything up front is acceptable. Filters by
/// window and kind, then paginates the remainder.
pub struct VecObservationSource {
    observations: Vec<Observation>,
}

impl VecObservationSource {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }
}

impl ObservationSource for VecObservationSource {
    fn fetch(
        &self,
        window_start: Instant,
        window_end: Instant,
        kind: ObservationKind,
        offset: usize,
        limit: usize,
    ) -> FnResult<ObservationPage> {
        let matching: Vec<&Observation> = self
            .observations
            .iter()
            .filter(|o| o.kind == kind && o.instant >= window_start && o.instant < window_end)
            .collect();

        let page: Vec<Observation> = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        let is_last_page = page.len() < limit;
        Ok(ObservationPage {
            observations: page,
            is_last_page,
        })
    }
}
