//! GTFS stop_times/frequencies I/O: the reader (with ordering repair),
//! the writer (two output files per refinement run), and the row types
//! they share. Grounded on the teacher's `src/gtfs.rs`, which reads a
//! GTFS CSV table into a keyed map with the `csv` crate; generalized
//! here to stop_times (which needs order-preservation and pass-through
//! columns, so rows are read as `StringRecord` rather than deserialized
//! into a fixed struct) and to writing, which the teacher's `gtfs.rs`
//! never did itself (output there went through `rmp-serde`/`plotters`,
//! both out of scope here).

mod reader;
mod writer;

pub use reader::{CsvGtfsReader, GtfsReader, OrderedStopTimes};
pub use writer::{CsvGtfsWriter, DiagnosticStats, EmittedStopTime, GtfsWriter};

use crate::types::TripStopKey;

/// One row of `stop_times.txt`. Seconds are seconds-from-midnight in
/// service-day local time and may exceed 86400 for after-midnight
/// service. `raw` carries every column from the source file so that
/// fields this crate doesn't model (`shape_dist_traveled`, `pickup_type`,
/// ...) are passed through unchanged on write.
#[derive(Debug, Clone)]
pub struct StopTimeRow {
    pub trip_id: String,
    pub stop_id: String,
    pub stop_sequence: u32,
    pub arrival_sec: i64,
    pub departure_sec: i64,
    pub raw: csv::StringRecord,
}

impl StopTimeRow {
    pub fn key(&self) -> TripStopKey {
        TripStopKey::new(self.trip_id.clone(), self.stop_id.clone())
    }
}
