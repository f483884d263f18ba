//! Clock/Calendar helper: converts absolute instants into seconds-into-day
//! and day-of-year in the agency's local calendar. Grounded on the way
//! `GtfsDateTime` wraps `chrono::NaiveDate`/`Duration` conversions, but
//! exposed as an injected capability (see `Calendar`) rather than a
//! standalone value type, per the four named capabilities in the design
//! notes (GTFS reader, GTFS writer, observation source, clock).

use chrono::{Datelike, NaiveDateTime, Timelike};

/// Absolute wall-clock instant. We model agency-local time directly as a
/// naive datetime: the engine never crosses time zones within one run, so
/// carrying a `Tz` generic parameter throughout the pipeline would add
/// ceremony without changing behaviour.
pub type Instant = NaiveDateTime;

/// The four named capabilities are dependency-injected; `Calendar` is one
/// of them. A real deployment would supply an implementation aware of the
/// agency's actual service-day rollover rules (e.g. GTFS's after-midnight
/// convention); tests use `LocalCalendar`, which treats `Instant` as
/// already being in agency-local time.
pub trait Calendar: Send + Sync {
    /// Seconds elapsed since local midnight of `instant`'s calendar date.
    /// May be used directly as GTFS-style seconds-from-midnight; this
    /// helper never folds after-midnight service back under 86400,
    /// because the caller (ingestion) needs to compare against
    /// schedule seconds that may themselves exceed 86400.
    fn seconds_into_day(&self, instant: Instant) -> i64;

    /// A value that identifies "the same service day" for two instants.
    /// Encoded as `year * 1000 + ordinal_day` so that it behaves like the
    /// day-of-year the spec names while remaining unambiguous across a
    /// year boundary (a bare ordinal alone would collide Dec-31 with the
    /// following Jan-1 of a non-leap/leap pair).
    fn day_of_year(&self, instant: Instant) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCalendar;

impl Calendar for LocalCalendar {
    fn seconds_into_day(&self, instant: Instant) -> i64 {
        let time = instant.time();
        (time.hour() as i64) * 3600 + (time.minute() as i64) * 60 + (time.second() as i64)
    }

    fn day_of_year(&self, instant: Instant) -> i64 {
        let date = instant.date();
        (date.year() as i64) * 1000 + date.ordinal() as i64
    }
}
