use std::error::Error;
use std::fmt;

use simple_error::bail;

/// Alias used throughout the crate so we don't have to repeat
/// `std::result::Result` at every call site.
pub type FnResult<R> = std::result::Result<R, Box<dyn Error>>;

/// Convenience trait for turning `Option`/`Result` into an `FnResult`
/// with a human-readable message, the way `main.rs::OrError` does in
/// the importer this crate grew out of.
pub trait OrError<T> {
    fn or_error(self, message: &str) -> FnResult<T>;
}

impl<T> OrError<T> for Option<T> {
    fn or_error(self, message: &str) -> FnResult<T> {
        match self {
            Some(t) => Ok(t),
            None => bail!(message.to_string()),
        }
    }
}

impl<T, E: fmt::Debug> OrError<T> for std::result::Result<T, E> {
    fn or_error(self, message: &str) -> FnResult<T> {
        match self {
            Ok(t) => Ok(t),
            Err(e) => bail!(format!("{}\nInner error: {:?}", message, e)),
        }
    }
}

/// Invalid fraction, non-positive thresholds, missing directory. Fatal,
/// surfaced at startup before any I/O happens.
#[derive(Debug)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.0)
    }
}
impl Error for ConfigError {}

/// Missing or malformed `stop_times.txt` / `frequencies.txt`. Fatal.
#[derive(Debug)]
pub struct GtfsError(pub String);

impl fmt::Display for GtfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GTFS error: {}", self.0)
    }
}
impl Error for GtfsError {}

/// A page fetch from the observation source failed. Non-fatal: the
/// window that produced it is abandoned, other windows continue.
#[derive(Debug)]
pub struct SourceError(pub String);

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observation source error: {}", self.0)
    }
}
impl Error for SourceError {}

/// Cannot create output files. Fatal, but only raised after ingestion
/// has already completed, so either both files are written or none are.
#[derive(Debug)]
pub struct WriteError(pub String);

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write error: {}", self.0)
    }
}
impl Error for WriteError {}

/// A single observation or row was discarded for violating an invariant
/// (unknown trip/stop, frequency trip missing its terminal departure, an
/// observation preceding its terminal departure). Non-fatal by
/// construction: raising one never aborts the run, it only logs what
/// was dropped and why.
#[derive(Debug)]
pub struct DataAnomaly(pub String);

impl fmt::Display for DataAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataAnomaly: {}", self.0)
    }
}
impl Error for DataAnomaly {}
