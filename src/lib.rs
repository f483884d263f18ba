//! Offline batch analytics core for transit schedule refinement from AVL
//! observations. Given a GTFS feed's `stop_times.txt`, a window of
//! recorded vehicle observations, and a configuration, the engine
//! produces a revised `stop_times.txt_new` plus a diagnostic
//! `stop_times.txt_extended`, and an adherence report comparing the
//! original schedule against the revised one.
//!
//! The crate is organized the way the teacher's importer is: small,
//! independently-testable modules (`stats`, `estimator`, `fitter`,
//! `adherence`) wired together by one orchestration type (`engine`),
//! with the I/O-facing capabilities (`gtfs`, `observation`, `clock`)
//! expressed as traits so tests can substitute in-memory fakes.

pub mod adherence;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod fitter;
pub mod gtfs;
pub mod ingest;
pub mod observation;
pub mod schedule;
pub mod stats;
pub mod types;

pub use cancel::CancellationToken;
pub use config::RefinementConfig;
pub use engine::{Engine, ProcessOutcome, RouteFitDiagnostics};
pub use error::FnResult;
