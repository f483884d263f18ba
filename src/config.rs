//! Fully enumerated configuration (spec §6), validated eagerly so a bad
//! flag is a `ConfigError` raised before any I/O happens, the way the
//! teacher's `Importer::set_dir_paths` validates its directory arguments
//! up front rather than discovering the problem mid-run.

use std::path::PathBuf;

use crate::clock::Instant;
use crate::error::{ConfigError, FnResult};

#[derive(Debug, Clone)]
pub struct RefinementConfig {
    pub gtfs_dir: PathBuf,
    pub begin_time: Instant,
    pub end_time: Instant,

    pub desired_fraction_early: f64,
    pub allowable_deviation_from_mean_sec: i64,
    pub allowable_deviation_from_original_sec: i64,
    pub do_not_update_first_stop_of_trip: bool,

    pub allowable_early_sec: i64,
    pub allowable_late_sec: i64,

    pub page_size: usize,
    pub window_chunk_days: i64,
    pub fit_iterations: u32,
}

impl RefinementConfig {
    pub fn validate(&self) -> FnResult<()> {
        if !(0.0..=1.0).contains(&self.desired_fraction_early) {
            return Err(Box::new(ConfigError(format!(
                "desired_fraction_early must be within [0,1], got {}",
                self.desired_fraction_early
            ))));
        }
        if self.allowable_deviation_from_mean_sec <= 0 {
            return Err(Box::new(ConfigError(
                "allowable_deviation_from_mean_sec must be positive".to_string(),
            )));
        }
        if self.allowable_deviation_from_original_sec <= 0 {
            return Err(Box::new(ConfigError(
                "allowable_deviation_from_original_sec must be positive".to_string(),
            )));
        }
        if self.allowable_early_sec < 0 || self.allowable_late_sec < 0 {
            return Err(Box::new(ConfigError(
                "allowable_early_sec/allowable_late_sec must be non-negative".to_string(),
            )));
        }
        if self.page_size == 0 {
            return Err(Box::new(ConfigError("page_size must be positive".to_string())));
        }
        if self.window_chunk_days <= 0 {
            return Err(Box::new(ConfigError(
                "window_chunk_days must be positive".to_string(),
            )));
        }
        if self.fit_iterations == 0 {
            return Err(Box::new(ConfigError("fit_iterations must be positive".to_string())));
        }
        if self.begin_time >= self.end_time {
            return Err(Box::new(ConfigError(
                "begin_time must be strictly before end_time".to_string(),
            )));
        }
        if !self.gtfs_dir.is_dir() {
            return Err(Box::new(ConfigError(format!(
                "gtfs_dir does not exist or is not a directory: {}",
                self.gtfs_dir.display()
            ))));
        }
        Ok(())
    }
}

impl Default for RefinementConfig {
    fn default() -> Self {
        use chrono::NaiveDate;
        Self {
            gtfs_dir: PathBuf::from("."),
            begin_time: NaiveDate::from_ymd(2024, 1, 1).and_hms(0, 0, 0),
            end_time: NaiveDate::from_ymd(2024, 1, 2).and_hms(0, 0, 0),
            desired_fraction_early: 0.2,
            allowable_deviation_from_mean_sec: 600,
            allowable_deviation_from_original_sec: 900,
            do_not_update_first_stop_of_trip: true,
            allowable_early_sec: 60,
            allowable_late_sec: 300,
            page_size: 500_000,
            window_chunk_days: 1,
            fit_iterations: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_fraction() {
        let mut cfg = RefinementConfig::default();
        cfg.gtfs_dir = std::env::temp_dir();
        cfg.desired_fraction_early = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_sane_defaults_with_real_dir() {
        let mut cfg = RefinementConfig::default();
        cfg.gtfs_dir = std::env::temp_dir();
        assert!(cfg.validate().is_ok());
    }
}
