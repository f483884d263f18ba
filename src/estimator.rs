//! Robust per-(trip,stop) estimator (spec §4.3): two outlier filters,
//! then mean/σ/min/max over what survives. Numeric routines here never
//! fail; a degenerate input (everything filtered out) yields `None`
//! rather than a panic or an error, so the caller can fall back to the
//! original schedule time.

use crate::stats::{mean, sample_std_dev};

#[derive(Debug, Clone)]
pub struct Stats {
    pub unfiltered_times: Vec<i64>,
    pub filtered_times: Vec<i64>,
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub min: i64,
    pub max: i64,
    /// Filled in later by the per-route fitter; `None` until then.
    pub best_value: Option<i64>,
}

/// Filters `times` against the mean-deviation and original-deviation
/// bands, then computes mean/σ/min/max over the survivors. `original`
/// being absent disables the second filter, matching "if original is
/// unavailable, apply only the first filter."
pub fn estimate(
    times: &[i64],
    original: Option<i64>,
    max_deviation_from_mean_sec: i64,
    max_deviation_from_original_sec: i64,
) -> Option<Stats> {
    let mean0 = mean(times)?;

    let filtered: Vec<i64> = times
        .iter()
        .copied()
        .filter(|&t| {
            let within_mean_band = ((t as f64) - mean0).abs() <= max_deviation_from_mean_sec as f64;
            let within_original_band = match original {
                Some(orig) => (t - orig).abs() <= max_deviation_from_original_sec,
                None => true,
            };
            within_mean_band && within_original_band
        })
        .collect();

    if filtered.is_empty() {
        return None;
    }

    let filtered_mean = mean(&filtered)?;
    let std_dev = sample_std_dev(&filtered, filtered_mean);
    let min = *filtered.iter().min().unwrap();
    let max = *filtered.iter().max().unwrap();

    Some(Stats {
        unfiltered_times: times.to_vec(),
        filtered_times: filtered,
        mean: filtered_mean,
        std_dev,
        min,
        max,
        best_value: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_smoke_test_mean_and_std_dev() {
        let times = vec![2, 4, 4, 4, 4, 5, 5, 7, 9];
        let stats = estimate(&times, Some(5), 1_000_000, 1_000_000).unwrap();
        assert!((stats.mean - 4.888_888_888_888_889).abs() < 1e-9);
        assert!((stats.std_dev.unwrap() - 2.027_588_1).abs() < 1e-5);
        assert_eq!(stats.filtered_times, stats.unfiltered_times);
    }

    #[test]
    fn outlier_filtered_by_mean_deviation() {
        // The initial mean over all five points is 181.2, so the band
        // has to be wide enough to keep the tight cluster (all within
        // ~82 of that initial mean) while still excluding 500.
        let times = vec![100, 101, 102, 103, 500];
        let stats = estimate(&times, Some(100), 90, 1_000_000).unwrap();
        assert_eq!(stats.filtered_times, vec![100, 101, 102, 103]);
        assert!((stats.mean - 101.5).abs() < 1e-9);
        let expected_var = (1.5f64.powi(2) + 0.5f64.powi(2) + 0.5f64.powi(2) + 1.5f64.powi(2)) / 3.0;
        assert!((stats.std_dev.unwrap() - expected_var.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn outlier_filtered_by_original_deviation() {
        let times = vec![300, 305, 600];
        let stats = estimate(&times, Some(300), 1_000_000, 60).unwrap();
        assert_eq!(stats.filtered_times, vec![300, 305]);
    }

    #[test]
    fn empty_retained_set_yields_no_stats() {
        let times = vec![1000];
        let stats = estimate(&times, Some(0), 10, 10);
        assert!(stats.is_none());
    }

    #[test]
    fn single_observation_has_no_std_dev() {
        let times = vec![42];
        let stats = estimate(&times, None, 1_000_000, 1_000_000).unwrap();
        assert_eq!(stats.std_dev, None);
        assert_eq!(stats.min, 42);
        assert_eq!(stats.max, 42);
    }

    #[test]
    fn estimator_is_idempotent_on_an_already_filtered_array() {
        let times = vec![100, 102, 98, 101, 99];
        let first = estimate(&times, Some(100), 50, 50).unwrap();
        let second = estimate(&first.filtered_times, Some(100), 50, 50).unwrap();
        assert_eq!(first.filtered_times, second.filtered_times);
    }

    #[test]
    fn no_original_disables_the_original_deviation_filter() {
        let times = vec![10, 12, 1000];
        let stats = estimate(&times, None, 5, 1).unwrap();
        // mean0 is pulled high by the outlier, so a small mean-deviation
        // band alone removes it; the original-deviation filter never runs.
        assert!(!stats.filtered_times.contains(&1000));
    }
}
