//! Statistics kernel: mean, sample standard deviation, and the early-count
//! predicate shared by the estimator and the fitter. Numeric routines here
//! never fail; degenerate inputs (empty slices, n<2) yield `None` rather
//! than panicking, matching the "no stats" propagation policy.

/// Arithmetic mean of `values`. `None` when `values` is empty.
pub fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().sum();
    Some(sum as f64 / values.len() as f64)
}

/// Sample standard deviation (divisor n-1). `None` when n<2, matching the
/// NaN-valued sigma the spec describes — we use `Option` rather than NaN
/// so downstream code can't accidentally propagate a NaN through a
/// comparison and get a silently-wrong answer.
pub fn sample_std_dev(values: &[i64], mean_value: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sum_sq: f64 = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean_value;
            d * d
        })
        .sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Counts observations in `values` that are "early" relative to
/// `threshold = mean_value - k * sigma`, i.e. `t < threshold`. Returns 0
/// for an empty slice; callers that need to distinguish "no data" from
/// "nothing was early" should check `values.is_empty()` themselves.
pub fn count_early(values: &[i64], mean_value: f64, sigma: f64, k: f64) -> usize {
    let threshold = mean_value - k * sigma;
    values.iter().filter(|&&t| (t as f64) < threshold).count()
}

/// Rounds to the nearest integer second using round-half-away-from-zero,
/// the conventional meaning of "round" for a schedule time.
pub fn round_to_seconds(value: f64) -> i64 {
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn mean_smoke() {
        let values = vec![2, 4, 4, 4, 4, 5, 5, 7, 9];
        let m = mean(&values).unwrap();
        assert!((m - 4.888_888_888_888_889).abs() < 1e-9);
    }

    #[test]
    fn std_dev_needs_two_values() {
        assert_eq!(sample_std_dev(&[5], 5.0), None);
    }

    #[test]
    fn std_dev_smoke() {
        let values = vec![2, 4, 4, 4, 4, 5, 5, 7, 9];
        let m = mean(&values).unwrap();
        let sd = sample_std_dev(&values, m).unwrap();
        assert!((sd - 2.027_588_1).abs() < 1e-5);
    }

    #[test]
    fn count_early_counts_strict_less_than() {
        let values = vec![480, 540, 600, 660, 720];
        // threshold 540, k=0 -> sigma irrelevant; mean_value acts as threshold directly
        assert_eq!(count_early(&values, 540.0, 0.0, 1.0), 1);
    }

    #[test]
    fn round_half_away_from_zero() {
        assert_eq!(round_to_seconds(3.5), 4);
        assert_eq!(round_to_seconds(-3.5), -4);
        assert_eq!(round_to_seconds(3.2), 3);
    }
}
