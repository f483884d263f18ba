//! Per-route quantile fitter (spec §4.4): bisection search for the
//! σ-multiplier `k` that makes the route-wide early fraction match the
//! configured target, then stamps `best_value` onto every Stats on that
//! route. Routes are fit independently of one another, so they're fit in
//! parallel with `rayon`, the way the teacher parallelizes independent
//! per-entity work in `PerScheduleImporter::process_message`.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::estimator::Stats;
use crate::stats::{count_early, round_to_seconds};
use crate::types::TripStopKey;

/// Fraction of filtered observations across the route that fall below
/// `mean - k * sigma` at each stop. Stats with fewer than two filtered
/// observations (sigma undefined) contribute neither numerator nor
/// denominator.
pub fn frac_early(stats: &[&Stats], k: f64) -> f64 {
    let mut early = 0usize;
    let mut total = 0usize;
    for s in stats {
        if s.filtered_times.len() < 2 {
            continue;
        }
        let sigma = match s.std_dev {
            Some(sigma) => sigma,
            None => continue,
        };
        early += count_early(&s.filtered_times, s.mean, sigma, k);
        total += s.filtered_times.len();
    }
    if total == 0 {
        0.0
    } else {
        early as f64 / total as f64
    }
}

/// Bisection on `k ∈ [0, 2]` starting at `k = 1`, for a fixed number of
/// iterations (5 is the default; target error ≈ 2⁻⁵).
pub fn fit_k(stats: &[&Stats], desired_fraction_early: f64, iterations: u32) -> f64 {
    let mut lower = 0.0_f64;
    let mut upper = 2.0_f64;
    let mut k = 1.0_f64;

    for _ in 0..iterations {
        let frac = frac_early(stats, k);
        if frac < desired_fraction_early {
            // Not enough early observations yet: a smaller k raises the
            // threshold (mean - k*sigma increases), admitting more.
            upper = k;
        } else {
            lower = k;
        }
        k = (lower + upper) / 2.0;
    }
    k
}

/// Fits one route's `k` and stamps `best_value` on every Stats on it.
/// Returns the chosen `k` for diagnostics/logging.
pub fn fit_route(
    stats_by_key: &mut HashMap<TripStopKey, Stats>,
    desired_fraction_early: f64,
    iterations: u32,
) -> f64 {
    let k = {
        let refs: Vec<&Stats> = stats_by_key.values().collect();
        fit_k(&refs, desired_fraction_early, iterations)
    };

    for stats in stats_by_key.values_mut() {
        let best = match stats.std_dev {
            Some(sigma) => round_to_seconds(stats.mean - k * sigma),
            None => round_to_seconds(stats.mean),
        };
        stats.best_value = Some(best);
    }

    k
}

/// Fits every route independently and in parallel. Returns the chosen
/// `k` per route, keyed by route_id, for the per-route fit diagnostics
/// the log stream reports.
pub fn fit_all_routes(
    routes: &mut HashMap<String, HashMap<TripStopKey, Stats>>,
    desired_fraction_early: f64,
    iterations: u32,
) -> HashMap<String, f64> {
    routes
        .par_iter_mut()
        .map(|(route_id, stats_by_key)| {
            let k = fit_route(stats_by_key, desired_fraction_early, iterations);
            (route_id.clone(), k)
        })
        .collect()
}
