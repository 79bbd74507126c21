//! Small numerical helpers shared by the estimators.

/// Safe comparison for floating point values (NaN sorts last).
pub fn float_total_cmp(a: &f64, b: &f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal),
    }
}

/// Sorted copy of the input.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(float_total_cmp);
    v
}

/// Arithmetic mean; NaN for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n); NaN for empty input.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|&x| (x - m) * (x - m)).sum();
    (ss / values.len() as f64).sqrt()
}

/// Calculate median of already-sorted data (handles even-length correctly).
pub fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Calculate median.
pub fn median(values: &[f64]) -> f64 {
    median_of_sorted(&sorted_copy(values))
}

/// Quantile of sorted data by linear interpolation between order statistics.
///
/// This is Hyndman-Fan type 7, the default rule of R's `quantile` and
/// NumPy's `percentile`: `h = p (n - 1)`, interpolate between
/// `sorted[floor(h)]` and `sorted[floor(h) + 1]`. `p` is clamped to [0, 1].
pub fn quantile_type7(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let p = p.clamp(0.0, 1.0);
    let h = p * (sorted.len() - 1) as f64;
    let lower = h.floor() as usize;
    let frac = h - lower as f64;

    if lower + 1 < sorted.len() {
        sorted[lower] * (1.0 - frac) + sorted[lower + 1] * frac
    } else {
        sorted[sorted.len() - 1]
    }
}

/// `count` evenly spaced values over `[start, end]`, endpoints included.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// Sorted, deduplicated copy of the input.
pub fn unique_sorted(values: &[f64]) -> Vec<f64> {
    let mut v = sorted_copy(values);
    v.dedup_by(|a, b| a == b);
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_quantile_matches_numpy_linear() {
        // numpy.percentile([1, 2, 3, 4], [2.5, 50, 97.5])
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        assert_approx_eq!(quantile_type7(&sorted, 0.025), 1.075, 1e-12);
        assert_approx_eq!(quantile_type7(&sorted, 0.5), 2.5, 1e-12);
        assert_approx_eq!(quantile_type7(&sorted, 0.975), 3.925, 1e-12);
        assert_eq!(quantile_type7(&sorted, 1.0), 4.0);
        assert_eq!(quantile_type7(&sorted, 0.0), 1.0);
        assert!(quantile_type7(&[], 0.5).is_nan());
    }

    #[test]
    fn test_linspace_endpoints() {
        let grid = linspace(1.0, 15.0, 15);
        assert_eq!(grid.len(), 15);
        assert_eq!(grid[0], 1.0);
        assert_eq!(grid[14], 15.0);
        assert_approx_eq!(grid[1], 2.0, 1e-12);

        let grid = linspace(1.0, 6.0, 10);
        assert_approx_eq!(grid[1], 1.0 + 5.0 / 9.0, 1e-12);
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
        assert!(linspace(3.0, 4.0, 0).is_empty());
    }

    #[test]
    fn test_summary_statistics() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx_eq!(mean(&data), 5.0, 1e-12);
        assert_approx_eq!(population_std(&data), 2.0, 1e-12);
        assert_approx_eq!(median(&data), 4.5, 1e-12);
        assert_eq!(unique_sorted(&data), vec![2.0, 4.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_float_total_cmp_pushes_nan_last() {
        let sorted = sorted_copy(&[3.0, f64::NAN, 1.0]);
        assert_eq!(sorted[0], 1.0);
        assert_eq!(sorted[1], 3.0);
        assert!(sorted[2].is_nan());
    }
}
