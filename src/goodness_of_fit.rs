//! Kolmogorov-Smirnov distance between a sample and a fitted power law.
//!
//! The statistic compares the empirical CDF at each sorted observation,
//! `F_n(x_(i)) = i / n`, with the model CDF at the same point and takes the
//! largest absolute gap:
//!
//! ```text
//! D = max_i | i/n - F(x_(i)) |
//! ```
//!
//! Only observations at or above `x_minimum` enter the comparison.

use crate::errors::{AppreciationError, AppreciationResult};
use crate::math_utils::float_total_cmp;
use crate::power_law::power_law_cdf;

/// Step-function empirical CDF over a sorted sample.
#[derive(Debug, Clone)]
pub struct EmpiricalCdf {
    support: Vec<f64>,
}

impl EmpiricalCdf {
    /// Build from the values at or above `x_minimum`.
    pub fn above_threshold(sample: &[f64], x_minimum: f64) -> AppreciationResult<Self> {
        let mut support: Vec<f64> = sample.iter().copied().filter(|&v| v >= x_minimum).collect();
        if support.is_empty() {
            return Err(AppreciationError::EmptyFilteredSample { x_minimum });
        }
        support.sort_by(float_total_cmp);
        Ok(Self { support })
    }

    /// Number of support points.
    pub fn len(&self) -> usize {
        self.support.len()
    }

    /// Whether the support is empty (never true for a constructed CDF).
    pub fn is_empty(&self) -> bool {
        self.support.is_empty()
    }

    /// Sorted support points.
    pub fn support(&self) -> &[f64] {
        &self.support
    }

    /// CDF value at the 1-indexed rank `k`, i.e. `k / n`.
    pub fn value_at(&self, rank: usize) -> f64 {
        rank as f64 / self.support.len() as f64
    }

    /// Largest absolute difference against a theoretical CDF.
    pub fn max_distance<F>(&self, cdf: F) -> f64
    where
        F: Fn(f64) -> f64,
    {
        self.support
            .iter()
            .enumerate()
            .map(|(i, &x)| (self.value_at(i + 1) - cdf(x)).abs())
            .fold(0.0, f64::max)
    }
}

/// KS statistic of `sample` against the power law `(alpha, x_minimum)`.
///
/// # Errors
/// `EmptyFilteredSample` when no value is at or above `x_minimum`.
pub fn ks_statistic(sample: &[f64], alpha: f64, x_minimum: f64) -> AppreciationResult<f64> {
    let ecdf = EmpiricalCdf::above_threshold(sample, x_minimum)?;
    let d = ecdf.max_distance(|x| power_law_cdf(x, alpha, x_minimum));
    if !d.is_finite() {
        return Err(AppreciationError::NumericalError {
            reason: format!(
                "KS statistic is not finite for alpha = {}, x_minimum = {}",
                alpha, x_minimum
            ),
            operation: Some("ks_statistic".to_string()),
        });
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn quantile(p: f64, alpha: f64, x_minimum: f64) -> f64 {
        x_minimum * (1.0 - p).powf(1.0 / (1.0 - alpha))
    }

    #[test]
    fn test_order_invariance() {
        let a = vec![2.0, 3.0, 4.0, 5.0, 10.0, 2.5, 7.0];
        let b = vec![10.0, 2.5, 5.0, 2.0, 7.0, 4.0, 3.0];
        assert_eq!(
            ks_statistic(&a, 2.2, 2.0).unwrap(),
            ks_statistic(&b, 2.2, 2.0).unwrap()
        );
    }

    #[test]
    fn test_zero_at_exact_percentile_ranks() {
        let (alpha, x_minimum, n) = (2.5, 2.0, 20);
        let mut sample: Vec<f64> = (1..n)
            .map(|i| quantile(i as f64 / n as f64, alpha, x_minimum))
            .collect();
        // The rank-n percentile is at infinity; a far point leaves a gap of 1e-18
        sample.push(x_minimum * 1e12);

        let d = ks_statistic(&sample, alpha, x_minimum).unwrap();
        assert!(d < 1e-12, "expected ~0, got {}", d);
    }

    #[test]
    fn test_hand_computed_statistic() {
        // Single point at x_minimum: ECDF = 1, model CDF = 0
        assert_approx_eq!(ks_statistic(&[2.0], 2.5, 2.0).unwrap(), 1.0, 1e-15);

        // Two points: max(|0.5 - F(x1)|, |1 - F(x2)|)
        let f = |x: f64| power_law_cdf(x, 3.0, 1.0);
        let expected = (0.5 - f(1.5)).abs().max((1.0 - f(4.0)).abs());
        assert_approx_eq!(ks_statistic(&[4.0, 1.5], 3.0, 1.0).unwrap(), expected, 1e-15);
    }

    #[test]
    fn test_ignores_values_below_threshold() {
        let d_full = ks_statistic(&[0.1, 0.5, 2.0, 3.0, 8.0], 2.0, 2.0).unwrap();
        let d_clean = ks_statistic(&[2.0, 3.0, 8.0], 2.0, 2.0).unwrap();
        assert_eq!(d_full, d_clean);
    }

    #[test]
    fn test_empty_filtered_sample() {
        assert!(matches!(
            ks_statistic(&[0.5, 1.0], 2.5, 2.0),
            Err(AppreciationError::EmptyFilteredSample { .. })
        ));
    }

    #[test]
    fn test_empirical_cdf_ranks() {
        let ecdf = EmpiricalCdf::above_threshold(&[5.0, 1.0, 3.0, 4.0], 2.0).unwrap();
        assert_eq!(ecdf.support(), &[3.0, 4.0, 5.0]);
        assert_eq!(ecdf.len(), 3);
        assert_approx_eq!(ecdf.value_at(1), 1.0 / 3.0, 1e-15);
        assert_eq!(ecdf.value_at(3), 1.0);
    }
}
