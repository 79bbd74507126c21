//! Pairs bootstrap confidence bands for the kernel smoother.
//!
//! Each replicate resamples `(x_i, y_i)` pairs with replacement, refits the
//! Nadaraya-Watson smoother at the evaluation points with the bandwidth held
//! fixed, and records the curve. Pointwise percentile bounds of the replicate
//! curves form the band.
//!
//! A resample can leave an evaluation point without kernel support (every
//! nearby observation drawn zero times). Such replicates are dropped and
//! counted; too many drops fail the computation rather than quietly
//! narrowing the band.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{
    validate_all_finite, validate_count, validate_data_length, validate_positive,
    validate_probability, validate_same_length, AppreciationError, AppreciationResult,
};
use crate::kernel_smoothing::{weighted_average, GaussianKernel};
use crate::math_utils::{float_total_cmp, quantile_type7};
use crate::replicates::{run_replicates, ReplicatePlan};
use crate::rng::resolve_seed;

/// Largest fraction of replicates that may be dropped for lack of kernel support.
pub const MAX_DROPPED_FRACTION: f64 = 0.2;

/// Bootstrap configuration for smoothing confidence bands.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BootstrapConfiguration {
    /// Number of bootstrap resamples
    pub num_bootstrap_samples: usize,
    /// Two-sided confidence level, e.g. 0.95
    pub confidence_level: f64,
    /// Kernel used for every refit
    pub kernel: GaussianKernel,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Enable parallel computation where supported
    pub parallel: bool,
}

impl Default for BootstrapConfiguration {
    fn default() -> Self {
        Self {
            num_bootstrap_samples: 1000,
            confidence_level: 0.95,
            kernel: GaussianKernel::Unnormalized,
            seed: None,
            parallel: true,
        }
    }
}

/// Replicate curves from a bootstrap run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BootstrapEnsemble {
    /// One curve per retained replicate, aligned with the evaluation points
    pub replicates: Vec<Vec<f64>>,
    /// Replicates dropped for lack of kernel support
    pub dropped: usize,
}

impl BootstrapEnsemble {
    /// Sorted replicate values at evaluation point `index`.
    pub fn sorted_column(&self, index: usize) -> Vec<f64> {
        let mut column: Vec<f64> = self.replicates.iter().map(|curve| curve[index]).collect();
        column.sort_by(float_total_cmp);
        column
    }
}

/// Pointwise bootstrap confidence band.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BootstrapInterval {
    /// Evaluation points
    pub points: Vec<f64>,
    /// Lower bound at each point
    pub lower: Vec<f64>,
    /// Upper bound at each point
    pub upper: Vec<f64>,
    /// Confidence level of the band
    pub confidence_level: f64,
    /// Bandwidth held fixed across replicates
    pub bandwidth: f64,
    /// Replicate curves
    pub ensemble: BootstrapEnsemble,
}

impl BootstrapInterval {
    /// Whether `value` lies inside the band at evaluation point `index`.
    pub fn contains(&self, index: usize, value: f64) -> bool {
        self.lower[index] <= value && value <= self.upper[index]
    }
}

/// Percentile bounds `((1-c)/2, 1-(1-c)/2)` of each ensemble column.
pub fn percentile_bounds(
    ensemble: &BootstrapEnsemble,
    num_points: usize,
    confidence_level: f64,
) -> AppreciationResult<(Vec<f64>, Vec<f64>)> {
    validate_probability(confidence_level, "confidence_level")?;
    if ensemble.replicates.is_empty() {
        return Err(AppreciationError::BootstrapError {
            reason: "no bootstrap replicates to summarise".to_string(),
        });
    }

    let tail = (1.0 - confidence_level) / 2.0;
    let mut lower = Vec::with_capacity(num_points);
    let mut upper = Vec::with_capacity(num_points);
    for index in 0..num_points {
        let column = ensemble.sorted_column(index);
        lower.push(quantile_type7(&column, tail));
        upper.push(quantile_type7(&column, 1.0 - tail));
    }
    Ok((lower, upper))
}

/// Pairs-bootstrap percentile band for the kernel smoother at `eval_points`.
///
/// # Example
/// ```rust
/// use tract_appreciation::{bootstrap_ci, BootstrapConfiguration};
///
/// let x: Vec<f64> = (0..30).map(|i| 1990.0 + i as f64).collect();
/// let y: Vec<f64> = x.iter().map(|t| 1000.0 + 10.0 * (t - 1990.0)).collect();
/// let config = BootstrapConfiguration { num_bootstrap_samples: 200, seed: Some(7), ..Default::default() };
///
/// let band = bootstrap_ci(&x, &y, 3.0, &[1995.0, 2005.0], &config).unwrap();
/// assert!(band.lower[0] <= band.upper[0]);
/// ```
pub fn bootstrap_ci(
    x: &[f64],
    y: &[f64],
    bandwidth: f64,
    eval_points: &[f64],
    config: &BootstrapConfiguration,
) -> AppreciationResult<BootstrapInterval> {
    validate_same_length(x, "x", y, "y")?;
    validate_data_length(x, 1, "bootstrap_ci")?;
    validate_all_finite(x, "x")?;
    validate_all_finite(y, "y")?;
    validate_all_finite(eval_points, "eval_points")?;
    validate_positive(bandwidth, "bandwidth")?;
    validate_count(config.num_bootstrap_samples, "num_bootstrap_samples")?;
    validate_probability(config.confidence_level, "confidence_level")?;

    let n = x.len();
    let base_seed = resolve_seed(config.seed);
    let plan = ReplicatePlan::new(config.num_bootstrap_samples, base_seed, config.parallel);

    let outcomes = run_replicates(plan, |_, rng| {
        let indices = rng.resample_indices(n);
        let xb: Vec<f64> = indices.iter().map(|&i| x[i]).collect();
        let yb: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let curve: AppreciationResult<Vec<f64>> = eval_points
            .iter()
            .map(|&x0| weighted_average(x0, &xb, &yb, bandwidth, config.kernel, None))
            .collect();
        match curve {
            Ok(curve) => Ok(Some(curve)),
            Err(AppreciationError::ZeroKernelSupport { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    })?;

    let total = outcomes.len();
    let replicates: Vec<Vec<f64>> = outcomes.into_iter().flatten().collect();
    let dropped = total - replicates.len();

    if dropped > 0 {
        log::warn!(
            "{} of {} bootstrap replicates had no kernel support at some evaluation point",
            dropped,
            total
        );
    }
    if dropped as f64 > MAX_DROPPED_FRACTION * total as f64 {
        return Err(AppreciationError::BootstrapError {
            reason: format!(
                "{} of {} replicates lacked kernel support (limit {:.0}%); widen the bandwidth",
                dropped,
                total,
                MAX_DROPPED_FRACTION * 100.0
            ),
        });
    }

    let ensemble = BootstrapEnsemble {
        replicates,
        dropped,
    };
    let (lower, upper) = percentile_bounds(&ensemble, eval_points.len(), config.confidence_level)?;

    Ok(BootstrapInterval {
        points: eval_points.to_vec(),
        lower,
        upper,
        confidence_level: config.confidence_level,
        bandwidth,
        ensemble,
    })
}
