//! Nadaraya-Watson kernel regression with a Gaussian kernel.
//!
//! The estimate at `x0` is the kernel-weighted average of the responses:
//!
//! ```text
//! m(x0) = sum_j K((x0 - x_j) / h) y_j / sum_j K((x0 - x_j) / h)
//! ```
//!
//! Any constant factor in `K` cancels, so the unnormalized kernel
//! `exp(-u^2 / 2)` and the density `exp(-u^2 / 2) / (h sqrt(2 pi))` give the
//! same estimate; both are offered for parity with existing analyses.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{
    validate_all_finite, validate_data_length, validate_positive, validate_same_length,
    AppreciationError, AppreciationResult,
};

/// Gaussian kernel variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GaussianKernel {
    /// `exp(-u^2 / 2)`
    #[default]
    Unnormalized,
    /// `exp(-u^2 / 2) / (h sqrt(2 pi))`
    Normalized,
}

impl GaussianKernel {
    /// Weight of a training point at distance `distance` for bandwidth `h`.
    #[inline]
    pub fn weight(self, distance: f64, bandwidth: f64) -> f64 {
        let u = distance / bandwidth;
        let w = (-0.5 * u * u).exp();
        match self {
            GaussianKernel::Unnormalized => w,
            GaussianKernel::Normalized => {
                w / (bandwidth * (2.0 * std::f64::consts::PI).sqrt())
            }
        }
    }
}

/// Smoothed curve evaluated on a set of points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmoothingResult {
    /// Bandwidth used
    pub bandwidth: f64,
    /// Evaluation points, in caller order
    pub points: Vec<f64>,
    /// Estimate at each evaluation point
    pub estimates: Vec<f64>,
}

impl SmoothingResult {
    /// Iterate over `(point, estimate)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.iter().copied().zip(self.estimates.iter().copied())
    }

    /// Estimate at an evaluation point, if it was evaluated.
    pub fn estimate_at(&self, point: f64) -> Option<f64> {
        self.iter().find(|&(p, _)| p == point).map(|(_, e)| e)
    }
}

/// Weighted average over the training points, skipping index `skip` if given.
///
/// Inputs are assumed validated; this is the inner loop shared by the public
/// smoother and leave-one-out cross-validation.
pub(crate) fn weighted_average(
    x_eval: f64,
    x: &[f64],
    y: &[f64],
    bandwidth: f64,
    kernel: GaussianKernel,
    skip: Option<usize>,
) -> AppreciationResult<f64> {
    let mut sum_w = 0.0;
    let mut sum_wy = 0.0;
    for (j, (&xj, &yj)) in x.iter().zip(y).enumerate() {
        if Some(j) == skip {
            continue;
        }
        let w = kernel.weight(x_eval - xj, bandwidth);
        sum_w += w;
        sum_wy += w * yj;
    }

    if sum_w <= 0.0 || !sum_w.is_finite() {
        return Err(AppreciationError::ZeroKernelSupport { x_eval, bandwidth });
    }
    Ok(sum_wy / sum_w)
}

fn validate_training_data(x: &[f64], y: &[f64], bandwidth: f64) -> AppreciationResult<()> {
    validate_same_length(x, "x", y, "y")?;
    validate_data_length(x, 1, "nadaraya_watson")?;
    validate_all_finite(x, "x")?;
    validate_all_finite(y, "y")?;
    validate_positive(bandwidth, "bandwidth")
}

/// Nadaraya-Watson estimate at a single point.
///
/// # Errors
/// * `ZeroKernelSupport` if every weight underflows to zero
/// * `InvalidParameter` for a non-positive bandwidth
/// * `DimensionMismatch` / `InsufficientData` for malformed training data
pub fn nadaraya_watson(
    x_eval: f64,
    x: &[f64],
    y: &[f64],
    bandwidth: f64,
    kernel: GaussianKernel,
) -> AppreciationResult<f64> {
    validate_training_data(x, y, bandwidth)?;
    weighted_average(x_eval, x, y, bandwidth, kernel, None)
}

/// Nadaraya-Watson estimates at every evaluation point.
pub fn smooth(
    eval_points: &[f64],
    x: &[f64],
    y: &[f64],
    bandwidth: f64,
    kernel: GaussianKernel,
) -> AppreciationResult<SmoothingResult> {
    validate_training_data(x, y, bandwidth)?;
    validate_all_finite(eval_points, "eval_points")?;

    let estimates = eval_points
        .iter()
        .map(|&x0| weighted_average(x0, x, y, bandwidth, kernel, None))
        .collect::<AppreciationResult<Vec<f64>>>()?;

    Ok(SmoothingResult {
        bandwidth,
        points: eval_points.to_vec(),
        estimates,
    })
}
