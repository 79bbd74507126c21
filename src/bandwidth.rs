//! Leave-one-out cross-validated bandwidth selection for the kernel smoother.
//!
//! For each candidate `h`, every observation is predicted from all the others
//! and the squared errors are averaged:
//!
//! ```text
//! CV(h) = (1/n) sum_i (y_i - m_{-i}(x_i; h))^2
//! ```
//!
//! The selected bandwidth minimises `CV(h)`; ties keep the earliest candidate.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{
    validate_all_finite, validate_data_length, validate_same_length, AppreciationError,
    AppreciationResult,
};
use crate::kernel_smoothing::{weighted_average, GaussianKernel};
use crate::math_utils::linspace;
use crate::replicates::map_indices;

/// Ordered, validated set of candidate bandwidths.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BandwidthGrid {
    values: Vec<f64>,
}

impl BandwidthGrid {
    /// Validate a list of candidates.
    ///
    /// # Errors
    /// `InvalidBandwidthGrid` if the list is empty or any entry is not a
    /// finite positive number.
    pub fn new(values: Vec<f64>) -> AppreciationResult<Self> {
        if values.is_empty() {
            return Err(AppreciationError::InvalidBandwidthGrid {
                reason: "grid is empty".to_string(),
            });
        }
        if let Some((i, &h)) = values
            .iter()
            .enumerate()
            .find(|(_, h)| !h.is_finite() || **h <= 0.0)
        {
            return Err(AppreciationError::InvalidBandwidthGrid {
                reason: format!("entry {} is {}, expected a finite positive value", i, h),
            });
        }
        Ok(Self { values })
    }

    /// `count` evenly spaced candidates over `[start, end]`, as `numpy.linspace`.
    pub fn linspace(start: f64, end: f64, count: usize) -> AppreciationResult<Self> {
        Self::new(linspace(start, end, count))
    }

    /// Candidate values in grid order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a validated grid.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of cross-validated bandwidth selection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BandwidthSelection {
    /// Selected bandwidth
    pub bandwidth: f64,
    /// Leave-one-out MSE of the selected bandwidth
    pub mse: f64,
    /// `(bandwidth, mse)` for every candidate in grid order
    pub scores: Vec<(f64, f64)>,
}

/// Leave-one-out mean squared prediction error for one bandwidth.
///
/// Returns `+inf` when some held-out point has no kernel support among the
/// remaining observations. Folds are spread over rayon only when `parallel`
/// is set.
pub fn loo_cv_mse(
    x: &[f64],
    y: &[f64],
    bandwidth: f64,
    kernel: GaussianKernel,
    parallel: bool,
) -> AppreciationResult<f64> {
    validate_same_length(x, "x", y, "y")?;
    validate_data_length(x, 2, "leave-one-out cross-validation")?;

    let fold = |i: usize| -> AppreciationResult<f64> {
        let prediction = weighted_average(x[i], x, y, bandwidth, kernel, Some(i))?;
        Ok((y[i] - prediction).powi(2))
    };

    match map_indices(x.len(), parallel, fold) {
        Ok(errors) => Ok(errors.iter().sum::<f64>() / errors.len() as f64),
        Err(AppreciationError::ZeroKernelSupport { x_eval, .. }) => {
            log::warn!(
                "Bandwidth {} leaves x = {} without kernel support; scoring it as infinite",
                bandwidth,
                x_eval
            );
            Ok(f64::INFINITY)
        }
        Err(e) => Err(e),
    }
}

/// Select the bandwidth with the smallest leave-one-out MSE.
///
/// # Example
/// ```rust
/// use tract_appreciation::{select_bandwidth, BandwidthGrid, GaussianKernel};
///
/// let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
/// let y: Vec<f64> = x.iter().map(|t| (t / 3.0).sin()).collect();
/// let grid = BandwidthGrid::linspace(0.5, 5.0, 10).unwrap();
///
/// let selection = select_bandwidth(&x, &y, &grid, GaussianKernel::default(), false).unwrap();
/// assert!(grid.values().contains(&selection.bandwidth));
/// ```
pub fn select_bandwidth(
    x: &[f64],
    y: &[f64],
    grid: &BandwidthGrid,
    kernel: GaussianKernel,
    parallel: bool,
) -> AppreciationResult<BandwidthSelection> {
    validate_same_length(x, "x", y, "y")?;
    validate_data_length(x, 2, "select_bandwidth")?;
    validate_all_finite(x, "x")?;
    validate_all_finite(y, "y")?;

    let scores = grid
        .values()
        .iter()
        .map(|&h| Ok((h, loo_cv_mse(x, y, h, kernel, parallel)?)))
        .collect::<AppreciationResult<Vec<(f64, f64)>>>()?;

    let mut best = scores[0];
    for &(h, mse) in &scores[1..] {
        if mse < best.1 {
            best = (h, mse);
        }
    }

    log::debug!("Selected bandwidth {} (LOO MSE {})", best.0, best.1);
    Ok(BandwidthSelection {
        bandwidth: best.0,
        mse: best.1,
        scores,
    })
}
