//! Continuous power-law model: maximum-likelihood fitting and inverse-CDF sampling.
//!
//! The model has density proportional to `x^(-alpha)` for `x >= x_minimum`, so
//! that `P(X > x) = (x / x_minimum)^(1 - alpha)`.
//!
//! ## Estimation
//!
//! With `n` observations at or above `x_minimum`, the maximum-likelihood shape is
//!
//! ```text
//! alpha = 1 + n / sum_i ln(x_i / x_minimum)
//! ```
//!
//! ## Sampling
//!
//! Synthetic draws come from the power law truncated to `[x_minimum, x_maximum]`
//! by inverting its CDF at a uniform `u`:
//!
//! ```text
//! x = x_minimum * (1 - u * (1 - (x_minimum / x_maximum)^(alpha - 1)))^(-1 / (alpha - 1))
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{validate_all_finite, validate_positive, AppreciationError, AppreciationResult};
use crate::rng::StudyRng;

/// Fitted power-law parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PowerLawModel {
    /// Shape parameter, always > 1
    pub alpha: f64,
    /// Lower support bound, always > 0
    pub x_minimum: f64,
}

impl PowerLawModel {
    /// Build a model from known parameters.
    pub fn new(alpha: f64, x_minimum: f64) -> AppreciationResult<Self> {
        validate_positive(x_minimum, "x_minimum")?;
        if !alpha.is_finite() || alpha <= 1.0 {
            return Err(AppreciationError::DegenerateShapeParameter {
                reason: format!("alpha = {} must be finite and > 1", alpha),
            });
        }
        Ok(Self { alpha, x_minimum })
    }

    /// Model CDF at `x`.
    pub fn cdf(&self, x: f64) -> f64 {
        power_law_cdf(x, self.alpha, self.x_minimum)
    }
}

/// Power-law CDF `1 - (x / x_minimum)^(1 - alpha)`.
pub fn power_law_cdf(x: f64, alpha: f64, x_minimum: f64) -> f64 {
    1.0 - (x / x_minimum).powf(1.0 - alpha)
}

/// Maximum-likelihood fit of the shape parameter above `x_minimum`.
///
/// When `x_minimum` is `None` the sample minimum is used.
///
/// # Errors
/// * `EmptyFilteredSample` if no value is at or above `x_minimum`
/// * `DegenerateShapeParameter` if fewer than two values lie strictly above
///   `x_minimum` (the log-sum collapses) or the estimate is not a valid shape
///
/// # Example
/// ```rust
/// use tract_appreciation::power_law::fit;
///
/// let model = fit(&[2.0, 3.0, 4.0, 5.0, 10.0], Some(2.0)).unwrap();
/// assert!((model.alpha - 2.379561).abs() < 1e-6);
/// ```
pub fn fit(sample: &[f64], x_minimum: Option<f64>) -> AppreciationResult<PowerLawModel> {
    validate_all_finite(sample, "sample")?;

    let x_minimum = match x_minimum {
        Some(x) => x,
        None => sample
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min),
    };
    if sample.is_empty() {
        return Err(AppreciationError::EmptyFilteredSample { x_minimum });
    }
    validate_positive(x_minimum, "x_minimum")?;

    let mut n = 0usize;
    let mut above = 0usize;
    let mut log_sum = 0.0;
    for &value in sample.iter().filter(|&&v| v >= x_minimum) {
        n += 1;
        if value > x_minimum {
            above += 1;
        }
        log_sum += (value / x_minimum).ln();
    }

    if n == 0 {
        return Err(AppreciationError::EmptyFilteredSample { x_minimum });
    }
    if above < 2 || log_sum <= 0.0 {
        return Err(AppreciationError::DegenerateShapeParameter {
            reason: format!(
                "{} of {} filtered values exceed x_minimum = {}; need at least 2",
                above, n, x_minimum
            ),
        });
    }

    let alpha = 1.0 + n as f64 / log_sum;
    log::debug!(
        "Power-law MLE: n = {}, x_minimum = {}, alpha = {}",
        n,
        x_minimum,
        alpha
    );
    PowerLawModel::new(alpha, x_minimum)
}

/// Draw `count` values from the power law truncated to `[x_minimum, x_maximum]`.
///
/// # Preconditions
/// `alpha` must be finite and different from 1, and `0 < x_minimum < x_maximum`.
pub fn sample_power_law(
    count: usize,
    alpha: f64,
    x_minimum: f64,
    x_maximum: f64,
    rng: &mut StudyRng,
) -> AppreciationResult<Vec<f64>> {
    let sampler = TruncatedPowerLaw::new(alpha, x_minimum, x_maximum)?;
    Ok((0..count).map(|_| sampler.sample(rng)).collect())
}

/// Inverse-CDF sampler with its constants precomputed.
#[derive(Debug, Clone, Copy)]
pub struct TruncatedPowerLaw {
    x_minimum: f64,
    x_maximum: f64,
    tail_mass: f64,
    exponent: f64,
}

impl TruncatedPowerLaw {
    /// Validate parameters and precompute the inverse-CDF constants.
    pub fn new(alpha: f64, x_minimum: f64, x_maximum: f64) -> AppreciationResult<Self> {
        if !alpha.is_finite() || alpha == 1.0 {
            return Err(AppreciationError::DegenerateShapeParameter {
                reason: format!("sampling requires a finite alpha != 1, got {}", alpha),
            });
        }
        validate_positive(x_minimum, "x_minimum")?;
        if !x_maximum.is_finite() || x_maximum <= x_minimum {
            return Err(AppreciationError::InvalidParameter {
                parameter: "x_maximum".to_string(),
                value: x_maximum,
                constraint: format!("finite and > x_minimum = {}", x_minimum),
            });
        }

        Ok(Self {
            x_minimum,
            x_maximum,
            tail_mass: 1.0 - (x_minimum / x_maximum).powf(alpha - 1.0),
            exponent: -1.0 / (alpha - 1.0),
        })
    }

    /// One draw.
    pub fn sample(&self, rng: &mut StudyRng) -> f64 {
        let u = rng.f64();
        let x = self.x_minimum * (1.0 - u * self.tail_mass).powf(self.exponent);
        // Rounding in powf can step a hair outside the support
        x.clamp(self.x_minimum, self.x_maximum)
    }
}
