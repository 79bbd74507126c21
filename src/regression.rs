//! Ordinary least squares with classical and permutation inference.
//!
//! Coefficients come from the normal equations `(XᵀX) β = Xᵀy`, solved with a
//! Cholesky factorisation. Standard errors use `σ² (XᵀX)⁻¹` with
//! `σ² = RSS / (n - k)` and two-sided p-values come from Student's t.
//!
//! The permutation test keeps the design fixed and shuffles the response, so
//! the projection `(XᵀX)⁻¹Xᵀ` is computed once and reused for every
//! permutation.

use std::fmt;

use nalgebra::{Cholesky, DMatrix, DVector};
use rand::seq::SliceRandom;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::errors::{
    validate_all_finite, validate_count, AppreciationError, AppreciationResult,
};
use crate::replicates::{run_replicates, ReplicatePlan};
use crate::rng::resolve_seed;

/// Name given to the intercept column.
pub const INTERCEPT: &str = "const";

const COLLINEARITY_TOLERANCE: f64 = 1e-10;

/// Fitted linear model.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OlsFit {
    /// Coefficient names, intercept first when present
    pub names: Vec<String>,
    /// Point estimates
    pub estimates: Vec<f64>,
    /// Standard errors
    pub standard_errors: Vec<f64>,
    /// t statistics
    pub t_statistics: Vec<f64>,
    /// Two-sided p-values
    pub p_values: Vec<f64>,
    /// Number of observations
    pub n_observations: usize,
    /// Residual degrees of freedom `n - k`
    pub residual_df: usize,
    /// Coefficient of determination
    pub r_squared: f64,
}

impl OlsFit {
    /// Position of a named coefficient.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Estimate of a named coefficient.
    pub fn estimate(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.estimates[i])
    }

    /// Two-sided p-value of a named coefficient.
    pub fn p_value(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.p_values[i])
    }
}

impl fmt::Display for OlsFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "OLS: n = {}, residual df = {}, R^2 = {:.4}",
            self.n_observations, self.residual_df, self.r_squared
        )?;
        writeln!(
            f,
            "{:<32} {:>14} {:>12} {:>10} {:>10}",
            "coefficient", "estimate", "std err", "t", "P>|t|"
        )?;
        for i in 0..self.names.len() {
            writeln!(
                f,
                "{:<32} {:>14.6e} {:>12.4e} {:>10.3} {:>10.4}",
                self.names[i],
                self.estimates[i],
                self.standard_errors[i],
                self.t_statistics[i],
                self.p_values[i]
            )?;
        }
        Ok(())
    }
}

/// Design matrix with its cached normal-equation factors.
#[derive(Debug, Clone)]
pub struct OlsDesign {
    names: Vec<String>,
    x: DMatrix<f64>,
    xtx_inverse: DMatrix<f64>,
    projection: DMatrix<f64>,
}

impl OlsDesign {
    /// Build the design from named predictor columns.
    ///
    /// # Errors
    /// * `DimensionMismatch` if a column length differs from `n_rows`
    /// * `InsufficientData` when there are no more rows than coefficients
    /// * `NumericalError` for a singular `XᵀX`
    pub fn new(
        n_rows: usize,
        predictors: &[(&str, &[f64])],
        add_intercept: bool,
    ) -> AppreciationResult<Self> {
        let mut names = Vec::with_capacity(predictors.len() + 1);
        if add_intercept {
            names.push(INTERCEPT.to_string());
        }
        for (name, column) in predictors {
            if column.len() != n_rows {
                return Err(AppreciationError::DimensionMismatch {
                    left: "response".to_string(),
                    left_len: n_rows,
                    right: (*name).to_string(),
                    right_len: column.len(),
                });
            }
            validate_all_finite(column, name)?;
            names.push((*name).to_string());
        }

        let k = names.len();
        if k == 0 {
            return Err(AppreciationError::InvalidParameter {
                parameter: "predictors".to_string(),
                value: 0.0,
                constraint: "at least one predictor or an intercept".to_string(),
            });
        }
        if n_rows <= k {
            return Err(AppreciationError::InsufficientData {
                required: k + 1,
                actual: n_rows,
            });
        }

        let offset = usize::from(add_intercept);
        let x = DMatrix::from_fn(n_rows, k, |row, col| {
            if add_intercept && col == 0 {
                1.0
            } else {
                predictors[col - offset].1[row]
            }
        });

        let singular = || AppreciationError::NumericalError {
            reason: "design matrix is singular (XᵀX is not positive definite)".to_string(),
            operation: Some("ols_fit".to_string()),
        };
        let xtx = x.transpose() * &x;
        let column_norms = xtx.diagonal();
        let cholesky = Cholesky::new(xtx).ok_or_else(singular)?;

        // Squared pivot over column norm is the share of a column not explained
        // by the columns before it; rounding can leave collinear columns a
        // tiny positive pivot.
        let pivots = cholesky.l().diagonal();
        if pivots
            .iter()
            .zip(column_norms.iter())
            .any(|(&l, &norm)| norm <= 0.0 || l * l / norm < COLLINEARITY_TOLERANCE)
        {
            return Err(singular());
        }
        let xtx_inverse = cholesky.inverse();
        let projection = &xtx_inverse * x.transpose();

        Ok(Self {
            names,
            x,
            xtx_inverse,
            projection,
        })
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    /// Coefficient names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Least-squares coefficients only, for a response of matching length.
    pub fn coefficients(&self, y: &[f64]) -> DVector<f64> {
        &self.projection * DVector::from_column_slice(y)
    }

    /// Full fit with standard errors and t-test p-values.
    pub fn fit(&self, y: &[f64]) -> AppreciationResult<OlsFit> {
        if y.len() != self.n_rows() {
            return Err(AppreciationError::DimensionMismatch {
                left: "response".to_string(),
                left_len: y.len(),
                right: "design".to_string(),
                right_len: self.n_rows(),
            });
        }
        validate_all_finite(y, "response")?;

        let n = self.n_rows();
        let k = self.names.len();
        let residual_df = n - k;

        let y_vec = DVector::from_column_slice(y);
        let beta = &self.projection * &y_vec;
        let residuals = &y_vec - &self.x * &beta;
        let rss = residuals.norm_squared();
        let sigma2 = rss / residual_df as f64;

        let y_mean = y_vec.mean();
        let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
        let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };

        let t_dist = StudentsT::new(0.0, 1.0, residual_df as f64).map_err(|e| {
            AppreciationError::NumericalError {
                reason: format!("Student's t with {} df: {}", residual_df, e),
                operation: Some("ols_fit".to_string()),
            }
        })?;

        let estimates: Vec<f64> = beta.iter().copied().collect();
        let standard_errors: Vec<f64> = (0..k)
            .map(|j| (sigma2 * self.xtx_inverse[(j, j)]).max(0.0).sqrt())
            .collect();
        let t_statistics: Vec<f64> = estimates
            .iter()
            .zip(&standard_errors)
            .map(|(&b, &se)| {
                if se > 0.0 {
                    b / se
                } else if b == 0.0 {
                    0.0
                } else {
                    b.signum() * f64::INFINITY
                }
            })
            .collect();
        let p_values: Vec<f64> = t_statistics
            .iter()
            .map(|&t| {
                if t.is_infinite() {
                    0.0
                } else {
                    (2.0 * (1.0 - t_dist.cdf(t.abs()))).clamp(0.0, 1.0)
                }
            })
            .collect();

        Ok(OlsFit {
            names: self.names.clone(),
            estimates,
            standard_errors,
            t_statistics,
            p_values,
            n_observations: n,
            residual_df,
            r_squared,
        })
    }
}

/// Fit `y` on the named predictor columns.
///
/// # Example
/// ```rust
/// use tract_appreciation::ols_fit;
///
/// let x = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let y = [3.0, 5.0, 7.0, 9.0, 11.0];
/// let fit = ols_fit(&y, &[("x", &x[..])], true).unwrap();
/// assert!((fit.estimate("x").unwrap() - 2.0).abs() < 1e-10);
/// ```
pub fn ols_fit(
    y: &[f64],
    predictors: &[(&str, &[f64])],
    add_intercept: bool,
) -> AppreciationResult<OlsFit> {
    OlsDesign::new(y.len(), predictors, add_intercept)?.fit(y)
}

/// Configuration for the response-permutation test.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PermutationConfig {
    /// Number of response permutations
    pub num_permutations: usize,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Enable parallel computation where supported
    pub parallel: bool,
}

impl Default for PermutationConfig {
    fn default() -> Self {
        Self {
            num_permutations: 5000,
            seed: None,
            parallel: true,
        }
    }
}

/// Outcome of a permutation test on one coefficient.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PermutationTestResult {
    /// Coefficient tested
    pub coefficient: String,
    /// Estimate on the observed data
    pub observed: f64,
    /// Estimates under permuted responses, in permutation order
    pub permuted: Vec<f64>,
    /// Fraction of permuted estimates with `|b| >= |observed|`
    pub p_value: f64,
}

/// Two-sided permutation test of a single coefficient.
///
/// The response is shuffled `num_permutations` times and the model refitted;
/// the p-value is the fraction of permuted estimates at least as extreme in
/// absolute value as the observed one.
pub fn permutation_test(
    y: &[f64],
    predictors: &[(&str, &[f64])],
    coefficient: &str,
    config: &PermutationConfig,
) -> AppreciationResult<PermutationTestResult> {
    validate_count(config.num_permutations, "num_permutations")?;

    let design = OlsDesign::new(y.len(), predictors, true)?;
    let index = design
        .names()
        .iter()
        .position(|n| n == coefficient)
        .ok_or_else(|| AppreciationError::InvalidParameter {
            parameter: format!("coefficient '{}'", coefficient),
            value: f64::NAN,
            constraint: format!("one of {:?}", design.names()),
        })?;

    validate_all_finite(y, "response")?;
    let observed = design.coefficients(y)[index];

    let base_seed = resolve_seed(config.seed);
    log::debug!(
        "Permutation test of '{}': {} permutations, seed = {}",
        coefficient,
        config.num_permutations,
        base_seed
    );

    let plan = ReplicatePlan::new(config.num_permutations, base_seed, config.parallel);
    let permuted = run_replicates(plan, |_, rng| {
        let mut shuffled = y.to_vec();
        shuffled.shuffle(rng);
        Ok(design.coefficients(&shuffled)[index])
    })?;

    let extreme = permuted.iter().filter(|b| b.abs() >= observed.abs()).count();
    let p_value = extreme as f64 / permuted.len() as f64;

    log::info!(
        "Permutation test of '{}': observed = {:.6}, p = {:.4}",
        coefficient,
        observed,
        p_value
    );

    Ok(PermutationTestResult {
        coefficient: coefficient.to_string(),
        observed,
        permuted,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::StudyRng;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_recovers_noiseless_coefficients() {
        let x1: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let x2: Vec<f64> = (0..20).map(|i| ((i * 7) % 11) as f64).collect();
        let y: Vec<f64> = x1
            .iter()
            .zip(&x2)
            .map(|(a, b)| 1.5 - 2.0 * a + 0.25 * b)
            .collect();

        let fit = ols_fit(&y, &[("a", &x1[..]), ("b", &x2[..])], true).unwrap();
        assert_eq!(fit.names, vec!["const", "a", "b"]);
        assert_approx_eq!(fit.estimate("const").unwrap(), 1.5, 1e-9);
        assert_approx_eq!(fit.estimate("a").unwrap(), -2.0, 1e-9);
        assert_approx_eq!(fit.estimate("b").unwrap(), 0.25, 1e-9);
        assert_approx_eq!(fit.r_squared, 1.0, 1e-9);
        assert_eq!(fit.residual_df, 17);
    }

    #[test]
    fn test_simple_regression_standard_error() {
        // y = [1, 3, 2, 5, 4] on x = [1..5]: slope 0.8, RSS = 3.6, Sxx = 10
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 3.0, 2.0, 5.0, 4.0];
        let fit = ols_fit(&y, &[("x", &x[..])], true).unwrap();
        assert_approx_eq!(fit.estimate("x").unwrap(), 0.8, 1e-12);
        let se = (3.6f64 / 3.0 / 10.0).sqrt();
        assert_approx_eq!(fit.standard_errors[1], se, 1e-12);
        assert_approx_eq!(fit.t_statistics[1], 0.8 / se, 1e-10);
        assert!(fit.p_values[1] > 0.05 && fit.p_values[1] < 0.2);
        assert_approx_eq!(fit.r_squared, 0.64, 1e-12);
    }

    #[test]
    fn test_singular_design_is_rejected() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let y = [1.0, 0.0, 1.0, 0.0];
        assert!(matches!(
            ols_fit(&y, &[("a", &a[..]), ("b", &b[..])], true),
            Err(AppreciationError::NumericalError { .. })
        ));
    }

    #[test]
    fn test_too_few_rows() {
        let x = [1.0, 2.0];
        let y = [1.0, 2.0];
        assert!(matches!(
            ols_fit(&y, &[("x", &x[..])], true),
            Err(AppreciationError::InsufficientData { .. })
        ));
        assert!(matches!(
            ols_fit(&y, &[("x", &[1.0, 2.0, 3.0][..])], true),
            Err(AppreciationError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_permutation_detects_strong_effect() {
        let mut rng = StudyRng::with_seed(3);
        let x: Vec<f64> = (0..60).map(|_| rng.uniform(0.0, 1.0)).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|v| 2.0 + 3.0 * v + 0.1 * rng.normal(0.0, 1.0).unwrap())
            .collect();
        let config = PermutationConfig {
            num_permutations: 500,
            seed: Some(5),
            ..Default::default()
        };
        let result = permutation_test(&y, &[("x", &x[..])], "x", &config).unwrap();
        assert_eq!(result.permuted.len(), 500);
        assert_eq!(result.p_value, 0.0);
        assert_approx_eq!(result.observed, 3.0, 0.2);
    }

    #[test]
    fn test_permutation_null_p_value_in_range() {
        let mut rng = StudyRng::with_seed(8);
        let x: Vec<f64> = (0..40).map(|_| rng.uniform(0.0, 1.0)).collect();
        let y: Vec<f64> = (0..40).map(|_| rng.normal(0.0, 1.0).unwrap()).collect();
        let config = PermutationConfig {
            num_permutations: 400,
            seed: Some(1),
            ..Default::default()
        };
        let result = permutation_test(&y, &[("x", &x[..])], "x", &config).unwrap();
        assert!((0.0..=1.0).contains(&result.p_value));
        assert!(result.p_value > 0.0);
    }

    #[test]
    fn test_unknown_coefficient() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 2.0, 4.0];
        let result = permutation_test(&y, &[("x", &x[..])], "z", &PermutationConfig::default());
        assert!(matches!(result, Err(AppreciationError::InvalidParameter { .. })));
    }
}
