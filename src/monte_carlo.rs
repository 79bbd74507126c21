//! Monte Carlo goodness-of-fit test for the power-law hypothesis.
//!
//! The sampling distribution of the KS statistic is not known in closed form
//! when the model parameters are estimated from the data, so the test builds
//! an empirical null: draw synthetic samples from the fitted model, recompute
//! the statistic for each, and rank the observed statistic among them.
//!
//! ## Procedure
//!
//! 1. `observed = ks_statistic(sample, alpha, x_minimum)`
//! 2. `x_maximum = x_maximum_factor * max(sample)` bounds the synthetic draws
//! 3. each replicate draws as many values as the filtered sample holds and
//!    computes their KS statistic against the same model
//! 4. `p = #{null >= observed} / replicates`
//!
//! Large statistics are evidence against the power law, so the p-value is
//! one-sided.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{
    validate_all_finite, validate_count, validate_positive, validate_probability,
    AppreciationError, AppreciationResult,
};
use crate::goodness_of_fit::ks_statistic;
use crate::math_utils::{mean, population_std, quantile_type7, sorted_copy};
use crate::power_law::{PowerLawModel, TruncatedPowerLaw};
use crate::replicates::{run_replicates, ReplicatePlan};
use crate::rng::resolve_seed;

/// Configuration parameters for the Monte Carlo KS test.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonteCarloConfig {
    /// Number of synthetic replicates in the null distribution
    pub num_replicates: usize,
    /// Significance level for the reject/fail-to-reject decision
    pub significance_level: f64,
    /// Upper bound of synthetic draws as a multiple of the sample maximum
    pub x_maximum_factor: f64,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Enable parallel computation where supported
    pub parallel: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            num_replicates: 10_000,
            significance_level: 0.05,
            x_maximum_factor: 1.5,
            seed: None,
            parallel: true,
        }
    }
}

impl MonteCarloConfig {
    fn validate(&self) -> AppreciationResult<()> {
        validate_count(self.num_replicates, "num_replicates")?;
        validate_probability(self.significance_level, "significance_level")?;
        if !self.x_maximum_factor.is_finite() || self.x_maximum_factor <= 1.0 {
            return Err(AppreciationError::InvalidParameter {
                parameter: "x_maximum_factor".to_string(),
                value: self.x_maximum_factor,
                constraint: "finite and > 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Results from the Monte Carlo KS test.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonteCarloTestResult {
    /// Model under test
    pub model: PowerLawModel,
    /// KS statistic of the observed sample
    pub observed_statistic: f64,
    /// KS statistics of the synthetic replicates, in replicate order
    pub null_distribution: Vec<f64>,
    /// Fraction of null statistics at least as large as the observed one
    pub p_value: f64,
    /// Null quantile at `1 - significance_level`
    pub critical_value: f64,
    /// Mean of the null distribution
    pub null_mean: f64,
    /// Population standard deviation of the null distribution
    pub null_std: f64,
    /// `(observed - null_mean) / null_std`, 0 when the null is degenerate
    pub effect_size: f64,
    /// Significance level used for the decision
    pub significance_level: f64,
    /// True if the power-law hypothesis is rejected
    pub reject_null: bool,
    /// Upper bound used for synthetic draws
    pub x_maximum: f64,
    /// Size of each synthetic sample (the filtered observed count)
    pub synthetic_size: usize,
}

/// One-sided empirical p-value: fraction of `null_distribution` that is `>= observed`.
///
/// Always in [0, 1] and non-increasing in `observed`. An empty null yields 1.
pub fn empirical_p_value(observed: f64, null_distribution: &[f64]) -> f64 {
    if null_distribution.is_empty() {
        return 1.0;
    }
    let count = null_distribution.iter().filter(|&&x| x >= observed).count();
    count as f64 / null_distribution.len() as f64
}

/// Monte Carlo KS goodness-of-fit test of `sample` against `model`.
///
/// # Example
/// ```rust
/// use tract_appreciation::{fit, monte_carlo_ks_test, MonteCarloConfig};
///
/// let sample = vec![2.1, 2.4, 2.2, 3.5, 2.9, 5.1, 2.05, 8.7, 2.6, 3.3];
/// let model = fit(&sample, None).unwrap();
/// let config = MonteCarloConfig { num_replicates: 200, seed: Some(42), ..Default::default() };
///
/// let result = monte_carlo_ks_test(&sample, &model, &config).unwrap();
/// assert!((0.0..=1.0).contains(&result.p_value));
/// ```
pub fn monte_carlo_ks_test(
    sample: &[f64],
    model: &PowerLawModel,
    config: &MonteCarloConfig,
) -> AppreciationResult<MonteCarloTestResult> {
    config.validate()?;
    validate_all_finite(sample, "sample")?;

    let PowerLawModel { alpha, x_minimum } = *model;
    let observed_statistic = ks_statistic(sample, alpha, x_minimum)?;

    let synthetic_size = sample.iter().filter(|&&v| v >= x_minimum).count();
    let sample_max = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let x_maximum = config.x_maximum_factor * sample_max;
    validate_positive(x_maximum, "x_maximum")?;
    let sampler = TruncatedPowerLaw::new(alpha, x_minimum, x_maximum)?;

    let base_seed = resolve_seed(config.seed);
    log::debug!(
        "Monte Carlo KS test: {} replicates of size {}, x_maximum = {}, seed = {}",
        config.num_replicates,
        synthetic_size,
        x_maximum,
        base_seed
    );

    let plan = ReplicatePlan::new(config.num_replicates, base_seed, config.parallel);
    let null_distribution = run_replicates(plan, |_, rng| {
        let synthetic: Vec<f64> = (0..synthetic_size).map(|_| sampler.sample(rng)).collect();
        ks_statistic(&synthetic, alpha, x_minimum)
    })?;

    let p_value = empirical_p_value(observed_statistic, &null_distribution);
    let sorted_null = sorted_copy(&null_distribution);
    let critical_value = quantile_type7(&sorted_null, 1.0 - config.significance_level);

    let null_mean = mean(&null_distribution);
    let null_std = population_std(&null_distribution);
    let effect_size = if null_std > 0.0 {
        (observed_statistic - null_mean) / null_std
    } else {
        0.0
    };
    let reject_null = p_value < config.significance_level;

    log::info!(
        "KS = {:.6}, null mean = {:.6}, p = {:.4} ({})",
        observed_statistic,
        null_mean,
        p_value,
        if reject_null { "reject" } else { "fail to reject" }
    );

    Ok(MonteCarloTestResult {
        model: *model,
        observed_statistic,
        null_distribution,
        p_value,
        critical_value,
        null_mean,
        null_std,
        effect_size,
        significance_level: config.significance_level,
        reject_null,
        x_maximum,
        synthetic_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power_law::{fit, sample_power_law};
    use crate::rng::StudyRng;

    fn config(replicates: usize, seed: u64) -> MonteCarloConfig {
        MonteCarloConfig {
            num_replicates: replicates,
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_p_value_bounds_and_monotonicity() {
        let null = vec![0.05, 0.1, 0.1, 0.2, 0.3];
        assert_eq!(empirical_p_value(0.0, &null), 1.0);
        assert_eq!(empirical_p_value(0.1, &null), 0.8);
        assert_eq!(empirical_p_value(0.15, &null), 0.4);
        assert_eq!(empirical_p_value(1.0, &null), 0.0);

        let mut previous = 1.0;
        for k in 0..100 {
            let p = empirical_p_value(k as f64 * 0.004, &null);
            assert!((0.0..=1.0).contains(&p));
            assert!(p <= previous);
            previous = p;
        }
    }

    #[test]
    fn test_power_law_data_is_not_rejected_often() {
        let mut rng = StudyRng::with_seed(11);
        let data = sample_power_law(500, 2.5, 2.0, 1e6, &mut rng).unwrap();
        let model = fit(&data, Some(2.0)).unwrap();
        let result = monte_carlo_ks_test(&data, &model, &config(300, 5)).unwrap();

        assert_eq!(result.null_distribution.len(), 300);
        assert_eq!(result.synthetic_size, 500);
        assert!(result.p_value > 0.01, "p = {}", result.p_value);
        assert!(result.effect_size.is_finite());
        assert!(result.null_distribution.iter().all(|&d| (0.0..=1.0).contains(&d)));
    }

    #[test]
    fn test_x_maximum_uses_factor() {
        let sample = vec![2.0, 2.5, 3.0, 4.0, 10.0];
        let model = fit(&sample, None).unwrap();
        let result = monte_carlo_ks_test(&sample, &model, &config(20, 1)).unwrap();
        assert_eq!(result.x_maximum, 15.0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible_across_modes() {
        let sample = vec![2.1, 2.4, 2.2, 3.5, 2.9, 5.1, 2.05, 8.7, 2.6, 3.3];
        let model = fit(&sample, None).unwrap();
        let par = monte_carlo_ks_test(&sample, &model, &config(100, 99)).unwrap();
        let seq = monte_carlo_ks_test(
            &sample,
            &model,
            &MonteCarloConfig {
                parallel: false,
                ..config(100, 99)
            },
        )
        .unwrap();
        assert_eq!(par.null_distribution, seq.null_distribution);
        assert_eq!(par.p_value, seq.p_value);
    }

    #[test]
    fn test_invalid_configuration() {
        let sample = vec![2.0, 3.0, 4.0];
        let model = PowerLawModel::new(2.0, 2.0).unwrap();
        assert!(matches!(
            monte_carlo_ks_test(&sample, &model, &config(0, 1)),
            Err(AppreciationError::InvalidParameter { .. })
        ));
        let bad_level = MonteCarloConfig {
            significance_level: 1.5,
            ..config(10, 1)
        };
        assert!(monte_carlo_ks_test(&sample, &model, &bad_level).is_err());
    }

    #[test]
    fn test_empty_filtered_sample_propagates() {
        let model = PowerLawModel::new(2.0, 5.0).unwrap();
        assert!(matches!(
            monte_carlo_ks_test(&[1.0, 2.0], &model, &config(10, 1)),
            Err(AppreciationError::EmptyFilteredSample { .. })
        ));
    }
}
