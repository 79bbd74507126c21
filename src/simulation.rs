//! Simulation studies of the operating characteristics of each method.
//!
//! Every study draws synthetic data with a known truth, runs the method on
//! it many times, and summarises how often it gets the answer right:
//!
//! - [`regression_error_rates`]: Type-I error and power of the OLS t-test
//! - [`kernel_smoothing_study`]: bias, MSE and band coverage of the smoother
//! - [`power_law_null_study`]: size of the Monte Carlo KS test on power-law data
//! - [`power_law_power_study`]: power of the same test against lognormal data
//! - [`monte_carlo_timing_study`]: runtime of the test across sizes and replicate counts
//!
//! Trials run through the replicate runner, so each study is reproducible
//! from its seed regardless of the `parallel` flag. Studies whose trials
//! contain their own replicate loop parallelise only the outer loop, and
//! with `parallel` off nothing is handed to rayon.

use std::fmt;
use std::time::Instant;

use rand_distr::{Distribution, LogNormal};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bandwidth::{select_bandwidth, BandwidthGrid};
use crate::bootstrap::{bootstrap_ci, BootstrapConfiguration};
use crate::errors::{validate_count, AppreciationError, AppreciationResult};
use crate::kernel_smoothing::{smooth, GaussianKernel};
use crate::math_utils::{linspace, mean};
use crate::monte_carlo::{monte_carlo_ks_test, MonteCarloConfig};
use crate::power_law::{fit, sample_power_law};
use crate::regression::ols_fit;
use crate::replicates::{fold_replicates, run_replicates, ReplicatePlan};
use crate::rng::{mix_seed, resolve_seed, StudyRng};

// ---------------------------------------------------------------------------
// Regression t-test error rates
// ---------------------------------------------------------------------------

/// Parameters of the regression error-rate study.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegressionSimulationConfig {
    /// Tracts per synthetic data set
    pub n_tracts: usize,
    /// Number of simulated data sets
    pub iterations: usize,
    /// Intercept
    pub intercept: f64,
    /// Poverty coefficient under the alternative
    pub poverty_effect: f64,
    /// Coefficient on occupied housing units
    pub housing_effect: f64,
    /// Poverty rate range
    pub poverty_range: (f64, f64),
    /// Occupied housing units range
    pub housing_range: (f64, f64),
    /// Noise standard deviation
    pub noise_sd: f64,
    /// Test level
    pub significance_level: f64,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Enable parallel computation where supported
    pub parallel: bool,
}

impl Default for RegressionSimulationConfig {
    fn default() -> Self {
        Self {
            n_tracts: 100,
            iterations: 1000,
            intercept: 1.0,
            poverty_effect: 0.5,
            housing_effect: 0.3,
            poverty_range: (0.0, 0.4),
            housing_range: (100.0, 5000.0),
            noise_sd: 1.0,
            significance_level: 0.05,
            seed: None,
            parallel: true,
        }
    }
}

/// Rejection rates of the poverty-coefficient t-test.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegressionErrorRates {
    /// Simulated data sets
    pub iterations: usize,
    /// Rejection rate when the true poverty effect is zero
    pub type_i_error_rate: f64,
    /// Rejection rate under the configured poverty effect
    pub power: f64,
    /// Test level
    pub significance_level: f64,
}

impl fmt::Display for RegressionErrorRates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Regression t-test simulation ({} iterations) ===", self.iterations)?;
        writeln!(f, "Type I error rate: {:.4}", self.type_i_error_rate)?;
        writeln!(f, "Power:             {:.4}", self.power)
    }
}

/// Type-I error and power of the OLS t-test for the poverty coefficient.
///
/// Each iteration draws one set of predictors and two responses, one with
/// no poverty effect and one with `poverty_effect`, and records whether the
/// t-test rejects at `significance_level` for each.
pub fn regression_error_rates(
    config: &RegressionSimulationConfig,
) -> AppreciationResult<RegressionErrorRates> {
    validate_count(config.iterations, "iterations")?;

    let n = config.n_tracts;
    let plan = ReplicatePlan::new(config.iterations, resolve_seed(config.seed), config.parallel);
    let (null_rejections, alt_rejections) = fold_replicates(
        plan,
        |_, rng| {
            let poverty: Vec<f64> = (0..n)
                .map(|_| rng.uniform(config.poverty_range.0, config.poverty_range.1))
                .collect();
            let housing: Vec<f64> = (0..n)
                .map(|_| rng.uniform(config.housing_range.0, config.housing_range.1))
                .collect();

            let mut reject = |effect: f64| -> AppreciationResult<bool> {
                let y = poverty
                    .iter()
                    .zip(&housing)
                    .map(|(&p, &h)| {
                        Ok(config.intercept
                            + effect * p
                            + config.housing_effect * h
                            + rng.normal(0.0, config.noise_sd)?)
                    })
                    .collect::<AppreciationResult<Vec<f64>>>()?;
                let fit = ols_fit(
                    &y,
                    &[
                        ("poverty_rate", poverty.as_slice()),
                        ("housing_occupied", housing.as_slice()),
                    ],
                    true,
                )?;
                Ok(fit.p_values[1] < config.significance_level)
            };

            let null_rejected = reject(0.0)?;
            let alt_rejected = reject(config.poverty_effect)?;
            Ok((null_rejected, alt_rejected))
        },
        (0usize, 0usize),
        |(null, alt), (null_hit, alt_hit)| (null + null_hit as usize, alt + alt_hit as usize),
    )?;

    let total = config.iterations as f64;
    let type_i = null_rejections as f64 / total;
    let power = alt_rejections as f64 / total;

    log::info!("Regression simulation: Type I = {:.4}, power = {:.4}", type_i, power);
    Ok(RegressionErrorRates {
        iterations: config.iterations,
        type_i_error_rate: type_i,
        power,
        significance_level: config.significance_level,
    })
}

// ---------------------------------------------------------------------------
// Kernel smoothing operating characteristics
// ---------------------------------------------------------------------------

/// Smooth mean trend of home values used as the known truth.
pub fn true_mean_trend(year: f64) -> f64 {
    let t = year - 1990.0;
    150_000.0 + 3_000.0 * t + 20_000.0 * (t / 6.0).sin()
}

/// Parameters of the kernel smoothing study.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmoothingStudyConfig {
    /// Number of equally spaced years
    pub n_years: usize,
    /// First year
    pub start_year: f64,
    /// Last year
    pub end_year: f64,
    /// Noise standard deviation around the true trend
    pub noise_sd: f64,
    /// Candidate bandwidths
    pub bandwidths: Vec<f64>,
    /// Number of simulated series
    pub num_simulations: usize,
    /// Bootstrap resamples per series
    pub num_bootstrap_samples: usize,
    /// Confidence level of the bootstrap band
    pub confidence_level: f64,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Enable parallel computation where supported
    pub parallel: bool,
}

impl Default for SmoothingStudyConfig {
    fn default() -> Self {
        Self {
            n_years: 30,
            start_year: 1990.0,
            end_year: 2020.0,
            noise_sd: 20_000.0,
            bandwidths: linspace(1.0, 6.0, 10),
            num_simulations: 1000,
            num_bootstrap_samples: 300,
            confidence_level: 0.95,
            seed: None,
            parallel: true,
        }
    }
}

/// Averages over simulated series.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmoothingStudyResult {
    /// Simulated series
    pub simulations: usize,
    /// Mean of per-series average `estimate - truth`
    pub average_bias: f64,
    /// Mean of per-series average squared error
    pub average_mse: f64,
    /// Mean fraction of years whose truth lies inside the band
    pub coverage: f64,
    /// Mean selected bandwidth
    pub mean_bandwidth: f64,
    /// Nominal band level
    pub confidence_level: f64,
}

impl fmt::Display for SmoothingStudyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Kernel smoothing simulation ({} series) ===", self.simulations)?;
        writeln!(f, "Average bias:   {:.2}", self.average_bias)?;
        writeln!(f, "Average MSE:    {:.2}", self.average_mse)?;
        writeln!(
            f,
            "Coverage ({:.0}% band): {:.3}",
            self.confidence_level * 100.0,
            self.coverage
        )?;
        writeln!(f, "Mean bandwidth: {:.3}", self.mean_bandwidth)
    }
}

struct SeriesOutcome {
    bias: f64,
    mse: f64,
    coverage: f64,
    bandwidth: f64,
}

/// Bias, MSE and pointwise band coverage of the CV-tuned smoother.
pub fn kernel_smoothing_study(
    config: &SmoothingStudyConfig,
) -> AppreciationResult<SmoothingStudyResult> {
    validate_count(config.num_simulations, "num_simulations")?;
    let grid = BandwidthGrid::new(config.bandwidths.clone())?;
    let years = linspace(config.start_year, config.end_year, config.n_years);
    let truth: Vec<f64> = years.iter().map(|&t| true_mean_trend(t)).collect();
    let kernel = GaussianKernel::Normalized;

    let plan = ReplicatePlan::new(
        config.num_simulations,
        resolve_seed(config.seed),
        config.parallel,
    );
    let outcomes = run_replicates(plan, |_, rng| {
        let observed = truth
            .iter()
            .map(|&m| Ok(m + rng.normal(0.0, config.noise_sd)?))
            .collect::<AppreciationResult<Vec<f64>>>()?;

        let selection = select_bandwidth(&years, &observed, &grid, kernel, false)?;
        let fitted = smooth(&years, &years, &observed, selection.bandwidth, kernel)?;
        let band = bootstrap_ci(
            &years,
            &observed,
            selection.bandwidth,
            &years,
            &BootstrapConfiguration {
                num_bootstrap_samples: config.num_bootstrap_samples,
                confidence_level: config.confidence_level,
                kernel,
                seed: Some(rng.u64()),
                parallel: false,
            },
        )?;

        let errors: Vec<f64> = fitted
            .estimates
            .iter()
            .zip(&truth)
            .map(|(e, m)| e - m)
            .collect();
        let covered = truth
            .iter()
            .enumerate()
            .filter(|&(i, &m)| band.contains(i, m))
            .count();

        Ok(SeriesOutcome {
            bias: mean(&errors),
            mse: errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64,
            coverage: covered as f64 / truth.len() as f64,
            bandwidth: selection.bandwidth,
        })
    })?;

    let average =
        |f: fn(&SeriesOutcome) -> f64| mean(&outcomes.iter().map(f).collect::<Vec<_>>());
    let result = SmoothingStudyResult {
        simulations: outcomes.len(),
        average_bias: average(|o| o.bias),
        average_mse: average(|o| o.mse),
        coverage: average(|o| o.coverage),
        mean_bandwidth: average(|o| o.bandwidth),
        confidence_level: config.confidence_level,
    };
    log::info!(
        "Smoothing simulation: bias = {:.2}, MSE = {:.2}, coverage = {:.3}",
        result.average_bias,
        result.average_mse,
        result.coverage
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Monte Carlo KS test: size and power
// ---------------------------------------------------------------------------

/// Parameters shared by the power-law size and power studies.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PowerLawStudyConfig {
    /// Observations drawn per run (before filtering, for the lognormal study)
    pub sample_size: usize,
    /// True exponent for the null study
    pub alpha: f64,
    /// Known lower threshold
    pub x_minimum: f64,
    /// Truncation point for the null study's draws
    pub x_maximum: f64,
    /// Lognormal location for the power study
    pub lognormal_mu: f64,
    /// Lognormal scale for the power study
    pub lognormal_sigma: f64,
    /// Number of simulated data sets
    pub num_runs: usize,
    /// Monte Carlo replicates per test
    pub num_replicates: usize,
    /// Test level
    pub significance_level: f64,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Enable parallel computation where supported
    pub parallel: bool,
}

impl Default for PowerLawStudyConfig {
    fn default() -> Self {
        Self {
            sample_size: 4000,
            alpha: 2.5,
            x_minimum: 2.0,
            x_maximum: 15.0,
            lognormal_mu: 1.5,
            lognormal_sigma: 0.5,
            num_runs: 1000,
            num_replicates: 10_000,
            significance_level: 0.05,
            seed: None,
            parallel: true,
        }
    }
}

/// Summary of repeated Monte Carlo KS tests.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PowerLawStudyResult {
    /// Which data-generating process was tested
    pub scenario: String,
    /// Number of runs
    pub runs: usize,
    /// p-value of each run
    pub p_values: Vec<f64>,
    /// Mean p-value
    pub mean_p_value: f64,
    /// Fraction of runs with `p < significance_level`
    pub rejection_rate: f64,
    /// Test level
    pub significance_level: f64,
}

impl fmt::Display for PowerLawStudyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ({} runs) ===", self.scenario, self.runs)?;
        writeln!(f, "Mean p-value:   {:.4}", self.mean_p_value)?;
        writeln!(
            f,
            "Rejection rate: {:.4} (p < {})",
            self.rejection_rate, self.significance_level
        )
    }
}

/// Settings of the Monte Carlo test nested inside one study run.
///
/// The nested loop always runs on the calling thread: either the outer loop
/// already occupies the pool or the caller asked for sequential execution.
fn nested_monte_carlo_config(config: &PowerLawStudyConfig, seed: u64) -> MonteCarloConfig {
    MonteCarloConfig {
        num_replicates: config.num_replicates,
        significance_level: config.significance_level,
        seed: Some(seed),
        parallel: false,
        ..Default::default()
    }
}

// Stream tags for the two power-law studies, which usually share a config
const NULL_STUDY_STREAM: usize = 0;
const POWER_STUDY_STREAM: usize = 1;

/// Replicate plan of one power-law study, on its own stream of the base seed.
fn power_law_study_plan(config: &PowerLawStudyConfig, stream: usize) -> ReplicatePlan {
    let base_seed = mix_seed(resolve_seed(config.seed), stream);
    ReplicatePlan::new(config.num_runs, base_seed, config.parallel)
}

fn repeated_ks_tests<G>(
    config: &PowerLawStudyConfig,
    scenario: &str,
    stream: usize,
    generate: G,
) -> AppreciationResult<PowerLawStudyResult>
where
    G: Fn(&mut StudyRng) -> AppreciationResult<Vec<f64>> + Send + Sync,
{
    validate_count(config.num_runs, "num_runs")?;

    let plan = power_law_study_plan(config, stream);
    let level = config.significance_level;
    let (p_values, rejections) = fold_replicates(
        plan,
        |run, rng| {
            let data = generate(rng)?;
            let model = fit(&data, Some(config.x_minimum))?;
            let test =
                monte_carlo_ks_test(&data, &model, &nested_monte_carlo_config(config, rng.u64()))?;
            log::debug!("{} run {}: p = {:.4}", scenario, run, test.p_value);
            Ok(test.p_value)
        },
        (Vec::with_capacity(config.num_runs), 0usize),
        |(mut p_values, rejections), p| {
            p_values.push(p);
            (p_values, rejections + (p < level) as usize)
        },
    )?;
    let result = PowerLawStudyResult {
        scenario: scenario.to_string(),
        runs: p_values.len(),
        mean_p_value: mean(&p_values),
        rejection_rate: rejections as f64 / p_values.len() as f64,
        p_values,
        significance_level: config.significance_level,
    };
    log::info!(
        "{}: mean p = {:.4}, rejection rate = {:.4}",
        scenario,
        result.mean_p_value,
        result.rejection_rate
    );
    Ok(result)
}

/// Size of the Monte Carlo KS test when the data really are a power law.
///
/// The rejection rate estimates the Type-I error.
pub fn power_law_null_study(config: &PowerLawStudyConfig) -> AppreciationResult<PowerLawStudyResult> {
    repeated_ks_tests(config, "Power-law data (test size)", NULL_STUDY_STREAM, |rng| {
        sample_power_law(
            config.sample_size,
            config.alpha,
            config.x_minimum,
            config.x_maximum,
            rng,
        )
    })
}

/// Power of the Monte Carlo KS test against lognormal data.
///
/// Draws are filtered to `>= x_minimum` before fitting.
pub fn power_law_power_study(config: &PowerLawStudyConfig) -> AppreciationResult<PowerLawStudyResult> {
    let lognormal = LogNormal::new(config.lognormal_mu, config.lognormal_sigma).map_err(|e| {
        AppreciationError::InvalidParameter {
            parameter: "lognormal_sigma".to_string(),
            value: config.lognormal_sigma,
            constraint: format!("valid lognormal distribution ({})", e),
        }
    })?;
    repeated_ks_tests(config, "Lognormal data (test power)", POWER_STUDY_STREAM, |rng| {
        Ok((0..config.sample_size)
            .map(|_| lognormal.sample(rng))
            .filter(|&v| v >= config.x_minimum)
            .collect())
    })
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Grid of the timing study.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingStudyConfig {
    /// Sample sizes to time
    pub sample_sizes: Vec<usize>,
    /// Monte Carlo replicate counts to time
    pub replicate_counts: Vec<usize>,
    /// Exponent of the synthetic data
    pub alpha: f64,
    /// Lower bound of the synthetic data
    pub x_minimum: f64,
    /// Upper bound of the synthetic data
    pub x_maximum: f64,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Enable parallel computation where supported
    pub parallel: bool,
}

impl Default for TimingStudyConfig {
    fn default() -> Self {
        Self {
            sample_sizes: vec![500, 1000, 2000, 4000],
            replicate_counts: vec![1000, 2000, 5000, 10_000],
            alpha: 2.5,
            x_minimum: 2.0,
            x_maximum: 15.0,
            seed: None,
            parallel: true,
        }
    }
}

/// Wall-clock time of one Monte Carlo test.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingMeasurement {
    /// Sample size
    pub sample_size: usize,
    /// Monte Carlo replicates
    pub replicates: usize,
    /// Elapsed seconds
    pub seconds: f64,
}

/// Timings over the full `sample_sizes × replicate_counts` grid.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingStudyResult {
    /// Measurements in grid order, sample size major
    pub measurements: Vec<TimingMeasurement>,
}

impl fmt::Display for TimingStudyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Monte Carlo KS test runtime ===")?;
        writeln!(f, "{:>8} {:>10} {:>12}", "n", "replicates", "seconds")?;
        for m in &self.measurements {
            writeln!(f, "{:>8} {:>10} {:>12.4}", m.sample_size, m.replicates, m.seconds)?;
        }
        Ok(())
    }
}

/// Time the Monte Carlo KS test for each sample size and replicate count.
///
/// Each sample size gets one synthetic data set, fitted with `x_minimum`
/// taken as the sample minimum, which is then tested once per replicate count.
pub fn monte_carlo_timing_study(config: &TimingStudyConfig) -> AppreciationResult<TimingStudyResult> {
    let mut rng = StudyRng::with_seed(resolve_seed(config.seed));
    let mut measurements =
        Vec::with_capacity(config.sample_sizes.len() * config.replicate_counts.len());

    for &n in &config.sample_sizes {
        validate_count(n, "sample_size")?;
        let data = sample_power_law(n, config.alpha, config.x_minimum, config.x_maximum, &mut rng)?;
        let model = fit(&data, None)?;

        for &replicates in &config.replicate_counts {
            let mc_config = MonteCarloConfig {
                num_replicates: replicates,
                seed: Some(rng.u64()),
                parallel: config.parallel,
                ..Default::default()
            };
            let start = Instant::now();
            monte_carlo_ks_test(&data, &model, &mc_config)?;
            let seconds = start.elapsed().as_secs_f64();

            log::info!("n = {}, replicates = {}: {:.4} s", n, replicates, seconds);
            measurements.push(TimingMeasurement {
                sample_size: n,
                replicates,
                seconds,
            });
        }
    }

    Ok(TimingStudyResult { measurements })
}
