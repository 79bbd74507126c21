//! # Study Configuration
//!
//! Iteration counts for every analysis and simulation, grouped into presets.
//! `full` reproduces the published study sizes; `quick` is meant for smoke
//! runs and tests.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bootstrap::BootstrapConfiguration;
use crate::monte_carlo::MonteCarloConfig;
use crate::regression::PermutationConfig;
use crate::rng::mix_seed;
use crate::simulation::{
    PowerLawStudyConfig, RegressionSimulationConfig, SmoothingStudyConfig, TimingStudyConfig,
};

// Stream tags mixed into the base seed, one per consumer
const MONTE_CARLO_STREAM: usize = 1;
const BOOTSTRAP_STREAM: usize = 2;
const PERMUTATION_STREAM: usize = 3;
const REGRESSION_STUDY_STREAM: usize = 4;
const SMOOTHING_STUDY_STREAM: usize = 5;
const POWER_LAW_STUDY_STREAM: usize = 6;
const TIMING_STUDY_STREAM: usize = 7;

/// Preset sizes for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StudyDepth {
    /// Small counts for smoke runs
    Quick,
    /// Moderate counts, minutes rather than hours
    Standard,
    /// Published study sizes
    Full,
}

/// Counts, seed and execution options shared by all analyses.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StudyConfig {
    /// Preset these counts came from
    pub depth: StudyDepth,
    /// Base seed; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Enable parallel computation where supported
    pub parallel: bool,
    /// Significance level of every test
    pub significance_level: f64,
    /// Confidence level of bootstrap bands
    pub confidence_level: f64,
    /// Monte Carlo replicates for the KS test on real data
    pub monte_carlo_replicates: usize,
    /// Bootstrap resamples for the home value trend band
    pub bootstrap_samples: usize,
    /// Response permutations for the regression test
    pub permutations: usize,
    /// Iterations of the regression and power-law simulation studies
    pub simulation_runs: usize,
    /// Monte Carlo replicates inside each power-law simulation run
    pub simulation_replicates: usize,
    /// Simulated series in the smoothing study
    pub smoothing_simulations: usize,
    /// Bootstrap resamples per simulated series
    pub smoothing_bootstrap_samples: usize,
    /// Replicate counts timed by the runtime study
    pub timing_replicate_counts: Vec<usize>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl StudyConfig {
    /// Quick configuration: smoke-test sizes
    pub fn quick() -> Self {
        Self {
            depth: StudyDepth::Quick,
            seed: None,
            parallel: true,
            significance_level: 0.05,
            confidence_level: 0.95,
            monte_carlo_replicates: 500,
            bootstrap_samples: 200,
            permutations: 500,
            simulation_runs: 50,
            simulation_replicates: 200,
            smoothing_simulations: 20,
            smoothing_bootstrap_samples: 100,
            timing_replicate_counts: vec![100, 200, 500, 1000],
        }
    }

    /// Standard configuration: full analysis counts, reduced simulation counts
    pub fn standard() -> Self {
        Self {
            depth: StudyDepth::Standard,
            monte_carlo_replicates: 10_000,
            bootstrap_samples: 1000,
            permutations: 5000,
            simulation_runs: 200,
            simulation_replicates: 1000,
            smoothing_simulations: 200,
            smoothing_bootstrap_samples: 300,
            timing_replicate_counts: vec![1000, 2000, 5000, 10_000],
            ..Self::quick()
        }
    }

    /// Full configuration: published study sizes
    pub fn full() -> Self {
        Self {
            depth: StudyDepth::Full,
            simulation_runs: 1000,
            simulation_replicates: 10_000,
            smoothing_simulations: 1000,
            ..Self::standard()
        }
    }

    /// Preset for a depth.
    pub fn for_depth(depth: StudyDepth) -> Self {
        match depth {
            StudyDepth::Quick => Self::quick(),
            StudyDepth::Standard => Self::standard(),
            StudyDepth::Full => Self::full(),
        }
    }

    /// Same configuration with a fixed seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed of one consumer's stream, derived from the base seed.
    ///
    /// `None` stays `None`, so every consumer then draws its own entropy.
    pub fn stream_seed(&self, stream: usize) -> Option<u64> {
        self.seed.map(|seed| mix_seed(seed, stream))
    }

    /// Monte Carlo KS test settings.
    pub fn monte_carlo(&self) -> MonteCarloConfig {
        MonteCarloConfig {
            num_replicates: self.monte_carlo_replicates,
            significance_level: self.significance_level,
            seed: self.stream_seed(MONTE_CARLO_STREAM),
            parallel: self.parallel,
            ..Default::default()
        }
    }

    /// Bootstrap band settings.
    pub fn bootstrap(&self) -> BootstrapConfiguration {
        BootstrapConfiguration {
            num_bootstrap_samples: self.bootstrap_samples,
            confidence_level: self.confidence_level,
            seed: self.stream_seed(BOOTSTRAP_STREAM),
            parallel: self.parallel,
            ..Default::default()
        }
    }

    /// Permutation test settings.
    pub fn permutation(&self) -> PermutationConfig {
        PermutationConfig {
            num_permutations: self.permutations,
            seed: self.stream_seed(PERMUTATION_STREAM),
            parallel: self.parallel,
        }
    }

    /// Regression error-rate study settings.
    pub fn regression_simulation(&self) -> RegressionSimulationConfig {
        RegressionSimulationConfig {
            iterations: self.simulation_runs,
            significance_level: self.significance_level,
            seed: self.stream_seed(REGRESSION_STUDY_STREAM),
            parallel: self.parallel,
            ..Default::default()
        }
    }

    /// Kernel smoothing study settings.
    pub fn smoothing_study(&self) -> SmoothingStudyConfig {
        SmoothingStudyConfig {
            num_simulations: self.smoothing_simulations,
            num_bootstrap_samples: self.smoothing_bootstrap_samples,
            confidence_level: self.confidence_level,
            seed: self.stream_seed(SMOOTHING_STUDY_STREAM),
            parallel: self.parallel,
            ..Default::default()
        }
    }

    /// Power-law size and power study settings.
    pub fn power_law_study(&self) -> PowerLawStudyConfig {
        PowerLawStudyConfig {
            num_runs: self.simulation_runs,
            num_replicates: self.simulation_replicates,
            significance_level: self.significance_level,
            seed: self.stream_seed(POWER_LAW_STUDY_STREAM),
            parallel: self.parallel,
            ..Default::default()
        }
    }

    /// Runtime study settings.
    pub fn timing_study(&self) -> TimingStudyConfig {
        TimingStudyConfig {
            replicate_counts: self.timing_replicate_counts.clone(),
            seed: self.stream_seed(TIMING_STUDY_STREAM),
            parallel: self.parallel,
            ..Default::default()
        }
    }
}
