//! Integration tests for the simulation studies
//!
//! The default tests run reduced study sizes and check structure and
//! reproducibility. The statistical checks on rejection rates and coverage
//! need thousands of fits and run only with `--features long-tests`.

use tract_appreciation::{
    kernel_smoothing_study, monte_carlo_timing_study, power_law_null_study,
    power_law_power_study, regression_error_rates, PowerLawStudyConfig,
    RegressionSimulationConfig, SmoothingStudyConfig, StudyConfig, TimingStudyConfig,
};

#[test]
fn test_regression_study_detects_effect() {
    // A large poverty effect is detected almost always
    let config = RegressionSimulationConfig {
        iterations: 100,
        poverty_effect: 10.0,
        seed: Some(406),
        ..Default::default()
    };
    let rates = regression_error_rates(&config).unwrap();
    assert!(rates.power > 0.9, "power = {}", rates.power);
    assert!(rates.type_i_error_rate < 0.2);
}

#[test]
fn test_power_law_studies_are_reproducible() {
    let config = PowerLawStudyConfig {
        sample_size: 400,
        x_maximum: 1e6,
        num_runs: 6,
        num_replicates: 100,
        seed: Some(42),
        ..Default::default()
    };
    let a = power_law_null_study(&config).unwrap();
    let b = power_law_null_study(&PowerLawStudyConfig {
        parallel: false,
        ..config.clone()
    })
    .unwrap();
    assert_eq!(a.p_values, b.p_values);

    let power = power_law_power_study(&config).unwrap();
    assert!(power.mean_p_value < a.mean_p_value);
    assert!(power.to_string().contains("Lognormal"));
}

#[test]
fn test_smoothing_study_from_quick_preset() {
    let config = StudyConfig::quick().with_seed(406);
    let study = SmoothingStudyConfig {
        num_simulations: 5,
        num_bootstrap_samples: 60,
        ..config.smoothing_study()
    };
    let result = kernel_smoothing_study(&study).unwrap();
    assert_eq!(result.simulations, 5);
    assert!(result.average_mse.sqrt() < 20_000.0);
    assert!(result.coverage > 0.3);
}

#[test]
fn test_smoothing_band_coverage_small_study() {
    // Pointwise 95% bands cover the true trend in most years
    let result = kernel_smoothing_study(&SmoothingStudyConfig {
        num_simulations: 25,
        num_bootstrap_samples: 150,
        seed: Some(406),
        ..Default::default()
    })
    .unwrap();
    assert!(
        (0.7..=1.0).contains(&result.coverage),
        "coverage = {}",
        result.coverage
    );
}

#[test]
fn test_timing_study_covers_grid() {
    let config = TimingStudyConfig {
        sample_sizes: vec![100, 200],
        replicate_counts: vec![20, 40],
        seed: Some(1),
        ..Default::default()
    };
    let result = monte_carlo_timing_study(&config).unwrap();
    assert_eq!(result.measurements.len(), 4);
    assert!(result.to_string().contains("replicates"));
}

#[cfg(feature = "long-tests")]
mod long {
    use super::*;

    #[test]
    fn test_regression_type_i_error_near_nominal() {
        let rates = regression_error_rates(&RegressionSimulationConfig {
            seed: Some(406),
            ..Default::default()
        })
        .unwrap();
        assert!(
            (rates.type_i_error_rate - 0.05).abs() < 0.025,
            "type I = {}",
            rates.type_i_error_rate
        );
    }

    #[test]
    fn test_power_law_test_is_conservative_and_powerful() {
        let config = PowerLawStudyConfig {
            sample_size: 1000,
            x_maximum: 1e6,
            num_runs: 100,
            num_replicates: 500,
            seed: Some(42),
            ..Default::default()
        };
        let null = power_law_null_study(&config).unwrap();
        assert!(null.rejection_rate <= 0.15, "size = {}", null.rejection_rate);

        let power = power_law_power_study(&config).unwrap();
        assert!(power.rejection_rate >= 0.9, "power = {}", power.rejection_rate);
    }

    #[test]
    fn test_smoothing_band_coverage() {
        let result = kernel_smoothing_study(&SmoothingStudyConfig {
            num_simulations: 200,
            num_bootstrap_samples: 300,
            seed: Some(406),
            ..Default::default()
        })
        .unwrap();
        assert!(
            (0.75..=1.0).contains(&result.coverage),
            "coverage = {}",
            result.coverage
        );
    }
}
