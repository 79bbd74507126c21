//! The three census analyses.
//!
//! - [`analyze_power_law`]: do tract appreciation ratios follow a power law?
//! - [`analyze_home_value_trend`]: smoothed median home value over time with
//!   a bootstrap band
//! - [`analyze_poverty_regression`]: is the poverty rate associated with
//!   appreciation after adjusting for other tract characteristics?

use crate::bandwidth::{select_bandwidth, BandwidthGrid};
use crate::bootstrap::bootstrap_ci;
use crate::config::StudyConfig;
use crate::data::{CensusTable, APPRECIATION_RATIO, REGRESSION_PREDICTORS};
use crate::errors::{validate_same_length, AppreciationResult};
use crate::kernel_smoothing::{smooth, GaussianKernel};
use crate::math_utils::unique_sorted;
use crate::monte_carlo::monte_carlo_ks_test;
use crate::power_law::fit;
use crate::regression::{ols_fit, permutation_test};
use crate::results::{HomeValueTrend, PovertyRegressionAnalysis, PowerLawAnalysis, SampleSummary};

/// Bandwidth candidates for the home value trend: 1, 2, ..., 15 years.
pub const TREND_BANDWIDTHS: (f64, f64, usize) = (1.0, 15.0, 15);

/// Coefficient tested by the poverty regression.
pub const POVERTY_COEFFICIENT: &str = "poverty_rate";

/// Fit a power law to positive appreciation ratios and test the fit.
///
/// `x_min` is the smallest ratio; synthetic draws are bounded by 1.5 times
/// the largest.
pub fn analyze_power_law(ratios: &[f64], config: &StudyConfig) -> AppreciationResult<PowerLawAnalysis> {
    let summary = SampleSummary::from_values(ratios)?;
    log::info!(
        "Fitting power law to {} ratios (median {:.4})",
        summary.count,
        summary.median
    );

    let model = fit(ratios, None)?;
    let test = monte_carlo_ks_test(ratios, &model, &config.monte_carlo())?;

    Ok(PowerLawAnalysis {
        summary,
        model,
        test,
    })
}

/// Smooth home values against year with a cross-validated bandwidth.
///
/// The curve and band are evaluated at each distinct year.
pub fn analyze_home_value_trend(
    years: &[f64],
    values: &[f64],
    config: &StudyConfig,
) -> AppreciationResult<HomeValueTrend> {
    validate_same_length(years, "years", values, "values")?;
    let kernel = GaussianKernel::Unnormalized;

    let (start, end, count) = TREND_BANDWIDTHS;
    let grid = BandwidthGrid::linspace(start, end, count)?;
    log::info!(
        "Selecting bandwidth over {} candidates for {} observations",
        grid.len(),
        years.len()
    );
    let selection = select_bandwidth(years, values, &grid, kernel, config.parallel)?;

    let eval_points = unique_sorted(years);
    let curve = smooth(&eval_points, years, values, selection.bandwidth, kernel)?;
    let band = bootstrap_ci(
        years,
        values,
        selection.bandwidth,
        &eval_points,
        &config.bootstrap(),
    )?;

    Ok(HomeValueTrend {
        n_observations: years.len(),
        selection,
        curve,
        band,
    })
}

/// Regress appreciation on the seven tract characteristics and
/// permutation-test the poverty coefficient.
pub fn analyze_poverty_regression(
    table: &CensusTable,
    config: &StudyConfig,
) -> AppreciationResult<PovertyRegressionAnalysis> {
    let frame = table.regression_frame(APPRECIATION_RATIO, &REGRESSION_PREDICTORS)?;
    let predictors = frame.predictor_slices();
    log::info!(
        "Regressing {} on {} predictors over {} tracts",
        frame.response_name,
        predictors.len(),
        frame.len()
    );

    let fit = ols_fit(&frame.response, &predictors, true)?;
    let permutation = permutation_test(
        &frame.response,
        &predictors,
        POVERTY_COEFFICIENT,
        &config.permutation(),
    )?;

    Ok(PovertyRegressionAnalysis {
        fit,
        permutation,
        dropped_rows: frame.dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::StudyRng;
    use std::io::Cursor;

    #[test]
    fn test_power_law_analysis_on_synthetic_ratios() {
        let mut rng = StudyRng::with_seed(17);
        let ratios: Vec<f64> = (0..400)
            .map(|_| 1.2 * (1.0 - rng.f64()).powf(-1.0 / 1.8))
            .collect();
        let config = StudyConfig::quick().with_seed(1);

        let analysis = analyze_power_law(&ratios, &config).unwrap();
        assert_eq!(analysis.summary.count, 400);
        assert_eq!(analysis.model.x_minimum, analysis.summary.min);
        assert!((analysis.model.alpha - 2.8).abs() < 0.4, "alpha = {}", analysis.model.alpha);
        assert!(analysis.to_string().contains("Monte Carlo KS test"));
    }

    #[test]
    fn test_trend_on_two_year_panel() {
        let years = vec![1990.0, 1990.0, 1990.0, 2021.0, 2021.0, 2021.0];
        let values = vec![100.0, 120.0, 110.0, 400.0, 380.0, 420.0];
        let config = StudyConfig::quick().with_seed(2);

        let trend = analyze_home_value_trend(&years, &values, &config).unwrap();
        assert_eq!(trend.curve.points, vec![1990.0, 2021.0]);
        assert!((trend.curve.estimates[0] - 110.0).abs() < 1e-3);
        assert!((trend.curve.estimates[1] - 400.0).abs() < 1e-3);
        assert_eq!(trend.selection.scores.len(), 15);
        for i in 0..2 {
            assert!(trend.band.lower[i] <= trend.band.upper[i]);
        }
    }

    #[test]
    fn test_poverty_regression_requires_columns() {
        let table = CensusTable::from_reader(Cursor::new("a,b\n1,2\n")).unwrap();
        assert!(analyze_poverty_regression(&table, &StudyConfig::quick()).is_err());
    }
}
