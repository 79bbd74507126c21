//! # Analysis Results Structures
//!
//! Result types of the three census analyses and their text reports.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bandwidth::BandwidthSelection;
use crate::bootstrap::BootstrapInterval;
use crate::errors::{validate_data_length, AppreciationResult, DataError};
use crate::kernel_smoothing::SmoothingResult;
use crate::math_utils::{mean, median};
use crate::monte_carlo::MonteCarloTestResult;
use crate::power_law::PowerLawModel;
use crate::regression::{OlsFit, PermutationTestResult};

/// Descriptive statistics of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampleSummary {
    /// Number of values
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Median
    pub median: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
}

impl SampleSummary {
    /// Summarise a non-empty sample.
    pub fn from_values(values: &[f64]) -> AppreciationResult<Self> {
        validate_data_length(values, 1, "sample summary")?;
        Ok(Self {
            count: values.len(),
            mean: mean(values),
            median: median(values),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Power-law fit and Monte Carlo goodness-of-fit test of appreciation ratios
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PowerLawAnalysis {
    /// Summary of the positive ratios
    pub summary: SampleSummary,
    /// Fitted model
    pub model: PowerLawModel,
    /// Monte Carlo KS test
    pub test: MonteCarloTestResult,
}

impl fmt::Display for PowerLawAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        let t = &self.test;
        writeln!(f, "=== Home value appreciation ratios (2019-23 vs 1990) ===")?;
        writeln!(f, "Census tracts:   {}", s.count)?;
        writeln!(f, "Mean ratio:      {:.4}", s.mean)?;
        writeln!(f, "Median ratio:    {:.4}", s.median)?;
        writeln!(f, "Minimum ratio:   {:.4}", s.min)?;
        writeln!(f, "Maximum ratio:   {:.4}", s.max)?;
        writeln!(f)?;
        writeln!(f, "=== Power-law fit ===")?;
        writeln!(f, "Estimated alpha: {:.6}", self.model.alpha)?;
        writeln!(f, "x_min:           {:.6}", self.model.x_minimum)?;
        writeln!(f)?;
        writeln!(f, "=== Monte Carlo KS test ({} replicates) ===", t.null_distribution.len())?;
        writeln!(f, "Null hypothesis: data follow a power law")?;
        writeln!(f, "Observed KS:     {:.6}", t.observed_statistic)?;
        writeln!(f, "Mean null KS:    {:.6}", t.null_mean)?;
        writeln!(f, "Std of null KS:  {:.6}", t.null_std)?;
        writeln!(f, "Critical value:  {:.6}", t.critical_value)?;
        writeln!(f, "p-value:         {:.4}", t.p_value)?;
        writeln!(f, "Effect size:     {:.4}", t.effect_size)?;
        writeln!(
            f,
            "{}",
            if t.reject_null {
                "Reject null hypothesis"
            } else {
                "Fail to reject null hypothesis"
            }
        )
    }
}

/// Smoothed home value trend with a bootstrap band
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HomeValueTrend {
    /// Number of `(year, value)` observations
    pub n_observations: usize,
    /// Cross-validated bandwidth choice
    pub selection: BandwidthSelection,
    /// Smoothed values at each distinct year
    pub curve: SmoothingResult,
    /// Bootstrap band at the same years
    pub band: BootstrapInterval,
}

impl HomeValueTrend {
    /// Write `year,estimate,lower,upper` rows with a header.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "year,estimate,lower,upper")?;
        for (i, (year, estimate)) in self.curve.iter().enumerate() {
            writeln!(
                writer,
                "{},{},{},{}",
                year, estimate, self.band.lower[i], self.band.upper[i]
            )?;
        }
        writer.flush()
    }

    /// Write the curve CSV to a file.
    pub fn write_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<(), DataError> {
        let file = File::create(path.as_ref())?;
        self.write_csv(BufWriter::new(file))?;
        log::info!("Wrote trend curve to {}", path.as_ref().display());
        Ok(())
    }
}

impl fmt::Display for HomeValueTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Kernel-smoothed median home value ===")?;
        writeln!(f, "Observations:       {}", self.n_observations)?;
        writeln!(
            f,
            "Selected bandwidth: {} (LOO MSE {:.4e})",
            self.selection.bandwidth, self.selection.mse
        )?;
        writeln!(
            f,
            "{:>8} {:>16} {:>16} {:>16}",
            "year",
            "estimate",
            format!("{:.1}% lower", self.band.confidence_level * 100.0),
            format!("{:.1}% upper", self.band.confidence_level * 100.0)
        )?;
        for (i, (year, estimate)) in self.curve.iter().enumerate() {
            writeln!(
                f,
                "{:>8} {:>16.2} {:>16.2} {:>16.2}",
                year, estimate, self.band.lower[i], self.band.upper[i]
            )?;
        }
        Ok(())
    }
}

/// Regression of appreciation on tract characteristics
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PovertyRegressionAnalysis {
    /// Parametric OLS fit
    pub fit: OlsFit,
    /// Permutation test of the poverty coefficient
    pub permutation: PermutationTestResult,
    /// Rows dropped for missing values
    pub dropped_rows: usize,
}

impl fmt::Display for PovertyRegressionAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Parametric regression ===")?;
        if self.dropped_rows > 0 {
            writeln!(f, "({} incomplete rows dropped)", self.dropped_rows)?;
        }
        write!(f, "{}", self.fit)?;
        writeln!(f)?;
        writeln!(
            f,
            "=== Permutation test ({} permutations) ===",
            self.permutation.permuted.len()
        )?;
        writeln!(
            f,
            "Observed coefficient for {}: {:.6e}",
            self.permutation.coefficient, self.permutation.observed
        )?;
        writeln!(f, "Permutation p-value: {:.4}", self.permutation.p_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::BootstrapEnsemble;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_sample_summary() {
        let s = SampleSummary::from_values(&[3.0, 1.0, 2.0, 10.0]).unwrap();
        assert_eq!(s.count, 4);
        assert_approx_eq!(s.mean, 4.0, 1e-12);
        assert_approx_eq!(s.median, 2.5, 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 10.0);
        assert!(SampleSummary::from_values(&[]).is_err());
    }

    #[test]
    fn test_trend_csv_layout() {
        let trend = HomeValueTrend {
            n_observations: 4,
            selection: BandwidthSelection {
                bandwidth: 2.0,
                mse: 1.0,
                scores: vec![(2.0, 1.0)],
            },
            curve: SmoothingResult {
                bandwidth: 2.0,
                points: vec![1990.0, 2021.0],
                estimates: vec![100.5, 400.25],
            },
            band: BootstrapInterval {
                points: vec![1990.0, 2021.0],
                lower: vec![90.0, 380.0],
                upper: vec![110.0, 420.0],
                confidence_level: 0.95,
                bandwidth: 2.0,
                ensemble: BootstrapEnsemble {
                    replicates: vec![],
                    dropped: 0,
                },
            },
        };

        let mut out = Vec::new();
        trend.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "year,estimate,lower,upper\n1990,100.5,90,110\n2021,400.25,380,420\n"
        );
        assert!(trend.to_string().contains("Selected bandwidth: 2"));
    }
}
