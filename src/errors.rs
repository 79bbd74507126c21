//! Error types and validation functions for appreciation analysis.
//!
//! Every numerical routine in this crate reports degenerate input at the point
//! of computation instead of letting NaN or infinity flow into later stages.

use std::sync::Arc;
use thiserror::Error;

/// Error types for power-law fitting, kernel smoothing and resampling tests.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum AppreciationError {
    /// No observations remain after applying the lower threshold.
    #[error("No observations at or above x_minimum = {x_minimum}")]
    EmptyFilteredSample {
        /// Threshold that removed every observation
        x_minimum: f64,
    },

    /// The power-law shape parameter is undefined for this sample.
    #[error("Degenerate power-law shape parameter: {reason}")]
    DegenerateShapeParameter {
        /// Why the shape parameter could not be estimated or used
        reason: String,
    },

    /// Every kernel weight is zero at the evaluation point.
    #[error("Zero kernel support at x = {x_eval} with bandwidth {bandwidth}")]
    ZeroKernelSupport {
        /// Evaluation point with no support
        x_eval: f64,
        /// Bandwidth in use
        bandwidth: f64,
    },

    /// The bandwidth grid is empty or holds non-positive entries.
    #[error("Invalid bandwidth grid: {reason}")]
    InvalidBandwidthGrid {
        /// What is wrong with the grid
        reason: String,
    },

    /// Insufficient data for the requested computation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Invalid parameter value.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Paired inputs have different lengths.
    #[error("Dimension mismatch: {left} has {left_len} values, {right} has {right_len}")]
    DimensionMismatch {
        /// Name of the first input
        left: String,
        /// Length of the first input
        left_len: usize,
        /// Name of the second input
        right: String,
        /// Length of the second input
        right_len: usize,
    },

    /// Numerical computation error.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for numerical failure
        reason: String,
        /// Operation that failed
        operation: Option<String>,
    },

    /// Bootstrap resampling error.
    #[error("Bootstrap resampling failed: {reason}")]
    BootstrapError {
        /// Reason for bootstrap failure
        reason: String,
    },

    /// Census data could not be loaded.
    #[error(transparent)]
    DataError(#[from] DataError),
}

/// Failures while reading the census CSV.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum DataError {
    /// The file could not be opened or read.
    #[error("I/O error reading census data: {source}")]
    Io {
        /// Underlying error
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A line could not be parsed.
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// A required column is not in the header.
    #[error("Missing column: {name}")]
    MissingColumn {
        /// Column name
        name: String,
    },
}

impl From<std::io::Error> for DataError {
    fn from(source: std::io::Error) -> Self {
        DataError::Io {
            source: Arc::new(source),
        }
    }
}

impl From<std::io::Error> for AppreciationError {
    fn from(source: std::io::Error) -> Self {
        AppreciationError::DataError(source.into())
    }
}

/// Result type for appreciation analysis operations.
pub type AppreciationResult<T> = Result<T, AppreciationError>;

/// Validates that data has sufficient length for analysis.
///
/// # Example
/// ```rust
/// use tract_appreciation::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2, "test").is_ok());
/// assert!(validate_data_length(&data, 5, "test").is_err());
/// ```
pub fn validate_data_length(
    data: &[f64],
    min_required: usize,
    operation: &str,
) -> AppreciationResult<()> {
    if data.len() < min_required {
        log::debug!(
            "{} rejected input of length {} (needs {})",
            operation,
            data.len(),
            min_required
        );
        Err(AppreciationError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that two paired inputs have the same length.
pub fn validate_same_length(
    left: &[f64],
    left_name: &str,
    right: &[f64],
    right_name: &str,
) -> AppreciationResult<()> {
    if left.len() != right.len() {
        return Err(AppreciationError::DimensionMismatch {
            left: left_name.to_string(),
            left_len: left.len(),
            right: right_name.to_string(),
            right_len: right.len(),
        });
    }
    Ok(())
}

/// Validates that a parameter is finite and strictly positive.
///
/// # Example
/// ```rust
/// use tract_appreciation::errors::validate_positive;
///
/// assert!(validate_positive(5.0, "bandwidth").is_ok());
/// assert!(validate_positive(0.0, "bandwidth").is_err());
/// assert!(validate_positive(f64::NAN, "bandwidth").is_err());
/// ```
pub fn validate_positive(value: f64, name: &str) -> AppreciationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppreciationError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "finite and > 0".to_string(),
        });
    }
    Ok(())
}

/// Validates that a level lies strictly inside (0, 1).
pub fn validate_probability(value: f64, name: &str) -> AppreciationResult<()> {
    if value.is_nan() || value <= 0.0 || value >= 1.0 {
        return Err(AppreciationError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "(0, 1)".to_string(),
        });
    }
    Ok(())
}

/// Validates that an iteration count is non-zero.
pub fn validate_count(value: usize, name: &str) -> AppreciationResult<()> {
    if value == 0 {
        return Err(AppreciationError::InvalidParameter {
            parameter: name.to_string(),
            value: 0.0,
            constraint: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first non-finite value.
///
/// # Example
/// ```rust
/// use tract_appreciation::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0, 3.0], "test").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN, 3.0], "test").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> AppreciationResult<()> {
    if let Some((i, &value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        let value_desc = if value.is_nan() {
            "NaN".to_string()
        } else if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };

        return Err(AppreciationError::NumericalError {
            reason: format!(
                "{} contains non-finite value at index {}: {}",
                name, i, value_desc
            ),
            operation: None,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_data_length() {
        let data = vec![1.0, 2.0];
        match validate_data_length(&data, 5, "test_operation") {
            Err(AppreciationError::InsufficientData { required, actual }) => {
                assert_eq!(required, 5);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected InsufficientData error, got {:?}", other),
        }
        assert!(validate_data_length(&data, 2, "test_operation").is_ok());
    }

    #[test]
    fn test_validate_same_length() {
        let result = validate_same_length(&[1.0, 2.0], "x", &[1.0], "y");
        match result {
            Err(AppreciationError::DimensionMismatch {
                left_len,
                right_len,
                ..
            }) => {
                assert_eq!(left_len, 2);
                assert_eq!(right_len, 1);
            }
            other => panic!("Expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_probability_bounds() {
        assert!(validate_probability(0.95, "confidence").is_ok());
        assert!(validate_probability(0.0, "confidence").is_err());
        assert!(validate_probability(1.0, "confidence").is_err());
        assert!(validate_probability(f64::NAN, "confidence").is_err());
    }

    #[test]
    fn test_validate_all_finite_reports_index() {
        let result = validate_all_finite(&[1.0, 2.0, f64::NEG_INFINITY], "ratios");
        match result {
            Err(AppreciationError::NumericalError { reason, .. }) => {
                assert!(reason.contains("ratios"));
                assert!(reason.contains("index 2"));
                assert!(reason.contains("-Infinity"));
            }
            other => panic!("Expected NumericalError, got {:?}", other),
        }
    }

    #[test]
    fn test_error_display_formatting() {
        let err = AppreciationError::ZeroKernelSupport {
            x_eval: 2050.0,
            bandwidth: 0.5,
        };
        let message = err.to_string();
        assert!(message.contains("2050"));
        assert!(message.contains("0.5"));

        let err = AppreciationError::EmptyFilteredSample { x_minimum: 2.0 };
        assert!(err.to_string().contains("x_minimum = 2"));

        let err: AppreciationError = DataError::MissingColumn {
            name: "poverty_rate".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Missing column: poverty_rate");
    }
}
