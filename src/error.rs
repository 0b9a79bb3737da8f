//! Error types for the forecasting core
//!
//! Everything in here is a precondition failure detected before the per-draw
//! loop starts, or an I/O failure at the loading/reporting boundary. Numerical
//! trouble inside a draw is recovered locally and never surfaces as an error.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors raised by forecast, conditional forecast and decomposition runs
#[derive(Error, Debug)]
pub enum ForecastError {
    /// An input array does not have the shape implied by the model dimensions
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    /// A scalar argument is out of range (zero horizon, zero workers, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Conditional forecasting needs the full draw ensemble of the unconditional run
    #[error("unconditional forecast was run without saving its draw ensemble")]
    MissingEnsemble,

    /// A constraint or report refers to a variable that is not in the model
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// A constraint cell holds an infinite value
    #[error("constraint at horizon {horizon}, variable {variable} is not finite")]
    NonFiniteConstraint { horizon: usize, variable: usize },

    /// The run was cancelled between draws
    #[error("run cancelled after {completed} of {total} draws")]
    Cancelled { completed: usize, total: usize },

    /// The worker pool could not be created
    #[error("worker pool error: {0}")]
    ThreadPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ForecastError {
    /// Shorthand for a shape mismatch given `(rows, cols)` pairs
    pub fn shape(what: impl Into<String>, expected: (usize, usize), actual: (usize, usize)) -> Self {
        ForecastError::ShapeMismatch {
            what: what.into(),
            expected: format!("{}x{}", expected.0, expected.1),
            actual: format!("{}x{}", actual.0, actual.1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_message_names_argument() {
        let err = ForecastError::shape("coefficients", (3, 7), (3, 6));
        let msg = err.to_string();
        assert!(msg.contains("coefficients"));
        assert!(msg.contains("3x7"));
        assert!(msg.contains("3x6"));
    }
}
