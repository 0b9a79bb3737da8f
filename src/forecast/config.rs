//! Configuration for forecast runs

use crate::error::{ForecastError, Result};
use crate::var::ShockIdentification;
use serde::{Deserialize, Serialize};

/// Configuration for an unconditional forecast run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Number of periods to forecast
    pub horizon: usize,

    /// Worker threads; 1 runs sequentially
    pub workers: usize,

    /// Seed of the per-draw random streams
    pub seed: u64,

    /// Keep the draw x variable x horizon ensemble (needed for conditional forecasts)
    pub save_draws: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 8,
            workers: 1,
            seed: 42,
            save_draws: true,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidArgument("horizon must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(ForecastError::InvalidArgument("workers must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Which singular values of the constraint design matrix get inverted
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PinvTolerance {
    /// Invert every strictly positive singular value
    #[default]
    Untruncated,
    /// Singular values below `tol * max singular value` join the null space
    Relative(f64),
}

impl PinvTolerance {
    /// Singular values at or below the returned cutoff are not inverted
    pub fn cutoff(&self, max_singular_value: f64) -> f64 {
        match self {
            PinvTolerance::Untruncated => 0.0,
            PinvTolerance::Relative(tol) => tol * max_singular_value,
        }
    }
}

/// Configuration for a conditional forecast run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalConfig {
    /// Worker threads; 1 runs sequentially
    pub workers: usize,

    /// Seed of the per-draw random streams
    pub seed: u64,

    /// Structural identification of the shocks solved for
    pub identification: ShockIdentification,

    /// Pseudo-inverse truncation of the constraint system
    pub pinv_tolerance: PinvTolerance,

    /// Independently jittered conditional paths per draw
    pub replications: usize,

    /// Keep the conditional path ensemble
    pub save_draws: bool,
}

impl Default for ConditionalConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            seed: 42,
            identification: ShockIdentification::Cholesky,
            pinv_tolerance: PinvTolerance::Untruncated,
            replications: 1,
            save_draws: true,
        }
    }
}

impl ConditionalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ForecastError::InvalidArgument("workers must be at least 1".to_string()));
        }
        if self.replications == 0 {
            return Err(ForecastError::InvalidArgument("replications must be at least 1".to_string()));
        }
        if let PinvTolerance::Relative(tol) = self.pinv_tolerance {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(ForecastError::InvalidArgument(format!(
                    "pseudo-inverse tolerance must be a non-negative number, got {}",
                    tol
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ForecastConfig::default().validate().is_ok());
        assert!(ConditionalConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let config = ForecastConfig { horizon: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tolerance_cutoff() {
        assert_eq!(PinvTolerance::Untruncated.cutoff(5.0), 0.0);
        assert_eq!(PinvTolerance::Relative(1e-8).cutoff(2.0), 2e-8);
        let bad = ConditionalConfig {
            pinv_tolerance: PinvTolerance::Relative(-1.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
