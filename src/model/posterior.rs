//! Posterior sample handed over by the estimator

use super::draw::{CoefficientLayout, ModelDims, PosteriorDraw};
use super::ident::VariableId;
use crate::error::{ForecastError, Result};
use nalgebra::{DMatrix, DVector};

/// Estimator output consumed by every entry point of this crate
#[derive(Debug, Clone)]
pub struct Posterior {
    /// One identifier per endogenous variable, in column order
    pub variables: Vec<VariableId>,

    /// Model dimensions shared by all draws
    pub dims: ModelDims,

    /// Column ordering of the lagged regressors in each draw
    pub layout: CoefficientLayout,

    /// Observed panel, T x K (oldest row first)
    pub data: DMatrix<f64>,

    /// Saved posterior draws
    pub draws: Vec<PosteriorDraw>,

    /// Observations held out at estimation time, H x K
    pub holdout: Option<DMatrix<f64>>,
}

impl Posterior {
    /// Number of endogenous variables
    pub fn k(&self) -> usize {
        self.dims.k
    }

    pub fn n_draws(&self) -> usize {
        self.draws.len()
    }

    /// Validate every array against the model dimensions
    ///
    /// Called by each entry point before the draw loop starts.
    pub fn validate(&self) -> Result<()> {
        let k = self.dims.k;
        if k == 0 {
            return Err(ForecastError::InvalidArgument("model has no variables".to_string()));
        }
        if self.dims.plag == 0 {
            return Err(ForecastError::InvalidArgument("lag order must be at least 1".to_string()));
        }
        if self.variables.len() != k {
            return Err(ForecastError::ShapeMismatch {
                what: "variables".to_string(),
                expected: k.to_string(),
                actual: self.variables.len().to_string(),
            });
        }
        if self.data.ncols() != k {
            return Err(ForecastError::shape("data", (self.data.nrows(), k), self.data.shape()));
        }
        if self.data.nrows() < self.dims.plag {
            return Err(ForecastError::InvalidArgument(format!(
                "data has {} observations but the model needs {} lags",
                self.data.nrows(),
                self.dims.plag
            )));
        }
        if let Some(holdout) = &self.holdout {
            if holdout.ncols() != k {
                return Err(ForecastError::shape("holdout", (holdout.nrows(), k), holdout.shape()));
            }
        }
        if self.draws.is_empty() {
            return Err(ForecastError::InvalidArgument("posterior holds no draws".to_string()));
        }
        for draw in &self.draws {
            draw.check_shapes(&self.dims)?;
        }
        Ok(())
    }

    /// State vector at the end of the sample: `[y_T, ..., y_{T-p+1}, 1, T+1]`
    ///
    /// The trend slot holds the trend value of the first forecast period;
    /// observation `t` of the panel has trend value `t` (1-based).
    pub fn initial_state(&self) -> DVector<f64> {
        let dims = &self.dims;
        let t = self.data.nrows();
        let mut state = DVector::zeros(dims.nkk());
        for lag in 0..dims.plag {
            let row = self.data.row(t - 1 - lag);
            for j in 0..dims.k {
                state[lag * dims.k + j] = row[j];
            }
        }
        if let Some(slot) = dims.constant_slot() {
            state[slot] = 1.0;
        }
        if let Some(slot) = dims.trend_slot() {
            state[slot] = (t + 1) as f64;
        }
        state
    }

    /// Drop draws flagged unstable by the estimator, returning how many were removed
    pub fn retain_stable(&mut self) -> usize {
        let before = self.draws.len();
        self.draws.retain(|d| d.stable);
        let removed = before - self.draws.len();
        if removed > 0 {
            log::warn!("dropped {} of {} draws flagged unstable", removed, before);
        }
        removed
    }

    /// Resolve a combined variable name to its column index
    pub fn variable_index(&self, name: &str, separator: &str) -> Result<usize> {
        self.variables
            .iter()
            .position(|id| id.matches(name, separator))
            .ok_or_else(|| ForecastError::UnknownVariable(name.to_string()))
    }
}
