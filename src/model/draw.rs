//! One posterior draw of the global model and its dimensions

use crate::error::{ForecastError, Result};
use nalgebra::DMatrix;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// Dimensions shared by every draw of a posterior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDims {
    /// Number of endogenous variables (K)
    pub k: usize,

    /// Lag order
    pub plag: usize,

    /// Whether the model carries an intercept
    pub constant: bool,

    /// Whether the model carries a linear trend
    pub trend: bool,
}

impl ModelDims {
    pub fn new(k: usize, plag: usize, constant: bool, trend: bool) -> Self {
        Self { k, plag, constant, trend }
    }

    /// Number of deterministic regressors (constant + trend)
    pub fn n_det(&self) -> usize {
        self.constant as usize + self.trend as usize
    }

    /// Columns of the stacked coefficient block
    pub fn n_regressors(&self) -> usize {
        self.k * self.plag + self.n_det()
    }

    /// Dimension of the companion state
    pub fn nkk(&self) -> usize {
        self.n_regressors()
    }

    /// Position of the constant in the state vector, if any
    pub fn constant_slot(&self) -> Option<usize> {
        self.constant.then_some(self.k * self.plag)
    }

    /// Position of the trend in the state vector, if any
    pub fn trend_slot(&self) -> Option<usize> {
        self.trend.then_some(self.k * self.plag + self.constant as usize)
    }
}

/// Column ordering of the lagged regressors in a coefficient block
///
/// Deterministic columns always come last, constant before trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoefficientLayout {
    /// All variables at lag 1, then all variables at lag 2, ...
    #[default]
    LagMajor,
    /// Variable 1 at lags 1..p, then variable 2 at lags 1..p, ...
    VariableMajor,
}

impl CoefficientLayout {
    /// Column of `var` at `lag` (0-based lag, i.e. 0 = first lag)
    pub fn column(&self, dims: &ModelDims, lag: usize, var: usize) -> usize {
        match self {
            CoefficientLayout::LagMajor => lag * dims.k + var,
            CoefficientLayout::VariableMajor => var * dims.plag + lag,
        }
    }
}

/// One posterior sample as produced by the estimator
///
/// Read-only once constructed; every component borrows it.
#[derive(Debug, Clone)]
pub struct PosteriorDraw {
    /// Stacked coefficients, K x (K*plag + n_det)
    pub coefficients: DMatrix<f64>,

    /// Inverse contemporaneous loading, K x K
    pub ginv: DMatrix<f64>,

    /// Covariance of the country-model residuals, K x K
    pub s: DMatrix<f64>,

    /// Impulse responses supplied by the estimator, K x K x horizon
    pub impulse_responses: Option<Array3<f64>>,

    /// Eigenvalue stability flag set by the estimator
    pub stable: bool,
}

impl PosteriorDraw {
    pub fn new(coefficients: DMatrix<f64>, ginv: DMatrix<f64>, s: DMatrix<f64>) -> Self {
        Self {
            coefficients,
            ginv,
            s,
            impulse_responses: None,
            stable: true,
        }
    }

    /// Attach estimator-supplied impulse responses
    pub fn with_impulse_responses(mut self, irf: Array3<f64>) -> Self {
        self.impulse_responses = Some(irf);
        self
    }

    /// Reduced-form residual covariance `Ginv * S * Ginv'`
    pub fn sigma(&self) -> DMatrix<f64> {
        let sigma = &self.ginv * &self.s * self.ginv.transpose();
        0.5 * (&sigma + sigma.transpose())
    }

    /// Check every array against the model dimensions
    pub fn check_shapes(&self, dims: &ModelDims) -> Result<()> {
        let k = dims.k;
        let coef = (self.coefficients.nrows(), self.coefficients.ncols());
        if coef != (k, dims.n_regressors()) {
            return Err(ForecastError::shape("coefficients", (k, dims.n_regressors()), coef));
        }
        let ginv = (self.ginv.nrows(), self.ginv.ncols());
        if ginv != (k, k) {
            return Err(ForecastError::shape("ginv", (k, k), ginv));
        }
        let s = (self.s.nrows(), self.s.ncols());
        if s != (k, k) {
            return Err(ForecastError::shape("s", (k, k), s));
        }
        if let Some(irf) = &self.impulse_responses {
            let (r, c, h) = irf.dim();
            if r != k || c != k || h == 0 {
                return Err(ForecastError::ShapeMismatch {
                    what: "impulse_responses".to_string(),
                    expected: format!("{}x{}xH", k, k),
                    actual: format!("{}x{}x{}", r, c, h),
                });
            }
        }
        Ok(())
    }

    /// Lag coefficient matrices A_1..A_p, each K x K
    pub fn lag_matrices(&self, dims: &ModelDims, layout: CoefficientLayout) -> Vec<DMatrix<f64>> {
        (0..dims.plag)
            .map(|lag| {
                DMatrix::from_fn(dims.k, dims.k, |i, j| {
                    self.coefficients[(i, layout.column(dims, lag, j))]
                })
            })
            .collect()
    }

    /// Deterministic-term coefficients, K x n_det
    pub fn deterministic_coefficients(&self, dims: &ModelDims) -> DMatrix<f64> {
        let start = dims.k * dims.plag;
        self.coefficients.columns(start, dims.n_det()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_var_two_lag() -> (ModelDims, PosteriorDraw) {
        let dims = ModelDims::new(2, 2, true, false);
        // Columns: y1.l1 y2.l1 y1.l2 y2.l2 const
        let coef = DMatrix::from_row_slice(2, 5, &[
            0.5, 0.1, 0.2, 0.0, 1.0,
            0.0, 0.4, 0.1, 0.3, 2.0,
        ]);
        let draw = PosteriorDraw::new(coef, DMatrix::identity(2, 2), DMatrix::identity(2, 2));
        (dims, draw)
    }

    #[test]
    fn test_dims() {
        let dims = ModelDims::new(3, 2, true, true);
        assert_eq!(dims.n_det(), 2);
        assert_eq!(dims.nkk(), 8);
        assert_eq!(dims.constant_slot(), Some(6));
        assert_eq!(dims.trend_slot(), Some(7));
    }

    #[test]
    fn test_lag_matrices_lag_major() {
        let (dims, draw) = two_var_two_lag();
        let lags = draw.lag_matrices(&dims, CoefficientLayout::LagMajor);
        assert_eq!(lags.len(), 2);
        assert_eq!(lags[0][(0, 1)], 0.1);
        assert_eq!(lags[1][(1, 1)], 0.3);
        assert_eq!(draw.deterministic_coefficients(&dims)[(1, 0)], 2.0);
    }

    #[test]
    fn test_lag_matrices_variable_major() {
        let (dims, draw) = two_var_two_lag();
        // Read as y1.l1 y1.l2 y2.l1 y2.l2
        let lags = draw.lag_matrices(&dims, CoefficientLayout::VariableMajor);
        assert_eq!(lags[0][(0, 1)], 0.2);
        assert_eq!(lags[1][(0, 0)], 0.1);
    }

    #[test]
    fn test_sigma_from_factors() {
        let coef = DMatrix::zeros(2, 2);
        let ginv = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.5, 1.0]);
        let s = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![1.0, 2.0]));
        let draw = PosteriorDraw::new(coef, ginv, s);
        let sigma = draw.sigma();
        assert!((sigma[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((sigma[(1, 0)] - 0.5).abs() < 1e-12);
        assert!((sigma[(1, 1)] - 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_check_shapes_rejects_bad_block() {
        let dims = ModelDims::new(2, 2, true, true);
        let (_, draw) = two_var_two_lag();
        assert!(matches!(
            draw.check_shapes(&dims),
            Err(ForecastError::ShapeMismatch { .. })
        ));
    }
}
