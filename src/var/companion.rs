//! Companion (VAR(1) state-space) form of one posterior draw

use crate::error::{ForecastError, Result};
use crate::model::{CoefficientLayout, ModelDims, PosteriorDraw};
use nalgebra::{DMatrix, DVector};

/// First-order state-space form of a VAR(p) with deterministic terms
///
/// `state_{t+1} = M state_t + drift + J shock_{t+1}` where the state stacks
/// `[y_t, ..., y_{t-p+1}, const, trend]`.
#[derive(Debug, Clone)]
pub struct Companion {
    /// Transition matrix M, nkk x nkk
    pub transition: DMatrix<f64>,

    /// Shock loading J, nkk x K
    pub loading: DMatrix<f64>,

    /// Affine term advancing the trend slot by one per step
    pub drift: DVector<f64>,

    pub dims: ModelDims,
}

impl Companion {
    /// Build the companion system of a draw
    ///
    /// A coefficient block whose shape disagrees with `dims` is an internal
    /// precondition violation; entry points validate the posterior first.
    pub fn from_draw(draw: &PosteriorDraw, dims: &ModelDims, layout: CoefficientLayout) -> Result<Self> {
        let (k, plag) = (dims.k, dims.plag);
        let nkk = dims.nkk();
        let shape = (draw.coefficients.nrows(), draw.coefficients.ncols());
        if shape != (k, dims.n_regressors()) {
            return Err(ForecastError::shape("coefficients", (k, dims.n_regressors()), shape));
        }

        let mut m = DMatrix::zeros(nkk, nkk);

        // AR rows, lag blocks placed contiguously
        for lag in 0..plag {
            for i in 0..k {
                for j in 0..k {
                    m[(i, lag * k + j)] = draw.coefficients[(i, layout.column(dims, lag, j))];
                }
            }
        }
        for d in 0..dims.n_det() {
            let col = k * plag + d;
            for i in 0..k {
                m[(i, col)] = draw.coefficients[(i, col)];
            }
        }

        // Shift older lags down one block
        for r in k..(k * plag) {
            m[(r, r - k)] = 1.0;
        }

        let mut drift = DVector::zeros(nkk);
        if let Some(c) = dims.constant_slot() {
            m[(c, c)] = 1.0;
        }
        if let Some(t) = dims.trend_slot() {
            m[(t, t)] = 1.0;
            drift[t] = 1.0;
        }

        let mut loading = DMatrix::zeros(nkk, k);
        loading.view_mut((0, 0), (k, k)).fill_with_identity();

        Ok(Self {
            transition: m,
            loading,
            drift,
            dims: *dims,
        })
    }

    /// One-step mean propagation `M x + drift`
    pub fn step_mean(&self, state: &DVector<f64>) -> DVector<f64> {
        &self.transition * state + &self.drift
    }

    /// State covariance contributed by one period's shocks, `J Sigma J'`
    pub fn shock_covariance(&self, sigma: &DMatrix<f64>) -> DMatrix<f64> {
        &self.loading * sigma * self.loading.transpose()
    }

    /// Square block of M acting on the lagged endogenous variables
    pub fn lag_block(&self) -> DMatrix<f64> {
        let n = self.dims.k * self.dims.plag;
        self.transition.view((0, 0), (n, n)).into_owned()
    }

    /// Largest eigenvalue modulus of the lag block (< 1 for a stable draw)
    pub fn max_modulus(&self) -> f64 {
        self.lag_block()
            .complex_eigenvalues()
            .iter()
            .fold(0.0_f64, |acc, z| acc.max(z.norm()))
    }

    /// Moving-average coefficients `Phi_h = J' M^h J` for h = 0..nstep-1
    pub fn ma_coefficients(&self, nstep: usize) -> Vec<DMatrix<f64>> {
        let k = self.dims.k;
        let lag = self.lag_block();
        let mut power = self.loading.rows(0, lag.nrows()).into_owned();
        let mut out = Vec::with_capacity(nstep);
        for h in 0..nstep {
            if h > 0 {
                power = &lag * &power;
            }
            out.push(power.rows(0, k).into_owned());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn draw_2x2() -> (ModelDims, PosteriorDraw) {
        let dims = ModelDims::new(2, 2, true, true);
        // y1.l1 y2.l1 y1.l2 y2.l2 const trend
        let coef = DMatrix::from_row_slice(2, 6, &[
            0.5, 0.1, 0.2, 0.0, 1.0, 0.01,
            0.0, 0.4, 0.1, 0.3, 2.0, 0.02,
        ]);
        (dims, PosteriorDraw::new(coef, DMatrix::identity(2, 2), DMatrix::identity(2, 2)))
    }

    #[test]
    fn test_companion_structure() {
        let (dims, draw) = draw_2x2();
        let c = Companion::from_draw(&draw, &dims, CoefficientLayout::LagMajor).unwrap();
        let m = &c.transition;
        assert_eq!(m.shape(), (6, 6));
        assert_eq!(m[(0, 0)], 0.5);
        assert_eq!(m[(1, 3)], 0.3);
        assert_eq!(m[(0, 4)], 1.0);
        assert_eq!(m[(1, 5)], 0.02);
        // Shift block
        assert_eq!(m[(2, 0)], 1.0);
        assert_eq!(m[(3, 1)], 1.0);
        assert_eq!(m[(2, 1)], 0.0);
        // Deterministic slots
        assert_eq!(m[(4, 4)], 1.0);
        assert_eq!(m[(5, 5)], 1.0);
        assert_eq!(c.drift[5], 1.0);
        assert_eq!(c.loading[(0, 0)], 1.0);
        assert_eq!(c.loading[(2, 0)], 0.0);
    }

    #[test]
    fn test_step_mean_matches_regression() {
        let (dims, draw) = draw_2x2();
        let c = Companion::from_draw(&draw, &dims, CoefficientLayout::LagMajor).unwrap();
        // y_T = (1, 2), y_{T-1} = (3, 4), trend for next period = 10
        let state = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 1.0, 10.0]);
        let next = c.step_mean(&state);
        let y1 = 0.5 * 1.0 + 0.1 * 2.0 + 0.2 * 3.0 + 1.0 + 0.01 * 10.0;
        let y2 = 0.4 * 2.0 + 0.1 * 3.0 + 0.3 * 4.0 + 2.0 + 0.02 * 10.0;
        assert_relative_eq!(next[0], y1, epsilon = 1e-12);
        assert_relative_eq!(next[1], y2, epsilon = 1e-12);
        assert_eq!(next[2], 1.0);
        assert_eq!(next[3], 2.0);
        assert_eq!(next[4], 1.0);
        assert_eq!(next[5], 11.0);
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let (_, draw) = draw_2x2();
        let dims = ModelDims::new(2, 3, true, true);
        assert!(Companion::from_draw(&draw, &dims, CoefficientLayout::LagMajor).is_err());
    }

    #[test]
    fn test_ma_coefficients_var1() {
        let dims = ModelDims::new(1, 1, false, false);
        let draw = PosteriorDraw::new(
            DMatrix::from_element(1, 1, 0.5),
            DMatrix::identity(1, 1),
            DMatrix::identity(1, 1),
        );
        let c = Companion::from_draw(&draw, &dims, CoefficientLayout::LagMajor).unwrap();
        let phi = c.ma_coefficients(4);
        assert_relative_eq!(phi[0][(0, 0)], 1.0);
        assert_relative_eq!(phi[3][(0, 0)], 0.125);
        assert_relative_eq!(c.max_modulus(), 0.5, epsilon = 1e-12);
    }
}
