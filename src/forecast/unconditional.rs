//! Unconditional posterior-predictive simulation

use super::config::ForecastConfig;
use super::ensemble::PathEnsemble;
use crate::error::Result;
use crate::model::{Posterior, VariableId};
use crate::runner::{DrawRunner, RunControl};
use crate::summary::{HoldoutEvaluation, QuantileSummary};
use crate::var::linalg::{sample_mvn_eigen, standard_normal_vector, symmetrize};
use crate::var::{Companion, DrawSystem};
use nalgebra::{DMatrix, DVector};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Forward recursion of the predictive mean and covariance of one draw
///
/// Yields the K-dimensional observed mean and K x K covariance block for
/// h = 1, 2, ...; the covariance starts at zero (the last state is known).
pub struct PredictiveRecursion<'a> {
    companion: &'a Companion,
    shock_cov: DMatrix<f64>,
    mean: DVector<f64>,
    cov: DMatrix<f64>,
}

impl<'a> PredictiveRecursion<'a> {
    pub fn new(companion: &'a Companion, sigma: &DMatrix<f64>, initial_state: &DVector<f64>) -> Self {
        let nkk = companion.dims.nkk();
        Self {
            companion,
            shock_cov: companion.shock_covariance(sigma),
            mean: initial_state.clone(),
            cov: DMatrix::zeros(nkk, nkk),
        }
    }
}

impl Iterator for PredictiveRecursion<'_> {
    type Item = (DVector<f64>, DMatrix<f64>);

    fn next(&mut self) -> Option<Self::Item> {
        let m = &self.companion.transition;
        let k = self.companion.dims.k;
        self.mean = self.companion.step_mean(&self.mean);
        self.cov = symmetrize(&(m * &self.cov * m.transpose() + &self.shock_cov));
        Some((
            self.mean.rows(0, k).into_owned(),
            self.cov.view((0, 0), (k, k)).into_owned(),
        ))
    }
}

/// One simulated path, variable x horizon
///
/// Each horizon is drawn from `N(mean_h, cov_h)`: through the Cholesky
/// factor when the block is positive definite, otherwise through its eigen
/// decomposition. Both give the same distribution.
pub fn simulate_draw<R: Rng + ?Sized>(
    companion: &Companion,
    sigma: &DMatrix<f64>,
    initial_state: &DVector<f64>,
    horizon: usize,
    rng: &mut R,
) -> Array2<f64> {
    let k = companion.dims.k;
    let mut path = Array2::zeros((k, horizon));
    let recursion = PredictiveRecursion::new(companion, sigma, initial_state);
    for (h, (mean, cov)) in recursion.take(horizon).enumerate() {
        let y = match cov.clone().cholesky() {
            Some(chol) => &mean + chol.l() * standard_normal_vector(k, rng),
            None => {
                log::trace!("covariance block at h={} not positive definite, sampling via eigen", h + 1);
                sample_mvn_eigen(&mean, &cov, rng)
            }
        };
        for i in 0..k {
            path[[i, h]] = y[i];
        }
    }
    path
}

/// Result of an unconditional forecast run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnconditionalForecast {
    pub variables: Vec<VariableId>,
    pub horizon: usize,
    pub n_draws: usize,
    pub summary: QuantileSummary,
    /// Present when the posterior carries a holdout window
    pub holdout: Option<HoldoutEvaluation>,
    /// Full draw ensemble, kept when `save_draws` is set
    #[serde(skip)]
    pub ensemble: Option<PathEnsemble>,
}

/// Unconditional forecast with default run hooks
pub fn unconditional_forecast(posterior: &Posterior, config: &ForecastConfig) -> Result<UnconditionalForecast> {
    unconditional_forecast_with(posterior, config, &RunControl::default())
}

/// Unconditional forecast with an observer and/or cancellation token attached
pub fn unconditional_forecast_with(
    posterior: &Posterior,
    config: &ForecastConfig,
    control: &RunControl<'_>,
) -> Result<UnconditionalForecast> {
    config.validate()?;
    posterior.validate()?;

    let k = posterior.k();
    let horizon = config.horizon;
    let n_draws = posterior.n_draws();
    log::info!(
        "unconditional forecast: {} draws, K={}, horizon={}, workers={}",
        n_draws,
        k,
        horizon,
        config.workers
    );

    let initial = posterior.initial_state();
    let runner = DrawRunner::new(config.workers, config.seed, control);
    let paths = runner.run(n_draws, |d, rng| {
        let system = DrawSystem::build(posterior, d)?;
        Ok(simulate_draw(&system.companion, &system.sigma, &initial, horizon, rng))
    })?;

    let ensemble = PathEnsemble::from_paths(&paths, k, horizon);
    drop(paths);

    let summary = QuantileSummary::from_ensemble(ensemble.view());
    let holdout = posterior
        .holdout
        .as_ref()
        .map(|h| HoldoutEvaluation::evaluate(ensemble.view(), h));

    Ok(UnconditionalForecast {
        variables: posterior.variables.clone(),
        horizon,
        n_draws,
        summary,
        holdout,
        ensemble: config.save_draws.then_some(ensemble),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoefficientLayout, ModelDims, PosteriorDraw, SyntheticPosterior};
    use crate::var::linalg::min_eigenvalue;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn var1_system(sigma: DMatrix<f64>) -> (Companion, DMatrix<f64>) {
        let dims = ModelDims::new(2, 1, true, false);
        let coef = DMatrix::from_row_slice(2, 3, &[0.5, 0.1, 1.0, 0.0, 0.8, 0.0]);
        let draw = PosteriorDraw::new(coef, DMatrix::identity(2, 2), DMatrix::identity(2, 2));
        (Companion::from_draw(&draw, &dims, CoefficientLayout::LagMajor).unwrap(), sigma)
    }

    #[test]
    fn test_recursion_first_step_is_sigma() {
        let sigma = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 0.5]);
        let (companion, sigma) = var1_system(sigma);
        let initial = DVector::from_vec(vec![2.0, 1.0, 1.0]);
        let mut rec = PredictiveRecursion::new(&companion, &sigma, &initial);
        let (mean, cov) = rec.next().unwrap();
        assert_relative_eq!(mean[0], 0.5 * 2.0 + 0.1 * 1.0 + 1.0, epsilon = 1e-12);
        assert_relative_eq!(mean[1], 0.8, epsilon = 1e-12);
        assert_relative_eq!(cov, sigma, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_blocks_are_psd() {
        let sigma = DMatrix::from_row_slice(2, 2, &[1.0, 0.9, 0.9, 1.0]);
        let (companion, sigma) = var1_system(sigma);
        let initial = DVector::from_vec(vec![0.0, 0.0, 1.0]);
        let mut prev_var = 0.0;
        for (_, cov) in PredictiveRecursion::new(&companion, &sigma, &initial).take(12) {
            assert_relative_eq!(cov.clone(), cov.transpose(), epsilon = 1e-12);
            assert!(min_eigenvalue(&cov) >= -1e-10);
            // Forecast-error variance never shrinks with the horizon
            assert!(cov[(0, 0)] >= prev_var - 1e-12);
            prev_var = cov[(0, 0)];
        }
    }

    #[test]
    fn test_covariance_matches_closed_form() {
        // cov_h = sum_{l<h} M^l (J Sigma J') M^l'
        let sigma = DMatrix::from_row_slice(2, 2, &[1.0, 0.2, 0.2, 2.0]);
        let (companion, sigma) = var1_system(sigma);
        let initial = DVector::from_vec(vec![0.0, 0.0, 1.0]);
        let shock = companion.shock_covariance(&sigma);
        let m = &companion.transition;
        let mut expected = DMatrix::zeros(3, 3);
        let mut power = DMatrix::identity(3, 3);
        let covs: Vec<_> = PredictiveRecursion::new(&companion, &sigma, &initial).take(4).collect();
        for (_, cov) in covs.iter() {
            expected += &power * &shock * power.transpose();
            power = m * power;
            assert_relative_eq!(cov.clone(), expected.view((0, 0), (2, 2)).into_owned(), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_singular_sigma_uses_fallback() {
        // Rank one: both shocks identical
        let sigma = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let (companion, sigma) = var1_system(sigma);
        let initial = DVector::from_vec(vec![0.0, 0.0, 1.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let path = simulate_draw(&companion, &sigma, &initial, 5, &mut rng);
        assert_eq!(path.dim(), (2, 5));
        assert!(path.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_forecast_summary_shape() {
        let posterior = SyntheticPosterior::single_country(2, 1, 20).build();
        let config = ForecastConfig { horizon: 3, ..Default::default() };
        let fc = unconditional_forecast(&posterior, &config).unwrap();
        assert_eq!(fc.summary.dim(), (2, 3, 5));
        assert_eq!(fc.ensemble.as_ref().unwrap().n_draws(), 20);
        assert!(fc.holdout.is_none());
    }

    #[test]
    fn test_sequential_run_is_reproducible() {
        let posterior = SyntheticPosterior::single_country(2, 2, 10).build();
        let config = ForecastConfig { horizon: 4, ..Default::default() };
        let a = unconditional_forecast(&posterior, &config).unwrap();
        let b = unconditional_forecast(&posterior, &config).unwrap();
        assert_eq!(a.summary.values, b.summary.values);
    }

    #[test]
    fn test_without_saved_draws() {
        let posterior = SyntheticPosterior::single_country(2, 1, 5).build();
        let config = ForecastConfig { horizon: 2, save_draws: false, ..Default::default() };
        assert!(unconditional_forecast(&posterior, &config).unwrap().ensemble.is_none());
    }
}
