//! Synthetic posterior generator
//!
//! Produces a posterior with the same layout the estimator hands over:
//! a stable "true" global VAR is simulated to get a panel, and draws are
//! scattered around the true parameters. Used by the demo binary and by
//! tests that need realistic inputs without an estimator run.

use super::draw::{CoefficientLayout, ModelDims, PosteriorDraw};
use super::ident::VariableId;
use super::posterior::Posterior;
use crate::var::Companion;
use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Burn-in periods discarded before the observed panel starts
const BURN_IN: usize = 50;

/// Settings for a synthetic posterior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticPosterior {
    pub countries: Vec<String>,
    pub variables: Vec<String>,
    pub plag: usize,
    pub constant: bool,
    pub trend: bool,
    pub n_draws: usize,
    pub n_obs: usize,
    /// Observations simulated past the panel and kept as a holdout window
    pub n_holdout: usize,
    /// Standard deviation of draw-to-draw coefficient noise
    pub coefficient_sd: f64,
    pub seed: u64,
}

impl Default for SyntheticPosterior {
    fn default() -> Self {
        Self {
            countries: vec!["US".to_string(), "EA".to_string()],
            variables: vec!["y".to_string(), "p".to_string()],
            plag: 2,
            constant: true,
            trend: false,
            n_draws: 200,
            n_obs: 100,
            n_holdout: 0,
            coefficient_sd: 0.02,
            seed: 42,
        }
    }
}

struct TrueModel {
    coefficients: DMatrix<f64>,
    ginv: DMatrix<f64>,
    s: DMatrix<f64>,
}

impl SyntheticPosterior {
    /// Single-country model with `k` variables named `v1..vk`
    pub fn single_country(k: usize, plag: usize, n_draws: usize) -> Self {
        Self {
            countries: vec![String::new()],
            variables: (1..=k).map(|i| format!("v{}", i)).collect(),
            plag,
            n_draws,
            ..Default::default()
        }
    }

    pub fn dims(&self) -> ModelDims {
        ModelDims::new(
            self.countries.len() * self.variables.len(),
            self.plag,
            self.constant,
            self.trend,
        )
    }

    fn identifiers(&self) -> Vec<VariableId> {
        self.countries
            .iter()
            .flat_map(|c| self.variables.iter().map(move |v| VariableId::new(c.clone(), v.clone())))
            .collect()
    }

    fn true_model(&self, rng: &mut ChaCha8Rng) -> TrueModel {
        let dims = self.dims();
        let k = dims.k;
        let mut coefficients = DMatrix::zeros(k, dims.n_regressors());
        for lag in 0..dims.plag {
            let own = 0.5 / ((lag + 1) * (lag + 1)) as f64;
            for i in 0..k {
                for j in 0..k {
                    let spill = 0.05 / k as f64 * rng.gen_range(-1.0..1.0);
                    coefficients[(i, lag * k + j)] = if i == j { own } else { spill };
                }
            }
        }
        if let Some(c) = dims.constant_slot() {
            for i in 0..k {
                coefficients[(i, c)] = 0.1 * rng.gen_range(-1.0..1.0);
            }
        }
        if let Some(t) = dims.trend_slot() {
            for i in 0..k {
                coefficients[(i, t)] = 0.001;
            }
        }

        let mut ginv = DMatrix::identity(k, k);
        for i in 0..k {
            for j in 0..i {
                ginv[(i, j)] = 0.2 / k as f64 * rng.gen_range(-1.0..1.0);
            }
        }
        let s = DMatrix::from_diagonal(&DVector::from_fn(k, |_, _| 0.5 + rng.gen_range(0.0..0.5)));
        TrueModel { coefficients, ginv, s }
    }

    fn simulate_panel(&self, truth: &TrueModel, rng: &mut ChaCha8Rng) -> DMatrix<f64> {
        let dims = self.dims();
        let k = dims.k;
        let total = BURN_IN + self.n_obs + self.n_holdout;
        let shock_factor = &truth.ginv * truth.s.map(f64::sqrt);
        let mut y = DMatrix::zeros(total, k);
        for t in dims.plag..total {
            let mut x = DVector::zeros(dims.n_regressors());
            for lag in 0..dims.plag {
                for j in 0..k {
                    x[lag * k + j] = y[(t - 1 - lag, j)];
                }
            }
            if let Some(c) = dims.constant_slot() {
                x[c] = 1.0;
            }
            if let Some(slot) = dims.trend_slot() {
                // Observation t of the kept panel carries trend value t (1-based)
                x[slot] = t as f64 + 1.0 - BURN_IN as f64;
            }
            let z = DVector::from_fn(k, |_, _| rng.sample::<f64, _>(StandardNormal));
            let row = &truth.coefficients * x + &shock_factor * z;
            y.set_row(t, &row.transpose());
        }
        y.rows(BURN_IN, self.n_obs + self.n_holdout).into_owned()
    }

    fn scatter_draw(&self, truth: &TrueModel, dims: &ModelDims, rng: &mut ChaCha8Rng) -> PosteriorDraw {
        let sd = self.coefficient_sd;
        let coefficients = truth
            .coefficients
            .map(|c| c + sd * rng.sample::<f64, _>(StandardNormal));
        let ginv = DMatrix::from_fn(dims.k, dims.k, |i, j| {
            if i > j {
                truth.ginv[(i, j)] + sd * rng.sample::<f64, _>(StandardNormal)
            } else {
                truth.ginv[(i, j)]
            }
        });
        let s = DMatrix::from_diagonal(&DVector::from_fn(dims.k, |i, _| {
            truth.s[(i, i)] * (1.0 + 0.1 * rng.sample::<f64, _>(StandardNormal)).abs()
        }));
        let mut draw = PosteriorDraw::new(coefficients, ginv, s);
        draw.stable = Companion::from_draw(&draw, dims, CoefficientLayout::LagMajor)
            .map(|c| c.max_modulus() < 1.0)
            .unwrap_or(false);
        draw
    }

    /// Simulate the panel and scatter `n_draws` draws around the true model
    pub fn build(&self) -> Posterior {
        let dims = self.dims();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let truth = self.true_model(&mut rng);
        let panel = self.simulate_panel(&truth, &mut rng);
        let draws = (0..self.n_draws)
            .map(|_| self.scatter_draw(&truth, &dims, &mut rng))
            .collect();

        let data = panel.rows(0, self.n_obs).into_owned();
        let holdout = (self.n_holdout > 0).then(|| panel.rows(self.n_obs, self.n_holdout).into_owned());

        Posterior {
            variables: self.identifiers(),
            dims,
            layout: CoefficientLayout::LagMajor,
            data,
            draws,
            holdout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_shapes() {
        let posterior = SyntheticPosterior {
            n_draws: 10,
            n_obs: 40,
            n_holdout: 4,
            trend: true,
            ..Default::default()
        }
        .build();
        assert!(posterior.validate().is_ok());
        assert_eq!(posterior.k(), 4);
        assert_eq!(posterior.n_draws(), 10);
        assert_eq!(posterior.data.shape(), (40, 4));
        assert_eq!(posterior.holdout.as_ref().unwrap().shape(), (4, 4));
        assert_eq!(posterior.variables[2], VariableId::new("EA", "y"));
        assert!(posterior.data.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_draws_are_stable() {
        let posterior = SyntheticPosterior::single_country(3, 2, 30).build();
        assert!(posterior.draws.iter().all(|d| d.stable));
    }

    #[test]
    fn test_same_seed_same_posterior() {
        let a = SyntheticPosterior::single_country(2, 1, 5).build();
        let b = SyntheticPosterior::single_country(2, 1, 5).build();
        assert_eq!(a.data, b.data);
        assert_eq!(a.draws[4].coefficients, b.draws[4].coefficients);
    }
}
