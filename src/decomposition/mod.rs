//! Forecast-error variance decomposition across posterior draws
//!
//! Shares are computed per draw and then either folded into a running mean
//! (constant memory per cell) or kept draw by draw so that quantile bands
//! can be reported. The full-distribution mode holds
//! `draws x K x K x horizon` values in memory; pick the running mean for
//! large models.

mod gfevd;

pub use gfevd::{draw_shares, variance_shares};

use crate::error::{ForecastError, Result};
use crate::model::{Posterior, VariableId};
use crate::runner::{DrawRunner, RunControl};
use crate::summary::{quantiles_over_draws, QuantileLevel};
use crate::var::{DrawSystem, ShockIdentification};
use ndarray::{Array3, Array4, Axis};
use serde::{Deserialize, Serialize};

/// How shares are aggregated across draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecompositionMode {
    /// Single pass, posterior mean only
    #[default]
    RunningMean,
    /// Keep every draw, report mean and quantiles
    FullDistribution,
}

/// Configuration for a decomposition run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionConfig {
    /// Number of horizons, impact included
    pub horizon: usize,

    /// Worker threads; 1 runs sequentially
    pub workers: usize,

    /// Seed of the per-draw streams (the decomposition itself draws nothing)
    pub seed: u64,

    /// Generalized (order invariant) or Cholesky shocks
    pub identification: ShockIdentification,

    pub mode: DecompositionMode,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            horizon: 8,
            workers: 1,
            seed: 42,
            identification: ShockIdentification::Generalized,
            mode: DecompositionMode::RunningMean,
        }
    }
}

impl DecompositionConfig {
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

/// Posterior decomposition table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionTable {
    pub variables: Vec<VariableId>,
    pub horizon: usize,
    pub mode: DecompositionMode,
    pub identification: ShockIdentification,
    pub n_draws: usize,
    /// Posterior mean share, variable x shock x horizon
    pub mean: Array3<f64>,
    /// Variable x shock x horizon x level, full-distribution mode only
    pub quantiles: Option<Array4<f64>>,
}

impl DecompositionTable {
    /// Mean share of `variable`'s forecast-error variance at `horizon` due to `shock`
    pub fn share(&self, variable: usize, shock: usize, horizon: usize) -> f64 {
        self.mean[[variable, shock, horizon]]
    }

    pub fn quantile(&self, variable: usize, shock: usize, horizon: usize, level: QuantileLevel) -> Option<f64> {
        self.quantiles
            .as_ref()
            .map(|q| q[[variable, shock, horizon, level.index()]])
    }
}

/// Running sum of shares and the number of draws folded in
struct ShareSum {
    sum: Array3<f64>,
    count: usize,
}

pub fn decompose(posterior: &Posterior, config: &DecompositionConfig) -> Result<DecompositionTable> {
    decompose_with(posterior, config, &RunControl::default())
}

pub fn decompose_with(
    posterior: &Posterior,
    config: &DecompositionConfig,
    control: &RunControl<'_>,
) -> Result<DecompositionTable> {
    config.validate()?;
    posterior.validate()?;

    let k = posterior.k();
    let horizon = config.horizon;
    let n_draws = posterior.n_draws();
    log::info!(
        "decomposition: {} draws, K={}, horizon={}, {:?} / {:?}",
        n_draws,
        k,
        horizon,
        config.identification,
        config.mode
    );

    let runner = DrawRunner::new(config.workers, config.seed, control);
    let shares_of = |d: usize| -> Result<Array3<f64>> {
        let system = DrawSystem::build(posterior, d)?;
        Ok(draw_shares(&system.companion, &system.sigma, config.identification, horizon))
    };

    let (mean, quantiles) = match config.mode {
        DecompositionMode::RunningMean => {
            let total = runner.run_fold(
                n_draws,
                || ShareSum {
                    sum: Array3::zeros((k, k, horizon)),
                    count: 0,
                },
                |mut acc, d, _| {
                    acc.sum += &shares_of(d)?;
                    acc.count += 1;
                    Ok(acc)
                },
                |mut left, right| {
                    left.sum += &right.sum;
                    left.count += right.count;
                    left
                },
            )?;
            let mean = if total.count > 0 {
                total.sum / total.count as f64
            } else {
                Array3::from_elem((k, k, horizon), f64::NAN)
            };
            (mean, None)
        }
        DecompositionMode::FullDistribution => {
            let per_draw = runner.run(n_draws, |d, _| shares_of(d))?;
            let mut all = Array4::zeros((n_draws, k, k, horizon));
            for (d, shares) in per_draw.iter().enumerate() {
                all.index_axis_mut(Axis(0), d).assign(shares);
            }
            drop(per_draw);
            let mean = all
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array3::from_elem((k, k, horizon), f64::NAN));
            (mean, Some(quantiles_over_draws(all.view())))
        }
    };

    Ok(DecompositionTable {
        variables: posterior.variables.clone(),
        horizon,
        mode: config.mode,
        identification: config.identification,
        n_draws,
        mean,
        quantiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyntheticPosterior;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_rows_sum_to_one() {
        let posterior = SyntheticPosterior::single_country(3, 2, 15).build();
        let table = decompose(&posterior, &DecompositionConfig { horizon: 5, ..Default::default() }).unwrap();
        assert_eq!(table.mean.dim(), (3, 3, 5));
        assert!(table.quantiles.is_none());
        for i in 0..3 {
            for h in 0..5 {
                let row: f64 = (0..3).map(|j| table.share(i, j, h)).sum();
                assert_relative_eq!(row, 1.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_running_mean_matches_full_distribution() {
        let posterior = SyntheticPosterior::single_country(2, 2, 20).build();
        let running = DecompositionConfig { horizon: 4, workers: 3, ..Default::default() };
        let full = DecompositionConfig {
            mode: DecompositionMode::FullDistribution,
            ..running.clone()
        };
        let a = decompose(&posterior, &running).unwrap();
        let b = decompose(&posterior, &full).unwrap();
        for (x, y) in a.mean.iter().zip(b.mean.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
        let q = b.quantiles.as_ref().unwrap();
        assert_eq!(q.dim(), (2, 2, 4, 5));
        let lo = b.quantile(0, 1, 3, QuantileLevel::Low16).unwrap();
        let hi = b.quantile(0, 1, 3, QuantileLevel::High84).unwrap();
        assert!(lo <= hi);
        assert!(a.quantile(0, 1, 3, QuantileLevel::Median).is_none());
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let posterior = SyntheticPosterior::single_country(2, 1, 3).build();
        let config = DecompositionConfig { horizon: 0, ..Default::default() };
        assert!(decompose(&posterior, &config).is_err());
    }
}
