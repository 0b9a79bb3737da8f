//! Conditional forecasts: minimum-norm structural shock paths
//!
//! For every draw the constrained cells are written as a linear system in the
//! stacked horizon x K shock sequence, `R e = r`, where row `(h, j)` of `R`
//! holds the response of variable j at each remaining lead to every earlier
//! shock. The particular solution comes from the SVD pseudo-inverse of `R`;
//! a standard normal draw projected onto the null space of `R` is added on
//! top so unconstrained directions keep their posterior spread.

use super::config::{ConditionalConfig, PinvTolerance};
use super::constraints::ConstraintSpec;
use super::ensemble::PathEnsemble;
use super::unconditional::UnconditionalForecast;
use crate::error::{ForecastError, Result};
use crate::model::{Posterior, VariableId};
use crate::runner::{DrawRunner, RunControl};
use crate::summary::{HoldoutEvaluation, QuantileSummary};
use crate::var::linalg::standard_normal_vector;
use crate::var::{resolve_impulse_responses, DrawSystem};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, Array3, ArrayView2};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Design matrix of the constraint system, one row per constrained cell
///
/// `R[row(h, j), kk * K + m] = IRF[j, m, h - kk]` for every shock period `kk <= h`.
pub fn constraint_design(irf: &Array3<f64>, cells: &[(usize, usize)], horizon: usize) -> DMatrix<f64> {
    let k = irf.dim().0;
    let mut design = DMatrix::zeros(cells.len(), k * horizon);
    for (row, &(h, j)) in cells.iter().enumerate() {
        for kk in 0..=h {
            for m in 0..k {
                design[(row, kk * k + m)] = irf[[j, m, h - kk]];
            }
        }
    }
    design
}

/// Add the effect of a stacked shock sequence to a path
///
/// `path[:, h] += sum_{kk <= h} IRF[:, :, h - kk] * shock_kk`
pub fn propagate_shocks(path: &mut Array2<f64>, irf: &Array3<f64>, shocks: &DVector<f64>) {
    let (k, horizon) = path.dim();
    for h in 0..horizon {
        for kk in 0..=h {
            let lead = h - kk;
            for i in 0..k {
                let mut acc = 0.0;
                for m in 0..k {
                    acc += irf[[i, m, lead]] * shocks[kk * k + m];
                }
                path[[i, h]] += acc;
            }
        }
    }
}

/// One conditional path, variable x horizon
///
/// `pred` is the draw's unconditional path, `cells` the constrained cells in
/// the order returned by [`ConstraintSpec::constrained_cells`]. With no
/// constrained cells the unconditional path comes back unchanged.
pub fn conditional_draw<R: Rng + ?Sized>(
    pred: ArrayView2<f64>,
    irf: &Array3<f64>,
    constraints: &ConstraintSpec,
    cells: &[(usize, usize)],
    tolerance: PinvTolerance,
    rng: &mut R,
) -> Result<Array2<f64>> {
    let (k, horizon) = pred.dim();
    let mut path = pred.to_owned();
    if cells.is_empty() {
        return Ok(path);
    }
    let s = k * horizon;

    let residual = DVector::from_iterator(
        cells.len(),
        cells.iter().map(|&(h, j)| {
            let jitter: f64 = rng.sample(StandardNormal);
            constraints.target(h, j) + constraints.sd(h, j) * jitter - pred[[j, h]]
        }),
    );

    let design = constraint_design(irf, cells, horizon);
    let svd = design.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u.as_ref(), svd.v_t.as_ref()) else {
        return Err(ForecastError::InvalidArgument(
            "singular value decomposition returned no singular vectors".to_string(),
        ));
    };

    let max_sv = svd.singular_values.iter().cloned().fold(0.0, f64::max);
    let cutoff = tolerance.cutoff(max_sv);
    let retained: Vec<usize> = (0..svd.singular_values.len())
        .filter(|&i| svd.singular_values[i] > cutoff)
        .collect();
    if retained.len() < svd.singular_values.len() {
        log::debug!(
            "constraint system rank {} of {} after truncation at {:.3e}",
            retained.len(),
            cells.len(),
            cutoff
        );
    }

    // particular solution V1 D^-1 U' r, then z minus its row-space projection
    let z = standard_normal_vector(s, rng);
    let mut shocks = z.clone();
    for &i in &retained {
        let v_i = v_t.row(i).transpose();
        let coef = u.column(i).dot(&residual) / svd.singular_values[i];
        let proj = v_i.dot(&z);
        shocks.axpy(coef - proj, &v_i, 1.0);
    }

    propagate_shocks(&mut path, irf, &shocks);
    Ok(path)
}

/// Result of a conditional forecast run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalForecast {
    pub variables: Vec<VariableId>,
    pub horizon: usize,
    /// Paths in the ensemble: draws x replications
    pub n_paths: usize,
    pub replications: usize,
    /// Number of constrained cells
    pub n_constrained: usize,
    pub summary: QuantileSummary,
    pub holdout: Option<HoldoutEvaluation>,
    #[serde(skip)]
    pub ensemble: Option<PathEnsemble>,
}

/// Conditional forecast with default run hooks
pub fn conditional_forecast(
    posterior: &Posterior,
    unconditional: &UnconditionalForecast,
    constraints: &ConstraintSpec,
    config: &ConditionalConfig,
) -> Result<ConditionalForecast> {
    conditional_forecast_with(posterior, unconditional, constraints, config, &RunControl::default())
}

pub fn conditional_forecast_with(
    posterior: &Posterior,
    unconditional: &UnconditionalForecast,
    constraints: &ConstraintSpec,
    config: &ConditionalConfig,
    control: &RunControl<'_>,
) -> Result<ConditionalForecast> {
    config.validate()?;
    posterior.validate()?;
    let ensemble = unconditional.ensemble.as_ref().ok_or(ForecastError::MissingEnsemble)?;

    let k = posterior.k();
    let horizon = unconditional.horizon;
    let n_draws = posterior.n_draws();
    if (ensemble.n_draws(), ensemble.k()) != (n_draws, k) {
        return Err(ForecastError::shape(
            "unconditional ensemble (draws, variables)",
            (n_draws, k),
            (ensemble.n_draws(), ensemble.k()),
        ));
    }
    if ensemble.horizon() != horizon {
        return Err(ForecastError::InvalidArgument(format!(
            "ensemble covers {} horizons, forecast reports {}",
            ensemble.horizon(),
            horizon
        )));
    }
    constraints.validate(horizon, k)?;

    let cells = constraints.constrained_cells();
    let replications = config.replications;
    log::info!(
        "conditional forecast: {} draws x {} replications, {} constrained cells of {}",
        n_draws,
        replications,
        cells.len(),
        k * horizon
    );

    let runner = DrawRunner::new(config.workers, config.seed, control);
    let per_draw = runner.run(n_draws, |d, rng| {
        let pred = ensemble.path(d);
        if cells.is_empty() {
            return Ok(vec![pred.to_owned(); replications]);
        }
        let system = DrawSystem::build(posterior, d)?;
        let irf = resolve_impulse_responses(
            posterior.draws[d].impulse_responses.as_ref(),
            &system.companion,
            &system.sigma,
            config.identification,
            horizon,
        );
        (0..replications)
            .map(|_| conditional_draw(pred, &irf, constraints, &cells, config.pinv_tolerance, rng))
            .collect::<Result<Vec<_>>>()
    })?;

    let paths: Vec<Array2<f64>> = per_draw.into_iter().flatten().collect();
    let ensemble = PathEnsemble::from_paths(&paths, k, horizon);
    drop(paths);

    let summary = QuantileSummary::from_ensemble(ensemble.view());
    let holdout = posterior
        .holdout
        .as_ref()
        .map(|h| HoldoutEvaluation::evaluate(ensemble.view(), h));

    Ok(ConditionalForecast {
        variables: posterior.variables.clone(),
        horizon,
        n_paths: ensemble.n_draws(),
        replications,
        n_constrained: cells.len(),
        summary,
        holdout,
        ensemble: config.save_draws.then_some(ensemble),
    })
}
