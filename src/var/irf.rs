//! Structural impulse responses of a single draw

use super::companion::Companion;
use super::linalg::psd_cholesky;
use nalgebra::DMatrix;
use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};

/// How reduced-form residuals are mapped to structural shocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShockIdentification {
    /// Lower-triangular Cholesky factor of Sigma (recursive ordering)
    #[default]
    Cholesky,
    /// Generalized impulses: column j is `Sigma[:, j] / sqrt(Sigma[j, j])`
    Generalized,
}

impl ShockIdentification {
    /// Structural impact matrix for the given residual covariance
    pub fn impact_matrix(&self, sigma: &DMatrix<f64>) -> DMatrix<f64> {
        match self {
            ShockIdentification::Cholesky => match sigma.clone().cholesky() {
                Some(chol) => chol.l(),
                None => {
                    log::debug!("Sigma not positive definite, using semi-definite factor");
                    psd_cholesky(sigma)
                }
            },
            ShockIdentification::Generalized => {
                let k = sigma.nrows();
                DMatrix::from_fn(k, k, |i, j| {
                    let sd = sigma[(j, j)].sqrt();
                    if sd > 0.0 {
                        sigma[(i, j)] / sd
                    } else {
                        0.0
                    }
                })
            }
        }
    }
}

/// `IRF[i, j, h]`: response of variable i at horizon h to a unit structural
/// shock j at horizon 0, for h = 0..nstep-1
pub fn impulse_responses(companion: &Companion, smat: &DMatrix<f64>, nstep: usize) -> Array3<f64> {
    let k = companion.dims.k;
    let mut irf = Array3::zeros((k, k, nstep));
    for (h, phi) in companion.ma_coefficients(nstep).iter().enumerate() {
        let response = phi * smat;
        for i in 0..k {
            for j in 0..k {
                irf[[i, j, h]] = response[(i, j)];
            }
        }
    }
    irf
}

/// Use the estimator's tensor when it covers `nstep` horizons, otherwise compute one
pub fn resolve_impulse_responses(
    supplied: Option<&Array3<f64>>,
    companion: &Companion,
    sigma: &DMatrix<f64>,
    identification: ShockIdentification,
    nstep: usize,
) -> Array3<f64> {
    match supplied {
        Some(irf) if irf.dim().2 >= nstep => irf.slice(s![.., .., ..nstep]).to_owned(),
        _ => impulse_responses(companion, &identification.impact_matrix(sigma), nstep),
    }
}
