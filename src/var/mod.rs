//! Per-draw VAR machinery: companion form, impulse responses, linear algebra

mod companion;
mod irf;
pub mod linalg;

pub use companion::Companion;
pub use irf::{impulse_responses, resolve_impulse_responses, ShockIdentification};

use crate::error::Result;
use crate::model::Posterior;
use nalgebra::DMatrix;

/// Everything derived from one draw that more than one component needs
///
/// Built once per draw and dropped as soon as that draw's output is written.
#[derive(Debug, Clone)]
pub struct DrawSystem {
    pub companion: Companion,
    pub sigma: DMatrix<f64>,
}

impl DrawSystem {
    pub fn build(posterior: &Posterior, draw: usize) -> Result<Self> {
        let d = &posterior.draws[draw];
        Ok(Self {
            companion: Companion::from_draw(d, &posterior.dims, posterior.layout)?,
            sigma: d.sigma(),
        })
    }
}
