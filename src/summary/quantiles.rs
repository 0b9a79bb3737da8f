//! Posterior quantile bands over the draw axis

use ndarray::{Array3, Array4, ArrayView3, ArrayView4};
use serde::{Deserialize, Serialize};

/// The fixed set of reported quantile levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantileLevel {
    Low16,
    Low25,
    Median,
    High75,
    High84,
}

impl QuantileLevel {
    /// All levels in ascending order; position in this array is the index
    /// of the level's slot in every quantile array
    pub const ALL: [QuantileLevel; 5] = [
        QuantileLevel::Low16,
        QuantileLevel::Low25,
        QuantileLevel::Median,
        QuantileLevel::High75,
        QuantileLevel::High84,
    ];

    pub fn probability(&self) -> f64 {
        match self {
            QuantileLevel::Low16 => 0.16,
            QuantileLevel::Low25 => 0.25,
            QuantileLevel::Median => 0.50,
            QuantileLevel::High75 => 0.75,
            QuantileLevel::High84 => 0.84,
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuantileLevel::Low16 => "low16",
            QuantileLevel::Low25 => "low25",
            QuantileLevel::Median => "median",
            QuantileLevel::High75 => "high75",
            QuantileLevel::High84 => "high84",
        }
    }
}

/// Linear interpolation between order statistics of sorted data
fn interpolate(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Quantiles of one cell's draws, NaN entries ignored
///
/// A cell with no usable value yields NaN at every level.
pub fn cell_quantiles<I: IntoIterator<Item = f64>>(values: I) -> [f64; 5] {
    let mut finite: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return [f64::NAN; 5];
    }
    finite.sort_by(f64::total_cmp);
    QuantileLevel::ALL.map(|q| interpolate(&finite, q.probability()))
}

/// Variable x horizon x level quantile array of a path ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileSummary {
    pub values: Array3<f64>,
}

impl QuantileSummary {
    /// Reduce a draw x variable x horizon ensemble
    pub fn from_ensemble(ensemble: ArrayView3<f64>) -> Self {
        let (_, k, horizon) = ensemble.dim();
        let mut values = Array3::zeros((k, horizon, QuantileLevel::ALL.len()));
        for i in 0..k {
            for h in 0..horizon {
                let q = cell_quantiles(ensemble.slice(ndarray::s![.., i, h]).iter().copied());
                for (slot, v) in q.iter().enumerate() {
                    values[[i, h, slot]] = *v;
                }
            }
        }
        Self { values }
    }

    pub fn get(&self, variable: usize, horizon: usize, level: QuantileLevel) -> f64 {
        self.values[[variable, horizon, level.index()]]
    }

    pub fn median(&self, variable: usize, horizon: usize) -> f64 {
        self.get(variable, horizon, QuantileLevel::Median)
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.values.dim()
    }
}

/// Variable x shock x horizon x level quantiles of a draw x variable x
/// shock x horizon array
pub fn quantiles_over_draws(draws: ArrayView4<f64>) -> Array4<f64> {
    let (_, k, m, horizon) = draws.dim();
    let mut out = Array4::zeros((k, m, horizon, QuantileLevel::ALL.len()));
    for i in 0..k {
        for j in 0..m {
            for h in 0..horizon {
                let q = cell_quantiles(draws.slice(ndarray::s![.., i, j, h]).iter().copied());
                for (slot, v) in q.iter().enumerate() {
                    out[[i, j, h, slot]] = *v;
                }
            }
        }
    }
    out
}
