//! Draw x variable x horizon path ensembles

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};

/// Simulated paths, one variable x horizon slice per draw
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEnsemble {
    paths: Array3<f64>,
}

impl PathEnsemble {
    /// Stack per-draw variable x horizon paths in draw order
    pub fn from_paths(paths: &[Array2<f64>], k: usize, horizon: usize) -> Self {
        let mut out = Array3::zeros((paths.len(), k, horizon));
        for (d, path) in paths.iter().enumerate() {
            out.index_axis_mut(ndarray::Axis(0), d).assign(path);
        }
        Self { paths: out }
    }

    pub fn from_array(paths: Array3<f64>) -> Self {
        Self { paths }
    }

    pub fn n_draws(&self) -> usize {
        self.paths.dim().0
    }

    pub fn k(&self) -> usize {
        self.paths.dim().1
    }

    pub fn horizon(&self) -> usize {
        self.paths.dim().2
    }

    /// Path of one draw, variable x horizon
    pub fn path(&self, draw: usize) -> ArrayView2<f64> {
        self.paths.index_axis(ndarray::Axis(0), draw)
    }

    pub fn view(&self) -> ArrayView3<f64> {
        self.paths.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paths_keeps_order() {
        let paths: Vec<Array2<f64>> = (0..3).map(|d| Array2::from_elem((2, 4), d as f64)).collect();
        let ensemble = PathEnsemble::from_paths(&paths, 2, 4);
        assert_eq!(ensemble.n_draws(), 3);
        assert_eq!(ensemble.k(), 2);
        assert_eq!(ensemble.horizon(), 4);
        assert_eq!(ensemble.path(2)[[1, 3]], 2.0);
        assert_eq!(ensemble.path(0)[[0, 0]], 0.0);
    }
}
