//! Holdout-sample evaluation of a path ensemble
//!
//! Each (variable, horizon) cell is treated as Gaussian with the ensemble's
//! mean and standard deviation. `rmse` is the one-observation root squared
//! error of that cell, i.e. `|realised - mean|`; average it yourself for a
//! proper RMSE.

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView3};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};

/// Per-cell predictive moments over the draw axis, NaN entries ignored
///
/// Returns `(mean, sd)` arrays of shape variable x horizon; `sd` is the
/// sample standard deviation (n - 1 denominator).
pub fn ensemble_moments(ensemble: ArrayView3<f64>) -> (Array2<f64>, Array2<f64>) {
    let (_, k, horizon) = ensemble.dim();
    let mut mean = Array2::from_elem((k, horizon), f64::NAN);
    let mut sd = Array2::from_elem((k, horizon), f64::NAN);
    for i in 0..k {
        for h in 0..horizon {
            let values: Vec<f64> = ensemble
                .slice(ndarray::s![.., i, h])
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .collect();
            let n = values.len();
            if n == 0 {
                continue;
            }
            let m = values.iter().sum::<f64>() / n as f64;
            mean[[i, h]] = m;
            if n > 1 {
                let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
                sd[[i, h]] = (ss / (n - 1) as f64).sqrt();
            }
        }
    }
    (mean, sd)
}

/// Gaussian log density of `x`, NaN when `sd` is not a positive finite number
pub fn gaussian_log_score(x: f64, mean: f64, sd: f64) -> f64 {
    match Normal::new(mean, sd) {
        Ok(dist) if sd > 0.0 => dist.ln_pdf(x),
        _ => f64::NAN,
    }
}

/// Comparison of the ensemble with the held-out observations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldoutEvaluation {
    /// Number of horizons evaluated (min of forecast horizon and holdout length)
    pub horizons: usize,
    /// Realised values, variable x horizon
    pub realized: Array2<f64>,
    pub mean: Array2<f64>,
    pub sd: Array2<f64>,
    /// Gaussian log predictive score per cell
    pub log_score: Array2<f64>,
    /// Absolute error of the predictive mean per cell
    pub rmse: Array2<f64>,
}

impl HoldoutEvaluation {
    /// Evaluate a draw x variable x horizon ensemble against an H x K holdout
    pub fn evaluate(ensemble: ArrayView3<f64>, holdout: &DMatrix<f64>) -> Self {
        let (_, k, horizon) = ensemble.dim();
        let horizons = horizon.min(holdout.nrows());
        let (mean, sd) = ensemble_moments(ensemble);

        let mut realized = Array2::zeros((k, horizons));
        let mut log_score = Array2::zeros((k, horizons));
        let mut rmse = Array2::zeros((k, horizons));
        for i in 0..k {
            for h in 0..horizons {
                let x = holdout[(h, i)];
                realized[[i, h]] = x;
                log_score[[i, h]] = gaussian_log_score(x, mean[[i, h]], sd[[i, h]]);
                rmse[[i, h]] = (x - mean[[i, h]]).abs();
            }
        }

        Self {
            horizons,
            realized,
            mean: mean.slice(ndarray::s![.., ..horizons]).to_owned(),
            sd: sd.slice(ndarray::s![.., ..horizons]).to_owned(),
            log_score,
            rmse,
        }
    }

    /// Sum of log scores over all finite cells
    pub fn total_log_score(&self) -> f64 {
        self.log_score.iter().filter(|v| v.is_finite()).sum()
    }

    /// Average of the per-cell errors over all finite cells
    pub fn mean_rmse(&self) -> f64 {
        let finite: Vec<f64> = self.rmse.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            f64::NAN
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    #[test]
    fn test_moments() {
        // Two draws, one variable, one horizon: values 1 and 3
        let ensemble = Array3::from_shape_vec((2, 1, 1), vec![1.0, 3.0]).unwrap();
        let (mean, sd) = ensemble_moments(ensemble.view());
        assert_relative_eq!(mean[[0, 0]], 2.0);
        assert_relative_eq!(sd[[0, 0]], 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_log_score_standard_normal() {
        let expected = -0.5 * (2.0 * std::f64::consts::PI).ln();
        assert_relative_eq!(gaussian_log_score(0.0, 0.0, 1.0), expected, epsilon = 1e-12);
        assert!(gaussian_log_score(0.0, 0.0, 0.0).is_nan());
    }

    #[test]
    fn test_evaluate_truncates_to_holdout() {
        let ensemble = Array3::from_shape_fn((4, 2, 3), |(d, i, h)| (d + i + h) as f64);
        let holdout = DMatrix::from_row_slice(2, 2, &[1.5, 2.5, 2.5, 3.5]);
        let eval = HoldoutEvaluation::evaluate(ensemble.view(), &holdout);
        assert_eq!(eval.horizons, 2);
        assert_eq!(eval.rmse.dim(), (2, 2));
        // mean over draws of (d + i + h) is 1.5 + i + h, so every error is zero
        assert!(eval.rmse.iter().all(|v| v.abs() < 1e-12));
        assert_relative_eq!(eval.mean_rmse(), 0.0, epsilon = 1e-12);
        assert!(eval.total_log_score().is_finite());
    }
}
