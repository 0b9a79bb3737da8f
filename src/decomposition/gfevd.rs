//! Per-draw forecast-error variance shares

use crate::var::{impulse_responses, Companion, ShockIdentification};
use nalgebra::DMatrix;
use ndarray::Array3;

/// Variance shares from an impulse-response tensor
///
/// `num[i, j, h] = sum_{l <= h} IRF[i, j, l]^2`, normalised over the shock
/// index j so each (i, h) row sums to one. A row with no variance at all
/// (a variable untouched by every shock) is left at zero.
pub fn variance_shares(irf: &Array3<f64>) -> Array3<f64> {
    let (k, m, horizon) = irf.dim();
    let mut shares = Array3::zeros((k, m, horizon));
    let mut cumulative = vec![0.0; m];
    for i in 0..k {
        cumulative.iter_mut().for_each(|c| *c = 0.0);
        for h in 0..horizon {
            for (j, c) in cumulative.iter_mut().enumerate() {
                *c += irf[[i, j, h]] * irf[[i, j, h]];
            }
            let total: f64 = cumulative.iter().sum();
            if total > 0.0 {
                for (j, c) in cumulative.iter().enumerate() {
                    shares[[i, j, h]] = c / total;
                }
            }
        }
    }
    shares
}

/// Variable x shock x horizon shares of one draw
///
/// With [`ShockIdentification::Generalized`] this is the Lanne-Nyberg
/// generalized decomposition; with `Cholesky` the orthogonalised one.
pub fn draw_shares(
    companion: &Companion,
    sigma: &DMatrix<f64>,
    identification: ShockIdentification,
    horizon: usize,
) -> Array3<f64> {
    let smat = identification.impact_matrix(sigma);
    variance_shares(&impulse_responses(companion, &smat, horizon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoefficientLayout, ModelDims, PosteriorDraw};
    use approx::assert_relative_eq;

    fn system() -> (Companion, DMatrix<f64>) {
        let dims = ModelDims::new(3, 1, true, false);
        let coef = DMatrix::from_row_slice(
            3,
            4,
            &[0.5, 0.1, 0.0, 0.2, 0.2, 0.4, 0.1, 0.0, 0.0, 0.3, 0.6, -0.1],
        );
        let draw = PosteriorDraw::new(coef, DMatrix::identity(3, 3), DMatrix::identity(3, 3));
        let sigma = DMatrix::from_row_slice(3, 3, &[1.0, 0.4, 0.2, 0.4, 2.0, 0.3, 0.2, 0.3, 0.5]);
        (Companion::from_draw(&draw, &dims, CoefficientLayout::LagMajor).unwrap(), sigma)
    }

    #[test]
    fn test_generalized_rows_sum_to_one() {
        let (companion, sigma) = system();
        let shares = draw_shares(&companion, &sigma, ShockIdentification::Generalized, 6);
        for i in 0..3 {
            for h in 0..6 {
                let row: f64 = (0..3).map(|j| shares[[i, j, h]]).sum();
                assert_relative_eq!(row, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cholesky_impact_shares() {
        let (companion, sigma) = system();
        let shares = draw_shares(&companion, &sigma, ShockIdentification::Cholesky, 2);
        // First variable is ordered first: all impact variance is its own
        assert_relative_eq!(shares[[0, 0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(shares[[0, 1, 0]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_variance_row_stays_zero() {
        let mut irf = Array3::zeros((2, 2, 2));
        irf[[0, 0, 0]] = 1.0;
        irf[[0, 1, 1]] = 1.0;
        let shares = variance_shares(&irf);
        assert_eq!(shares[[0, 0, 1]], 0.5);
        assert_eq!(shares[[1, 0, 1]], 0.0);
        assert_eq!(shares[[1, 1, 1]], 0.0);
    }
}
