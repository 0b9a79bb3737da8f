//! Small dense linear-algebra helpers shared by the simulators

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::Rng;
use rand_distr::StandardNormal;

/// Relative pivot tolerance for the semi-definite Cholesky factor
const PSD_PIVOT_TOL: f64 = 1e-12;

pub fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    0.5 * (m + m.transpose())
}

/// Vector of independent standard normal draws
pub fn standard_normal_vector<R: Rng + ?Sized>(n: usize, rng: &mut R) -> DVector<f64> {
    DVector::from_fn(n, |_, _| rng.sample(StandardNormal))
}

/// Lower-triangular factor `L` with `L L' = A` for a positive semi-definite `A`
///
/// Pivots at or below `PSD_PIVOT_TOL * max(diag)` are treated as exact zeros
/// and their column is zeroed, so rank-deficient covariances still get a
/// triangular factor.
pub fn psd_cholesky(a: &DMatrix<f64>) -> DMatrix<f64> {
    let n = a.nrows();
    let scale = a.diagonal().iter().fold(0.0_f64, |m, &d| m.max(d.abs()));
    let tol = PSD_PIVOT_TOL * scale.max(f64::MIN_POSITIVE);
    let mut l = DMatrix::zeros(n, n);
    for j in 0..n {
        let mut d = a[(j, j)];
        for k in 0..j {
            d -= l[(j, k)] * l[(j, k)];
        }
        if d <= tol {
            continue;
        }
        let pivot = d.sqrt();
        l[(j, j)] = pivot;
        for i in (j + 1)..n {
            let mut v = a[(i, j)];
            for k in 0..j {
                v -= l[(i, k)] * l[(j, k)];
            }
            l[(i, j)] = v / pivot;
        }
    }
    l
}

/// Draw from `N(mean, cov)` through a symmetric eigen decomposition
///
/// Works for singular and slightly indefinite covariances: negative
/// eigenvalues are clamped to zero.
pub fn sample_mvn_eigen<R: Rng + ?Sized>(
    mean: &DVector<f64>,
    cov: &DMatrix<f64>,
    rng: &mut R,
) -> DVector<f64> {
    let eig = SymmetricEigen::new(symmetrize(cov));
    let roots = eig.eigenvalues.map(|l| l.max(0.0).sqrt());
    let z = standard_normal_vector(mean.len(), rng);
    mean + eig.eigenvectors * z.component_mul(&roots)
}

/// Smallest eigenvalue of a symmetric matrix
pub fn min_eigenvalue(m: &DMatrix<f64>) -> f64 {
    SymmetricEigen::new(symmetrize(m))
        .eigenvalues
        .iter()
        .fold(f64::INFINITY, |acc, &v| acc.min(v))
}
