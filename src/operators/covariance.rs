//! Correlated Gaussian sampling
//!
//! Builds the covariance matrix of correlated mutation from per-axis step sizes and
//! rotation angles, factors it with Cholesky and draws correlated deltas.
//!
//! For axes `i < j` with angle index `k` (row-major over the upper triangle):
//!
//! ```text
//! C[i][i] = σᵢ²
//! C[i][j] = C[j][i] = ½ (σᵢ² − σⱼ²) · tan(2αₖ)
//! ```
//!
//! This construction is not positive definite in general. When plain Cholesky fails
//! the matrix is repaired by clamping its eigenvalues from below and factored again.

use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::warn;

use crate::error::{EvoResult, EvolutionError, NumericalError};
use crate::hyperparameter::self_adaptive::num_angles;

/// Build the symmetric covariance matrix for the given step sizes and angles
pub fn covariance_matrix(step_sizes: &[f64], angles: &[f64]) -> EvoResult<DMatrix<f64>> {
    let n = step_sizes.len();
    if angles.len() != num_angles(n) {
        return Err(EvolutionError::DimensionMismatch {
            expected: num_angles(n),
            actual: angles.len(),
        });
    }

    let variances: Vec<f64> = step_sizes.iter().map(|s| s * s).collect();
    let mut matrix = DMatrix::from_diagonal(&DVector::from_vec(variances.clone()));

    let mut k = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            let value = 0.5 * (variances[i] - variances[j]) * (2.0 * angles[k]).tan();
            matrix[(i, j)] = value;
            matrix[(j, i)] = value;
            k += 1;
        }
    }

    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(NumericalError::NonFiniteCovariance.into());
    }
    Ok(matrix)
}

/// Lower-triangular factor of a covariance matrix, ready for sampling
#[derive(Clone, Debug)]
pub struct CovarianceSampler {
    lower: DMatrix<f64>,
    regularized: bool,
}

impl CovarianceSampler {
    /// Build and factor the covariance matrix for the given strategy parameters
    ///
    /// `min_eigenvalue` is the floor applied if the matrix needs repair; it must be
    /// positive.
    pub fn new(step_sizes: &[f64], angles: &[f64], min_eigenvalue: f64) -> EvoResult<Self> {
        let matrix = covariance_matrix(step_sizes, angles)?;
        Self::from_covariance(matrix, min_eigenvalue)
    }

    /// Factor an existing symmetric covariance matrix
    pub fn from_covariance(matrix: DMatrix<f64>, min_eigenvalue: f64) -> EvoResult<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(NumericalError::NonFiniteCovariance.into());
        }
        let dimension = matrix.nrows();

        if let Some(cholesky) = Cholesky::new(matrix.clone()) {
            return Ok(Self {
                lower: cholesky.l(),
                regularized: false,
            });
        }

        let eigen = SymmetricEigen::new(matrix);
        let smallest = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
        let clamped = eigen.eigenvalues.map(|lambda| lambda.max(min_eigenvalue));
        let repaired = &eigen.eigenvectors
            * DMatrix::from_diagonal(&clamped)
            * eigen.eigenvectors.transpose();
        let repaired = (&repaired + repaired.transpose()) * 0.5;

        warn!(
            dimension,
            smallest_eigenvalue = smallest,
            floor = min_eigenvalue,
            "covariance matrix not positive definite, clamping eigenvalues"
        );

        Cholesky::new(repaired)
            .map(|cholesky| Self {
                lower: cholesky.l(),
                regularized: true,
            })
            .ok_or_else(|| NumericalError::CovarianceNotPositiveDefinite { dimension }.into())
    }

    /// The lower-triangular Cholesky factor L with C = L·Lᵀ
    pub fn lower(&self) -> &DMatrix<f64> {
        &self.lower
    }

    /// Whether the matrix needed eigenvalue clamping before it could be factored
    pub fn was_regularized(&self) -> bool {
        self.regularized
    }

    /// Dimension of the distribution
    pub fn dimension(&self) -> usize {
        self.lower.nrows()
    }

    /// Draw one correlated delta: L · z with z ~ N(0, I)
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        let z = DVector::from_fn(self.dimension(), |_, _| rng.sample::<f64, _>(StandardNormal));
        (&self.lower * z).iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_unit_steps_zero_angle_is_identity() {
        let matrix = covariance_matrix(&[1.0, 1.0], &[0.0]).unwrap();
        assert_eq!(matrix, DMatrix::identity(2, 2));

        let sampler = CovarianceSampler::new(&[1.0, 1.0], &[0.0], 1e-4).unwrap();
        assert_eq!(sampler.lower(), &DMatrix::identity(2, 2));
        assert!(!sampler.was_regularized());
    }

    #[test]
    fn test_equal_steps_ignore_angles() {
        let matrix = covariance_matrix(&[0.5, 0.5, 0.5], &[0.3, -1.2, 2.0]).unwrap();
        assert_relative_eq!(matrix, DMatrix::identity(3, 3) * 0.25, epsilon = 1e-15);
    }

    #[test]
    fn test_off_diagonal_formula() {
        let angle = 0.2_f64;
        let matrix = covariance_matrix(&[2.0, 1.0], &[angle]).unwrap();
        let expected = 0.5 * (4.0 - 1.0) * (2.0 * angle).tan();
        assert_relative_eq!(matrix[(0, 0)], 4.0);
        assert_relative_eq!(matrix[(1, 1)], 1.0);
        assert_relative_eq!(matrix[(0, 1)], expected);
        assert_relative_eq!(matrix[(1, 0)], expected);
    }

    #[test]
    fn test_known_cholesky_factor() {
        let matrix = DMatrix::from_row_slice(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        let sampler = CovarianceSampler::from_covariance(matrix, 1e-4).unwrap();
        let expected = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 1.0, 2f64.sqrt()]);
        assert_relative_eq!(sampler.lower().clone(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_indefinite_matrix_is_regularized() {
        // off-diagonal 1.5 * tan(1.2) ≈ 3.86 exceeds sqrt(4 * 1)
        let sampler = CovarianceSampler::new(&[2.0, 1.0], &[0.6], 1e-4).unwrap();
        assert!(sampler.was_regularized());

        let l = sampler.lower();
        let rebuilt = l * l.transpose();
        let eigen = SymmetricEigen::new(rebuilt);
        assert!(eigen.eigenvalues.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_non_finite_covariance_rejected() {
        let result = covariance_matrix(&[1e200, 1.0], &[0.1]);
        assert!(matches!(
            result,
            Err(EvolutionError::Numerical(NumericalError::NonFiniteCovariance))
        ));
    }

    #[test]
    fn test_angle_count_checked() {
        let result = covariance_matrix(&[1.0, 1.0, 1.0], &[0.0]);
        assert!(matches!(
            result,
            Err(EvolutionError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_identity_sample_matches_standard_normal_draws() {
        let sampler = CovarianceSampler::new(&[1.0, 1.0], &[0.0], 1e-4).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut replay = rng.clone();

        let delta = sampler.sample(&mut rng);
        let z0: f64 = replay.sample(StandardNormal);
        let z1: f64 = replay.sample(StandardNormal);
        assert_relative_eq!(delta[0], z0);
        assert_relative_eq!(delta[1], z1);
    }
}
