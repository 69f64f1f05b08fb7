//! Full-covariance Gaussian M-step.
//!
//! Weighted re-estimation of priors, means, and covariances from the k×n
//! responsibility matrix. A component whose responsibility mass vanishes
//! cannot be re-estimated; that is reported as a degeneracy, not patched
//! with a floor value.

use crate::error::{MezclaError, Result};
use crate::mixture::MixtureParams;
use crate::primitives::{Matrix, Vector};
use crate::traits::MaximizationUpdater;

/// Default [`MaximizationUpdater`] for full-covariance Gaussian mixtures.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianMaximization;

impl MaximizationUpdater for GaussianMaximization {
    fn maximization(
        &self,
        x: &Matrix<f64>,
        responsibilities: &Matrix<f64>,
    ) -> Result<MixtureParams> {
        let (n, d) = x.shape();
        let k = responsibilities.n_rows();
        if responsibilities.n_cols() != n {
            return Err(MezclaError::dimension_mismatch(
                format!("responsibilities {k}x{n}"),
                format!("{k}x{}", responsibilities.n_cols()),
            ));
        }

        // Effective number of points per component.
        let mut mass = vec![0.0; k];
        for c in 0..k {
            for i in 0..n {
                mass[c] += responsibilities.get(c, i);
            }
            if !(mass[c] > 0.0) || !mass[c].is_finite() {
                return Err(MezclaError::EmptyComponent { component: c });
            }
        }

        let priors: Vec<f64> = mass.iter().map(|&m| m / n as f64).collect();

        let mut means = Matrix::zeros(k, d);
        for c in 0..k {
            for j in 0..d {
                let mut weighted_sum = 0.0;
                for i in 0..n {
                    weighted_sum += responsibilities.get(c, i) * x.get(i, j);
                }
                means.set(c, j, weighted_sum / mass[c]);
            }
        }

        let mut covariances = Vec::with_capacity(k);
        let mut diff = vec![0.0; d];
        for c in 0..k {
            let mut cov = Matrix::zeros(d, d);
            for i in 0..n {
                let r = responsibilities.get(c, i);
                for j in 0..d {
                    diff[j] = x.get(i, j) - means.get(c, j);
                }
                for a in 0..d {
                    for b in 0..=a {
                        let value = cov.get(a, b) + r * diff[a] * diff[b];
                        cov.set(a, b, value);
                    }
                }
            }
            // Symmetric fill from the lower triangle.
            for a in 0..d {
                for b in 0..=a {
                    let value = cov.get(a, b) / mass[c];
                    cov.set(a, b, value);
                    cov.set(b, a, value);
                }
            }
            covariances.push(cov);
        }

        Ok(MixtureParams {
            priors: Vector::from_vec(priors),
            means,
            covariances,
        })
    }
}
