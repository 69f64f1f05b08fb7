//! Gaussian mixture model fitting via expectation-maximization.
//!
//! [`ExpectationMaximization`] drives the initialize → (M-step, E-step) loop
//! to convergence for a fixed component count, using the collaborators in
//! [`crate::traits`]. The defaults fit full-covariance Gaussians:
//! [`KMeansInit`], [`GaussianExpectation`], [`GaussianMaximization`].

mod em;
mod expectation;
mod init;
mod maximization;

pub use em::{EmFit, ExpectationMaximization, PROGRESS_INTERVAL};
pub use expectation::GaussianExpectation;
pub use init::KMeansInit;
pub use maximization::GaussianMaximization;

use crate::error::{MezclaError, Result};
use crate::primitives::{Matrix, Vector};
use serde::{Deserialize, Serialize};

/// Parameters of a Gaussian mixture: priors, means, covariances.
///
/// The leading dimension of all three fields is the component count k:
/// `priors` has k entries summing to 1, `means` is k×d, and `covariances`
/// holds k symmetric positive-definite d×d matrices. A covariance that
/// drifts singular is a failure condition reported by the E-step, never
/// silently repaired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureParams {
    /// Mixing weights, one per component, summing to 1.
    pub priors: Vector<f64>,
    /// Component means (k × d).
    pub means: Matrix<f64>,
    /// Component covariances, k matrices of d × d.
    pub covariances: Vec<Matrix<f64>>,
}

impl MixtureParams {
    /// Number of mixture components k.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.priors.len()
    }

    /// Data dimensionality d.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.means.n_cols()
    }
}

/// Result of one E-step: soft assignments plus the likelihood they imply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    /// Posterior responsibilities (k × n); every column sums to 1.
    pub responsibilities: Matrix<f64>,
    /// Total log-likelihood: sum over points of the log mixture density.
    pub log_likelihood: f64,
}

/// Validates the dataset shape, returning (n, d).
pub(crate) fn validate_dataset(x: &Matrix<f64>) -> Result<(usize, usize)> {
    let (n, d) = x.shape();
    if n == 0 {
        return Err(MezclaError::invalid_input("data", "0 rows", "n >= 1"));
    }
    if d == 0 {
        return Err(MezclaError::invalid_input("data", "0 columns", "d >= 1"));
    }
    Ok((n, d))
}

/// Validates the shared iteration controls.
pub(crate) fn validate_iteration_controls(max_iter: usize, tol: f64) -> Result<()> {
    if max_iter == 0 {
        return Err(MezclaError::invalid_input("max_iter", max_iter, ">= 1"));
    }
    // The comparison also rejects NaN.
    if !(tol >= 0.0) {
        return Err(MezclaError::invalid_input("tol", tol, ">= 0"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests_em_contract.rs"]
mod tests_em_contract;
