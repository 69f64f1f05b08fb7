//! Collaborator traits for the EM engine.
//!
//! The engine is generic over three seams: parameter initialization, the
//! E-step, and the M-step. The defaults ([`KMeansInit`],
//! [`GaussianExpectation`], [`GaussianMaximization`]) fit a full-covariance
//! Gaussian mixture; tests substitute synthetic collaborators to exercise
//! the control flow in isolation.
//!
//! [`KMeansInit`]: crate::mixture::KMeansInit
//! [`GaussianExpectation`]: crate::mixture::GaussianExpectation
//! [`GaussianMaximization`]: crate::mixture::GaussianMaximization

use crate::error::Result;
use crate::mixture::{Expectation, MixtureParams};
use crate::primitives::Matrix;

/// Produces starting parameters for a dataset and component count.
pub trait Initializer {
    /// Returns initial priors, means, and covariances for `k` components.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` exceeds the number of data points or the
    /// initialization otherwise cannot produce valid parameters.
    fn initialize(&self, x: &Matrix<f64>, k: usize) -> Result<MixtureParams>;
}

/// Computes posterior responsibilities and the total log-likelihood.
pub trait ExpectationEvaluator {
    /// Evaluates the E-step for the current parameters.
    ///
    /// The returned responsibilities are k×n with every column summing
    /// to 1, and the log-likelihood is the sum over data points of the log
    /// mixture density.
    ///
    /// # Errors
    ///
    /// Returns an error on a singular covariance or a non-finite
    /// log-likelihood.
    fn expectation(&self, x: &Matrix<f64>, params: &MixtureParams) -> Result<Expectation>;
}

/// Re-estimates mixture parameters from responsibilities.
pub trait MaximizationUpdater {
    /// Evaluates the M-step for the given k×n responsibilities.
    ///
    /// # Errors
    ///
    /// Returns an error if a component has no responsibility mass.
    fn maximization(&self, x: &Matrix<f64>, responsibilities: &Matrix<f64>)
        -> Result<MixtureParams>;
}
