//! Expectation-maximization engine for a fixed component count.
//!
//! The loop ordering is fixed: initialize, one E-step to establish the
//! likelihood baseline, then alternate M-step and E-step so that every
//! iteration ends with a likelihood that belongs to the parameters being
//! carried. Convergence is judged on the absolute log-likelihood delta,
//! which is non-decreasing under a correct M-step and therefore a reliable,
//! scale-free stopping signal.

use crate::error::{MezclaError, Result};
use crate::mixture::{
    validate_dataset, validate_iteration_controls, GaussianExpectation, GaussianMaximization,
    KMeansInit, MixtureParams,
};
use crate::primitives::Matrix;
use crate::traits::{ExpectationEvaluator, Initializer, MaximizationUpdater};
use serde::{Deserialize, Serialize};

/// Verbose progress is reported at iteration 0, at every multiple of this
/// interval, and at the terminating iteration (exactly once each).
pub const PROGRESS_INTERVAL: usize = 10;

/// Outcome of one EM run.
///
/// Hitting the iteration cap is not an error: `converged` is false and the
/// parameters from the final iteration are returned, paired with the
/// likelihood they produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmFit {
    /// Fitted mixture parameters.
    pub params: MixtureParams,
    /// Final posterior responsibilities (k × n).
    pub responsibilities: Matrix<f64>,
    /// Log-likelihood of `params` on the training data.
    pub log_likelihood: f64,
    /// Log-likelihood after every iteration; entry 0 is the post-init
    /// E-step baseline. Non-decreasing for a correct E/M pair.
    pub log_likelihood_trace: Vec<f64>,
    /// Number of completed M/E updates.
    pub n_iter: usize,
    /// Whether the likelihood delta dropped to the tolerance before the
    /// iteration cap.
    pub converged: bool,
}

/// Expectation-maximization driver for Gaussian mixture fitting.
///
/// # Examples
///
/// ```
/// use mezcla::prelude::*;
///
/// let data = Matrix::from_vec(8, 2, vec![
///     0.0, 0.1, 0.2, 0.0, 0.1, 0.2, 0.0, 0.0,
///     5.0, 5.1, 5.2, 5.0, 5.1, 5.2, 5.0, 5.0,
/// ]).expect("valid matrix dimensions and data length");
///
/// let em = ExpectationMaximization::new(2).with_random_state(42);
/// let fit = em.fit(&data).expect("fit succeeds with valid data");
///
/// assert_eq!(fit.params.n_components(), 2);
/// assert_eq!(fit.responsibilities.shape(), (2, 8));
/// assert!(fit.log_likelihood.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct ExpectationMaximization<
    I = KMeansInit,
    E = GaussianExpectation,
    M = GaussianMaximization,
> {
    /// Number of mixture components.
    n_components: usize,
    /// Maximum number of EM iterations.
    max_iter: usize,
    /// Convergence tolerance on the log-likelihood delta.
    tol: f64,
    /// Whether to print progress lines (never affects numerical results).
    verbose: bool,
    init: I,
    e_step: E,
    m_step: M,
}

impl ExpectationMaximization {
    /// Creates an engine with the default Gaussian collaborators.
    ///
    /// Defaults: `max_iter = 1000`, `tol = 1e-5`, quiet.
    #[must_use]
    pub fn new(n_components: usize) -> Self {
        Self::with_steps(
            n_components,
            KMeansInit::new(),
            GaussianExpectation,
            GaussianMaximization,
        )
    }

    /// Sets the seed for the default k-means initializer.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.init = self.init.clone().with_random_state(seed);
        self
    }
}

impl<I, E, M> ExpectationMaximization<I, E, M>
where
    I: Initializer,
    E: ExpectationEvaluator,
    M: MaximizationUpdater,
{
    /// Creates an engine with explicit collaborators.
    #[must_use]
    pub fn with_steps(n_components: usize, init: I, e_step: E, m_step: M) -> Self {
        Self {
            n_components,
            max_iter: 1000,
            tol: 1e-5,
            verbose: false,
            init,
            e_step,
            m_step,
        }
    }

    /// Sets the maximum number of EM iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Enables or disables progress reporting.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Number of mixture components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    fn report(&self, iteration: usize, log_likelihood: f64) {
        if self.verbose {
            println!("log-likelihood after {iteration} iterations: {log_likelihood:.5}");
        }
    }

    /// Runs EM to convergence (or the iteration cap) on `x`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error for an empty dataset, `k == 0`,
    /// `k > n`, `max_iter == 0`, or a negative/NaN tolerance — all detected
    /// before any computation. Numerical degeneracies raised by the
    /// collaborators (singular covariance, non-finite likelihood, empty
    /// component) propagate unchanged.
    pub fn fit(&self, x: &Matrix<f64>) -> Result<EmFit> {
        self.fit_with_reporter(x, &mut |iteration, log_likelihood| {
            self.report(iteration, log_likelihood);
        })
    }

    /// Loop body behind [`ExpectationMaximization::fit`]. The reporter is
    /// invoked at iteration 0, at every `PROGRESS_INTERVAL`-th iteration,
    /// and at the terminating iteration, exactly once each; it never feeds
    /// back into the numerics.
    pub(super) fn fit_with_reporter(
        &self,
        x: &Matrix<f64>,
        reporter: &mut dyn FnMut(usize, f64),
    ) -> Result<EmFit> {
        let (n, _d) = validate_dataset(x)?;
        validate_iteration_controls(self.max_iter, self.tol)?;
        if self.n_components == 0 {
            return Err(MezclaError::invalid_input(
                "n_components",
                self.n_components,
                ">= 1",
            ));
        }
        if self.n_components > n {
            return Err(MezclaError::invalid_input(
                "n_components",
                self.n_components,
                "<= number of data points",
            ));
        }

        let mut params = self.init.initialize(x, self.n_components)?;
        let baseline = self.e_step.expectation(x, &params)?;
        let mut responsibilities = baseline.responsibilities;
        let mut log_likelihood = baseline.log_likelihood;
        let mut trace = vec![log_likelihood];

        reporter(0, log_likelihood);

        let mut prev = log_likelihood;
        let mut n_iter = 0;
        let mut converged = false;

        for i in 1..=self.max_iter {
            params = self.m_step.maximization(x, &responsibilities)?;
            let e = self.e_step.expectation(x, &params)?;
            responsibilities = e.responsibilities;
            log_likelihood = e.log_likelihood;
            trace.push(log_likelihood);
            n_iter = i;

            let reported = i % PROGRESS_INTERVAL == 0;
            if reported {
                reporter(i, log_likelihood);
            }

            if (log_likelihood - prev).abs() <= self.tol {
                converged = true;
                // Terminating iteration is always reported, but only once.
                if !reported {
                    reporter(i, log_likelihood);
                }
                break;
            }
            prev = log_likelihood;
        }

        if !converged && n_iter % PROGRESS_INTERVAL != 0 {
            reporter(n_iter, log_likelihood);
        }

        Ok(EmFit {
            params,
            responsibilities,
            log_likelihood,
            log_likelihood_trace: trace,
            n_iter,
            converged,
        })
    }
}
