//! Component-count selection via the Bayesian Information Criterion.
//!
//! [`BicSearch`] runs the EM engine once per candidate k in `kmin..=kmax`,
//! scores every fit with `BIC(k) = p(k)·ln(n) − 2·ll(k)`, and keeps the
//! minimum. A failing candidate fails the whole search: silently dropping
//! a k would crown a "best" model that never faced its full competitor
//! set.

use crate::error::{MezclaError, Result};
use crate::mixture::{
    validate_dataset, validate_iteration_controls, EmFit, ExpectationMaximization, MixtureParams,
};
use crate::primitives::Matrix;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Result of a BIC search over a component-count range.
///
/// `log_likelihoods` and `bics` have exactly `kmax − kmin + 1` entries in
/// increasing-k order; entry `i` belongs to `k = kmin + i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BicSelection {
    /// Smallest candidate evaluated.
    pub kmin: usize,
    /// Candidate with the minimum BIC (ties break to the smallest k).
    pub best_k: usize,
    /// Parameters of the best-scoring fit.
    pub best_params: MixtureParams,
    /// Log-likelihood per candidate k.
    pub log_likelihoods: Vec<f64>,
    /// BIC score per candidate k (lower is better).
    pub bics: Vec<f64>,
}

/// BIC-driven search for the number of mixture components.
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
/// let selection = BicSearch::new(1)
///     .with_kmax(2)
///     .with_random_state(42)
///     .select(&data)
///     .expect("search succeeds with valid data");
///
/// assert_eq!(selection.best_k, 2);
/// assert_eq!(selection.bics.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BicSearch {
    /// Smallest candidate component count.
    kmin: usize,
    /// Largest candidate; defaults to `kmin` when unset.
    kmax: Option<usize>,
    /// Iteration cap handed to every EM run.
    max_iter: usize,
    /// Convergence tolerance handed to every EM run.
    tol: f64,
    /// Progress reporting for the EM runs.
    verbose: bool,
    /// Seed for the k-means initializer.
    random_state: Option<u64>,
}

impl BicSearch {
    /// Creates a search starting at `kmin`.
    ///
    /// Without [`BicSearch::with_kmax`] the search evaluates `kmin` alone;
    /// it never defaults to scanning up to n.
    #[must_use]
    pub fn new(kmin: usize) -> Self {
        Self {
            kmin,
            kmax: None,
            max_iter: 1000,
            tol: 1e-5,
            verbose: false,
            random_state: None,
        }
    }

    /// Sets the inclusive upper end of the candidate range.
    #[must_use]
    pub fn with_kmax(mut self, kmax: usize) -> Self {
        self.kmax = Some(kmax);
        self
    }

    /// Sets the iteration cap for every EM run.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance for every EM run.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Enables or disables progress reporting in the EM runs.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the seed for the k-means initializer of every EM run.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn engine(&self, k: usize) -> ExpectationMaximization {
        let mut em = ExpectationMaximization::new(k)
            .with_max_iter(self.max_iter)
            .with_tol(self.tol)
            .with_verbose(self.verbose);
        if let Some(seed) = self.random_state {
            em = em.with_random_state(seed);
        }
        em
    }

    /// Runs the search on `x`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error for an empty dataset, `kmin == 0`,
    /// `kmax < kmin`, `kmax > n`, `max_iter == 0`, or a negative/NaN
    /// tolerance. Any EM failure for any candidate k propagates unchanged;
    /// the search never returns a partially filled result.
    pub fn select(&self, x: &Matrix<f64>) -> Result<BicSelection> {
        let (n, d) = validate_dataset(x)?;
        validate_iteration_controls(self.max_iter, self.tol)?;
        if self.kmin == 0 {
            return Err(MezclaError::invalid_input("kmin", self.kmin, ">= 1"));
        }
        let kmax = self.kmax.unwrap_or(self.kmin);
        if kmax < self.kmin {
            return Err(MezclaError::invalid_input(
                "kmax",
                kmax,
                &format!(">= kmin ({})", self.kmin),
            ));
        }
        if kmax > n {
            return Err(MezclaError::invalid_input(
                "kmax",
                kmax,
                "<= number of data points",
            ));
        }

        let ks: Vec<usize> = (self.kmin..=kmax).collect();

        #[cfg(feature = "parallel")]
        let fits: Vec<EmFit> = ks
            .par_iter()
            .map(|&k| self.engine(k).fit(x))
            .collect::<Result<_>>()?;

        #[cfg(not(feature = "parallel"))]
        let fits: Vec<EmFit> = ks
            .iter()
            .map(|&k| self.engine(k).fit(x))
            .collect::<Result<_>>()?;

        // Scoring is sequential and in increasing-k order, so the minimum
        // lands on the smallest tied k no matter how the fits were
        // scheduled.
        let ln_n = (n as f64).ln();
        let mut log_likelihoods = Vec::with_capacity(fits.len());
        let mut bics = Vec::with_capacity(fits.len());
        for (idx, fit) in fits.iter().enumerate() {
            log_likelihoods.push(fit.log_likelihood);
            bics.push(free_parameters(ks[idx], d) * ln_n - 2.0 * fit.log_likelihood);
        }

        let best_idx = best_index(&bics);
        let best_k = ks[best_idx];
        let mut fits = fits;
        let best_params = fits.swap_remove(best_idx).params;

        Ok(BicSelection {
            kmin: self.kmin,
            best_k,
            best_params,
            log_likelihoods,
            bics,
        })
    }
}

/// Free parameters of a k-component, d-dimensional full-covariance mixture:
/// k − 1 independent priors, k mean vectors, k symmetric covariances.
fn free_parameters(k: usize, d: usize) -> f64 {
    ((k - 1) + k * d + k * d * (d + 1) / 2) as f64
}

/// Index of the minimum score; the strict comparison sends ties to the
/// earliest (smallest-k) entry.
fn best_index(bics: &[f64]) -> usize {
    let mut best = 0;
    for (idx, &bic) in bics.iter().enumerate().skip(1) {
        if bic < bics[best] {
            best = idx;
        }
    }
    best
}
