//! Full-covariance Gaussian E-step.
//!
//! Works in log space throughout: each component contributes
//! `ln(prior) + ln N(x; mean, cov)`, the per-point totals come from
//! log-sum-exp, and responsibilities are the exponentiated differences.
//! The Gaussian log-density uses one Cholesky factorization per component
//! per call, giving both the log-determinant and the Mahalanobis term.

use crate::error::{MezclaError, Result};
use crate::mixture::{Expectation, MixtureParams};
use crate::primitives::Matrix;
use crate::traits::ExpectationEvaluator;

const LN_TWO_PI: f64 = 1.837_877_066_409_345_3;

/// Default [`ExpectationEvaluator`] for full-covariance Gaussian mixtures.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianExpectation;

impl GaussianExpectation {
    fn check_shapes(x: &Matrix<f64>, params: &MixtureParams) -> Result<(usize, usize, usize)> {
        let (n, d) = x.shape();
        let k = params.priors.len();

        if params.means.shape() != (k, d) {
            return Err(MezclaError::dimension_mismatch(
                format!("means {k}x{d}"),
                format!("{}x{}", params.means.n_rows(), params.means.n_cols()),
            ));
        }
        if params.covariances.len() != k {
            return Err(MezclaError::dimension_mismatch(
                format!("{k} covariance matrices"),
                params.covariances.len(),
            ));
        }
        for (c, cov) in params.covariances.iter().enumerate() {
            if cov.shape() != (d, d) {
                return Err(MezclaError::dimension_mismatch(
                    format!("covariance {c} of {d}x{d}"),
                    format!("{}x{}", cov.n_rows(), cov.n_cols()),
                ));
            }
        }
        Ok((n, d, k))
    }
}

impl ExpectationEvaluator for GaussianExpectation {
    fn expectation(&self, x: &Matrix<f64>, params: &MixtureParams) -> Result<Expectation> {
        let (n, d, k) = Self::check_shapes(x, params)?;

        // Per-component constants: Cholesky factor, Gaussian normalizer,
        // log prior. A covariance that fails to factor is singular.
        let mut factors = Vec::with_capacity(k);
        let mut log_norms = Vec::with_capacity(k);
        let mut log_priors = Vec::with_capacity(k);
        for c in 0..k {
            let factor = params.covariances[c]
                .cholesky()
                .map_err(|_| MezclaError::SingularCovariance { component: c })?;
            log_norms.push(-0.5 * (d as f64 * LN_TWO_PI + factor.log_det_from_cholesky()));
            log_priors.push(if params.priors[c] > 0.0 {
                params.priors[c].ln()
            } else {
                f64::NEG_INFINITY
            });
            factors.push(factor);
        }

        let mut responsibilities = Matrix::zeros(k, n);
        let mut log_likelihood = 0.0;
        let mut diff = vec![0.0; d];
        let mut log_weighted = vec![0.0; k];

        for i in 0..n {
            for c in 0..k {
                for j in 0..d {
                    diff[j] = x.get(i, j) - params.means.get(c, j);
                }
                let y = factors[c]
                    .forward_substitute(&diff)
                    .map_err(|_| MezclaError::SingularCovariance { component: c })?;
                let mahalanobis: f64 = y.iter().map(|v| v * v).sum();
                log_weighted[c] = log_priors[c] + log_norms[c] - 0.5 * mahalanobis;
            }

            let max_term = log_weighted
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            if !max_term.is_finite() {
                return Err(MezclaError::NonFiniteLikelihood { value: max_term });
            }

            let sum_exp: f64 = log_weighted.iter().map(|&lw| (lw - max_term).exp()).sum();
            let log_total = max_term + sum_exp.ln();
            log_likelihood += log_total;

            for c in 0..k {
                responsibilities.set(c, i, (log_weighted[c] - log_total).exp());
            }
        }

        if !log_likelihood.is_finite() {
            return Err(MezclaError::NonFiniteLikelihood {
                value: log_likelihood,
            });
        }

        Ok(Expectation {
            responsibilities,
            log_likelihood,
        })
    }
}
