// =========================================================================
// FALSIFY-EM: expectation-maximization engine contract (mezcla mixture)
//
// References:
//   - Dempster, Laird, Rubin (1977) "Maximum Likelihood from Incomplete
//     Data via the EM Algorithm"
// =========================================================================

use super::*;
use crate::error::MezclaError;
use crate::primitives::{Matrix, Vector};
use crate::traits::{ExpectationEvaluator, Initializer, MaximizationUpdater};
use std::cell::{Cell, RefCell};

/// Two well-separated 2D clusters with deterministic jitter, `n_per` points
/// each.
fn two_cluster_data(n_per: usize) -> Matrix<f64> {
    let mut data = Vec::with_capacity(n_per * 2 * 2);
    for (cx, cy) in [(0.0, 0.0), (8.0, 8.0)] {
        for i in 0..n_per {
            let t = i as f64;
            data.push(cx + 0.3 * (1.3 * t).sin());
            data.push(cy + 0.3 * (0.7 * t).cos());
        }
    }
    Matrix::from_vec(n_per * 2, 2, data).expect("valid matrix")
}

// Scripted collaborators for exercising the loop control flow in isolation.

/// E-step whose likelihood climbs by 1 per call, so the delta never drops
/// to any tolerance below 1.
struct ClimbingExpectation {
    call: RefCell<f64>,
}

impl ExpectationEvaluator for ClimbingExpectation {
    fn expectation(
        &self,
        x: &Matrix<f64>,
        params: &MixtureParams,
    ) -> crate::error::Result<Expectation> {
        let mut call = self.call.borrow_mut();
        *call += 1.0;
        let n = x.n_rows();
        let k = params.n_components();
        Ok(Expectation {
            responsibilities: Matrix::from_vec(k, n, vec![1.0 / k as f64; k * n])
                .expect("responsibility dimensions match allocation"),
            log_likelihood: -100.0 + *call,
        })
    }
}

/// E-step whose likelihood climbs by 1 per call until it plateaus, forcing
/// convergence at iteration `climb_until` exactly.
struct PlateauExpectation {
    call: Cell<usize>,
    climb_until: usize,
}

impl ExpectationEvaluator for PlateauExpectation {
    fn expectation(
        &self,
        x: &Matrix<f64>,
        params: &MixtureParams,
    ) -> crate::error::Result<Expectation> {
        self.call.set(self.call.get() + 1);
        let n = x.n_rows();
        let k = params.n_components();
        Ok(Expectation {
            responsibilities: Matrix::from_vec(k, n, vec![1.0 / k as f64; k * n])
                .expect("responsibility dimensions match allocation"),
            log_likelihood: self.call.get().min(self.climb_until) as f64,
        })
    }
}

struct IdentityMaximization;

impl MaximizationUpdater for IdentityMaximization {
    fn maximization(
        &self,
        x: &Matrix<f64>,
        responsibilities: &Matrix<f64>,
    ) -> crate::error::Result<MixtureParams> {
        let d = x.n_cols();
        let k = responsibilities.n_rows();
        Ok(MixtureParams {
            priors: Vector::from_vec(vec![1.0 / k as f64; k]),
            means: Matrix::zeros(k, d),
            covariances: (0..k).map(|_| Matrix::eye(d)).collect(),
        })
    }
}

struct TrivialInit;

impl Initializer for TrivialInit {
    fn initialize(&self, x: &Matrix<f64>, k: usize) -> crate::error::Result<MixtureParams> {
        IdentityMaximization.maximization(x, &Matrix::zeros(k, x.n_rows()))
    }
}

/// FALSIFY-EM-001: responsibility columns sum to 1 at every iteration
#[test]
fn falsify_em_001_responsibility_columns_sum_to_one_each_iteration() {
    /// Wraps the real E-step and checks the normalization invariant on
    /// every call, covering the baseline and all loop iterations.
    struct CheckedExpectation {
        inner: GaussianExpectation,
        calls: Cell<usize>,
    }

    impl ExpectationEvaluator for CheckedExpectation {
        fn expectation(
            &self,
            x: &Matrix<f64>,
            params: &MixtureParams,
        ) -> crate::error::Result<Expectation> {
            let e = self.inner.expectation(x, params)?;
            let (k, n) = e.responsibilities.shape();
            for i in 0..n {
                let col_sum: f64 = (0..k).map(|c| e.responsibilities.get(c, i)).sum();
                assert!(
                    (col_sum - 1.0).abs() < 1e-6,
                    "FALSIFIED EM-001: column {i} sums to {col_sum} on call {}",
                    self.calls.get()
                );
            }
            self.calls.set(self.calls.get() + 1);
            Ok(e)
        }
    }

    let checked = CheckedExpectation {
        inner: GaussianExpectation,
        calls: Cell::new(0),
    };
    let em = ExpectationMaximization::with_steps(
        2,
        KMeansInit::new().with_random_state(42),
        checked,
        GaussianMaximization,
    )
    .with_max_iter(100);

    let fit = em.fit(&two_cluster_data(10)).expect("fit succeeds");
    assert!(fit.n_iter >= 1);
}

/// FALSIFY-EM-002: log-likelihood trace is non-decreasing
#[test]
fn falsify_em_002_log_likelihood_monotone() {
    let em = ExpectationMaximization::new(2)
        .with_random_state(42)
        .with_max_iter(200)
        .with_tol(1e-8);
    let fit = em.fit(&two_cluster_data(12)).expect("fit succeeds");

    for w in fit.log_likelihood_trace.windows(2) {
        assert!(
            w[1] >= w[0] - 1e-7,
            "FALSIFIED EM-002: likelihood dropped from {} to {}",
            w[0],
            w[1]
        );
    }
    assert_eq!(
        *fit.log_likelihood_trace
            .last()
            .expect("trace is never empty"),
        fit.log_likelihood
    );
}

/// FALSIFY-EM-003: a tolerance beyond any plausible likelihood change
/// converges after exactly one update
#[test]
fn falsify_em_003_huge_tolerance_single_update() {
    let em = ExpectationMaximization::new(2)
        .with_random_state(42)
        .with_tol(1e12);
    let fit = em.fit(&two_cluster_data(8)).expect("fit succeeds");

    assert!(fit.converged, "FALSIFIED EM-003: did not converge");
    assert_eq!(
        fit.n_iter, 1,
        "FALSIFIED EM-003: expected 1 iteration, ran {}",
        fit.n_iter
    );
    // Baseline plus one update.
    assert_eq!(fit.log_likelihood_trace.len(), 2);
}

/// FALSIFY-EM-004: malformed arguments fail as invalid input from the
/// entry point, before any computation
#[test]
fn falsify_em_004_invalid_inputs() {
    let x = two_cluster_data(4);

    let cases: Vec<(&str, MezclaError)> = vec![
        (
            "k = 0",
            ExpectationMaximization::new(0).fit(&x).unwrap_err(),
        ),
        (
            "k > n",
            ExpectationMaximization::new(9).fit(&x).unwrap_err(),
        ),
        (
            "max_iter = 0",
            ExpectationMaximization::new(2)
                .with_max_iter(0)
                .fit(&x)
                .unwrap_err(),
        ),
        (
            "tol < 0",
            ExpectationMaximization::new(2)
                .with_tol(-1.0)
                .fit(&x)
                .unwrap_err(),
        ),
        (
            "tol NaN",
            ExpectationMaximization::new(2)
                .with_tol(f64::NAN)
                .fit(&x)
                .unwrap_err(),
        ),
        (
            "empty data",
            ExpectationMaximization::new(1)
                .fit(&Matrix::zeros(0, 2))
                .unwrap_err(),
        ),
        (
            "zero-dimensional data",
            ExpectationMaximization::new(1)
                .fit(&Matrix::zeros(4, 0))
                .unwrap_err(),
        ),
    ];

    for (case, err) in cases {
        assert!(
            err.is_invalid_input(),
            "FALSIFIED EM-004: {case} produced {err:?} instead of invalid input"
        );
    }
}

/// FALSIFY-EM-005: duplicate points collapse a covariance and surface as
/// numerical degeneracy, not as a silently repaired fit
#[test]
fn falsify_em_005_degenerate_data_propagates() {
    let x = Matrix::from_vec(4, 2, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0])
        .expect("valid matrix");
    let err = ExpectationMaximization::new(1).fit(&x).unwrap_err();
    assert!(
        err.is_numerical_degeneracy(),
        "FALSIFIED EM-005: got {err:?}"
    );
}

/// FALSIFY-EM-006: verbosity never changes numerical results
#[test]
fn falsify_em_006_verbose_parity() {
    let x = two_cluster_data(8);
    let quiet = ExpectationMaximization::new(2)
        .with_random_state(7)
        .fit(&x)
        .expect("fit succeeds");
    let loud = ExpectationMaximization::new(2)
        .with_random_state(7)
        .with_verbose(true)
        .fit(&x)
        .expect("fit succeeds");

    assert_eq!(quiet.log_likelihood, loud.log_likelihood);
    assert_eq!(quiet.n_iter, loud.n_iter);
    assert_eq!(quiet.params, loud.params);
}

/// FALSIFY-EM-007: the engine runs to the cap and reports non-convergence
/// when the likelihood keeps moving
#[test]
fn falsify_em_007_iteration_cap_is_not_an_error() {
    let em = ExpectationMaximization::with_steps(
        2,
        TrivialInit,
        ClimbingExpectation {
            call: RefCell::new(0.0),
        },
        IdentityMaximization,
    )
    .with_max_iter(25)
    .with_tol(0.5);

    let fit = em.fit(&two_cluster_data(4)).expect("cap reached is not an error");
    assert!(!fit.converged, "FALSIFIED EM-007: reported convergence");
    assert_eq!(fit.n_iter, 25);
    assert_eq!(fit.log_likelihood_trace.len(), 26);
}

/// FALSIFY-EM-008: separated clusters are recovered with near-hard
/// assignments and means near the cluster centers
#[test]
fn falsify_em_008_recovers_separated_clusters() {
    let x = two_cluster_data(15);
    let fit = ExpectationMaximization::new(2)
        .with_random_state(42)
        .fit(&x)
        .expect("fit succeeds");

    let mut first_coords = [fit.params.means.get(0, 0), fit.params.means.get(1, 0)];
    first_coords.sort_by(|a, b| a.partial_cmp(b).expect("finite"));
    assert!(
        first_coords[0].abs() < 0.5,
        "FALSIFIED EM-008: low mean at {}",
        first_coords[0]
    );
    assert!(
        (first_coords[1] - 8.0).abs() < 0.5,
        "FALSIFIED EM-008: high mean at {}",
        first_coords[1]
    );
    assert!((fit.params.priors.sum() - 1.0).abs() < 1e-9);
}

/// FALSIFY-EM-009: progress is reported at iteration 0, at every 10th
/// iteration, and at the terminating iteration, exactly once each
#[test]
fn falsify_em_009_progress_cadence_exactly_once() {
    let x = two_cluster_data(4);

    let cadence_of = |e_step: PlateauExpectation, max_iter: usize| {
        let em = ExpectationMaximization::with_steps(2, TrivialInit, e_step, IdentityMaximization)
            .with_max_iter(max_iter)
            .with_tol(0.5);
        let mut reported = Vec::new();
        let fit = em
            .fit_with_reporter(&x, &mut |iteration, _| reported.push(iteration))
            .expect("fit succeeds");
        (reported, fit)
    };

    let plateau = |climb_until| PlateauExpectation {
        call: Cell::new(0),
        climb_until,
    };

    // Converges off the 10-grid: iteration 0 plus the terminating iteration.
    let (reported, fit) = cadence_of(plateau(3), 100);
    assert!(fit.converged);
    assert_eq!(fit.n_iter, 3);
    assert_eq!(
        reported,
        vec![0, 3],
        "FALSIFIED EM-009: cadence {reported:?} for convergence at iteration 3"
    );

    // Converges exactly on a multiple of the interval: the periodic line
    // and the termination line are the same line.
    let (reported, fit) = cadence_of(plateau(10), 100);
    assert!(fit.converged);
    assert_eq!(fit.n_iter, 10);
    assert_eq!(
        reported,
        vec![0, 10],
        "FALSIFIED EM-009: iteration 10 must be reported exactly once, got {reported:?}"
    );

    // Cap reached off the 10-grid: periodic lines plus the final iteration.
    let em = ExpectationMaximization::with_steps(
        2,
        TrivialInit,
        ClimbingExpectation {
            call: RefCell::new(0.0),
        },
        IdentityMaximization,
    )
    .with_max_iter(23)
    .with_tol(0.5);
    let mut reported = Vec::new();
    let fit = em
        .fit_with_reporter(&x, &mut |iteration, _| reported.push(iteration))
        .expect("cap reached is not an error");
    assert!(!fit.converged);
    assert_eq!(
        reported,
        vec![0, 10, 20, 23],
        "FALSIFIED EM-009: cadence {reported:?} for a capped 23-iteration run"
    );
}

mod em_proptest_falsify {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        /// FALSIFY-EM-001-prop: final responsibilities stay normalized for
        /// random cluster geometry
        #[test]
        fn falsify_em_001_prop_normalized_responsibilities(
            n_per in 5..=12usize,
            separation in 4.0..12.0f64,
            seed in 0..100u64,
        ) {
            let mut data = Vec::with_capacity(n_per * 2 * 2);
            for center in [0.0, separation] {
                for i in 0..n_per {
                    let t = (i + seed as usize) as f64;
                    data.push(center + 0.25 * (1.1 * t).sin());
                    data.push(center + 0.25 * (0.6 * t).cos());
                }
            }
            let x = Matrix::from_vec(n_per * 2, 2, data).expect("valid");

            let fit = ExpectationMaximization::new(2)
                .with_random_state(seed)
                .with_max_iter(300)
                .fit(&x)
                .expect("fit succeeds");

            let (k, n) = fit.responsibilities.shape();
            prop_assert_eq!((k, n), (2, n_per * 2));
            for i in 0..n {
                let col_sum: f64 = (0..k).map(|c| fit.responsibilities.get(c, i)).sum();
                prop_assert!(
                    (col_sum - 1.0).abs() < 1e-6,
                    "FALSIFIED EM-001-prop: column {} sums to {}", i, col_sum
                );
            }
            prop_assert!((fit.params.priors.sum() - 1.0).abs() < 1e-9);
        }
    }
}
