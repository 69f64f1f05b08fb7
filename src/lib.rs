//! Mezcla: Gaussian mixture modelling in pure Rust.
//!
//! Mezcla fits unlabeled multivariate data with a full-covariance Gaussian
//! Mixture Model via expectation-maximization, and selects the number of
//! components by minimizing the Bayesian Information Criterion over a
//! candidate range.
//!
//! # Quick Start
//!
//! ```
//! use mezcla::prelude::*;
//!
//! // Two tight clusters around (0, 0) and (5, 5).
//! let data = Matrix::from_vec(8, 2, vec![
//!     0.0, 0.1, 0.2, 0.0, 0.1, 0.2, 0.0, 0.0,
//!     5.0, 5.1, 5.2, 5.0, 5.1, 5.2, 5.0, 5.0,
//! ]).expect("valid matrix dimensions and data length");
//!
//! // Fit a fixed component count...
//! let fit = ExpectationMaximization::new(2)
//!     .with_random_state(42)
//!     .fit(&data)
//!     .expect("fit succeeds with valid data");
//! assert!(fit.converged);
//! assert!((fit.params.priors.sum() - 1.0).abs() < 1e-9);
//!
//! // ...or let BIC choose it.
//! let selection = BicSearch::new(1)
//!     .with_kmax(2)
//!     .with_random_state(42)
//!     .select(&data)
//!     .expect("search succeeds with valid data");
//! assert_eq!(selection.best_k, 2);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`mixture`]: EM engine and the default Gaussian collaborators
//! - [`model_selection`]: BIC search over a component-count range
//! - [`traits`]: Collaborator seams (initializer, E-step, M-step)
//! - [`error`]: Error taxonomy and `Result` alias
//!
//! # Features
//!
//! - `parallel`: evaluate BIC candidates with rayon. Best-k selection stays
//!   deterministic regardless of scheduling.

pub mod error;
pub mod mixture;
pub mod model_selection;
pub mod prelude;
pub mod primitives;
pub mod traits;

pub use error::{MezclaError, Result};
pub use mixture::{EmFit, Expectation, ExpectationMaximization, MixtureParams};
pub use model_selection::{BicSearch, BicSelection};
pub use primitives::{Matrix, Vector};
pub use traits::{ExpectationEvaluator, Initializer, MaximizationUpdater};
