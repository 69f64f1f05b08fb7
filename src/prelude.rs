//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use mezcla::prelude::*;
//! ```

pub use crate::error::{MezclaError, Result};
pub use crate::mixture::{
    EmFit, Expectation, ExpectationMaximization, GaussianExpectation, GaussianMaximization,
    KMeansInit, MixtureParams,
};
pub use crate::model_selection::{BicSearch, BicSelection};
pub use crate::primitives::{Matrix, Vector};
pub use crate::traits::{ExpectationEvaluator, Initializer, MaximizationUpdater};
