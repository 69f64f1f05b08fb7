//! Error types for mezcla operations.
//!
//! Two fatal error families exist: invalid input (detected before any
//! computation) and numerical degeneracy (detected mid-computation and
//! propagated unchanged). Reaching the iteration cap is not an error;
//! it is reported through [`EmFit::converged`](crate::mixture::EmFit).

use std::fmt;

/// Main error type for mezcla operations.
///
/// # Examples
///
/// ```
/// use mezcla::error::MezclaError;
///
/// let err = MezclaError::invalid_input("k", "0", ">= 1");
/// assert!(err.is_invalid_input());
/// assert!(err.to_string().contains("k"));
/// ```
#[derive(Debug)]
pub enum MezclaError {
    /// A hyperparameter or argument violates its documented constraint.
    InvalidInput {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Matrix/vector dimensions don't match for the operation.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// A component covariance matrix is not positive definite.
    SingularCovariance {
        /// Index of the offending mixture component
        component: usize,
    },

    /// The total log-likelihood left the finite range.
    NonFiniteLikelihood {
        /// The offending value (NaN or +/- infinity)
        value: f64,
    },

    /// A mixture component received no responsibility mass.
    EmptyComponent {
        /// Index of the offending mixture component
        component: usize,
    },
}

impl fmt::Display for MezclaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MezclaError::InvalidInput {
                param,
                value,
                constraint,
            } => {
                write!(f, "Invalid input: {param} = {value}, expected {constraint}")
            }
            MezclaError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {expected}, got {actual}")
            }
            MezclaError::SingularCovariance { component } => {
                write!(
                    f,
                    "Singular covariance for component {component}: matrix is not positive definite"
                )
            }
            MezclaError::NonFiniteLikelihood { value } => {
                write!(f, "Non-finite log-likelihood encountered: {value}")
            }
            MezclaError::EmptyComponent { component } => {
                write!(
                    f,
                    "Component {component} has zero responsibility mass; cannot re-estimate parameters"
                )
            }
        }
    }
}

impl std::error::Error for MezclaError {}

impl MezclaError {
    /// Create an invalid-input error with descriptive context.
    #[must_use]
    pub fn invalid_input(param: &str, value: impl fmt::Display, constraint: &str) -> Self {
        Self::InvalidInput {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Create a dimension mismatch error with descriptive context.
    #[must_use]
    pub fn dimension_mismatch(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// True for errors detected by argument validation, before any
    /// computation has started.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            MezclaError::InvalidInput { .. } | MezclaError::DimensionMismatch { .. }
        )
    }

    /// True for errors raised by the numerics mid-computation: a singular
    /// covariance, a non-finite likelihood, or an empty component.
    #[must_use]
    pub fn is_numerical_degeneracy(&self) -> bool {
        matches!(
            self,
            MezclaError::SingularCovariance { .. }
                | MezclaError::NonFiniteLikelihood { .. }
                | MezclaError::EmptyComponent { .. }
        )
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, MezclaError>;
