//! Core compute primitives (Vector, Matrix).
//!
//! Dense row-major storage over `f64`, covering exactly the linear algebra
//! the EM loop needs: shape bookkeeping, Cholesky factorization, and
//! triangular solves.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
