//! Eigenvalue decompositions for symmetric and Hermitian matrices.
//!
//! [`tridiag::tridiagonalize`] reduces a symmetric or Hermitian matrix to
//! tridiagonal form by two-sided Householder reflections. From there,
//! [`dac::tridiagonal_evd`] solves the real symmetric-tridiagonal problem by
//! divide and conquer over the secular equation, and
//! [`qr_iteration::evd_qr`] runs the unshifted QR iteration on a symmetric
//! matrix directly.

pub mod dac;
pub mod qr_iteration;
pub mod tridiag;

pub use dac::tridiagonal_evd;
pub use qr_iteration::evd_qr;
pub use tridiag::tridiagonalize;
