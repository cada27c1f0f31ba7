//! Structured dense linear algebra.
//!
//! This crate re-exports the core containers, views and primitives of
//! [`strata_core`] together with the decomposition crates:
//!
//! - [`cholesky`]: upper Cholesky `Uᴴ U = H`, unblocked and blocked;
//! - [`lu`]: Householder LU, with and without row pivoting;
//! - [`qr`]: Householder QR with explicit accumulation of `Q`;
//! - [`svd`]: Householder bidiagonalization and Golub–Kahan iteration;
//! - [`evd`]: Householder tridiagonalization, the tridiagonal
//!   divide-and-conquer eigensolver, and the unshifted QR-iteration
//!   eigensolver.

pub use strata_core::*;

pub use strata_cholesky as cholesky;
pub use strata_evd as evd;
pub use strata_lu as lu;
pub use strata_qr as qr;
pub use strata_svd as svd;
