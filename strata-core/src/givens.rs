//! Givens rotations.
//!
//! A [`Givens`] is the planar unitary
//!
//! ```text
//! G = [  c        s ]
//!     [ -conj(s)  c ]
//! ```
//!
//! with real `c` and `c² + |s|² = 1, built so that `G · [a, b]ᵀ = [r, 0]ᵀ`.
//! The chasing algorithms apply these to row pairs (from the left) and column
//! pairs (from the right, as `A · Gᴴ`), accumulating the same rotations into
//! the orthogonal factors.

use crate::{ComplexField, MatMut};
use assert2::assert as fancy_assert;

/// A plane rotation acting on an index pair.
#[derive(Copy, Clone, Debug)]
pub struct Givens<T: ComplexField> {
    pub c: T::Real,
    pub s: T,
}

impl<T: ComplexField> Givens<T> {
    /// The identity rotation.
    #[inline]
    pub fn identity() -> Self {
        Self {
            c: T::Real::one(),
            s: T::zero(),
        }
    }

    /// Rotation annihilating `b` against `a`: returns `(g, r)` with
    /// `g · [a, b]ᵀ = [r, 0]ᵀ`.
    pub fn make(a: T, b: T) -> (Self, T) {
        if b == T::zero() {
            return (Self::identity(), a);
        }
        if a == T::zero() {
            let b_abs = b.abs();
            return (
                Self {
                    c: T::Real::zero(),
                    s: b.conj().scale(b_abs.inv()),
                },
                T::from_real(b_abs),
            );
        }
        let a_abs = a.abs();
        let norm = (a_abs * a_abs + b.abs2()).sqrt();
        let phase = a.scale(a_abs.inv());
        let c = a_abs * norm.inv();
        let s = phase * b.conj().scale(norm.inv());
        (Self { c, s }, phase.scale(norm))
    }

    /// Applies the rotation to rows `i1` and `i2`: `rows ← G · rows`.
    #[track_caller]
    pub fn apply_left(&self, mut mat: MatMut<'_, T>, i1: usize, i2: usize) {
        fancy_assert!(i1 < mat.nrows());
        fancy_assert!(i2 < mat.nrows());
        for j in 0..mat.ncols() {
            let x = mat.read(i1, j);
            let y = mat.read(i2, j);
            mat.write(i1, j, x.scale(self.c) + self.s * y);
            mat.write(i2, j, y.scale(self.c) - self.s.conj() * x);
        }
    }

    /// Applies the adjoint rotation to columns `j1` and `j2`: `cols ← cols · Gᴴ`.
    #[track_caller]
    pub fn apply_right(&self, mut mat: MatMut<'_, T>, j1: usize, j2: usize) {
        fancy_assert!(j1 < mat.ncols());
        fancy_assert!(j2 < mat.ncols());
        for i in 0..mat.nrows() {
            let x = mat.read(i, j1);
            let y = mat.read(i, j2);
            mat.write(i, j1, x.scale(self.c) + self.s.conj() * y);
            mat.write(i, j2, y.scale(self.c) - self.s * x);
        }
    }
}
