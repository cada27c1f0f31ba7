//! Permutations.
//!
//! A [`Permutation`] is a bijection over `0..n`, stored as an explicit index
//! vector. Applying one to a container is a gather view (the row/column
//! [`crate::imf::Imf::Select`] maps); it never moves data. Pivoted
//! factorizations build theirs by transposition swaps and compose them into a
//! global permutation.

use crate::algebra::BinaryOp;
use crate::{ComplexField, Error, MatMut, MatRef, Result, VecRef};
use alloc::vec::Vec;
use assert2::assert as fancy_assert;
use core::cmp::Ordering;

/// A bijection over `0..n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation {
    idx: Vec<usize>,
}

impl Permutation {
    /// The identity permutation of length `n`.
    pub fn identity(n: usize) -> Self {
        Self {
            idx: (0..n).collect(),
        }
    }

    /// Permutation from an explicit index vector; every index must appear
    /// exactly once.
    #[track_caller]
    pub fn from_indices(idx: Vec<usize>) -> Self {
        let n = idx.len();
        let mut seen = alloc::vec![false; n];
        for &i in &idx {
            fancy_assert!(i < n, "permutation index out of range");
            fancy_assert!(!seen[i], "duplicate permutation index");
            seen[i] = true;
        }
        Self { idx }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.idx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Image of `k`.
    #[track_caller]
    #[inline]
    pub fn index(&self, k: usize) -> usize {
        self.idx[k]
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.idx
    }

    /// Swaps the images of `a` and `b`.
    #[track_caller]
    #[inline]
    pub fn swap(&mut self, a: usize, b: usize) {
        self.idx.swap(a, b);
    }

    /// Resets to the identity.
    pub fn set_identity(&mut self) {
        for (k, p) in self.idx.iter_mut().enumerate() {
            *p = k;
        }
    }

    /// The inverse bijection.
    pub fn inverse(&self) -> Permutation {
        let mut inv = alloc::vec![0; self.len()];
        for (k, &p) in self.idx.iter().enumerate() {
            inv[p] = k;
        }
        Permutation { idx: inv }
    }

    /// Function composition `self ∘ other`: `k ↦ self[other[k]]`.
    #[track_caller]
    pub fn compose(&self, other: &Permutation) -> Permutation {
        fancy_assert!(self.len() == other.len());
        Permutation {
            idx: other.idx.iter().map(|&k| self.idx[k]).collect(),
        }
    }

    /// Row-gather view: row `k` of the result is row `self[k]` of `mat`.
    #[track_caller]
    pub fn permute_rows<'a, T>(&self, mat: MatRef<'a, T>) -> MatRef<'a, T> {
        fancy_assert!(self.len() == mat.nrows());
        let cols: Vec<usize> = (0..mat.ncols()).collect();
        mat.select(&self.idx, &cols)
    }

    /// Gather view over a vector: entry `k` of the result is `v[self[k]]`.
    #[track_caller]
    pub fn permute_vec<'a, T>(&self, v: VecRef<'a, T>) -> VecRef<'a, T> {
        fancy_assert!(self.len() == v.len());
        v.select(&self.idx)
    }
}

/// Swaps rows `a` and `b` of a full-storage matrix in place.
#[track_caller]
pub fn swap_rows<T: ComplexField>(mut mat: MatMut<'_, T>, a: usize, b: usize) {
    fancy_assert!(a < mat.nrows());
    fancy_assert!(b < mat.nrows());
    if a == b {
        return;
    }
    for j in 0..mat.ncols() {
        let x = mat.read(a, j);
        let y = mat.read(b, j);
        mat.write(a, j, y);
        mat.write(b, j, x);
    }
}

/// Swaps columns `a` and `b` of a full-storage matrix in place.
#[track_caller]
pub fn swap_cols<T: ComplexField>(mut mat: MatMut<'_, T>, a: usize, b: usize) {
    fancy_assert!(a < mat.ncols());
    fancy_assert!(b < mat.ncols());
    if a == b {
        return;
    }
    for i in 0..mat.nrows() {
        let x = mat.read(i, a);
        let y = mat.read(i, b);
        mat.write(i, a, y);
        mat.write(i, b, x);
    }
}

/// Writes into `perm` the permutation that sorts `v` under `cmp`; `v` itself
/// is not modified. The sort is stable.
pub fn sort_permutation<T: ComplexField>(
    perm: &mut Permutation,
    v: VecRef<'_, T>,
    mut cmp: impl FnMut(&T, &T) -> Ordering,
) -> Result {
    if perm.len() != v.len() {
        return Err(Error::Mismatch);
    }
    if !v.is_initialized() {
        return Err(Error::Illegal);
    }
    let values: Vec<T> = (0..v.len()).map(|k| v.read(k)).collect();
    perm.set_identity();
    perm.idx.sort_by(|&a, &b| cmp(&values[a], &values[b]));
    Ok(())
}

/// Fold over a gathered vector: `acc ← op(acc, v[perm[k]])` for each `k`.
pub fn fold_permuted<T: ComplexField>(
    acc: &mut T,
    perm: &Permutation,
    v: VecRef<'_, T>,
    op: impl BinaryOp<T>,
) -> Result {
    if perm.len() != v.len() {
        return Err(Error::Mismatch);
    }
    crate::ops::fold_vec(acc, perm.permute_vec(v), op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Plus;
    use crate::{Mat, Structure, Vector};
    use assert2::assert;

    #[test]
    fn inverse_round_trip() {
        let p = Permutation::from_indices(vec![2, 0, 3, 1]);
        let inv = p.inverse();
        let id = p.compose(&inv);
        assert!(id == Permutation::identity(4));
        let id = inv.compose(&p);
        assert!(id == Permutation::identity(4));
    }

    #[test]
    fn compose_applies_right_first() {
        let p = Permutation::from_indices(vec![1, 2, 0]);
        let q = Permutation::from_indices(vec![2, 1, 0]);
        let pq = p.compose(&q);
        for k in 0..3 {
            assert!(pq.index(k) == p.index(q.index(k)));
        }
    }

    #[test]
    fn sort_leaves_input_unmodified() {
        let v = Vector::<f64>::from_fn(4, |k| [3.0, 1.0, 2.0, 0.0][k]);
        let mut p = Permutation::identity(4);
        sort_permutation(&mut p, v.as_ref(), |a, b| a.partial_cmp(b).unwrap()).unwrap();
        assert!(p.as_slice() == &[3, 1, 2, 0]);
        assert!(v.read(0) == 3.0);
        let sorted = p.permute_vec(v.as_ref());
        for k in 0..3 {
            assert!(sorted.read(k) <= sorted.read(k + 1));
        }
    }

    #[test]
    fn sort_length_mismatch() {
        let v = Vector::<f64>::zeros(3);
        let mut p = Permutation::identity(4);
        assert!(
            sort_permutation(&mut p, v.as_ref(), |a, b| a.partial_cmp(b).unwrap())
                == Err(Error::Mismatch)
        );
    }

    #[test]
    fn row_gather_view() {
        let m = Mat::<f64>::from_fn(Structure::General, 3, 2, |i, j| (i * 2 + j) as f64);
        let p = Permutation::from_indices(vec![2, 0, 1]);
        let pm = p.permute_rows(m.as_ref());
        for i in 0..3 {
            for j in 0..2 {
                assert!(pm.read(i, j) == m.read(p.index(i), j));
            }
        }
    }

    #[test]
    fn swaps() {
        let mut m = Mat::<f64>::from_fn(Structure::General, 3, 3, |i, j| (i * 3 + j) as f64);
        swap_rows(m.as_mut(), 0, 2);
        assert!(m.read(0, 1) == 7.0);
        assert!(m.read(2, 1) == 1.0);
        swap_cols(m.as_mut(), 1, 2);
        assert!(m.read(0, 1) == 8.0);
    }

    #[test]
    fn fold_over_gather() {
        let v = Vector::<f64>::from_fn(3, |k| (k + 1) as f64);
        let p = Permutation::from_indices(vec![2, 1, 0]);
        let mut acc = 0.0;
        fold_permuted(&mut acc, &p, v.as_ref(), Plus).unwrap();
        assert!(acc == 6.0);
    }
}
