//! Element-wise, reduction and build primitives.
//!
//! Uniform calling convention: every primitive returns a [`Result`], never
//! panics for domain errors, and takes its algebraic objects (semirings,
//! monoids, operators) as explicit arguments.
//!
//! Initialization protocol: primitives that write the full logical extent of
//! their output propagate an uninitialized input by marking the output
//! uninitialized and returning `Ok`; primitives that update their output in
//! place, or reduce into a plain scalar, return [`Error::Illegal`] instead
//! (a Rust scalar carries no initialization flag to propagate into). Shape
//! checks run first in either case, and outputs are untouched on error.

use crate::algebra::{BinaryOp, Semiring};
use crate::{
    ComplexField, Conj, Error, Mat, MatMut, MatRead, Outer, Result, VecMut, VecRef, Vector,
};

#[inline]
fn same_shape<T>(dst: &MatMut<'_, T>, src: &impl MatRead<T>) -> bool {
    dst.nrows() == src.nrows() && dst.ncols() == src.ncols()
}

/// Copies `src` into every stored position of `dst`.
pub fn set<T: ComplexField>(mut dst: MatMut<'_, T>, src: &impl MatRead<T>) -> Result {
    if !same_shape(&dst, src) {
        return Err(Error::Mismatch);
    }
    if !src.is_initialized() {
        dst.set_initialized(false);
        return Ok(());
    }
    dst.update_stored(|i, j, v| *v = src.read(i, j));
    dst.set_initialized(true);
    Ok(())
}

/// Broadcasts `value` to every stored position of `dst`.
pub fn set_scalar<T: ComplexField>(mut dst: MatMut<'_, T>, value: T) -> Result {
    dst.update_stored(|_, _, v| *v = value);
    dst.set_initialized(true);
    Ok(())
}

/// Copies `src` into `dst`.
pub fn set_vec<T: ComplexField>(mut dst: VecMut<'_, T>, src: VecRef<'_, T>) -> Result {
    if dst.len() != src.len() {
        return Err(Error::Mismatch);
    }
    if !src.is_initialized() {
        dst.set_initialized(false);
        return Ok(());
    }
    for k in 0..dst.len() {
        dst.write(k, src.read(k));
    }
    dst.set_initialized(true);
    Ok(())
}

/// Broadcasts `value` to every position of `dst`.
pub fn set_vec_scalar<T: ComplexField>(mut dst: VecMut<'_, T>, value: T) -> Result {
    for k in 0..dst.len() {
        dst.write(k, value);
    }
    dst.set_initialized(true);
    Ok(())
}

/// Fills an original container from a finite sequence in storage order,
/// consuming exactly `storage_len` elements.
pub fn build_matrix<T: ComplexField>(
    mat: &mut Mat<T>,
    iter: impl IntoIterator<Item = T>,
) -> Result {
    mat.fill_from_iter(iter)
}

/// Fills an original vector from a finite sequence, consuming exactly `len`
/// elements.
pub fn build_vector<T: ComplexField>(
    vec: &mut Vector<T>,
    iter: impl IntoIterator<Item = T>,
) -> Result {
    vec.fill_from_iter(iter)
}

/// In-place left fold `dst[i,j] ← op(dst[i,j], src[i,j])` over the stored
/// positions of `dst`.
pub fn foldl<T: ComplexField>(
    mut dst: MatMut<'_, T>,
    src: &impl MatRead<T>,
    op: impl BinaryOp<T>,
) -> Result {
    if !same_shape(&dst, src) {
        return Err(Error::Mismatch);
    }
    if !dst.is_initialized() || !src.is_initialized() {
        return Err(Error::Illegal);
    }
    dst.update_stored(|i, j, v| *v = op.apply(*v, src.read(i, j)));
    Ok(())
}

/// In-place right fold `dst[i,j] ← op(src[i,j], dst[i,j])` over the stored
/// positions of `dst`.
pub fn foldr<T: ComplexField>(
    src: &impl MatRead<T>,
    mut dst: MatMut<'_, T>,
    op: impl BinaryOp<T>,
) -> Result {
    if !same_shape(&dst, src) {
        return Err(Error::Mismatch);
    }
    if !dst.is_initialized() || !src.is_initialized() {
        return Err(Error::Illegal);
    }
    dst.update_stored(|i, j, v| *v = op.apply(src.read(i, j), *v));
    Ok(())
}

/// In-place broadcast fold `dst[i,j] ← op(dst[i,j], rhs)`.
pub fn foldl_scalar<T: ComplexField>(
    mut dst: MatMut<'_, T>,
    rhs: T,
    op: impl BinaryOp<T>,
) -> Result {
    if !dst.is_initialized() {
        return Err(Error::Illegal);
    }
    dst.update_stored(|_, _, v| *v = op.apply(*v, rhs));
    Ok(())
}

/// In-place broadcast fold from the right: `dst[i,j] ← op(lhs, dst[i,j])`.
pub fn foldr_scalar<T: ComplexField>(
    lhs: T,
    mut dst: MatMut<'_, T>,
    op: impl BinaryOp<T>,
) -> Result {
    if !dst.is_initialized() {
        return Err(Error::Illegal);
    }
    dst.update_stored(|_, _, v| *v = op.apply(lhs, *v));
    Ok(())
}

/// In-place left fold over a vector: `dst[k] ← op(dst[k], src[k])`.
pub fn foldl_vec<T: ComplexField>(
    mut dst: VecMut<'_, T>,
    src: VecRef<'_, T>,
    op: impl BinaryOp<T>,
) -> Result {
    if dst.len() != src.len() {
        return Err(Error::Mismatch);
    }
    if !dst.is_initialized() || !src.is_initialized() {
        return Err(Error::Illegal);
    }
    for k in 0..dst.len() {
        let v = op.apply(dst.read(k), src.read(k));
        dst.write(k, v);
    }
    Ok(())
}

/// In-place broadcast fold over a vector: `dst[k] ← op(dst[k], rhs)`.
pub fn foldl_vec_scalar<T: ComplexField>(
    mut dst: VecMut<'_, T>,
    rhs: T,
    op: impl BinaryOp<T>,
) -> Result {
    if !dst.is_initialized() {
        return Err(Error::Illegal);
    }
    for k in 0..dst.len() {
        let v = op.apply(dst.read(k), rhs);
        dst.write(k, v);
    }
    Ok(())
}

/// Reduces a vector into a scalar accumulator: `acc ← op(acc, x[k])` for
/// each `k` in order.
pub fn fold_vec<T: ComplexField>(acc: &mut T, x: VecRef<'_, T>, op: impl BinaryOp<T>) -> Result {
    if !x.is_initialized() {
        return Err(Error::Illegal);
    }
    let mut a = *acc;
    for k in 0..x.len() {
        a = op.apply(a, x.read(k));
    }
    *acc = a;
    Ok(())
}

/// Element-wise binary apply `dst[i,j] ← op(a[i,j], b[i,j])`.
pub fn ewise_apply<T: ComplexField>(
    mut dst: MatMut<'_, T>,
    a: &impl MatRead<T>,
    b: &impl MatRead<T>,
    op: impl BinaryOp<T>,
) -> Result {
    if !same_shape(&dst, a) || !same_shape(&dst, b) {
        return Err(Error::Mismatch);
    }
    if !a.is_initialized() || !b.is_initialized() {
        dst.set_initialized(false);
        return Ok(());
    }
    dst.update_stored(|i, j, v| *v = op.apply(a.read(i, j), b.read(i, j)));
    dst.set_initialized(true);
    Ok(())
}

/// Element-wise product under the ring's multiplicative operator.
pub fn ewise_mul<T: ComplexField>(
    dst: MatMut<'_, T>,
    a: &impl MatRead<T>,
    b: &impl MatRead<T>,
    ring: impl Semiring<T>,
) -> Result {
    ewise_apply(dst, a, b, ring.mul_monoid())
}

/// Applies `f(i, j, &mut value)` to every stored position of `dst`.
/// Companion containers of identical logical shape are captured by `f` and
/// accessed at the same index.
pub fn for_each<T: ComplexField>(
    mut dst: MatMut<'_, T>,
    f: impl FnMut(usize, usize, &mut T),
) -> Result {
    if !dst.is_initialized() {
        return Err(Error::Illegal);
    }
    dst.update_stored(f);
    Ok(())
}

/// Applies `f(k, &mut value)` to every position of `dst`.
pub fn for_each_vec<T: ComplexField>(
    mut dst: VecMut<'_, T>,
    mut f: impl FnMut(usize, &mut T),
) -> Result {
    if !dst.is_initialized() {
        return Err(Error::Illegal);
    }
    for k in 0..dst.len() {
        let mut v = dst.read(k);
        f(k, &mut v);
        dst.write(k, v);
    }
    Ok(())
}

/// Dot product: `acc ← acc ⊕ Σ_k x[k] ⊗ y[k]`. Conjugation is selected by
/// passing a conjugate view.
pub fn dot<T: ComplexField>(
    acc: &mut T,
    x: VecRef<'_, T>,
    y: VecRef<'_, T>,
    ring: impl Semiring<T>,
) -> Result {
    if x.len() != y.len() {
        return Err(Error::Mismatch);
    }
    if !x.is_initialized() || !y.is_initialized() {
        return Err(Error::Illegal);
    }
    let mut a = *acc;
    for k in 0..x.len() {
        a = ring.add(a, ring.mul(x.read(k), y.read(k)));
    }
    *acc = a;
    Ok(())
}

/// Euclidean norm: `out ← sqrt(Σ_k x[k]·conj(x[k]))`, accumulated with the
/// ring's additive monoid.
pub fn norm2<T: ComplexField>(
    out: &mut T,
    x: VecRef<'_, T>,
    ring: impl Semiring<T>,
) -> Result {
    if !x.is_initialized() {
        return Err(Error::Illegal);
    }
    let mut acc = ring.zero();
    for k in 0..x.len() {
        let v = x.read(k);
        acc = ring.add(acc, T::from_real(v.abs2()));
    }
    *out = acc.sqrt();
    Ok(())
}

/// Lazy rank-1 view `x ⊗ x` under `op`, usable wherever a [`MatRead`] input
/// is accepted; it materializes only on demand.
pub fn outer<T: ComplexField, M: BinaryOp<T>>(x: VecRef<'_, T>, op: M) -> Outer<'_, T, M> {
    Outer {
        x,
        conj_rhs: Conj::No,
        op,
    }
}

/// Lazy Hermitian rank-1 view `x ⊗ conj(x)` under `op`.
pub fn outer_conj<T: ComplexField, M: BinaryOp<T>>(x: VecRef<'_, T>, op: M) -> Outer<'_, T, M> {
    Outer {
        x,
        conj_rhs: Conj::Yes,
        op,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{AddMul, Minus, Plus, Times};
    use crate::{Mat, Structure, Vector};
    use assert2::assert;

    #[test]
    fn set_copies_and_chains() {
        let b = Mat::<f64>::from_fn(Structure::General, 2, 3, |i, j| (i * 3 + j) as f64);
        let mut a = Mat::<f64>::new(Structure::General, 2, 3);
        let mut c = Mat::<f64>::new(Structure::General, 2, 3);
        set(a.as_mut(), &b.as_ref()).unwrap();
        set(c.as_mut(), &a.as_ref()).unwrap();
        for i in 0..2 {
            for j in 0..3 {
                assert!(c.read(i, j) == b.read(i, j));
            }
        }
    }

    #[test]
    fn set_shape_mismatch() {
        let b = Mat::<f64>::zeros(Structure::General, 2, 3);
        let mut a = Mat::<f64>::new(Structure::General, 3, 2);
        assert!(set(a.as_mut(), &b.as_ref()) == Err(Error::Mismatch));
        assert!(!a.is_initialized());
    }

    #[test]
    fn set_propagates_uninitialized() {
        let b = Mat::<f64>::new(Structure::General, 2, 2);
        let mut a = Mat::<f64>::zeros(Structure::General, 2, 2);
        assert!(set(a.as_mut(), &b.as_ref()) == Ok(()));
        assert!(!a.is_initialized());
    }

    #[test]
    fn scalar_broadcast_respects_structure() {
        let mut u = Mat::<f64>::new(Structure::UpperTriangular, 3, 3);
        set_scalar(u.as_mut(), 2.0).unwrap();
        assert!(u.read(0, 2) == 2.0);
        assert!(u.read(2, 0) == 0.0);
    }

    #[test]
    fn foldl_requires_initialized() {
        let src = Mat::<f64>::zeros(Structure::General, 2, 2);
        let mut dst = Mat::<f64>::new(Structure::General, 2, 2);
        assert!(foldl(dst.as_mut(), &src.as_ref(), Plus) == Err(Error::Illegal));
    }

    #[test]
    fn foldl_subtracts() {
        let a = Mat::<f64>::from_fn(Structure::General, 2, 2, |i, j| (i + j) as f64);
        let mut dst = Mat::<f64>::from_fn(Structure::General, 2, 2, |_, _| 10.0);
        foldl(dst.as_mut(), &a.as_ref(), Minus).unwrap();
        assert!(dst.read(1, 1) == 8.0);
        assert!(dst.read(0, 0) == 10.0);
    }

    #[test]
    fn foldr_folds_from_the_left_operand() {
        let a = Mat::<f64>::from_fn(Structure::General, 2, 2, |i, j| (i + j) as f64);
        let mut dst = Mat::<f64>::from_fn(Structure::General, 2, 2, |_, _| 10.0);
        foldr(&a.as_ref(), dst.as_mut(), Minus).unwrap();
        // dst ← a − dst
        assert!(dst.read(1, 1) == -8.0);
        assert!(dst.read(0, 0) == -10.0);
    }

    #[test]
    fn scalar_broadcast_folds() {
        let mut dst = Mat::<f64>::from_fn(Structure::General, 2, 2, |i, j| (i * 2 + j) as f64);
        foldl_scalar(dst.as_mut(), 1.0, Plus).unwrap();
        assert!(dst.read(1, 1) == 4.0);
        foldr_scalar(10.0, dst.as_mut(), Minus).unwrap();
        // dst ← 10 − dst
        assert!(dst.read(0, 0) == 9.0);
        assert!(dst.read(1, 1) == 6.0);
    }

    #[test]
    fn vector_folds() {
        let mut dst = Vector::<f64>::from_fn(3, |k| k as f64);
        let src = Vector::<f64>::from_fn(3, |_| 1.0);
        foldl_vec(dst.as_mut(), src.as_ref(), Plus).unwrap();
        assert!(dst.read(2) == 3.0);
        foldl_vec_scalar(dst.as_mut(), 2.0, Times).unwrap();
        assert!(dst.read(2) == 6.0);
        for_each_vec(dst.as_mut(), |k, v| *v = *v + k as f64).unwrap();
        assert!(dst.read(2) == 8.0);
    }

    #[test]
    fn ewise_mul_uses_ring_product() {
        let a = Mat::<f64>::from_fn(Structure::General, 2, 2, |i, _| (i + 1) as f64);
        let b = Mat::<f64>::from_fn(Structure::General, 2, 2, |_, j| (j + 2) as f64);
        let mut c = Mat::<f64>::new(Structure::General, 2, 2);
        ewise_mul(c.as_mut(), &a.as_ref(), &b.as_ref(), AddMul).unwrap();
        assert!(c.read(0, 0) == 2.0);
        assert!(c.read(1, 1) == 6.0);
    }

    #[test]
    fn conjugated_outer_is_hermitian() {
        use crate::c64;
        let x = Vector::<c64>::from_fn(2, |k| c64::new(1.0, k as f64));
        let o = outer_conj(x.as_ref(), Times);
        assert!(MatRead::read(&o, 0, 1) == x.read(0) * x.read(1).conj());
        assert!(MatRead::read(&o, 1, 0) == MatRead::read(&o, 0, 1).conj());
    }

    #[test]
    fn ewise_apply_writes_output() {
        let a = Mat::<f64>::from_fn(Structure::General, 2, 2, |i, _| i as f64);
        let b = Mat::<f64>::from_fn(Structure::General, 2, 2, |_, j| j as f64);
        let mut c = Mat::<f64>::new(Structure::General, 2, 2);
        ewise_apply(c.as_mut(), &a.as_ref(), &b.as_ref(), Plus).unwrap();
        assert!(c.read(1, 1) == 2.0);
        assert!(c.is_initialized());
    }

    #[test]
    fn dot_and_norm2() {
        let x = Vector::<f64>::from_fn(3, |k| (k + 1) as f64);
        let y = Vector::<f64>::from_fn(3, |k| (k + 1) as f64);
        let mut acc = 0.0;
        dot(&mut acc, x.as_ref(), y.as_ref(), AddMul).unwrap();
        assert!(acc == 14.0);

        let mut n = 0.0;
        norm2(&mut n, x.as_ref(), AddMul).unwrap();
        assert!((n - 14.0f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn complex_norm2_uses_modulus() {
        use crate::c64;
        let x = Vector::<c64>::from_fn(2, |k| c64::new(k as f64, 1.0));
        let mut n = c64::new(0.0, 0.0);
        norm2(&mut n, x.as_ref(), AddMul).unwrap();
        assert!((n.re - 3.0f64.sqrt()).abs() < 1e-15);
        assert!(n.im == 0.0);
    }

    #[test]
    fn outer_feeds_foldl() {
        let v = Vector::<f64>::from_fn(2, |k| (k + 1) as f64);
        let mut dst = Mat::<f64>::zeros(Structure::Symmetric, 2, 2);
        foldl(dst.as_mut(), &outer(v.as_ref(), Times), Minus).unwrap();
        assert!(dst.read(0, 0) == -1.0);
        assert!(dst.read(0, 1) == -2.0);
        assert!(dst.read(1, 1) == -4.0);
        assert!(dst.read(1, 0) == dst.read(0, 1));
    }

    #[test]
    fn for_each_sees_coordinates() {
        let mut m = Mat::<f64>::zeros(Structure::UpperTriangular, 3, 3);
        for_each(m.as_mut(), |i, j, v| *v = (i * 10 + j) as f64).unwrap();
        assert!(m.read(1, 2) == 12.0);
        assert!(m.read(2, 1) == 0.0);
    }

    #[test]
    fn fold_vec_reduces() {
        let x = Vector::<f64>::from_fn(4, |k| k as f64);
        let mut acc = 0.0;
        fold_vec(&mut acc, x.as_ref(), Plus).unwrap();
        assert!(acc == 6.0);
    }
}
