//! LU without pivoting: `L U = H`.
//!
//! No row exchanges are performed, so an exactly zero pivot cannot be
//! repaired; it is reported as a failure with the outputs untouched.

use core::sync::atomic::AtomicBool;
use dyn_stack::{DynStack, SizeOverflow, StackReq};
use reborrow::*;
use strata_core::algebra::{AddMul, Minus};
use strata_core::{
    mul, ops, solve, ComplexField, Error, Mat, MatMut, MatRef, Parallelism, Result, Structure,
};

/// Factors columns `k0..k1` of `w` in place order, with trailing updates
/// covering columns up to `jend` (the full width for the unblocked
/// factorization, the panel width for the blocked one). Fails on an exactly
/// zero pivot.
fn panel_factor<T: ComplexField>(w: &mut Mat<T>, k0: usize, k1: usize, jend: usize) -> Result {
    let m = w.nrows();
    for k in k0..k1 {
        let pivot = w.read(k, k);
        if pivot == T::zero() {
            return Err(Error::Failed);
        }
        let pivot_inv = pivot.inv();
        for i in k + 1..m {
            let v = w.read(i, k) * pivot_inv;
            w.write(i, k, v);
        }
        for i in k + 1..m {
            let lik = w.read(i, k);
            for j in k + 1..jend {
                let val = w.read(i, j) - lik * w.read(k, j);
                w.write(i, j, val);
            }
        }
    }
    Ok(())
}

/// Unblocked factorization: `l` holds the unit-diagonal lower trapezoid and
/// `u` the upper trapezoid with `L U = H`.
pub fn lu<T: ComplexField>(
    h: MatRef<'_, T>,
    mut l: MatMut<'_, T>,
    mut u: MatMut<'_, T>,
) -> Result {
    super::checks(&h, &l, &u)?;
    if !h.is_initialized() {
        l.set_initialized(false);
        u.set_initialized(false);
        return Ok(());
    }
    let (m, n) = (h.nrows(), h.ncols());
    let mut w = Mat::<T>::new(Structure::General, m, n);
    ops::set(w.as_mut(), &h)?;
    panel_factor(&mut w, 0, m.min(n), n)?;
    super::extract_factors(&w, l, u)
}

/// Workspace requirement of [`lu_blocked`].
pub fn lu_blocked_req<T: 'static>(
    nrows: usize,
    ncols: usize,
    block_size: usize,
) -> core::result::Result<StackReq, SizeOverflow> {
    crate::partial_pivoting::lu_blocked_req::<T>(nrows, ncols, block_size)
}

/// Blocked factorization with panel width `block_size`.
pub fn lu_blocked<T: ComplexField>(
    h: MatRef<'_, T>,
    mut l: MatMut<'_, T>,
    mut u: MatMut<'_, T>,
    block_size: usize,
    mut stack: DynStack<'_>,
) -> Result {
    super::checks(&h, &l, &u)?;
    let (m, n) = (h.nrows(), h.ncols());
    let k_dim = m.min(n);
    if block_size == 0 || (k_dim > 0 && block_size > k_dim) {
        return Err(Error::Failed);
    }
    if !h.is_initialized() {
        l.set_initialized(false);
        u.set_initialized(false);
        return Ok(());
    }

    let mut w = Mat::<T>::new(Structure::General, m, n);
    ops::set(w.as_mut(), &h)?;

    let mut k = 0;
    while k < k_dim {
        let bs = block_size.min(k_dim - k);
        panel_factor(&mut w, k, k + bs, k + bs)?;

        let rest_cols = n - k - bs;
        let rest_rows = m - k - bs;
        if rest_cols > 0 {
            let stack = stack.rb_mut();

            let l11_init = AtomicBool::new(true);
            let (mut l11_buf, stack) = stack.make_with::<T, _>(bs * bs, |_| T::zero());
            let mut l11 = MatMut::from_major_slice(&mut l11_buf, bs, bs, &l11_init);
            for i in 0..bs {
                for j in 0..bs {
                    let v = if i == j {
                        T::one()
                    } else if j < i {
                        w.read(k + i, k + j)
                    } else {
                        T::zero()
                    };
                    l11.write(i, j, v);
                }
            }
            let l11 = l11.into_const().retype(Structure::LowerTriangular);

            let x_init = AtomicBool::new(true);
            let (mut x_buf, stack) = stack.make_with::<T, _>(bs * rest_cols, |_| T::zero());
            let mut x = MatMut::from_major_slice(&mut x_buf, bs, rest_cols, &x_init);
            solve::forward_substitution_mat(
                l11,
                x.rb_mut(),
                w.as_ref().submatrix(k, k + bs, bs, rest_cols),
            )?;
            ops::set(w.as_mut().submatrix(k, k + bs, bs, rest_cols), &x.rb())?;

            if rest_rows > 0 {
                let p_init = AtomicBool::new(true);
                let (mut p_buf, _) =
                    stack.make_with::<T, _>(rest_rows * rest_cols, |_| T::zero());
                let mut prod =
                    MatMut::from_major_slice(&mut p_buf, rest_rows, rest_cols, &p_init);
                mul::mxm(
                    prod.rb_mut(),
                    w.as_ref().submatrix(k + bs, k, rest_rows, bs),
                    x.rb(),
                    AddMul,
                    Parallelism::None,
                )?;
                ops::foldl(
                    w.as_mut().submatrix(k + bs, k + bs, rest_rows, rest_cols),
                    &prod.rb(),
                    Minus,
                )?;
            }
        }
        k += bs;
    }
    super::extract_factors(&w, l, u)
}
