//! LU with partial (row) pivoting: `L U = P H`.

use core::sync::atomic::AtomicBool;
use dyn_stack::{DynStack, SizeOverflow, StackReq};
use reborrow::*;
use strata_core::algebra::{AddMul, Minus};
use strata_core::permutation::{self, Permutation};
use strata_core::{
    mul, ops, solve, ComplexField, Error, Mat, MatMut, MatRef, Parallelism, Result, Structure,
};

/// Factors columns `k0..k1` of `w`, pivoting over full rows and recording the
/// exchanges in `p`. Trailing updates cover columns up to `jend`: the full
/// width for the unblocked factorization, the panel width for the blocked one
/// (whose remaining columns are handled by the triangular solve and the Schur
/// update).
fn panel_factor<T: ComplexField>(
    w: &mut Mat<T>,
    p: &mut Permutation,
    k0: usize,
    k1: usize,
    jend: usize,
) {
    let m = w.nrows();
    for k in k0..k1 {
        let mut piv = k;
        let mut best = w.read(k, k).score();
        for i in k + 1..m {
            let s = w.read(i, k).score();
            if s > best {
                best = s;
                piv = i;
            }
        }
        if piv != k {
            permutation::swap_rows(w.as_mut(), k, piv);
            p.swap(k, piv);
        }
        let pivot_inv = w.read(k, k).inv();
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
}

/// Unblocked factorization. On success `l` holds the unit-diagonal lower
/// trapezoid, `u` the upper trapezoid, and `p` the row permutation with
/// `L U = P H`.
pub fn lu<T: ComplexField>(
    h: MatRef<'_, T>,
    mut l: MatMut<'_, T>,
    mut u: MatMut<'_, T>,
    p: &mut Permutation,
) -> Result {
    super::checks(&h, &l, &u)?;
    if p.len() != h.nrows() {
        return Err(Error::Failed);
    }
    if !h.is_initialized() {
        l.set_initialized(false);
        u.set_initialized(false);
        return Ok(());
    }
    let (m, n) = (h.nrows(), h.ncols());
    let mut w = Mat::<T>::new(Structure::General, m, n);
    ops::set(w.as_mut(), &h)?;
    p.set_identity();
    panel_factor(&mut w, p, 0, m.min(n), n);
    super::extract_factors(&w, l, u)
}

/// Workspace requirement of [`lu_blocked`].
pub fn lu_blocked_req<T: 'static>(
    nrows: usize,
    ncols: usize,
    block_size: usize,
) -> core::result::Result<StackReq, SizeOverflow> {
    let k = nrows.min(ncols);
    let bs = block_size.min(k).max(1);
    StackReq::try_all_of([
        StackReq::try_new::<T>(bs * bs)?,
        StackReq::try_new::<T>(bs * (ncols - bs.min(ncols)))?,
        StackReq::try_new::<T>((nrows - bs.min(nrows)) * (ncols - bs.min(ncols)))?,
    ])
}

/// Blocked factorization with panel width `block_size`: per-panel pivoting is
/// applied to the full working rows, composing the local exchanges into the
/// global permutation.
pub fn lu_blocked<T: ComplexField>(
    h: MatRef<'_, T>,
    mut l: MatMut<'_, T>,
    mut u: MatMut<'_, T>,
    p: &mut Permutation,
    block_size: usize,
    mut stack: DynStack<'_>,
) -> Result {
    super::checks(&h, &l, &u)?;
    let (m, n) = (h.nrows(), h.ncols());
    let k_dim = m.min(n);
    if p.len() != m {
        return Err(Error::Failed);
    }
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
    p.set_identity();

    let mut k = 0;
    while k < k_dim {
        let bs = block_size.min(k_dim - k);
        panel_factor(&mut w, p, k, k + bs, k + bs);

        let rest_cols = n - k - bs;
        let rest_rows = m - k - bs;
        if rest_cols > 0 {
            let stack = stack.rb_mut();

            // unit-lower diagonal block of the panel
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

            // U₁₂ from L₁₁ X = A₁₂
            let x_init = AtomicBool::new(true);
            let (mut x_buf, stack) = stack.make_with::<T, _>(bs * rest_cols, |_| T::zero());
            let mut x = MatMut::from_major_slice(&mut x_buf, bs, rest_cols, &x_init);
            solve::forward_substitution_mat(
                l11,
                x.rb_mut(),
                w.as_ref().submatrix(k, k + bs, bs, rest_cols),
            )?;
            ops::set(w.as_mut().submatrix(k, k + bs, bs, rest_cols), &x.rb())?;

            // Schur update A₂₂ ← A₂₂ − L₂₁ U₁₂
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
