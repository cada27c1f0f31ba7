//! Householder bidiagonalization: `H = U B V` with unitary `U`, `V` and
//! upper-bidiagonal `B`.
//!
//! Each column is reduced below the diagonal by a left reflector, then each
//! row beyond the superdiagonal by a right reflector; the right reflector for
//! a row is built from the conjugated row so that the one-sided application
//! `B ← B (I − 2 v vᴴ)` annihilates the row tail. `U` accumulates the left
//! reflectors from the right, `V` the right reflectors from the left, keeping
//! `U B V` equal to `H` at every step.

use strata_core::householder::{apply_left, apply_right, make_reflector};
use strata_core::{ops, ComplexField, Error, Mat, MatMut, MatRef, Result, Structure, Vector};

pub(crate) fn shape_checks<T>(
    h: &MatRef<'_, T>,
    u: &MatMut<'_, T>,
    mid: &MatMut<'_, T>,
    v: &MatMut<'_, T>,
) -> Result {
    let (m, n) = (h.nrows(), h.ncols());
    if u.nrows() != m || u.ncols() != m || v.nrows() != n || v.ncols() != n {
        return Err(Error::Failed);
    }
    if mid.nrows() != m || mid.ncols() != n {
        return Err(Error::Failed);
    }
    Ok(())
}

/// Working bidiagonalization of an initialized `h`: returns `(U, B, V)` as
/// full containers with `U B V = H`.
pub(crate) fn bidiag_work<T: ComplexField>(h: MatRef<'_, T>) -> Result<(Mat<T>, Mat<T>, Mat<T>)> {
    let (m, n) = (h.nrows(), h.ncols());
    let mut bw = Mat::<T>::new(Structure::General, m, n);
    ops::set(bw.as_mut(), &h)?;
    let mut uw = Mat::<T>::identity(Structure::Square, m);
    let mut vw = Mat::<T>::identity(Structure::Square, n);

    for k in 0..m.min(n) {
        if k + 1 < m {
            let x = Vector::from_fn(m - k, |i| bw.read(k + i, k));
            if let Some((v, _)) = make_reflector(x.as_ref()) {
                apply_left(v.as_ref(), bw.as_mut().submatrix(k, k, m - k, n - k));
                apply_right(uw.as_mut().submatrix(0, k, m, m - k), v.as_ref());
                for i in k + 1..m {
                    bw.write(i, k, T::zero());
                }
            }
        }

        if k + 2 < n {
            let len = n - k - 1;
            // the reflector annihilating conj(row) also annihilates the row
            // tail when applied from the right: r (I − 2 v vᴴ) = ᾱ e₀ᵀ
            let x = Vector::from_fn(len, |j| bw.read(k, k + 1 + j).conj());
            if let Some((vv, _)) = make_reflector(x.as_ref()) {
                apply_right(bw.as_mut().submatrix(k, k + 1, m - k, len), vv.as_ref());
                apply_left(vv.as_ref(), vw.as_mut().submatrix(k + 1, 0, len, n));
                for j in k + 2..n {
                    bw.write(k, j, T::zero());
                }
            }
        }
    }
    Ok((uw, bw, vw))
}

/// Bidiagonalizes `h` into `u · b · v`, with `u` of size `m × m`, `b` of size
/// `m × n` and `v` of size `n × n`.
pub fn bidiagonalize<T: ComplexField>(
    h: MatRef<'_, T>,
    mut u: MatMut<'_, T>,
    mut b: MatMut<'_, T>,
    mut v: MatMut<'_, T>,
) -> Result {
    shape_checks(&h, &u, &b, &v)?;
    if !h.is_initialized() {
        u.set_initialized(false);
        b.set_initialized(false);
        v.set_initialized(false);
        return Ok(());
    }
    let (uw, bw, vw) = bidiag_work(h)?;
    ops::set(u, &uw.as_ref())?;
    ops::set(b, &bw.as_ref())?;
    ops::set(v, &vw.as_ref())
}
