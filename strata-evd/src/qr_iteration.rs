//! Unshifted QR-iteration eigensolver for real symmetric matrices.
//!
//! Each iteration factors the working matrix as `A = Q R`, reassembles
//! `A ← R Q` (an orthogonal similarity), and accumulates `Q` into the total
//! transform. Super-diagonal entries that fall below the tolerance at the
//! leading or trailing end are zeroed, and when that isolates a strictly
//! smaller active block, the iteration recurses on the block and stops. The
//! iteration also stops when the whole super-diagonal norm drops below the
//! squared tolerance, or at the iteration cap.

use strata_core::algebra::AddMul;
use strata_core::{
    mul, ops, Error, Mat, MatMut, MatRef, Parallelism, RealField, Result, Structure, VecMut,
    Vector,
};

const MAX_ITERATIONS: usize = 10_000_000;

fn qr_iterate<T: RealField>(mut w: Mat<T>) -> Result<(Mat<T>, Vec<T>)> {
    let n = w.nrows();
    let mut qt = Mat::<T>::identity(Structure::Square, n);
    if n <= 1 {
        let d = (0..n).map(|i| w.read(i, i)).collect();
        return Ok((qt, d));
    }
    let tol = T::from_f64(1e-6);
    let tol2 = tol * tol;

    for _ in 0..MAX_ITERATIONS {
        let mut lo = 0;
        while lo + 1 < n && w.read(lo, lo + 1).abs() <= tol {
            w.write(lo, lo + 1, T::zero());
            w.write(lo + 1, lo, T::zero());
            lo += 1;
        }
        let mut hi = n - 1;
        while hi > lo && w.read(hi - 1, hi).abs() <= tol {
            w.write(hi - 1, hi, T::zero());
            w.write(hi, hi - 1, T::zero());
            hi -= 1;
        }
        if lo >= hi {
            let d = (0..n).map(|i| w.read(i, i)).collect();
            return Ok((qt, d));
        }
        if lo > 0 || hi < n - 1 {
            let len = hi - lo + 1;
            let sub = Mat::from_fn(Structure::Square, len, len, |i, j| {
                w.read(lo + i, lo + j)
            });
            let (qs, dsub) = qr_iterate(sub)?;
            let embed = Mat::from_fn(Structure::Square, n, n, |i, j| {
                if i >= lo && i <= hi && j >= lo && j <= hi {
                    qs.read(i - lo, j - lo)
                } else if i == j {
                    T::one()
                } else {
                    T::zero()
                }
            });
            let mut q = Mat::<T>::zeros(Structure::General, n, n);
            mul::mxm(
                q.as_mut(),
                qt.as_ref(),
                embed.as_ref(),
                AddMul,
                Parallelism::None,
            )?;
            let mut d: Vec<T> = (0..n).map(|i| w.read(i, i)).collect();
            for (k, &val) in dsub.iter().enumerate() {
                d[lo + k] = val;
            }
            return Ok((q, d));
        }

        let mut s = T::zero();
        for i in 0..n - 1 {
            let e = w.read(i, i + 1);
            s = s + e * e;
        }
        if s.sqrt() < tol2 {
            let d = (0..n).map(|i| w.read(i, i)).collect();
            return Ok((qt, d));
        }

        let mut qf = Mat::<T>::new(Structure::Orthogonal, n, n);
        let mut rf = Mat::<T>::new(Structure::UpperTriangular, n, n);
        strata_qr::qr(w.as_ref(), qf.as_mut(), rf.as_mut())?;
        let mut rq = Mat::<T>::zeros(Structure::General, n, n);
        mul::mxm(
            rq.as_mut(),
            rf.as_ref(),
            qf.as_ref(),
            AddMul,
            Parallelism::None,
        )?;
        ops::set(w.as_mut(), &rq.as_ref())?;
        let mut qnew = Mat::<T>::zeros(Structure::General, n, n);
        mul::mxm(
            qnew.as_mut(),
            qt.as_ref(),
            qf.as_ref(),
            AddMul,
            Parallelism::None,
        )?;
        ops::set(qt.as_mut(), &qnew.as_ref())?;
    }
    let d = (0..n).map(|i| w.read(i, i)).collect();
    Ok((qt, d))
}

/// Eigendecomposition `H Q = Q diag(d)` of a real symmetric matrix by the
/// unshifted QR iteration.
pub fn evd_qr<T: RealField>(
    h: MatRef<'_, T>,
    mut q: MatMut<'_, T>,
    mut d: VecMut<'_, T>,
) -> Result {
    let n = h.nrows();
    if h.ncols() != n || q.nrows() != n || q.ncols() != n || d.len() != n {
        return Err(Error::Failed);
    }
    if !h.structure().is_a(Structure::Symmetric) {
        return Err(Error::Failed);
    }
    if !h.is_initialized() {
        q.set_initialized(false);
        d.set_initialized(false);
        return Ok(());
    }

    let mut w = Mat::<T>::new(Structure::Square, n, n);
    ops::set(w.as_mut(), &h)?;
    let (qm, dm) = qr_iterate(w)?;
    ops::set(q, &qm.as_ref())?;
    let dv = Vector::from_fn(n, |k| dm[k]);
    ops::set_vec(d, dv.as_ref())
}
