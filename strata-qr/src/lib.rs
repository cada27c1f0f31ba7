//! Householder QR decomposition: `H = Q R` with unitary `Q` and
//! upper-trapezoidal `R`.
//!
//! Each column is reduced by a reflector `Qₖ = I − 2 v vᴴ` applied from the
//! left; the same reflector accumulates into `Q` from the right. Reflectors
//! are Hermitian, so the adjoint accumulation `Q ← Q Qₖᴴ` reuses `Qₖ`
//! directly. A column already aligned with its target axis contributes the
//! identity and is skipped.

use reborrow::*;
use strata_core::householder::{apply_left, apply_right, make_reflector};
use strata_core::{ops, ComplexField, Error, Mat, MatMut, MatRef, Result, Structure, Vector};

fn checks<T>(h: &MatRef<'_, T>, q: &MatMut<'_, T>, r: &MatMut<'_, T>) -> Result {
    let (m, n) = (h.nrows(), h.ncols());
    if q.nrows() != m || q.ncols() != m || r.nrows() != m || r.ncols() != n {
        return Err(Error::Failed);
    }
    if !matches!(
        q.structure(),
        Structure::General | Structure::Square | Structure::Orthogonal
            | Structure::OrthogonalColumns
    ) {
        return Err(Error::Failed);
    }
    if !r.structure().is_a(Structure::UpperTrapezoidal)
        && !matches!(r.structure(), Structure::General | Structure::Square)
    {
        return Err(Error::Failed);
    }
    Ok(())
}

/// Factors `h` into `q · r`. `q` must be `m × m` with a full storage layout
/// (`Orthogonal`, `Square` or `General`); `r` must be `m × n`.
pub fn qr<T: ComplexField>(h: MatRef<'_, T>, mut q: MatMut<'_, T>, mut r: MatMut<'_, T>) -> Result {
    checks(&h, &q, &r)?;
    if !h.is_initialized() {
        q.set_initialized(false);
        r.set_initialized(false);
        return Ok(());
    }
    let (m, n) = (h.nrows(), h.ncols());

    let mut rw = Mat::<T>::new(Structure::General, m, n);
    ops::set(rw.as_mut(), &h)?;
    let mut qw = Mat::<T>::identity(Structure::Square, m);

    for k in 0..n.min(m.saturating_sub(1)) {
        let x = Vector::from_fn(m - k, |i| rw.read(k + i, k));
        if let Some((v, _)) = make_reflector(x.as_ref()) {
            apply_left(v.as_ref(), rw.as_mut().submatrix(k, k, m - k, n - k));
            apply_right(qw.as_mut().submatrix(0, k, m, m - k), v.as_ref());
            // the reflector annihilates the sub-diagonal of column k exactly
            for i in k + 1..m {
                rw.write(i, k, T::zero());
            }
        }
    }

    ops::set(q.rb_mut(), &qw.as_ref())?;
    ops::set(r.rb_mut(), &rw.as_ref().retype(Structure::UpperTrapezoidal))
}
