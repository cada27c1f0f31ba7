//! Householder tridiagonalization: `Q T Qᴴ = H` for symmetric or Hermitian
//! `H`.
//!
//! For each column, the entries below the subdiagonal are annihilated by a
//! reflector applied from both sides, `W ← Qₖ W Qₖᴴ`; the reflectors are
//! Hermitian, so the accumulation `Q ← Q Qₖᴴ` reuses them directly. For a
//! Hermitian input, the reflected row entries come out conjugated by the
//! two-sided application, which keeps `W` Hermitian throughout.

use strata_core::householder::{apply_left, apply_right, make_reflector};
use strata_core::{
    ops, ComplexField, Error, Mat, MatMut, MatRef, Result, Structure, Vector,
};

/// Reduces `h` to tridiagonal form `t` with `q · t · qᴴ = h`. `t` should be
/// a `SymmetricTridiagonal` (or `HermitianTridiagonal`) container of the same
/// size; a full-storage `t` receives the band with explicit zeros elsewhere.
pub fn tridiagonalize<T: ComplexField>(
    h: MatRef<'_, T>,
    mut q: MatMut<'_, T>,
    mut t: MatMut<'_, T>,
) -> Result {
    let n = h.nrows();
    if h.ncols() != n
        || q.nrows() != n
        || q.ncols() != n
        || t.nrows() != n
        || t.ncols() != n
    {
        return Err(Error::Failed);
    }
    let hermitian = h.structure().is_a(Structure::Hermitian);
    if !h.structure().is_a(Structure::Symmetric) && !hermitian {
        return Err(Error::Failed);
    }
    if !h.is_initialized() {
        q.set_initialized(false);
        t.set_initialized(false);
        return Ok(());
    }

    let mut ww = Mat::<T>::new(Structure::Square, n, n);
    ops::set(ww.as_mut(), &h)?;
    let mut qw = Mat::<T>::identity(Structure::Square, n);

    for k in 0..n.saturating_sub(2) {
        let x = Vector::from_fn(n - k - 1, |i| ww.read(k + 1 + i, k));
        if let Some((v, _)) = make_reflector(x.as_ref()) {
            apply_left(v.as_ref(), ww.as_mut().submatrix(k + 1, 0, n - k - 1, n));
            apply_right(ww.as_mut().submatrix(0, k + 1, n, n - k - 1), v.as_ref());
            apply_right(qw.as_mut().submatrix(0, k + 1, n, n - k - 1), v.as_ref());
            for i in k + 2..n {
                ww.write(i, k, T::zero());
                ww.write(k, i, T::zero());
            }
        }
    }

    let target = if hermitian {
        Structure::HermitianTridiagonal
    } else {
        Structure::SymmetricTridiagonal
    };
    ops::set(q, &qw.as_ref())?;
    ops::set(t, &ww.as_ref().retype(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use rand::prelude::*;
    use strata_core::algebra::AddMul;
    use strata_core::{c64, mul, Parallelism};

    #[test]
    fn symmetric_round_trip() {
        let mut rng = StdRng::seed_from_u64(70);
        let n = 6;
        let h = Mat::<f64>::from_fn(Structure::Symmetric, n, n, |_, _| rng.gen::<f64>() - 0.5);
        let mut q = Mat::<f64>::new(Structure::Orthogonal, n, n);
        let mut t = Mat::<f64>::new(Structure::SymmetricTridiagonal, n, n);
        tridiagonalize(h.as_ref(), q.as_mut(), t.as_mut()).unwrap();

        let mut qt = Mat::<f64>::zeros(Structure::General, n, n);
        mul::mxm(
            qt.as_mut(),
            q.as_ref(),
            t.as_ref(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        let mut qtq = Mat::<f64>::zeros(Structure::General, n, n);
        mul::mxm(
            qtq.as_mut(),
            qt.as_ref(),
            q.as_ref().adjoint(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        for i in 0..n {
            for j in 0..n {
                assert!((qtq.read(i, j) - h.read(i, j)).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn band_is_exact() {
        let mut rng = StdRng::seed_from_u64(71);
        let n = 5;
        let h = Mat::<f64>::from_fn(Structure::Symmetric, n, n, |_, _| rng.gen::<f64>() - 0.5);
        let mut q = Mat::<f64>::new(Structure::Orthogonal, n, n);
        // a full-storage destination receives explicit zeros off the band
        let mut t = Mat::<f64>::new(Structure::Square, n, n);
        tridiagonalize(h.as_ref(), q.as_mut(), t.as_mut()).unwrap();
        for i in 0..n {
            for j in 0..n {
                if i.abs_diff(j) > 1 {
                    assert!(t.read(i, j) == 0.0);
                }
            }
        }
        // symmetry of the band
        for i in 0..n - 1 {
            assert!(t.read(i, i + 1) == t.read(i + 1, i));
        }
    }

    #[test]
    fn hermitian_round_trip() {
        let mut rng = StdRng::seed_from_u64(72);
        let n = 5;
        let h = Mat::<c64>::from_fn(Structure::Hermitian, n, n, |i, j| {
            if i == j {
                c64::new(rng.gen::<f64>(), 0.0)
            } else {
                c64::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5)
            }
        });
        let mut q = Mat::<c64>::new(Structure::Orthogonal, n, n);
        let mut t = Mat::<c64>::new(Structure::HermitianTridiagonal, n, n);
        tridiagonalize(h.as_ref(), q.as_mut(), t.as_mut()).unwrap();

        let mut qt = Mat::<c64>::zeros(Structure::General, n, n);
        mul::mxm(
            qt.as_mut(),
            q.as_ref(),
            t.as_ref(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        let mut qtq = Mat::<c64>::zeros(Structure::General, n, n);
        mul::mxm(
            qtq.as_mut(),
            qt.as_ref(),
            q.as_ref().adjoint(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        for i in 0..n {
            for j in 0..n {
                assert!((qtq.read(i, j) - h.read(i, j)).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn rejects_general_input() {
        let g = Mat::<f64>::zeros(Structure::General, 3, 3);
        let mut q = Mat::<f64>::new(Structure::Orthogonal, 3, 3);
        let mut t = Mat::<f64>::new(Structure::SymmetricTridiagonal, 3, 3);
        assert!(tridiagonalize(g.as_ref(), q.as_mut(), t.as_mut()) == Err(Error::Failed));
    }
}
