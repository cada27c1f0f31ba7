//! Singular value decomposition by Golub–Kahan bidiagonal iteration:
//! `H = U S V` with unitary `U`, `V` and nonnegative diagonal `S`.
//!
//! The input is first bidiagonalized; the iteration then applies
//! implicit-shift bulge-chasing sweeps to the bidiagonal band, with the
//! Wilkinson shift taken from the trailing `2 × 2` block of `Bᴴ B`. Each
//! right Givens restores the band and folds into `V`, each left Givens chases
//! the bulge and folds into `U`, so `U B V` stays equal to `H` throughout.
//! Converged superdiagonal entries are trimmed at `10⁻¹²`; the sweep count is
//! capped at 30. Inputs with more columns than rows are factored through
//! their transpose. Diagonal phases are absorbed into `U` at the end, leaving
//! the singular values as magnitudes.

use reborrow::*;
use strata_core::givens::Givens;
use strata_core::{ops, ComplexField, Mat, MatMut, MatRef, RealField, Result};

pub mod bidiag;

pub use bidiag::bidiagonalize;

const MAX_SWEEPS: usize = 30;

/// Golub–Kahan sweeps on the leading `n × n` band of the bidiagonal working
/// matrix, with accumulation into the working `U` and `V`.
fn golub_kahan<T: ComplexField>(uw: &mut Mat<T>, bw: &mut Mat<T>, vw: &mut Mat<T>, n: usize) {
    if n < 2 {
        return;
    }
    let trim_tol = <T::Real as RealField>::from_f64(1e-12);
    let half = <T::Real as RealField>::from_f64(0.5);

    for _ in 0..MAX_SWEEPS {
        for i in 0..n - 1 {
            if bw.read(i, i + 1).abs() <= trim_tol {
                bw.write(i, i + 1, T::zero());
            }
        }
        let mut hi = n - 1;
        while hi > 0 && bw.read(hi - 1, hi) == T::zero() {
            hi -= 1;
        }
        if hi == 0 {
            return;
        }
        let mut lo = hi - 1;
        while lo > 0 && bw.read(lo - 1, lo) != T::zero() {
            lo -= 1;
        }

        // Wilkinson shift from the trailing 2×2 of Bᴴ B over the active block
        let dm = bw.read(hi - 1, hi - 1).abs2();
        let dn = bw.read(hi, hi).abs2();
        let em = bw.read(hi - 1, hi).abs2();
        let em1 = if hi >= lo + 2 {
            bw.read(hi - 2, hi - 1).abs2()
        } else {
            T::Real::zero()
        };
        let a = dm + em1;
        let c = dn + em;
        let b2 = dm * em;
        let delta = (a - c) * half;
        let denom = delta.abs() + (delta * delta + b2).sqrt();
        let mu = if denom == T::Real::zero() {
            c
        } else if delta >= T::Real::zero() {
            c - b2 * denom.inv()
        } else {
            c + b2 * denom.inv()
        };

        for k in lo..hi {
            let (g, _) = if k == lo {
                // first column of Bᴴ B − μ I over the active block
                let y = T::from_real(bw.read(lo, lo).abs2() - mu);
                let z = bw.read(lo, lo) * bw.read(lo, lo + 1).conj();
                Givens::make(y, z)
            } else {
                Givens::make(bw.read(k - 1, k).conj(), bw.read(k - 1, k + 1).conj())
            };
            g.apply_right(bw.as_mut(), k, k + 1);
            g.apply_left(vw.as_mut(), k, k + 1);
            if k > lo {
                bw.write(k - 1, k + 1, T::zero());
            }

            let (g, _) = Givens::make(bw.read(k, k), bw.read(k + 1, k));
            g.apply_left(bw.as_mut(), k, k + 1);
            g.apply_right(uw.as_mut(), k, k + 1);
            bw.write(k + 1, k, T::zero());
        }
    }
}

/// Iterates on the bidiagonalization of an initialized `h` with
/// `h.nrows() ≥ h.ncols()`; returns `(U, S, V)` working containers.
fn svd_work<T: ComplexField>(h: MatRef<'_, T>) -> Result<(Mat<T>, Mat<T>, Mat<T>)> {
    let (m, n) = (h.nrows(), h.ncols());
    let (mut uw, mut bw, mut vw) = bidiag::bidiag_work(h)?;
    golub_kahan(&mut uw, &mut bw, &mut vw, n);

    // absorb the diagonal phases into U, leaving magnitudes
    for i in 0..n {
        let d = bw.read(i, i);
        let mag = d.abs();
        if mag != T::Real::zero() {
            let phase = d.scale(mag.inv());
            for r in 0..m {
                let val = uw.read(r, i) * phase;
                uw.write(r, i, val);
            }
            bw.write(i, i, T::from_real(mag));
        }
    }
    // the band residue left by the sweep cap is below the trim tolerance
    for i in 0..n.saturating_sub(1) {
        bw.write(i, i + 1, T::zero());
    }
    Ok((uw, bw, vw))
}

/// Factors `h` into `u · s · v`, with `u` of size `m × m`, `s` of size
/// `m × n` holding the nonnegative singular values on its diagonal, and `v`
/// of size `n × n`.
pub fn svd<T: ComplexField>(
    h: MatRef<'_, T>,
    mut u: MatMut<'_, T>,
    mut s: MatMut<'_, T>,
    mut v: MatMut<'_, T>,
) -> Result {
    bidiag::shape_checks(&h, &u, &s, &v)?;
    if !h.is_initialized() {
        u.set_initialized(false);
        s.set_initialized(false);
        v.set_initialized(false);
        return Ok(());
    }
    let (m, n) = (h.nrows(), h.ncols());
    if m < n {
        // factor the transpose, then transpose the factors back
        let (uw, sw, vw) = svd_work(h.transpose())?;
        ops::set(u.rb_mut(), &vw.as_ref().transpose())?;
        ops::set(s.rb_mut(), &sw.as_ref().transpose())?;
        ops::set(v.rb_mut(), &uw.as_ref().transpose())?;
        return Ok(());
    }
    let (uw, sw, vw) = svd_work(h)?;
    ops::set(u.rb_mut(), &uw.as_ref())?;
    ops::set(s.rb_mut(), &sw.as_ref())?;
    ops::set(v.rb_mut(), &vw.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use rand::prelude::*;
    use strata_core::algebra::AddMul;
    use strata_core::{c64, mul, Parallelism, Structure};

    fn check_svd_f64(m: usize, n: usize, seed: u64, tol: f64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let h = Mat::<f64>::from_fn(Structure::General, m, n, |_, _| rng.gen::<f64>() - 0.5);
        let mut u = Mat::<f64>::new(Structure::Orthogonal, m, m);
        let mut s = Mat::<f64>::new(Structure::General, m, n);
        let mut v = Mat::<f64>::new(Structure::Orthogonal, n, n);
        svd(h.as_ref(), u.as_mut(), s.as_mut(), v.as_mut()).unwrap();

        // singular values are nonnegative, off-diagonal of S is zero
        for i in 0..m {
            for j in 0..n {
                if i == j {
                    assert!(s.read(i, j) >= 0.0);
                } else {
                    assert!(s.read(i, j) == 0.0);
                }
            }
        }

        let mut us = Mat::<f64>::zeros(Structure::General, m, n);
        mul::mxm(
            us.as_mut(),
            u.as_ref(),
            s.as_ref(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        let mut usv = Mat::<f64>::zeros(Structure::General, m, n);
        mul::mxm(
            usv.as_mut(),
            us.as_ref(),
            v.as_ref(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        for i in 0..m {
            for j in 0..n {
                assert!((usv.read(i, j) - h.read(i, j)).abs() < tol);
            }
        }

        let mut utu = Mat::<f64>::zeros(Structure::General, m, m);
        mul::mxm(
            utu.as_mut(),
            u.as_ref().adjoint(),
            u.as_ref(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        for i in 0..m {
            for j in 0..m {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!((utu.read(i, j) - expect).abs() < tol);
            }
        }
    }

    #[test]
    fn round_trips() {
        check_svd_f64(5, 5, 60, 1e-10);
        check_svd_f64(6, 4, 61, 1e-10);
        check_svd_f64(4, 6, 62, 1e-10);
        check_svd_f64(1, 1, 63, 1e-14);
    }

    #[test]
    fn diagonal_input() {
        let h = Mat::<f64>::from_fn(Structure::General, 3, 3, |i, j| {
            if i == j {
                [3.0, -1.0, 2.0][i]
            } else {
                0.0
            }
        });
        let mut u = Mat::<f64>::new(Structure::Orthogonal, 3, 3);
        let mut s = Mat::<f64>::new(Structure::General, 3, 3);
        let mut v = Mat::<f64>::new(Structure::Orthogonal, 3, 3);
        svd(h.as_ref(), u.as_mut(), s.as_mut(), v.as_mut()).unwrap();
        // the negative diagonal entry comes out as a magnitude, with the sign
        // absorbed into U
        assert!((s.read(1, 1) - 1.0).abs() < 1e-14);
        assert!((u.read(1, 1) + 1.0).abs() < 1e-14);
    }

    #[test]
    fn complex_round_trip() {
        let mut rng = StdRng::seed_from_u64(64);
        let (m, n) = (4, 3);
        let h = Mat::<c64>::from_fn(Structure::General, m, n, |_, _| {
            c64::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5)
        });
        let mut u = Mat::<c64>::new(Structure::Orthogonal, m, m);
        let mut s = Mat::<c64>::new(Structure::General, m, n);
        let mut v = Mat::<c64>::new(Structure::Orthogonal, n, n);
        svd(h.as_ref(), u.as_mut(), s.as_mut(), v.as_mut()).unwrap();

        for i in 0..n {
            // magnitudes only on the diagonal
            assert!(s.read(i, i).im.abs() < 1e-12);
            assert!(s.read(i, i).re >= 0.0);
        }
        let mut us = Mat::<c64>::zeros(Structure::General, m, n);
        mul::mxm(
            us.as_mut(),
            u.as_ref(),
            s.as_ref(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        let mut usv = Mat::<c64>::zeros(Structure::General, m, n);
        mul::mxm(
            usv.as_mut(),
            us.as_ref(),
            v.as_ref(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        for i in 0..m {
            for j in 0..n {
                assert!((usv.read(i, j) - h.read(i, j)).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn uninitialized_input_propagates() {
        let h = Mat::<f64>::new(Structure::General, 3, 3);
        let mut u = Mat::<f64>::zeros(Structure::Orthogonal, 3, 3);
        let mut s = Mat::<f64>::zeros(Structure::General, 3, 3);
        let mut v = Mat::<f64>::zeros(Structure::Orthogonal, 3, 3);
        assert!(svd(h.as_ref(), u.as_mut(), s.as_mut(), v.as_mut()) == Ok(()));
        assert!(!u.is_initialized());
        assert!(!s.is_initialized());
        assert!(!v.is_initialized());
    }
}
