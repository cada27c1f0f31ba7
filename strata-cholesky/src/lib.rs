//! Cholesky decomposition in upper form: `Uᴴ U = H` for a symmetric (or
//! Hermitian) positive-definite `H`.
//!
//! The unblocked routines work on one column at a time; the blocked routines
//! factor a diagonal block, solve the coupling panel by forward substitution
//! against `U₁₁ᴴ`, and downdate the trailing submatrix, taking their panel
//! workspace from a [`DynStack`]. The in-place variants write only the upper
//! triangle; whatever the strict lower triangle of a full-storage input held
//! before is left untouched and is not meaningful afterwards.
//!
//! Positive definiteness is not checked: a non-PD input produces a NaN pivot
//! in the square root, which propagates into the factor.

use core::sync::atomic::AtomicBool;
use dyn_stack::{DynStack, SizeOverflow, StackReq};
use reborrow::*;
use strata_core::algebra::{AddMul, Minus};
use strata_core::{
    mul, ops, solve, ComplexField, Error, Mat, MatMut, MatRef, Parallelism, Result, Structure,
};

fn checks<T>(h: &MatRef<'_, T>, u: &MatMut<'_, T>) -> Result {
    let n = h.nrows();
    if h.ncols() != n || u.nrows() != n || u.ncols() != n {
        return Err(Error::Failed);
    }
    if !h.structure().is_a(Structure::Symmetric) && !h.structure().is_a(Structure::Hermitian) {
        return Err(Error::Failed);
    }
    Ok(())
}

/// One column step of the upper factorization, acting on the trailing
/// submatrix anchored at `k`. Touches only positions `(i, j)` with
/// `k ≤ i ≤ j`.
fn cholesky_step<T: ComplexField>(w: &mut MatMut<'_, T>, k: usize, n: usize) {
    let alpha = w.read(k, k).sqrt();
    w.write(k, k, alpha);
    let alpha_inv = alpha.inv();
    for j in k + 1..n {
        let v = w.read(k, j) * alpha_inv;
        w.write(k, j, v);
    }
    for i in k + 1..n {
        for j in i..n {
            let vi = w.read(k, i);
            let vj = w.read(k, j);
            let val = w.read(i, j) - vi.conj() * vj;
            w.write(i, j, val);
        }
    }
}

/// Unblocked in-place factorization; on success the upper triangle of `w`
/// holds `U`.
pub fn cholesky_in_place<T: ComplexField>(mut w: MatMut<'_, T>) -> Result {
    let n = w.nrows();
    if w.ncols() != n || !w.structure().requires_square() {
        return Err(Error::Failed);
    }
    if !w.is_initialized() {
        return Err(Error::Illegal);
    }
    for k in 0..n {
        cholesky_step(&mut w, k, n);
    }
    Ok(())
}

/// Unblocked out-of-place factorization: copies `h` into a working buffer of
/// the same structure, factors it, and stores the upper triangle into `u`.
pub fn cholesky<T: ComplexField>(h: MatRef<'_, T>, mut u: MatMut<'_, T>) -> Result {
    checks(&h, &u)?;
    if !h.is_initialized() {
        u.set_initialized(false);
        return Ok(());
    }
    let n = h.nrows();
    let mut w = Mat::<T>::new(h.structure(), n, n);
    ops::set(w.as_mut(), &h)?;
    {
        let mut wm = w.as_mut();
        for k in 0..n {
            cholesky_step(&mut wm, k, n);
        }
    }
    ops::set(u, &w.as_ref().retype(Structure::UpperTriangular))
}

/// Workspace requirement of the blocked factorizations.
pub fn cholesky_blocked_req<T: 'static>(
    dim: usize,
    block_size: usize,
) -> core::result::Result<StackReq, SizeOverflow> {
    let bs = block_size.min(dim);
    let rest = dim - bs;
    StackReq::try_all_of([
        StackReq::try_new::<T>(bs * rest)?,
        StackReq::try_new::<T>(rest * rest)?,
    ])
}

/// Blocked in-place factorization with panel width `block_size`.
pub fn cholesky_in_place_blocked<T: ComplexField>(
    mut w: MatMut<'_, T>,
    block_size: usize,
    mut stack: DynStack<'_>,
) -> Result {
    let n = w.nrows();
    if w.ncols() != n || !w.structure().requires_square() {
        return Err(Error::Failed);
    }
    if block_size == 0 || (n > 0 && block_size > n) {
        return Err(Error::Failed);
    }
    if !w.is_initialized() {
        return Err(Error::Illegal);
    }

    let mut k = 0;
    while k < n {
        let bs = block_size.min(n - k);
        cholesky_in_place(w.rb_mut().submatrix(k, k, bs, bs))?;

        let rest = n - k - bs;
        if rest > 0 {
            let stack = stack.rb_mut();
            let x_init = AtomicBool::new(true);
            let (mut x_buf, stack) = stack.make_with::<T, _>(bs * rest, |_| T::zero());
            let mut x = MatMut::from_major_slice(&mut x_buf, bs, rest, &x_init);

            // U₁₁ᴴ X = A₁₂
            {
                let u11 = w
                    .rb()
                    .submatrix(k, k, bs, bs)
                    .retype(Structure::UpperTriangular);
                let a12 = w.rb().submatrix(k, k + bs, bs, rest);
                solve::forward_substitution_mat(u11.adjoint(), x.rb_mut(), a12)?;
            }
            ops::set(w.rb_mut().submatrix(k, k + bs, bs, rest), &x.rb())?;

            // A₂₂ ← A₂₂ − Xᴴ X
            let p_init = AtomicBool::new(true);
            let (mut p_buf, _) = stack.make_with::<T, _>(rest * rest, |_| T::zero());
            let mut p = MatMut::from_major_slice(&mut p_buf, rest, rest, &p_init);
            mul::mxm(
                p.rb_mut(),
                x.rb().adjoint(),
                x.rb(),
                AddMul,
                Parallelism::None,
            )?;
            // downdate the upper triangle only; the strict lower triangle of
            // a full-storage input stays untouched
            let mut a22 = w.rb_mut().submatrix(k + bs, k + bs, rest, rest);
            if !a22.structure().reflects() {
                a22 = a22.retype(Structure::Symmetric);
            }
            ops::foldl(a22, &p.rb(), Minus)?;
        }
        k += bs;
    }
    Ok(())
}

/// Blocked out-of-place factorization.
pub fn cholesky_blocked<T: ComplexField>(
    h: MatRef<'_, T>,
    mut u: MatMut<'_, T>,
    block_size: usize,
    stack: DynStack<'_>,
) -> Result {
    checks(&h, &u)?;
    let n = h.nrows();
    if block_size == 0 || (n > 0 && block_size > n) {
        return Err(Error::Failed);
    }
    if !h.is_initialized() {
        u.set_initialized(false);
        return Ok(());
    }
    let mut w = Mat::<T>::new(h.structure(), n, n);
    ops::set(w.as_mut(), &h)?;
    cholesky_in_place_blocked(w.as_mut(), block_size, stack)?;
    ops::set(u, &w.as_ref().retype(Structure::UpperTriangular))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::GlobalMemBuffer;
    use rand::prelude::*;
    use strata_core::c64;

    fn spd(n: usize, rng: &mut StdRng) -> Mat<f64> {
        let a = Mat::<f64>::from_fn(Structure::General, n, n, |_, _| rng.gen::<f64>() - 0.5);
        Mat::from_fn(Structure::Symmetric, n, n, |i, j| {
            let mut acc = if i == j { n as f64 } else { 0.0 };
            for k in 0..n {
                acc += a.read(k, i) * a.read(k, j);
            }
            acc
        })
    }

    fn hpd(n: usize, rng: &mut StdRng) -> Mat<c64> {
        let a = Mat::<c64>::from_fn(Structure::General, n, n, |_, _| {
            c64::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5)
        });
        Mat::from_fn(Structure::Hermitian, n, n, |i, j| {
            let mut acc = if i == j {
                c64::new(n as f64, 0.0)
            } else {
                c64::new(0.0, 0.0)
            };
            for k in 0..n {
                acc += a.read(k, i).conj() * a.read(k, j);
            }
            acc
        })
    }

    fn residual(h: MatRef<'_, f64>, u: MatRef<'_, f64>) -> f64 {
        let n = h.nrows();
        let mut rec = Mat::<f64>::zeros(Structure::General, n, n);
        mul::mxm(rec.as_mut(), u.clone().adjoint(), u, AddMul, Parallelism::None).unwrap();
        let mut acc = 0.0f64;
        for i in 0..n {
            for j in 0..n {
                let d = rec.read(i, j) - h.read(i, j);
                acc += d * d;
            }
        }
        acc.sqrt()
    }

    #[test]
    fn known_three_by_three() {
        let h = Mat::<f64>::from_fn(Structure::Symmetric, 3, 3, |i, j| {
            [[4.0, 2.0, 0.0], [2.0, 5.0, 1.0], [0.0, 1.0, 3.0]][i][j]
        });
        let mut u = Mat::<f64>::new(Structure::UpperTriangular, 3, 3);
        cholesky(h.as_ref(), u.as_mut()).unwrap();
        assert_approx_eq!(u.read(0, 0), 2.0, 1e-14);
        assert_approx_eq!(u.read(0, 1), 1.0, 1e-14);
        assert_approx_eq!(u.read(1, 1), 2.0, 1e-14);
        assert_approx_eq!(u.read(1, 2), 0.5, 1e-14);
        assert_approx_eq!(u.read(2, 2), 2.75f64.sqrt(), 1e-14);
        assert!(u.read(0, 2).abs() < 1e-14);
    }

    #[test]
    fn round_trip() {
        let mut rng = StdRng::seed_from_u64(0);
        for n in [1, 2, 5, 8] {
            let h = spd(n, &mut rng);
            let mut u = Mat::<f64>::new(Structure::UpperTriangular, n, n);
            cholesky(h.as_ref(), u.as_mut()).unwrap();
            assert!(residual(h.as_ref(), u.as_ref()) < 1e-10);
        }
    }

    #[test]
    fn hermitian_round_trip() {
        let mut rng = StdRng::seed_from_u64(1);
        let h = hpd(6, &mut rng);
        let mut u = Mat::<c64>::new(Structure::UpperTriangular, 6, 6);
        cholesky(h.as_ref(), u.as_mut()).unwrap();
        let n = 6;
        let mut rec = Mat::<c64>::zeros(Structure::General, n, n);
        mul::mxm(
            rec.as_mut(),
            u.as_ref().adjoint(),
            u.as_ref(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        for i in 0..n {
            for j in 0..n {
                assert!((rec.read(i, j) - h.read(i, j)).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn blocked_matches_unblocked() {
        let mut rng = StdRng::seed_from_u64(2);
        let n = 9;
        let h = spd(n, &mut rng);
        let mut u_ref = Mat::<f64>::new(Structure::UpperTriangular, n, n);
        cholesky(h.as_ref(), u_ref.as_mut()).unwrap();
        for bs in [1, 2, 4, n] {
            let mut u = Mat::<f64>::new(Structure::UpperTriangular, n, n);
            cholesky_blocked(
                h.as_ref(),
                u.as_mut(),
                bs,
                DynStack::new(&mut GlobalMemBuffer::new(
                    cholesky_blocked_req::<f64>(n, bs).unwrap(),
                )),
            )
            .unwrap();
            for i in 0..n {
                for j in i..n {
                    assert!((u.read(i, j) - u_ref.read(i, j)).abs() < 1e-10);
                }
            }
        }
    }

    #[test]
    fn blocked_hermitian_round_trip() {
        let mut rng = StdRng::seed_from_u64(3);
        let n = 7;
        let h = hpd(n, &mut rng);
        let mut u = Mat::<c64>::new(Structure::UpperTriangular, n, n);
        cholesky_blocked(
            h.as_ref(),
            u.as_mut(),
            3,
            DynStack::new(&mut GlobalMemBuffer::new(
                cholesky_blocked_req::<c64>(n, 3).unwrap(),
            )),
        )
        .unwrap();
        let mut rec = Mat::<c64>::zeros(Structure::General, n, n);
        mul::mxm(
            rec.as_mut(),
            u.as_ref().adjoint(),
            u.as_ref(),
            AddMul,
            Parallelism::None,
        )
        .unwrap();
        for i in 0..n {
            for j in 0..n {
                assert!((rec.read(i, j) - h.read(i, j)).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn in_place_leaves_lower_triangle() {
        let mut rng = StdRng::seed_from_u64(4);
        let n = 5;
        let h = spd(n, &mut rng);
        // full-storage square copy with sentinel values in the strict lower
        // triangle
        let mut w = Mat::<f64>::from_fn(Structure::Square, n, n, |i, j| {
            if i > j {
                -77.0
            } else {
                h.read(i, j)
            }
        });
        cholesky_in_place(w.as_mut()).unwrap();
        for i in 0..n {
            for j in 0..i {
                assert!(w.read(i, j) == -77.0);
            }
        }
        let u = Mat::<f64>::from_fn(Structure::UpperTriangular, n, n, |i, j| {
            if i <= j {
                w.read(i, j)
            } else {
                0.0
            }
        });
        assert!(residual(h.as_ref(), u.as_ref()) < 1e-10);
    }

    #[test]
    fn blocked_in_place_leaves_lower_triangle() {
        let mut rng = StdRng::seed_from_u64(5);
        let n = 7;
        let h = spd(n, &mut rng);
        let mut w = Mat::<f64>::from_fn(Structure::Square, n, n, |i, j| {
            if i > j {
                -77.0
            } else {
                h.read(i, j)
            }
        });
        cholesky_in_place_blocked(
            w.as_mut(),
            3,
            DynStack::new(&mut GlobalMemBuffer::new(
                cholesky_blocked_req::<f64>(n, 3).unwrap(),
            )),
        )
        .unwrap();
        for i in 0..n {
            for j in 0..i {
                assert!(w.read(i, j) == -77.0);
            }
        }
        let u = Mat::<f64>::from_fn(Structure::UpperTriangular, n, n, |i, j| {
            if i <= j {
                w.read(i, j)
            } else {
                0.0
            }
        });
        assert!(residual(h.as_ref(), u.as_ref()) < 1e-10);
    }

    #[test]
    fn invalid_block_size_fails() {
        let h = Mat::<f64>::zeros(Structure::Symmetric, 4, 4);
        let mut u = Mat::<f64>::new(Structure::UpperTriangular, 4, 4);
        for bs in [0, 5] {
            let result = cholesky_blocked(
                h.as_ref(),
                u.as_mut(),
                bs,
                DynStack::new(&mut GlobalMemBuffer::new(
                    cholesky_blocked_req::<f64>(4, 1).unwrap(),
                )),
            );
            assert!(result == Err(Error::Failed));
        }
    }

    #[test]
    fn dimension_mismatch_fails() {
        let h = Mat::<f64>::zeros(Structure::Symmetric, 3, 3);
        let mut u = Mat::<f64>::new(Structure::General, 2, 2);
        assert!(cholesky(h.as_ref(), u.as_mut()) == Err(Error::Failed));
        let g = Mat::<f64>::zeros(Structure::General, 3, 3);
        let mut u = Mat::<f64>::new(Structure::UpperTriangular, 3, 3);
        assert!(cholesky(g.as_ref(), u.as_mut()) == Err(Error::Failed));
    }

    #[test]
    fn uninitialized_input_propagates() {
        let h = Mat::<f64>::new(Structure::Symmetric, 3, 3);
        let mut u = Mat::<f64>::zeros(Structure::UpperTriangular, 3, 3);
        assert!(cholesky(h.as_ref(), u.as_mut()) == Ok(()));
        assert!(!u.is_initialized());
        let mut w = Mat::<f64>::new(Structure::Symmetric, 3, 3);
        assert!(cholesky_in_place(w.as_mut()) == Err(Error::Illegal));
    }

    #[test]
    fn non_pd_input_produces_nan() {
        let h = Mat::<f64>::from_fn(Structure::Symmetric, 2, 2, |i, j| {
            [[-1.0, 0.0], [0.0, 1.0]][i][j]
        });
        let mut u = Mat::<f64>::new(Structure::UpperTriangular, 2, 2);
        cholesky(h.as_ref(), u.as_mut()).unwrap();
        assert!(u.read(0, 0).is_nan());
    }
}
