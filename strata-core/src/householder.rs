//! Householder reflectors.
//!
//! A reflector is the Hermitian unitary `I − 2 v vᴴ` for a unit vector `v`.
//! [`make_reflector`] builds `v` so that the reflector maps `x` onto
//! `α · e₀`; the apply functions update a block in place, reading and writing
//! through the view layer so that packed and transposed operands work
//! unchanged.

use crate::{ComplexField, MatMut, VecRef, Vector};
use assert2::assert as fancy_assert;

fn norm<T: ComplexField>(x: &VecRef<'_, T>) -> T::Real {
    let mut acc = T::Real::zero();
    for k in 0..x.len() {
        acc = acc + x.read(k).abs2();
    }
    acc.sqrt()
}

/// Builds the unit reflector vector for `x`, so that `(I − 2 v vᴴ) x = α e₀`.
///
/// `α = ‖x‖ · x₀ / |x₀|`, falling back to `α = ‖x‖` when `x₀` vanishes.
/// Returns `None` when `x` is already a multiple of `e₀` (the reflection is
/// the identity and should be skipped).
pub fn make_reflector<T: ComplexField>(x: VecRef<'_, T>) -> Option<(Vector<T>, T)> {
    let n = x.len();
    if n == 0 {
        return None;
    }
    let x_norm = norm(&x);
    let x0 = x.read(0);
    let x0_abs = x0.abs();
    let alpha = if x0_abs == T::Real::zero() {
        T::from_real(x_norm)
    } else {
        x0.scale(x0_abs.inv()).scale(x_norm)
    };

    let mut v = Vector::from_fn(n, |k| {
        if k == 0 {
            x.read(0) - alpha
        } else {
            x.read(k)
        }
    });
    let v_norm = norm(&v.as_ref());
    if v_norm == T::Real::zero() {
        return None;
    }
    let scale = v_norm.inv();
    for k in 0..n {
        let val = v.read(k).scale(scale);
        v.write(k, val);
    }
    Some((v, alpha))
}

/// `block ← (I − 2 v vᴴ) · block`; the block's row count must equal `v`'s
/// length.
#[track_caller]
pub fn apply_left<T: ComplexField>(v: VecRef<'_, T>, mut block: MatMut<'_, T>) {
    fancy_assert!(block.nrows() == v.len());
    let two = T::one() + T::one();
    let n = v.len();
    for j in 0..block.ncols() {
        let mut s = T::zero();
        for i in 0..n {
            s = s + v.read(i).conj() * block.read(i, j);
        }
        let s = s * two;
        for i in 0..n {
            let val = block.read(i, j) - s * v.read(i);
            block.write(i, j, val);
        }
    }
}

/// `block ← block · (I − 2 v vᴴ)`; the block's column count must equal `v`'s
/// length.
#[track_caller]
pub fn apply_right<T: ComplexField>(mut block: MatMut<'_, T>, v: VecRef<'_, T>) {
    fancy_assert!(block.ncols() == v.len());
    let two = T::one() + T::one();
    let n = v.len();
    for i in 0..block.nrows() {
        let mut s = T::zero();
        for j in 0..n {
            s = s + block.read(i, j) * v.read(j);
        }
        let s = s * two;
        for j in 0..n {
            let val = block.read(i, j) - s * v.read(j).conj();
            block.write(i, j, val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{c64, Mat, Structure};
    use assert2::assert;

    #[test]
    fn reflects_onto_first_axis() {
        let x = Vector::<f64>::from_fn(3, |k| [3.0, 0.0, 4.0][k]);
        let (v, alpha) = make_reflector(x.as_ref()).unwrap();
        assert!((alpha - 5.0).abs() < 1e-14);
        let mut m = Mat::<f64>::from_fn(Structure::General, 3, 1, |i, _| x.read(i));
        apply_left(v.as_ref(), m.as_mut());
        assert!((m.read(0, 0) - 5.0).abs() < 1e-14);
        assert!(m.read(1, 0).abs() < 1e-14);
        assert!(m.read(2, 0).abs() < 1e-14);
    }

    #[test]
    fn aligned_input_is_skipped() {
        let x = Vector::<f64>::from_fn(3, |k| if k == 0 { 2.0 } else { 0.0 });
        assert!(make_reflector(x.as_ref()).is_none());
    }

    #[test]
    fn complex_reflector_is_unitary() {
        let x = Vector::<c64>::from_fn(3, |k| c64::new(k as f64 + 1.0, -(k as f64)));
        let (v, alpha) = make_reflector(x.as_ref()).unwrap();
        // α carries the phase of x₀
        let mut norm2 = 0.0;
        for k in 0..3 {
            norm2 += x.read(k).abs2();
        }
        assert!((alpha.abs() - norm2.sqrt()).abs() < 1e-14);

        // applying twice is the identity
        let mut m = Mat::<c64>::from_fn(Structure::General, 3, 2, |i, j| {
            c64::new(i as f64, j as f64 - 1.0)
        });
        let orig = m.clone();
        apply_left(v.as_ref(), m.as_mut());
        apply_left(v.as_ref(), m.as_mut());
        for i in 0..3 {
            for j in 0..2 {
                assert!((m.read(i, j) - orig.read(i, j)).abs() < 1e-13);
            }
        }
    }

    #[test]
    fn right_application_is_adjoint_of_left() {
        let x = Vector::<c64>::from_fn(2, |k| c64::new(1.0 + k as f64, 0.5));
        let (v, _) = make_reflector(x.as_ref()).unwrap();
        let a = Mat::<c64>::from_fn(Structure::General, 2, 2, |i, j| {
            c64::new((i * 2 + j) as f64, j as f64)
        });
        // (Q a)ᴴ == aᴴ Qᴴ == aᴴ Q, with Q Hermitian
        let mut left = a.clone();
        apply_left(v.as_ref(), left.as_mut());
        let mut right = Mat::<c64>::from_fn(Structure::General, 2, 2, |i, j| {
            a.read(j, i).conj()
        });
        apply_right(right.as_mut(), v.as_ref());
        for i in 0..2 {
            for j in 0..2 {
                assert!((left.read(i, j).conj() - right.read(j, i)).abs() < 1e-13);
            }
        }
    }
}
