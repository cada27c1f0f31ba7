//! LU decomposition.
//!
//! Both factorizations produce a unit-diagonal lower-trapezoidal `L` and an
//! upper-trapezoidal `U`. [`partial_pivoting`] selects the largest-magnitude
//! pivot in each column and records the row exchanges in a permutation, so
//! that `L U = P H`; [`no_pivoting`] factors in place order and reports an
//! exactly zero pivot as a failure. Blocked variants factor a column panel,
//! solve the coupling row panel against the unit-lower diagonal block, and
//! downdate the trailing submatrix with a Schur complement.

use reborrow::*;
use strata_core::{ComplexField, Error, Mat, MatMut, MatRef, Result, Structure};

pub mod no_pivoting;
pub mod partial_pivoting;

fn checks<T>(h: &MatRef<'_, T>, l: &MatMut<'_, T>, u: &MatMut<'_, T>) -> Result {
    let (m, n) = (h.nrows(), h.ncols());
    let k = m.min(n);
    if l.nrows() != m || l.ncols() != k || u.nrows() != k || u.ncols() != n {
        return Err(Error::Failed);
    }
    if !l.structure().is_a(Structure::LowerTrapezoidal)
        || !u.structure().is_a(Structure::UpperTrapezoidal)
    {
        return Err(Error::Failed);
    }
    Ok(())
}

/// Copies the factors out of the working matrix: the strict lower trapezoid
/// plus a unit diagonal into `l`, the upper trapezoid into `u`.
fn extract_factors<T: ComplexField>(
    w: &Mat<T>,
    mut l: MatMut<'_, T>,
    mut u: MatMut<'_, T>,
) -> Result {
    use strata_core::ops;
    ops::set_scalar(l.rb_mut(), T::zero())?;
    ops::for_each(l.rb_mut(), |i, j, v| {
        *v = if i == j { T::one() } else { w.read(i, j) };
    })?;
    let k = w.nrows().min(w.ncols());
    ops::set(
        u.rb_mut(),
        &w.as_ref()
            .submatrix(0, 0, k, w.ncols())
            .retype(Structure::UpperTrapezoidal),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use rand::prelude::*;
    use strata_core::algebra::AddMul;
    use strata_core::{mul, Parallelism};

    pub fn random_mat(m: usize, n: usize, seed: u64) -> Mat<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Mat::from_fn(Structure::General, m, n, |_, _| rng.gen::<f64>() - 0.5)
    }

    /// `‖L U − R‖_F` where `R` is the (possibly row-permuted) input.
    pub fn reconstruction_error(
        l: MatRef<'_, f64>,
        u: MatRef<'_, f64>,
        r: MatRef<'_, f64>,
    ) -> f64 {
        let (m, n) = (r.nrows(), r.ncols());
        let mut rec = Mat::<f64>::zeros(Structure::General, m, n);
        mul::mxm(rec.as_mut(), l, u, AddMul, Parallelism::None).unwrap();
        let mut acc = 0.0;
        for i in 0..m {
            for j in 0..n {
                let d = rec.read(i, j) - r.read(i, j);
                acc += d * d;
            }
        }
        acc.sqrt()
    }
}
