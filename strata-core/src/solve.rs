//! Triangular substitution.
//!
//! Forward substitution solves `A x = b` for lower-triangular `A`, back
//! substitution for upper-triangular `A`; the matrix forms solve one right-hand
//! side column at a time. Transposed and conjugated systems are solved by
//! passing the corresponding view (the structure tag of the view selects the
//! right routine).
//!
//! An exactly zero diagonal entry is not trapped: the division produces an
//! infinity or NaN that propagates into the solution, as in the unblocked
//! factorizations built on top of these routines.

use crate::{ComplexField, Error, MatMut, MatRef, Result, Structure, VecMut, VecRef};

fn lower_checks<T>(a: &MatRef<'_, T>, x_len: usize, b_len: usize) -> Result {
    if a.nrows() != a.ncols() || a.nrows() != x_len || a.nrows() != b_len {
        return Err(Error::Failed);
    }
    if !a.structure().is_a(Structure::LowerTriangular) {
        return Err(Error::Failed);
    }
    Ok(())
}

fn upper_checks<T>(a: &MatRef<'_, T>, x_len: usize, b_len: usize) -> Result {
    if a.nrows() != a.ncols() || a.nrows() != x_len || a.nrows() != b_len {
        return Err(Error::Failed);
    }
    if !a.structure().is_a(Structure::UpperTriangular) {
        return Err(Error::Failed);
    }
    Ok(())
}

/// Solves `A x = b` with `A` lower-triangular:
/// `xᵢ = (bᵢ − Σ_{j<i} Aᵢⱼ xⱼ) / Aᵢᵢ`.
pub fn forward_substitution<T: ComplexField>(
    a: MatRef<'_, T>,
    mut x: VecMut<'_, T>,
    b: VecRef<'_, T>,
) -> Result {
    lower_checks(&a, x.len(), b.len())?;
    if !a.is_initialized() || !b.is_initialized() {
        x.set_initialized(false);
        return Ok(());
    }
    let n = a.nrows();
    for i in 0..n {
        let mut acc = b.read(i);
        for j in 0..i {
            acc = acc - a.read(i, j) * x.read(j);
        }
        x.write(i, acc * a.read(i, i).inv());
    }
    x.set_initialized(true);
    Ok(())
}

/// Solves `A x = b` with `A` upper-triangular, from the last row up.
pub fn back_substitution<T: ComplexField>(
    a: MatRef<'_, T>,
    mut x: VecMut<'_, T>,
    b: VecRef<'_, T>,
) -> Result {
    upper_checks(&a, x.len(), b.len())?;
    if !a.is_initialized() || !b.is_initialized() {
        x.set_initialized(false);
        return Ok(());
    }
    let n = a.nrows();
    for i in (0..n).rev() {
        let mut acc = b.read(i);
        for j in i + 1..n {
            acc = acc - a.read(i, j) * x.read(j);
        }
        x.write(i, acc * a.read(i, i).inv());
    }
    x.set_initialized(true);
    Ok(())
}

/// Multi-RHS forward substitution: solves `A X = B` column by column.
pub fn forward_substitution_mat<T: ComplexField>(
    a: MatRef<'_, T>,
    mut x: MatMut<'_, T>,
    b: MatRef<'_, T>,
) -> Result {
    lower_checks(&a, x.nrows(), b.nrows())?;
    if x.ncols() != b.ncols() {
        return Err(Error::Failed);
    }
    if !a.is_initialized() || !b.is_initialized() {
        x.set_initialized(false);
        return Ok(());
    }
    let n = a.nrows();
    for col in 0..b.ncols() {
        for i in 0..n {
            let mut acc = b.read(i, col);
            for j in 0..i {
                acc = acc - a.read(i, j) * x.read(j, col);
            }
            x.write(i, col, acc * a.read(i, i).inv());
        }
    }
    x.set_initialized(true);
    Ok(())
}

/// Multi-RHS back substitution: solves `A X = B` column by column.
pub fn back_substitution_mat<T: ComplexField>(
    a: MatRef<'_, T>,
    mut x: MatMut<'_, T>,
    b: MatRef<'_, T>,
) -> Result {
    upper_checks(&a, x.nrows(), b.nrows())?;
    if x.ncols() != b.ncols() {
        return Err(Error::Failed);
    }
    if !a.is_initialized() || !b.is_initialized() {
        x.set_initialized(false);
        return Ok(());
    }
    let n = a.nrows();
    for col in 0..b.ncols() {
        for i in (0..n).rev() {
            let mut acc = b.read(i, col);
            for j in i + 1..n {
                acc = acc - a.read(i, j) * x.read(j, col);
            }
            x.write(i, col, acc * a.read(i, i).inv());
        }
    }
    x.set_initialized(true);
    Ok(())
}
