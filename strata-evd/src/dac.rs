//! Divide-and-conquer eigensolver for real symmetric tridiagonal matrices.
//!
//! The matrix is split in half by subtracting the rank-one coupling
//! `β v vᵀ` with `v = e_{m−1} + e_m`, which decouples it into two smaller
//! tridiagonals with modified corner entries. After recursing, the spectrum
//! of `D + β z zᵀ` (with `D` the combined sub-spectra and `z = Uᵀ v`) is
//! found from the secular equation
//!
//! ```text
//! 1 + β Σᵢ zᵢ² / (dᵢ − λ) = 0
//! ```
//!
//! solved by recursive bisection on each root interval. Entries of `z` below
//! `10⁻⁷` in magnitude are deflated: their eigenvalue is taken unchanged and
//! their eigenvector is the canonical unit vector. Eigenvectors of the
//! update are `(D − λ I)⁻¹ z`, normalized.

use strata_core::algebra::AddMul;
use strata_core::{
    mul, ops, Error, Mat, MatMut, MatRef, Parallelism, RealField, Result, Structure, VecMut,
    Vector,
};

/// Secular-equation bisection on `(lo, hi)`, to absolute tolerance `10⁻⁷`.
fn bisect<T: RealField>(ds: &[T], zs: &[T], rho: T, lo: T, hi: T) -> T {
    let tol = T::from_f64(1e-7);
    let half = T::from_f64(0.5);
    let mid = (lo + hi) * half;
    if hi - lo <= tol {
        return mid;
    }
    let mut f = T::one();
    for j in 0..ds.len() {
        let denom = ds[j] - mid;
        if denom == T::zero() {
            return mid;
        }
        f = f + rho * zs[j] * zs[j] * denom.inv();
    }
    // for β > 0 the secular function increases across each root interval,
    // for β < 0 it decreases
    if (f > T::zero()) == (rho > T::zero()) {
        bisect(ds, zs, rho, lo, mid)
    } else {
        bisect(ds, zs, rho, mid, hi)
    }
}

/// Eigendecomposition of `D + ρ z zᵀ`: returns the eigenvector matrix (rows
/// in the order of `dd`) and the eigenvalues in ascending order.
fn secular_eigen<T: RealField>(dd: &[T], z: &[T], rho: T) -> (Mat<T>, Vec<T>) {
    let n = dd.len();
    if rho == T::zero() {
        return (Mat::identity(Structure::Square, n), dd.to_vec());
    }
    let deflate_tol = T::from_f64(1e-7);

    let mut perm: Vec<usize> = (0..n).collect();
    perm.sort_by(|&a, &b| {
        dd[a]
            .partial_cmp(&dd[b])
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    let ds: Vec<T> = perm.iter().map(|&k| dd[k]).collect();
    let zs: Vec<T> = perm.iter().map(|&k| z[k]).collect();

    let mut zsum = T::zero();
    for &v in &zs {
        zsum = zsum + v * v;
    }
    let span = rho.abs() * zsum;

    let mut q = Mat::<T>::zeros(Structure::General, n, n);
    let mut lambda = vec![T::zero(); n];
    for i in 0..n {
        if zs[i].abs() < deflate_tol {
            lambda[i] = ds[i];
            q.write(perm[i], i, T::one());
            continue;
        }
        let (lo, hi) = if rho > T::zero() {
            let hi = if i + 1 < n { ds[i + 1] } else { ds[i] + span };
            (ds[i], hi)
        } else {
            let lo = if i > 0 { ds[i - 1] } else { ds[i] - span };
            (lo, ds[i])
        };
        let lam = bisect(&ds, &zs, rho, lo, hi);
        lambda[i] = lam;

        let mut col = vec![T::zero(); n];
        let mut norm2 = T::zero();
        for j in 0..n {
            if zs[j].abs() < deflate_tol {
                continue;
            }
            let val = zs[j] * (ds[j] - lam).inv();
            col[j] = val;
            norm2 = norm2 + val * val;
        }
        let scale = norm2.sqrt().inv();
        for j in 0..n {
            q.write(perm[j], i, col[j] * scale);
        }
    }
    (q, lambda)
}

fn dac_rec<T: RealField>(diag: &[T], off: &[T]) -> Result<(Mat<T>, Vec<T>)> {
    let n = diag.len();
    if n == 1 {
        return Ok((Mat::identity(Structure::Square, 1), vec![diag[0]]));
    }
    let m = n / 2;
    let beta = off[m - 1];

    let mut d_top = diag[..m].to_vec();
    let mut d_bot = diag[m..].to_vec();
    d_top[m - 1] = d_top[m - 1] - beta;
    d_bot[0] = d_bot[0] - beta;

    let (q1, d1) = dac_rec(&d_top, &off[..m - 1])?;
    let (q2, d2) = dac_rec(&d_bot, &off[m..])?;

    // combined sub-spectra and the coupling z = Uᵀ v with v = e_{m−1} + e_m
    let mut dd = Vec::with_capacity(n);
    dd.extend_from_slice(&d1);
    dd.extend_from_slice(&d2);
    let mut z = vec![T::zero(); n];
    for i in 0..m {
        z[i] = q1.read(m - 1, i);
    }
    for i in 0..n - m {
        z[m + i] = q2.read(0, i);
    }

    let (qsec, lambda) = secular_eigen(&dd, &z, beta);

    let blk = Mat::from_fn(Structure::Square, n, n, |i, j| {
        if i < m && j < m {
            q1.read(i, j)
        } else if i >= m && j >= m {
            q2.read(i - m, j - m)
        } else {
            T::zero()
        }
    });
    let mut q = Mat::<T>::zeros(Structure::General, n, n);
    mul::mxm(
        q.as_mut(),
        blk.as_ref(),
        qsec.as_ref(),
        AddMul,
        Parallelism::None,
    )?;
    Ok((q, lambda))
}

/// Eigendecomposition `T Q = Q diag(d)` of a real symmetric tridiagonal
/// matrix.
pub fn tridiagonal_evd<T: RealField>(
    t: MatRef<'_, T>,
    mut q: MatMut<'_, T>,
    mut d: VecMut<'_, T>,
) -> Result {
    let n = t.nrows();
    if t.ncols() != n || q.nrows() != n || q.ncols() != n || d.len() != n {
        return Err(Error::Failed);
    }
    if !t.structure().is_a(Structure::SymmetricTridiagonal) {
        return Err(Error::Failed);
    }
    if !t.is_initialized() {
        q.set_initialized(false);
        d.set_initialized(false);
        return Ok(());
    }
    if n == 0 {
        q.set_initialized(true);
        d.set_initialized(true);
        return Ok(());
    }

    let diag: Vec<T> = (0..n).map(|i| t.read(i, i)).collect();
    let off: Vec<T> = (0..n - 1).map(|i| t.read(i, i + 1)).collect();
    let (qm, dm) = dac_rec(&diag, &off)?;
    ops::set(q, &qm.as_ref())?;
    let dv = Vector::from_fn(n, |k| dm[k]);
    ops::set_vec(d, dv.as_ref())
}
