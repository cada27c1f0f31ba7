//! End-to-end scenarios with fixed seed values.

use assert2::assert;
use assert_approx_eq::assert_approx_eq;
use strata::algebra::AddMul;
use strata::{
    cholesky, evd, mul, ops, qr, solve, GridConfig, Mat, Parallelism, Structure, ThreadGrid,
    Vector,
};

#[test]
fn back_substitution_4x4() {
    let a = Mat::<f64>::from_fn(Structure::UpperTriangular, 4, 4, |i, j| {
        [
            [2.0, 1.0, 0.0, 0.0],
            [0.0, 3.0, 1.0, 0.0],
            [0.0, 0.0, 4.0, 1.0],
            [0.0, 0.0, 0.0, 5.0],
        ][i][j]
    });
    let b = Vector::<f64>::from_fn(4, |_| 1.0);
    let mut x = Vector::<f64>::new(4);
    solve::back_substitution(a.as_ref(), x.as_mut(), b.as_ref()).unwrap();

    assert!((x.read(3) - 0.2).abs() < 1e-10);
    assert!((x.read(2) - 0.2).abs() < 1e-10);
    assert!((x.read(1) - 4.0 / 15.0).abs() < 1e-10);
    assert!((x.read(0) - 11.0 / 30.0).abs() < 1e-10);

    let mut ax = Vector::<f64>::zeros(4);
    mul::mxv(ax.as_mut(), a.as_ref(), x.as_ref(), AddMul).unwrap();
    for i in 0..4 {
        assert!((ax.read(i) - 1.0).abs() < 1e-10);
    }
}

#[test]
fn forward_substitution_3x3() {
    let a = Mat::<f64>::from_fn(Structure::LowerTriangular, 3, 3, |i, j| {
        [[2.0, 0.0, 0.0], [1.0, 3.0, 0.0], [0.0, 1.0, 4.0]][i][j]
    });
    let b = Vector::<f64>::from_fn(3, |k| [4.0, 7.0, 9.0][k]);
    let mut x = Vector::<f64>::new(3);
    solve::forward_substitution(a.as_ref(), x.as_mut(), b.as_ref()).unwrap();
    assert_approx_eq!(x.read(0), 2.0, 1e-10);
    assert_approx_eq!(x.read(1), 5.0 / 3.0, 1e-10);
    assert_approx_eq!(x.read(2), (9.0 - 5.0 / 3.0) / 4.0, 1e-10);
}

#[test]
fn cholesky_3x3() {
    let h = Mat::<f64>::from_fn(Structure::SymmetricPositiveDefinite, 3, 3, |i, j| {
        [[4.0, 2.0, 0.0], [2.0, 5.0, 1.0], [0.0, 1.0, 3.0]][i][j]
    });
    let mut u = Mat::<f64>::new(Structure::UpperTriangular, 3, 3);
    cholesky::cholesky(h.as_ref(), u.as_mut()).unwrap();
    assert_approx_eq!(u.read(0, 0), 2.0, 1e-10);
    assert_approx_eq!(u.read(0, 1), 1.0, 1e-10);
    assert_approx_eq!(u.read(1, 1), 2.0, 1e-10);
    assert_approx_eq!(u.read(1, 2), 0.5, 1e-10);
    assert_approx_eq!(u.read(2, 2), 2.75f64.sqrt(), 1e-10);
}

#[test]
fn qr_2x2_identity_reflector() {
    let h = Mat::<f64>::from_fn(Structure::General, 2, 2, |i, j| {
        [[1.0, 1.0], [0.0, 1.0]][i][j]
    });
    let mut q = Mat::<f64>::new(Structure::Orthogonal, 2, 2);
    let mut r = Mat::<f64>::new(Structure::UpperTriangular, 2, 2);
    qr::qr(h.as_ref(), q.as_mut(), r.as_mut()).unwrap();
    for i in 0..2 {
        for j in 0..2 {
            assert!(q.read(i, j) == if i == j { 1.0 } else { 0.0 });
            assert!(r.read(i, j) == h.read(i, j));
        }
    }
}

#[test]
fn parallel_mxm_identity_32() {
    let id = Mat::<f64>::identity(Structure::Square, 32);
    let mut c = Mat::<f64>::zeros(Structure::General, 32, 32);
    mul::mxm(
        c.as_mut(),
        id.as_ref(),
        id.as_ref(),
        AddMul,
        Parallelism::Grid(GridConfig::new(ThreadGrid::new(2, 2, 1), 8, 8)),
    )
    .unwrap();
    for i in 0..32 {
        for j in 0..32 {
            assert!(c.read(i, j) == if i == j { 1.0 } else { 0.0 });
        }
    }
}

#[test]
fn dac_on_diagonal_matrix() {
    let t = Mat::<f64>::from_fn(Structure::SymmetricTridiagonal, 3, 3, |i, j| {
        if i == j {
            (i + 1) as f64
        } else {
            0.0
        }
    });
    let mut q = Mat::<f64>::new(Structure::Orthogonal, 3, 3);
    let mut d = Vector::<f64>::new(3);
    evd::tridiagonal_evd(t.as_ref(), q.as_mut(), d.as_mut()).unwrap();

    // d is a permutation of {1, 2, 3} and Q the matching permutation matrix
    let mut seen = [false; 3];
    for k in 0..3 {
        let v = d.read(k);
        let idx = [1.0, 2.0, 3.0]
            .iter()
            .position(|e| (v - e).abs() < 1e-10)
            .unwrap();
        assert!(!seen[idx]);
        seen[idx] = true;
        for i in 0..3 {
            let expect = if i == idx { 1.0 } else { 0.0 };
            assert!((q.read(i, k).abs() - expect).abs() < 1e-10);
        }
    }

    // residual T Q − Q diag(d)
    let mut tq = Mat::<f64>::zeros(Structure::General, 3, 3);
    mul::mxm(
        tq.as_mut(),
        t.as_ref(),
        q.as_ref(),
        AddMul,
        Parallelism::None,
    )
    .unwrap();
    for i in 0..3 {
        for j in 0..3 {
            assert!((tq.read(i, j) - q.read(i, j) * d.read(j)).abs() < 1e-10);
        }
    }
}

#[test]
fn launcher_maps_exit_codes() {
    use strata::launcher::{exit_code, ExecMode, Launcher};
    let launcher = Launcher::new(ExecMode::FromCommand, GridConfig::default());
    let ok = launcher.exec(
        |n: usize, _| {
            let mut m = Mat::<f64>::new(Structure::General, n, n);
            ops::build_matrix(&mut m, (0..n * n).map(|k| k as f64))?;
            Ok(m.read(n - 1, n - 1))
        },
        3,
    );
    assert!(ok == Ok(8.0));
    assert!(exit_code(&ok) == 0);
}
