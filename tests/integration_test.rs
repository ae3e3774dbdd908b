//! End-to-end pipeline tests through the public API: construct functionals,
//! evaluate energies and potentials over a small grid, and check the
//! compensated and spin-resolved paths against each other.

use nalgebra::{DMatrix, DVector};
use xceval::{Functional, Spin, XcError};

fn grid() -> (DVector<f64>, DMatrix<f64>, DMatrix<f64>) {
    let density = DVector::from_row_slice(&[0.2, 0.65, 1.0, 1.7, 3.4]);
    let gradient = DMatrix::from_fn(5, 3, |i, j| {
        0.05 * (i as f64 + 1.0) * (j as f64 - 1.0) + 0.02
    });
    let hessian = DMatrix::from_fn(5, 6, |i, j| 0.01 * (i as f64) - 0.005 * (j as f64));
    (density, gradient, hessian)
}

fn halve(m: &DMatrix<f64>) -> DMatrix<f64> {
    m.map(|x| 0.5 * x)
}

#[test]
fn lda_pipeline_energy_column_matches_potential_output() {
    let (density, _, _) = grid();
    let mut lda = Functional::new(&[("lda", 1.0)]).unwrap();

    let energy = lda.eval_energy(&density, None).unwrap();
    let out = lda.eval_potential(&density, None, None).unwrap();
    assert_eq!(out.shape(), (5, 2));
    for p in 0..5 {
        assert!((energy[p] - out[(p, 0)]).abs() < 1e-13);
    }
}

#[test]
fn gga_resolved_halves_match_compensated_evaluation() {
    let (density, gradient, hessian) = grid();
    let mut xc = Functional::new(&[("pbex", 1.0), ("vwn5c", 1.0)]).unwrap();
    assert_eq!(xc.classification() as u8, 1);

    let ab = DMatrix::from_fn(5, 2, |i, _| 0.5 * density[i]);
    let grad_ab = Spin::new(halve(&gradient), halve(&gradient));
    let hess_ab = Spin::new(halve(&hessian), halve(&hessian));

    let e = xc.eval_energy(&density, Some(&gradient)).unwrap();
    let e_ab = xc.eval_energy_ab(&ab, Some(&grad_ab)).unwrap();
    for p in 0..5 {
        assert!((e[p] - e_ab[p]).abs() < 1e-12);
    }

    let v = xc
        .eval_potential(&density, Some(&gradient), Some(&hessian))
        .unwrap();
    let v_ab = xc
        .eval_potential_ab(&ab, Some(&grad_ab), Some(&hess_ab))
        .unwrap();
    assert_eq!(v.shape(), (5, 2));
    assert_eq!(v_ab.shape(), (5, 3));
    for p in 0..5 {
        assert!((v[(p, 0)] - v_ab[(p, 0)]).abs() < 1e-12);
        assert!((v[(p, 1)] - v_ab[(p, 1)]).abs() < 1e-12);
        assert!((v_ab[(p, 1)] - v_ab[(p, 2)]).abs() < 1e-12);
    }
}

#[test]
fn a_request_failure_leaves_the_handle_usable() {
    let (density, gradient, hessian) = grid();
    let mut xc = Functional::new(&[("pbex", 1.0)]).unwrap();

    // Each failure aborts only the single request.
    assert!(matches!(
        xc.eval_energy(&density, None),
        Err(XcError::MissingRequiredInput { .. })
    ));
    let bad = DMatrix::zeros(5, 4);
    assert!(matches!(
        xc.eval_potential(&density, Some(&bad), Some(&hessian)),
        Err(XcError::ShapeMismatch { .. })
    ));

    let out = xc
        .eval_potential(&density, Some(&gradient), Some(&hessian))
        .unwrap();
    assert_eq!(out.shape(), (5, 2));
    assert!(out.iter().all(|x| x.is_finite()));
}

#[test]
fn caller_arrays_are_never_mutated() {
    let (density, gradient, hessian) = grid();
    let density_before = density.clone();
    let gradient_before = gradient.clone();
    let hessian_before = hessian.clone();

    let mut xc = Functional::new(&[("pbex", 1.0), ("slaterx", 0.25)]).unwrap();
    xc.eval_potential(&density, Some(&gradient), Some(&hessian))
        .unwrap();

    assert_eq!(density, density_before);
    assert_eq!(gradient, gradient_before);
    assert_eq!(hessian, hessian_before);
}
