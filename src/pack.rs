//! Input validation and flat column packing.
//!
//! The kernel consumes one contiguous matrix per request, with the column
//! layout fixed by the resolved [`VariableSet`]. The packers here validate
//! every argument shape (naming the offending argument and the expected vs.
//! actual shape), then allocate a fresh matrix and copy; caller-supplied
//! arrays are never mutated.
//!
//! Column layouts:
//! - compensated potential (10): [n, gx, gy, gz, hxx, hxy, hxz, hyy, hyz, hzz]
//! - resolved potential (20): alpha block (10) followed by beta block (10)
//! - energy-only layouts omit the Hessian block; LDA layouts omit both the
//!   gradient and the Hessian blocks.

use nalgebra::{DMatrix, DVector};

use crate::error::XcError;
use crate::variables::VariableSet;

/// Per-channel alpha/beta pair for spin-resolved gradient and Hessian
/// arguments. Each channel is a `(points, 3)` gradient or `(points, 6)`
/// symmetric-Hessian matrix.
#[derive(Debug, Clone)]
pub struct Spin<T> {
    pub alpha: T,
    pub beta: T,
}

impl<T> Spin<T> {
    pub fn new(alpha: T, beta: T) -> Self {
        Self { alpha, beta }
    }
}

fn matrix_shape(m: &DMatrix<f64>) -> String {
    format!("({}, {})", m.nrows(), m.ncols())
}

fn expect_shape(
    argument: &str,
    m: &DMatrix<f64>,
    rows: usize,
    cols: usize,
) -> Result<(), XcError> {
    if m.nrows() != rows || m.ncols() != cols {
        return Err(XcError::ShapeMismatch {
            argument: argument.to_string(),
            expected: format!("({}, {})", rows, cols),
            actual: matrix_shape(m),
        });
    }
    Ok(())
}

/// Pack a spin-compensated request into the layout of `vars`.
pub(crate) fn pack_compensated(
    vars: VariableSet,
    density: &DVector<f64>,
    gradient: Option<&DMatrix<f64>>,
    hessian: Option<&DMatrix<f64>>,
) -> Result<DMatrix<f64>, XcError> {
    let npts = density.len();
    match vars {
        VariableSet::N => {
            let mut packed = DMatrix::zeros(npts, 1);
            for p in 0..npts {
                packed[(p, 0)] = density[p];
            }
            Ok(packed)
        }
        VariableSet::NNxNyNz => {
            let grad = gradient.ok_or(XcError::MissingRequiredInput {
                what: "gradient required",
            })?;
            expect_shape("gradient", grad, npts, 3)?;
            let mut packed = DMatrix::zeros(npts, 4);
            for p in 0..npts {
                packed[(p, 0)] = density[p];
                for c in 0..3 {
                    packed[(p, 1 + c)] = grad[(p, c)];
                }
            }
            Ok(packed)
        }
        VariableSet::N2ndTaylor => {
            let (grad, hess) = match (gradient, hessian) {
                (Some(g), Some(h)) => (g, h),
                _ => {
                    return Err(XcError::MissingRequiredInput {
                        what: "gradient and Hessian required",
                    })
                }
            };
            expect_shape("gradient", grad, npts, 3)?;
            expect_shape("hessian", hess, npts, 6)?;
            let mut packed = DMatrix::zeros(npts, 10);
            for p in 0..npts {
                packed[(p, 0)] = density[p];
                for c in 0..3 {
                    packed[(p, 1 + c)] = grad[(p, c)];
                }
                for c in 0..6 {
                    packed[(p, 4 + c)] = hess[(p, c)];
                }
            }
            Ok(packed)
        }
        _ => unreachable!("spin-resolved variable set {vars:?} passed to the compensated packer"),
    }
}

/// Pack a spin-resolved request into the layout of `vars`.
///
/// The density is a `(points, 2)` matrix (alpha column, beta column); the
/// gradient and Hessian arrive as per-channel [`Spin`] pairs.
pub(crate) fn pack_resolved(
    vars: VariableSet,
    density: &DMatrix<f64>,
    gradient: Option<&Spin<DMatrix<f64>>>,
    hessian: Option<&Spin<DMatrix<f64>>>,
) -> Result<DMatrix<f64>, XcError> {
    if density.ncols() != 2 {
        return Err(XcError::ShapeMismatch {
            argument: "density".to_string(),
            expected: "(nr_points, 2)".to_string(),
            actual: matrix_shape(density),
        });
    }
    let npts = density.nrows();
    match vars {
        VariableSet::AB => {
            let mut packed = DMatrix::zeros(npts, 2);
            for p in 0..npts {
                packed[(p, 0)] = density[(p, 0)];
                packed[(p, 1)] = density[(p, 1)];
            }
            Ok(packed)
        }
        VariableSet::ABAxAyAzBxByBz => {
            let grad = gradient.ok_or(XcError::MissingRequiredInput {
                what: "gradient required",
            })?;
            expect_shape("gradient.alpha", &grad.alpha, npts, 3)?;
            expect_shape("gradient.beta", &grad.beta, npts, 3)?;
            let mut packed = DMatrix::zeros(npts, 8);
            for p in 0..npts {
                packed[(p, 0)] = density[(p, 0)];
                packed[(p, 1)] = density[(p, 1)];
                for c in 0..3 {
                    packed[(p, 2 + c)] = grad.alpha[(p, c)];
                    packed[(p, 5 + c)] = grad.beta[(p, c)];
                }
            }
            Ok(packed)
        }
        VariableSet::AB2ndTaylor => {
            let (grad, hess) = match (gradient, hessian) {
                (Some(g), Some(h)) => (g, h),
                _ => {
                    return Err(XcError::MissingRequiredInput {
                        what: "gradient and Hessian required",
                    })
                }
            };
            expect_shape("gradient.alpha", &grad.alpha, npts, 3)?;
            expect_shape("gradient.beta", &grad.beta, npts, 3)?;
            expect_shape("hessian.alpha", &hess.alpha, npts, 6)?;
            expect_shape("hessian.beta", &hess.beta, npts, 6)?;
            let mut packed = DMatrix::zeros(npts, 20);
            for p in 0..npts {
                packed[(p, 0)] = density[(p, 0)];
                packed[(p, 10)] = density[(p, 1)];
                for c in 0..3 {
                    packed[(p, 1 + c)] = grad.alpha[(p, c)];
                    packed[(p, 11 + c)] = grad.beta[(p, c)];
                }
                for c in 0..6 {
                    packed[(p, 4 + c)] = hess.alpha[(p, c)];
                    packed[(p, 14 + c)] = hess.beta[(p, c)];
                }
            }
            Ok(packed)
        }
        _ => unreachable!("spin-compensated variable set {vars:?} passed to the resolved packer"),
    }
}

/// Slice the energy-density column (column 0) out of a kernel output matrix.
pub fn energy_column(output: &DMatrix<f64>) -> DVector<f64> {
    output.column(0).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn density(n: usize) -> DVector<f64> {
        DVector::from_fn(n, |i, _| 0.5 + 0.1 * i as f64)
    }

    fn gradient(n: usize, offset: f64) -> DMatrix<f64> {
        DMatrix::from_fn(n, 3, |i, j| offset + i as f64 + 0.1 * j as f64)
    }

    fn hessian(n: usize, offset: f64) -> DMatrix<f64> {
        DMatrix::from_fn(n, 6, |i, j| offset - (i as f64) + 0.01 * j as f64)
    }

    #[test]
    fn n_taylor_pack_recovers_inputs_by_column_range() {
        let n = 4;
        let rho = density(n);
        let grad = gradient(n, 1.0);
        let hess = hessian(n, -2.0);
        let packed =
            pack_compensated(VariableSet::N2ndTaylor, &rho, Some(&grad), Some(&hess)).unwrap();
        assert_eq!(packed.shape(), (n, 10));
        for p in 0..n {
            assert_eq!(packed[(p, 0)], rho[p]);
            for c in 0..3 {
                assert_eq!(packed[(p, 1 + c)], grad[(p, c)]);
            }
            for c in 0..6 {
                assert_eq!(packed[(p, 4 + c)], hess[(p, c)]);
            }
        }
    }

    #[test]
    fn gga_energy_pack_layout() {
        let n = 3;
        let rho = density(n);
        let grad = gradient(n, 0.0);
        let packed = pack_compensated(VariableSet::NNxNyNz, &rho, Some(&grad), None).unwrap();
        assert_eq!(packed.shape(), (n, 4));
        assert_eq!(packed[(2, 0)], rho[2]);
        assert_eq!(packed[(2, 3)], grad[(2, 2)]);
    }

    #[test]
    fn ab_taylor_pack_keeps_alpha_block_before_beta_block() {
        let n = 2;
        let rho = DMatrix::from_fn(n, 2, |i, j| 1.0 + i as f64 + 10.0 * j as f64);
        let grad = Spin::new(gradient(n, 1.0), gradient(n, 100.0));
        let hess = Spin::new(hessian(n, 2.0), hessian(n, 200.0));
        let packed =
            pack_resolved(VariableSet::AB2ndTaylor, &rho, Some(&grad), Some(&hess)).unwrap();
        assert_eq!(packed.shape(), (n, 20));
        for p in 0..n {
            assert_eq!(packed[(p, 0)], rho[(p, 0)]);
            assert_eq!(packed[(p, 10)], rho[(p, 1)]);
            for c in 0..3 {
                assert_eq!(packed[(p, 1 + c)], grad.alpha[(p, c)]);
                assert_eq!(packed[(p, 11 + c)], grad.beta[(p, c)]);
            }
            for c in 0..6 {
                assert_eq!(packed[(p, 4 + c)], hess.alpha[(p, c)]);
                assert_eq!(packed[(p, 14 + c)], hess.beta[(p, c)]);
            }
        }
    }

    #[test]
    fn ab_gga_energy_pack_puts_both_densities_first() {
        let n = 2;
        let rho = DMatrix::from_fn(n, 2, |i, j| 1.0 + i as f64 + 10.0 * j as f64);
        let grad = Spin::new(gradient(n, 1.0), gradient(n, -1.0));
        let packed =
            pack_resolved(VariableSet::ABAxAyAzBxByBz, &rho, Some(&grad), None).unwrap();
        assert_eq!(packed.shape(), (n, 8));
        assert_eq!(packed[(1, 0)], rho[(1, 0)]);
        assert_eq!(packed[(1, 1)], rho[(1, 1)]);
        assert_eq!(packed[(1, 2)], grad.alpha[(1, 0)]);
        assert_eq!(packed[(1, 5)], grad.beta[(1, 0)]);
    }

    #[test]
    fn missing_gradient_for_gga_energy() {
        let rho = density(3);
        let err = pack_compensated(VariableSet::NNxNyNz, &rho, None, None).unwrap_err();
        assert_eq!(
            err,
            XcError::MissingRequiredInput {
                what: "gradient required"
            }
        );
    }

    #[test]
    fn missing_hessian_for_gga_potential() {
        let rho = density(3);
        let grad = gradient(3, 0.0);
        let err =
            pack_compensated(VariableSet::N2ndTaylor, &rho, Some(&grad), None).unwrap_err();
        assert_eq!(
            err,
            XcError::MissingRequiredInput {
                what: "gradient and Hessian required"
            }
        );
    }

    #[test]
    fn gradient_shape_mismatch_reports_expected_and_actual() {
        let rho = density(5);
        let bad = DMatrix::zeros(5, 4);
        let err = pack_compensated(VariableSet::NNxNyNz, &rho, Some(&bad), None).unwrap_err();
        assert_eq!(
            err,
            XcError::ShapeMismatch {
                argument: "gradient".to_string(),
                expected: "(5, 3)".to_string(),
                actual: "(5, 4)".to_string(),
            }
        );
    }

    #[test]
    fn point_count_disagreement_is_a_shape_mismatch() {
        let rho = density(4);
        let grad = gradient(3, 0.0);
        let hess = hessian(4, 0.0);
        let err = pack_compensated(VariableSet::N2ndTaylor, &rho, Some(&grad), Some(&hess))
            .unwrap_err();
        assert!(matches!(err, XcError::ShapeMismatch { argument, .. } if argument == "gradient"));
    }

    #[test]
    fn resolved_density_must_have_two_columns() {
        let rho = DMatrix::zeros(4, 3);
        let err = pack_resolved(VariableSet::AB, &rho, None, None).unwrap_err();
        assert_eq!(
            err,
            XcError::ShapeMismatch {
                argument: "density".to_string(),
                expected: "(nr_points, 2)".to_string(),
                actual: "(4, 3)".to_string(),
            }
        );
    }

    #[test]
    fn beta_channel_shape_is_checked_after_alpha() {
        let n = 3;
        let rho = DMatrix::from_element(n, 2, 0.5);
        let grad = Spin::new(gradient(n, 0.0), DMatrix::zeros(n, 4));
        let err =
            pack_resolved(VariableSet::ABAxAyAzBxByBz, &rho, Some(&grad), None).unwrap_err();
        assert!(
            matches!(err, XcError::ShapeMismatch { argument, .. } if argument == "gradient.beta")
        );
    }

    #[test]
    fn energy_column_takes_column_zero() {
        let out = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let e = energy_column(&out);
        assert_eq!(e.as_slice(), &[1.0, 3.0]);
    }
}
