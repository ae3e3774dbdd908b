//! Functional handle and the evaluation pipeline.
//!
//! [`Functional`] owns one native kernel handle for its whole lifetime:
//! acquired at construction, classified once, released by `Drop` on every
//! exit path (including construction failure after a rejected component
//! name). Each evaluation runs the synchronous pipeline
//! resolve -> pack -> setup -> invoke -> unpack.
//!
//! A handle is not safe for concurrent evaluation calls; the eval entry
//! points take `&mut self` and callers wanting parallelism use one handle
//! per worker.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info};

use crate::error::XcError;
use crate::kernel::{NativeFunctional, NativeKernel, ReferenceKernel, XC_API_VERSION};
use crate::pack::{self, Spin};
use crate::variables::{self, FunctionalClass, RequestKind, SpinMode, VariableSet};

/// An exchange-correlation functional: a weighted sum of named components
/// with a derived, immutable classification.
pub struct Functional {
    backend: Box<dyn NativeFunctional>,
    class: FunctionalClass,
}

impl std::fmt::Debug for Functional {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Functional")
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

impl Functional {
    /// Build a functional from ordered (component name, weight) pairs using
    /// the built-in [`ReferenceKernel`].
    ///
    /// ```
    /// use xceval::Functional;
    /// let lda = Functional::new(&[("lda", 1.0)]).unwrap();
    /// assert_eq!(lda.classification() as u8, 0);
    /// ```
    pub fn new(weights: &[(&str, f64)]) -> Result<Self, XcError> {
        Self::with_kernel(&ReferenceKernel, weights)
    }

    /// Build a functional against a caller-supplied kernel.
    pub fn with_kernel(
        kernel: &dyn NativeKernel,
        weights: &[(&str, f64)],
    ) -> Result<Self, XcError> {
        let mut backend = kernel
            .create(XC_API_VERSION)
            .map_err(|code| XcError::ConfigurationError { code })?;
        for (name, weight) in weights {
            if backend.set_component(name, *weight) != 0 {
                // backend drops here, releasing the partially-built handle
                return Err(XcError::UnknownFunctionalComponent {
                    name: (*name).to_string(),
                });
            }
        }
        // Queried once; cached for the handle's lifetime.
        let class = if backend.is_meta_gga() {
            FunctionalClass::MetaGga
        } else if backend.is_gga() {
            FunctionalClass::Gga
        } else {
            FunctionalClass::Lda
        };
        info!(?class, components = weights.len(), "functional constructed");
        Ok(Self { backend, class })
    }

    /// Classification by highest density derivative: 0 = LDA, 1 = GGA,
    /// 2 = meta-GGA.
    pub fn classification(&self) -> FunctionalClass {
        self.class
    }

    /// Energy density at each point, spin-compensated.
    ///
    /// `gradient` is a `(points, 3)` matrix [x, y, z], required for GGA
    /// functionals.
    pub fn eval_energy(
        &mut self,
        density: &DVector<f64>,
        gradient: Option<&DMatrix<f64>>,
    ) -> Result<DVector<f64>, XcError> {
        let (vars, order) =
            variables::resolve(SpinMode::Compensated, self.class, RequestKind::EnergyOnly)?;
        let packed = pack::pack_compensated(vars, density, gradient, None)?;
        let out = self.dispatch(vars, RequestKind::EnergyOnly, order, packed)?;
        Ok(pack::energy_column(&out))
    }

    /// Energy density and potential, spin-compensated.
    ///
    /// `hessian` is a `(points, 6)` matrix [xx, xy, xz, yy, yz, zz];
    /// gradient and Hessian are required for GGA functionals. Output columns:
    /// 0 = energy density, 1 = potential.
    pub fn eval_potential(
        &mut self,
        density: &DVector<f64>,
        gradient: Option<&DMatrix<f64>>,
        hessian: Option<&DMatrix<f64>>,
    ) -> Result<DMatrix<f64>, XcError> {
        let (vars, order) = variables::resolve(
            SpinMode::Compensated,
            self.class,
            RequestKind::EnergyAndPotential,
        )?;
        let packed = pack::pack_compensated(vars, density, gradient, hessian)?;
        self.dispatch(vars, RequestKind::EnergyAndPotential, order, packed)
    }

    /// Energy density at each point, spin-resolved.
    ///
    /// `density` is `(points, 2)` [alpha, beta]; `gradient` carries one
    /// `(points, 3)` matrix per channel.
    pub fn eval_energy_ab(
        &mut self,
        density: &DMatrix<f64>,
        gradient: Option<&Spin<DMatrix<f64>>>,
    ) -> Result<DVector<f64>, XcError> {
        let (vars, order) =
            variables::resolve(SpinMode::Resolved, self.class, RequestKind::EnergyOnly)?;
        let packed = pack::pack_resolved(vars, density, gradient, None)?;
        let out = self.dispatch(vars, RequestKind::EnergyOnly, order, packed)?;
        Ok(pack::energy_column(&out))
    }

    /// Energy density and potentials, spin-resolved. Output columns:
    /// 0 = energy density, 1 = alpha potential, 2 = beta potential.
    pub fn eval_potential_ab(
        &mut self,
        density: &DMatrix<f64>,
        gradient: Option<&Spin<DMatrix<f64>>>,
        hessian: Option<&Spin<DMatrix<f64>>>,
    ) -> Result<DMatrix<f64>, XcError> {
        let (vars, order) = variables::resolve(
            SpinMode::Resolved,
            self.class,
            RequestKind::EnergyAndPotential,
        )?;
        let packed = pack::pack_resolved(vars, density, gradient, hessian)?;
        self.dispatch(vars, RequestKind::EnergyAndPotential, order, packed)
    }

    /// Configure the kernel, cross-check the reported widths against the
    /// packed layout, and invoke the evaluation.
    fn dispatch(
        &mut self,
        vars: VariableSet,
        kind: RequestKind,
        order: u8,
        packed: DMatrix<f64>,
    ) -> Result<DMatrix<f64>, XcError> {
        let npts = packed.nrows();

        let status = self.backend.setup(vars, kind, order);
        if status > 0 {
            return Err(XcError::ConfigurationError { code: status });
        }

        let inw = self.backend.input_length();
        if inw != packed.ncols() {
            return Err(XcError::ShapeMismatch {
                argument: "kernel input".to_string(),
                expected: format!("({}, {})", npts, packed.ncols()),
                actual: format!("({}, {})", npts, inw),
            });
        }
        let outw = variables::output_len(vars, kind, order);
        let reported = self.backend.output_length();
        if reported != outw {
            return Err(XcError::ShapeMismatch {
                argument: "kernel output".to_string(),
                expected: format!("({}, {})", npts, outw),
                actual: format!("({}, {})", npts, reported),
            });
        }

        debug!(?vars, order, points = npts, inw, outw, "invoking kernel");
        let result = self.backend.evaluate(&packed);
        if result.shape() != (npts, outw) {
            return Err(XcError::ShapeMismatch {
                argument: "kernel output".to_string(),
                expected: format!("({}, {})", npts, outw),
                actual: format!("({}, {})", result.nrows(), result.ncols()),
            });
        }
        Ok(result)
    }
}
