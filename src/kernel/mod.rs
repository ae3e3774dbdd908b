//! Native functional kernel interface and the built-in reference kernel.
//!
//! The dispatch layer talks to the kernel only through [`NativeKernel`] and
//! [`NativeFunctional`]: create a handle, register weighted components, query
//! the classification predicates, configure a variable set, and evaluate a
//! packed input matrix. Handle release is the trait object's `Drop`; the
//! owner in [`crate::functional`] guarantees exactly one release on every
//! exit path.
//!
//! [`ReferenceKernel`] is a compact in-crate implementation sufficient for
//! LDA (Slater exchange + VWN5 correlation) and PBE GGA exchange, with the
//! per-point mathematics in the `lda` and `pbe` submodules.

mod lda;
mod pbe;

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::variables::{self, FunctionalClass, RequestKind, VariableSet};

/// Interface version expected of a kernel; `create` rejects others.
pub const XC_API_VERSION: u32 = 2;

/// Factory for per-functional kernel handles.
pub trait NativeKernel {
    /// Create a fresh functional handle, or report a status code when the
    /// requested interface version is not supported.
    fn create(&self, api_version: u32) -> Result<Box<dyn NativeFunctional>, i32>;
}

/// One native functional object. Status-code convention: 0 = ok, > 0 =
/// invalid. Not safe for concurrent evaluation; callers serialize access.
pub trait NativeFunctional: Send {
    /// Register a named component with the given weight.
    fn set_component(&mut self, name: &str, weight: f64) -> i32;
    /// True if any component depends on the density gradient.
    fn is_gga(&self) -> bool;
    /// True if any component depends on the kinetic-energy density.
    fn is_meta_gga(&self) -> bool;
    /// Configure the evaluation for a variable set, request kind, and order.
    fn setup(&mut self, vars: VariableSet, kind: RequestKind, order: u8) -> i32;
    /// Input width of the configured variable set.
    fn input_length(&self) -> usize;
    /// Output width of the configured evaluation.
    fn output_length(&self) -> usize;
    /// Evaluate a packed `(points, input_length)` matrix into a
    /// `(points, output_length)` matrix.
    fn evaluate(&self, input: &DMatrix<f64>) -> DMatrix<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    SlaterX,
    Vwn5C,
    PbeX,
    TpssX,
}

impl Component {
    fn family(self) -> FunctionalClass {
        match self {
            Component::SlaterX | Component::Vwn5C => FunctionalClass::Lda,
            Component::PbeX => FunctionalClass::Gga,
            Component::TpssX => FunctionalClass::MetaGga,
        }
    }

    fn energy(self, d: &PointDensity) -> f64 {
        match self {
            Component::SlaterX => lda::slater_energy(d.a, d.b),
            Component::Vwn5C => lda::vwn5_energy(d.a, d.b),
            Component::PbeX => pbe::pbex_energy(d.a, d.b, &d.ga, &d.gb),
            Component::TpssX => unreachable!("meta-GGA evaluation is rejected at setup"),
        }
    }

    fn energy_potential(self, d: &PointDensity) -> (f64, f64, f64) {
        match self {
            Component::SlaterX => lda::slater_energy_potential(d.a, d.b),
            Component::Vwn5C => lda::vwn5_energy_potential(d.a, d.b),
            Component::PbeX => {
                pbe::pbex_energy_potential(d.a, d.b, &d.ga, &d.gb, &d.ha, &d.hb)
            }
            Component::TpssX => unreachable!("meta-GGA evaluation is rejected at setup"),
        }
    }
}

/// Registry lookup; names are case-insensitive, and `lda` is the usual
/// Slater + VWN5 composite.
fn components_for(name: &str) -> Option<&'static [Component]> {
    match name.to_ascii_lowercase().as_str() {
        "slaterx" => Some(&[Component::SlaterX]),
        "vwn5c" => Some(&[Component::Vwn5C]),
        "pbex" => Some(&[Component::PbeX]),
        "tpssx" => Some(&[Component::TpssX]),
        "lda" => Some(&[Component::SlaterX, Component::Vwn5C]),
        _ => None,
    }
}

/// Per-spin densities, gradients, and Hessians at one grid point.
/// Compensated variable sets map to alpha = beta = n/2 channels.
struct PointDensity {
    a: f64,
    b: f64,
    ga: [f64; 3],
    gb: [f64; 3],
    ha: [f64; 6],
    hb: [f64; 6],
}

impl PointDensity {
    fn from_row(m: &DMatrix<f64>, p: usize, vars: VariableSet) -> Self {
        let mut d = PointDensity {
            a: 0.0,
            b: 0.0,
            ga: [0.0; 3],
            gb: [0.0; 3],
            ha: [0.0; 6],
            hb: [0.0; 6],
        };
        match vars {
            VariableSet::N => {
                d.a = 0.5 * m[(p, 0)];
                d.b = d.a;
            }
            VariableSet::NNxNyNz => {
                d.a = 0.5 * m[(p, 0)];
                d.b = d.a;
                for c in 0..3 {
                    d.ga[c] = 0.5 * m[(p, 1 + c)];
                    d.gb[c] = d.ga[c];
                }
            }
            VariableSet::N2ndTaylor => {
                d.a = 0.5 * m[(p, 0)];
                d.b = d.a;
                for c in 0..3 {
                    d.ga[c] = 0.5 * m[(p, 1 + c)];
                    d.gb[c] = d.ga[c];
                }
                for c in 0..6 {
                    d.ha[c] = 0.5 * m[(p, 4 + c)];
                    d.hb[c] = d.ha[c];
                }
            }
            VariableSet::AB => {
                d.a = m[(p, 0)];
                d.b = m[(p, 1)];
            }
            VariableSet::ABAxAyAzBxByBz => {
                d.a = m[(p, 0)];
                d.b = m[(p, 1)];
                for c in 0..3 {
                    d.ga[c] = m[(p, 2 + c)];
                    d.gb[c] = m[(p, 5 + c)];
                }
            }
            VariableSet::AB2ndTaylor => {
                d.a = m[(p, 0)];
                d.b = m[(p, 10)];
                for c in 0..3 {
                    d.ga[c] = m[(p, 1 + c)];
                    d.gb[c] = m[(p, 11 + c)];
                }
                for c in 0..6 {
                    d.ha[c] = m[(p, 4 + c)];
                    d.hb[c] = m[(p, 14 + c)];
                }
            }
        }
        d
    }
}

struct EvalConfig {
    vars: VariableSet,
    kind: RequestKind,
    order: u8,
}

/// Built-in reference kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceKernel;

impl NativeKernel for ReferenceKernel {
    fn create(&self, api_version: u32) -> Result<Box<dyn NativeFunctional>, i32> {
        if api_version != XC_API_VERSION {
            return Err(1);
        }
        Ok(Box::new(ReferenceFunctional::default()))
    }
}

#[derive(Default)]
struct ReferenceFunctional {
    terms: Vec<(Component, f64)>,
    config: Option<EvalConfig>,
}

impl ReferenceFunctional {
    fn class(&self) -> FunctionalClass {
        self.terms
            .iter()
            .map(|(c, _)| c.family())
            .max()
            .unwrap_or(FunctionalClass::Lda)
    }
}

impl NativeFunctional for ReferenceFunctional {
    fn set_component(&mut self, name: &str, weight: f64) -> i32 {
        match components_for(name) {
            Some(components) => {
                for c in components {
                    self.terms.push((*c, weight));
                }
                0
            }
            None => 1,
        }
    }

    fn is_gga(&self) -> bool {
        self.class() >= FunctionalClass::Gga
    }

    fn is_meta_gga(&self) -> bool {
        self.class() == FunctionalClass::MetaGga
    }

    fn setup(&mut self, vars: VariableSet, kind: RequestKind, order: u8) -> i32 {
        // Meta-GGA components need kinetic-density variables that none of
        // the offered sets carry.
        if self.class() == FunctionalClass::MetaGga {
            return 1;
        }
        // A GGA functional cannot be evaluated from density-only variables.
        if self.class() == FunctionalClass::Gga
            && matches!(vars, VariableSet::N | VariableSet::AB)
        {
            return 2;
        }
        let order_ok = match kind {
            RequestKind::EnergyOnly => order == 0,
            RequestKind::EnergyAndPotential => order == 1,
        };
        if !order_ok {
            return 3;
        }
        // Potential extraction needs LDA or second-order Taylor variables.
        if kind == RequestKind::EnergyAndPotential
            && matches!(vars, VariableSet::NNxNyNz | VariableSet::ABAxAyAzBxByBz)
        {
            return 4;
        }
        self.config = Some(EvalConfig { vars, kind, order });
        0
    }

    fn input_length(&self) -> usize {
        self.config.as_ref().map(|c| c.vars.len()).unwrap_or(0)
    }

    fn output_length(&self) -> usize {
        self.config
            .as_ref()
            .map(|c| variables::output_len(c.vars, c.kind, c.order))
            .unwrap_or(0)
    }

    fn evaluate(&self, input: &DMatrix<f64>) -> DMatrix<f64> {
        let npts = input.nrows();
        let Some(cfg) = self.config.as_ref() else {
            return DMatrix::zeros(npts, 0);
        };
        let outw = variables::output_len(cfg.vars, cfg.kind, cfg.order);

        let mut out = vec![0.0; npts * outw];
        out.par_chunks_mut(outw).enumerate().for_each(|(p, row)| {
            let d = PointDensity::from_row(input, p, cfg.vars);
            match cfg.kind {
                RequestKind::EnergyOnly => {
                    row[0] = self.terms.iter().map(|(c, w)| w * c.energy(&d)).sum();
                }
                RequestKind::EnergyAndPotential => {
                    let mut e = 0.0;
                    let mut va = 0.0;
                    let mut vb = 0.0;
                    for (c, w) in &self.terms {
                        let (ce, cva, cvb) = c.energy_potential(&d);
                        e += w * ce;
                        va += w * cva;
                        vb += w * cvb;
                    }
                    row[0] = e;
                    // Compensated output carries a single potential column;
                    // the channels are identical there by construction.
                    row[1] = va;
                    if row.len() == 3 {
                        row[2] = vb;
                    }
                }
            }
        });
        DMatrix::from_row_slice(npts, outw, &out)
    }
}
