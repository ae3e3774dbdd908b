//! Canonical variable sets and the dispatch table that selects one.
//!
//! A request is described by three tags: the spin mode of the supplied
//! density, the functional class, and whether the caller wants only the
//! energy density or also the potential. [`resolve`] maps each combination to
//! the variable set the kernel must be configured with, together with the
//! derivative order of the evaluation.

use std::fmt;

use crate::error::XcError;

/// Functional classification by the highest density derivative it depends on.
///
/// The numeric values are part of the public API (0 = LDA, 1 = GGA,
/// 2 = meta-GGA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FunctionalClass {
    /// Depends on the density only.
    Lda = 0,
    /// Depends on the density and its gradient.
    Gga = 1,
    /// Additionally depends on the kinetic-energy density; unsupported by
    /// this layer's energy/potential extraction.
    MetaGga = 2,
}

/// Single total-density channel vs. separate alpha/beta channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinMode {
    Compensated,
    Resolved,
}

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    EnergyOnly,
    EnergyAndPotential,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::EnergyOnly => write!(f, "energy"),
            RequestKind::EnergyAndPotential => write!(f, "potential"),
        }
    }
}

/// Canonical ordered selection of density-derivative quantities handed to
/// the kernel, with a fixed column count and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSet {
    /// [n]
    N,
    /// [n, gx, gy, gz]
    NNxNyNz,
    /// [n, grad(3), hess(6)]
    N2ndTaylor,
    /// [a, b]
    AB,
    /// [a, b, ga(3), gb(3)]
    ABAxAyAzBxByBz,
    /// alpha block [a, ga(3), ha(6)] followed by the same beta block
    AB2ndTaylor,
}

impl VariableSet {
    /// Number of input columns the kernel expects for this variable set.
    pub fn len(&self) -> usize {
        match self {
            VariableSet::N => 1,
            VariableSet::NNxNyNz => 4,
            VariableSet::N2ndTaylor => 10,
            VariableSet::AB => 2,
            VariableSet::ABAxAyAzBxByBz => 8,
            VariableSet::AB2ndTaylor => 20,
        }
    }

    pub fn spin_mode(&self) -> SpinMode {
        match self {
            VariableSet::N | VariableSet::NNxNyNz | VariableSet::N2ndTaylor => {
                SpinMode::Compensated
            }
            VariableSet::AB | VariableSet::ABAxAyAzBxByBz | VariableSet::AB2ndTaylor => {
                SpinMode::Resolved
            }
        }
    }

    /// Number of independent density channels (1 compensated, 2 resolved).
    pub fn density_channels(&self) -> usize {
        match self.spin_mode() {
            SpinMode::Compensated => 1,
            SpinMode::Resolved => 2,
        }
    }
}

/// Select the variable set and derivative order for a request.
///
/// Meta-GGAs resolve to [`XcError::UnsupportedFunctionalKind`] for both
/// request kinds.
pub fn resolve(
    spin: SpinMode,
    class: FunctionalClass,
    kind: RequestKind,
) -> Result<(VariableSet, u8), XcError> {
    use FunctionalClass::*;
    use RequestKind::*;
    use SpinMode::*;

    match (spin, class, kind) {
        (_, MetaGga, kind) => Err(XcError::UnsupportedFunctionalKind { kind }),
        (Compensated, Lda, EnergyOnly) => Ok((VariableSet::N, 0)),
        (Compensated, Lda, EnergyAndPotential) => Ok((VariableSet::N, 1)),
        (Compensated, Gga, EnergyOnly) => Ok((VariableSet::NNxNyNz, 0)),
        (Compensated, Gga, EnergyAndPotential) => Ok((VariableSet::N2ndTaylor, 1)),
        (Resolved, Lda, EnergyOnly) => Ok((VariableSet::AB, 0)),
        (Resolved, Lda, EnergyAndPotential) => Ok((VariableSet::AB, 1)),
        (Resolved, Gga, EnergyOnly) => Ok((VariableSet::ABAxAyAzBxByBz, 0)),
        (Resolved, Gga, EnergyAndPotential) => Ok((VariableSet::AB2ndTaylor, 1)),
    }
}

/// Number of distinct partial derivatives up to `order` in `nvars` variables,
/// i.e. C(nvars + order, order). This is the output width of an energy-mode
/// evaluation.
pub fn taylor_len(nvars: usize, order: u8) -> usize {
    let order = order as usize;
    let mut len = 1usize;
    for k in 1..=order {
        len = len * (nvars + k) / k;
    }
    len
}

/// Output width intrinsic to (variable set, request kind, order).
///
/// Energy-mode output is the full derivative triangle; potential mode yields
/// the energy density plus one potential column per density channel.
pub fn output_len(vars: VariableSet, kind: RequestKind, order: u8) -> usize {
    match kind {
        RequestKind::EnergyOnly => taylor_len(vars.len(), order),
        RequestKind::EnergyAndPotential => 1 + vars.density_channels(),
    }
}
