//! Exchange-correlation functional evaluation dispatch.
//!
//! This crate sits between a caller holding grid-point density data and a
//! native functional kernel: it classifies a functional (LDA / GGA /
//! meta-GGA), resolves the canonical variable set for a request, validates
//! and packs the heterogeneous inputs into the flat column layout the kernel
//! expects, invokes the kernel, and unpacks the named energy/potential
//! columns. It computes no exchange-correlation physics of its own beyond
//! the built-in reference kernel.
//!
//! ```
//! use nalgebra::DVector;
//! use xceval::Functional;
//!
//! let mut lda = Functional::new(&[("lda", 1.0)]).unwrap();
//! let density = DVector::from_row_slice(&[1.0]);
//! let out = lda.eval_potential(&density, None, None).unwrap();
//! // column 0: energy density, column 1: potential
//! assert!((out[(0, 0)] + 0.8101513).abs() < 1e-7);
//! ```

pub mod error;
pub mod functional;
pub mod kernel;
pub mod pack;
pub mod variables;

pub use error::XcError;
pub use functional::Functional;
pub use kernel::{NativeFunctional, NativeKernel, ReferenceKernel, XC_API_VERSION};
pub use pack::{energy_column, Spin};
pub use variables::{FunctionalClass, RequestKind, SpinMode, VariableSet};
