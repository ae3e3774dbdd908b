//! Error types for functional evaluation.

use crate::variables::RequestKind;

/// Errors raised while validating, configuring, or dispatching an
/// exchange-correlation evaluation request.
///
/// Everything except [`XcError::ConfigurationError`] is detected before the
/// native kernel is invoked. A failure aborts the single request; there is no
/// retry and no silent shape coercion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum XcError {
    /// A component name was not recognized by the kernel registry.
    #[error("unknown functional component: {name}")]
    UnknownFunctionalComponent { name: String },

    /// Energy/potential extraction is not offered for meta-GGA functionals.
    #[error("xc {kind} not supported for meta-GGAs")]
    UnsupportedFunctionalKind { kind: RequestKind },

    /// A gradient or Hessian argument required by the functional class and
    /// request kind was not supplied.
    #[error("missing required input: {what}")]
    MissingRequiredInput { what: &'static str },

    /// An argument does not have the shape the resolved variable set expects.
    #[error("wrong shape of {argument} argument [ {actual} instead of {expected} ]")]
    ShapeMismatch {
        argument: String,
        expected: String,
        actual: String,
    },

    /// The native setup call rejected the resolved configuration.
    #[error("functional setup failed with status code {code}")]
    ConfigurationError { code: i32 },
}
