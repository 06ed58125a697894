//! Evaluation error types.
//!
//! Every error aborts the current evaluation and propagates to the host;
//! the evaluator never recovers internally.

use std::fmt;

/// Error raised while evaluating a script or coercing values across the
/// host boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Shape or tag mismatch, missing binding, un-pinned reference
    RuntimeError(String),
    /// An `assert` expression evaluated its condition to `#false`
    AssertionFailed,
    /// Host interop coercion failure (see the cast bridge)
    CastError(String),
    /// An implicit parameter was not bound in the implicit environment
    NotFoundInImplicitEnv(String),
}

impl EvalError {
    /// Convenience constructor used throughout the evaluator.
    pub fn runtime(msg: impl Into<String>) -> EvalError {
        EvalError::RuntimeError(msg.into())
    }

    pub fn cast(msg: impl Into<String>) -> EvalError {
        EvalError::CastError(msg.into())
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::RuntimeError(msg) => write!(f, "runtime error: {}", msg),
            EvalError::AssertionFailed => write!(f, "assertion failed"),
            EvalError::CastError(msg) => write!(f, "cast error: {}", msg),
            EvalError::NotFoundInImplicitEnv(name) => {
                write!(f, "implicit parameter ?{} is not bound", name)
            }
        }
    }
}

impl std::error::Error for EvalError {}
