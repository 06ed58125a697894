//! Merl runtime: the tree-walking evaluator and the host interop bridge.
//!
//! Key design principles:
//! - Evaluation is synchronous, deterministic, and never recovers: every
//!   error short-circuits to the host
//! - Operators and library functions are not primitive; the prelude
//!   installs them as `VFun`s in the pinned environment
//! - The cast bridge is the only place host types and `Value`s meet

pub mod cast;
pub mod eval;
pub mod prelude;

pub use cast::{
    Either, EpochSeconds, FromValue, ToType, ToValue, TypedFun, fun1, fun2, fun3, with_implicit,
};
pub use eval::{Env, as_bool, eval, match_pat};
pub use prelude::{op, prelude, vbool};
