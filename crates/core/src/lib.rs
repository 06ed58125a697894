//! Merl core: the shared data model of the language toolchain.
//!
//! Key design principles:
//! - `Value`: what evaluation talks about (tagged data, structural equality)
//! - `Expr`: the pinned, elaborated tree the evaluator walks
//! - Environments: lexical bindings, pinned content addresses, and the
//!   reader-scoped implicit environment are three separate maps

pub mod ast;
pub mod error;
pub mod hash;
pub mod module;
pub mod types;
pub mod value;

pub use ast::{Comment, Expr, ExtIdent, Lit, Pat, Pinned, TextChunk};
pub use error::EvalError;
pub use hash::VcHash;
pub use module::{BASE_MODULE, Module, ModuleEntry, ModuleMap, PinnedEnv};
pub use types::{Type, TypeScheme};
pub use value::{CustomValue, ImplEnv, NativeFn, VFun, Value};
