//! Content-addressed identities for Merl objects.
//!
//! Functions, modules, and enums are stored and referenced by the SHA-256
//! of a canonical encoding. The encoding ignores comments, bracketing, and
//! lexical renaming, and it embeds the hashes of every referenced object,
//! so an object's address depends transitively on its dependencies (a
//! Merkle graph).

pub mod canonical;

use merl_core::ast::{Expr, Pat, Pinned, TextChunk};
use merl_core::hash::VcHash;
use merl_core::types::TypeScheme;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// A version-controlled object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VcObject {
    Function { expr: Expr, scheme: TypeScheme },
    TestFunction { expr: Expr },
    Module { exports: BTreeMap<String, VcHash> },
    Enum { name: String, constructors: BTreeSet<String> },
}

/// Provenance of an object relative to its predecessor revision.
///
/// These annotate the revision graph only; they never participate in the
/// object's hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VcObjectPred {
    /// First revision of a script
    Init,
    CompatibleWithPred(VcHash),
    IncompatibleWithPred(VcHash, Vec<String>),
    MarkedBreakingWithPred(VcHash),
    CloneOf(VcHash),
    /// Cloned from an object that has since been removed
    CloneOfRemoved(VcHash),
    /// Cloned from an object the store no longer knows
    CloneOfNotFound(VcHash),
}

/// Compute an object's content address over its canonical encoding.
///
/// The encoding is deterministic: enum constructor sets and module export
/// maps are ordered, expressions are canonicalized first, and bincode's
/// fixed layout does the rest.
pub fn hash_object(obj: &VcObject) -> VcHash {
    let canonical = match obj {
        VcObject::Function { expr, scheme } => VcObject::Function {
            expr: canonical::canonicalize(expr),
            scheme: scheme.clone(),
        },
        VcObject::TestFunction { expr } => VcObject::TestFunction {
            expr: canonical::canonicalize(expr),
        },
        VcObject::Module { .. } | VcObject::Enum { .. } => obj.clone(),
    };
    // Serialization of our own closed AST type cannot fail
    let bytes = bincode::serialize(&canonical).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    VcHash(hasher.finalize().into())
}

/// The set of hashes that must be present in the pinned environment before
/// this object can be evaluated.
pub fn dependencies(obj: &VcObject) -> BTreeSet<VcHash> {
    match obj {
        VcObject::Function { expr, .. } | VcObject::TestFunction { expr } => {
            let mut deps = BTreeSet::new();
            collect_expr_deps(expr, &mut deps);
            deps
        }
        VcObject::Module { exports } => exports.values().copied().collect(),
        VcObject::Enum { .. } => BTreeSet::new(),
    }
}

fn collect_pinned(pinned: &Pinned, deps: &mut BTreeSet<VcHash>) {
    // Builtin pins resolve through the prelude, not the store
    if let Pinned::UnderVc(h) = pinned {
        deps.insert(*h);
    }
}

fn collect_pat_deps(pat: &Pat, deps: &mut BTreeSet<VcHash>) {
    match pat {
        Pat::Enum(pinned, _) => collect_pinned(pinned, deps),
        Pat::One(inner) => collect_pat_deps(inner, deps),
        Pat::Tuple(items) => items.iter().for_each(|p| collect_pat_deps(p, deps)),
        Pat::Var(_) | Pat::Lit(_) | Pat::Empty => {}
    }
}

fn collect_expr_deps(expr: &Expr, deps: &mut BTreeSet<VcHash>) {
    match expr {
        Expr::Var(pinned, _) | Expr::Enum(pinned, _) => collect_pinned(pinned, deps),
        Expr::Lit(_) | Expr::Empty | Expr::TypeRep(_) => {}
        Expr::InterpolatedText(chunks) => {
            for chunk in chunks {
                if let TextChunk::Expr(e) = chunk {
                    collect_expr_deps(e, deps);
                }
            }
        }
        Expr::Array(items) | Expr::Tuple(items) => {
            items.iter().for_each(|e| collect_expr_deps(e, deps));
        }
        Expr::ArrayComp {
            body,
            sources,
            cond,
        } => {
            collect_expr_deps(body, deps);
            sources.iter().for_each(|(_, e)| collect_expr_deps(e, deps));
            if let Some(c) = cond {
                collect_expr_deps(c, deps);
            }
        }
        Expr::Op {
            lhs, pinned, rhs, ..
        } => {
            collect_pinned(pinned, deps);
            collect_expr_deps(lhs, deps);
            collect_expr_deps(rhs, deps);
        }
        Expr::PreOp { pinned, expr, .. } => {
            collect_pinned(pinned, deps);
            collect_expr_deps(expr, deps);
        }
        Expr::App(f, a) => {
            collect_expr_deps(f, deps);
            collect_expr_deps(a, deps);
        }
        Expr::Lam(_, body) | Expr::One(body) => collect_expr_deps(body, deps),
        Expr::Let(_, bound, body) => {
            collect_expr_deps(bound, deps);
            collect_expr_deps(body, deps);
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            collect_expr_deps(cond, deps);
            collect_expr_deps(then_branch, deps);
            collect_expr_deps(else_branch, deps);
        }
        Expr::Assert(cond, body) => {
            collect_expr_deps(cond, deps);
            collect_expr_deps(body, deps);
        }
        Expr::Case(scrutinee, arms) => {
            collect_expr_deps(scrutinee, deps);
            for (pat, body) in arms {
                collect_pat_deps(pat, deps);
                collect_expr_deps(body, deps);
            }
        }
        Expr::CommentAbove(_, inner)
        | Expr::CommentAfter(inner, _)
        | Expr::CommentBelow(inner, _)
        | Expr::Bracketed(inner)
        | Expr::RenameModule(_, _, inner)
        | Expr::OpenModule(_, inner) => collect_expr_deps(inner, deps),
    }
}

/// Deterministic address for a prelude builtin. Builtins are not stored
/// objects; their pins are derived from the qualified name alone.
pub fn builtin_hash(module: &str, name: &str) -> VcHash {
    let mut hasher = Sha256::new();
    hasher.update(b"builtin:");
    hasher.update(module.as_bytes());
    hasher.update(b".");
    hasher.update(name.as_bytes());
    VcHash(hasher.finalize().into())
}

/// The well-known address of the bool enum, used by `if`, `assert`, and
/// comprehension conditions to recognize their condition values.
pub fn bool_enum_hash() -> VcHash {
    static HASH: OnceLock<VcHash> = OnceLock::new();
    *HASH.get_or_init(|| {
        hash_object(&VcObject::Enum {
            name: "bool".to_string(),
            constructors: ["false".to_string(), "true".to_string()].into(),
        })
    })
}
