//! The pinned, elaborated abstract syntax tree.
//!
//! The evaluator only ever sees expressions in this form: every enum
//! constructor and operator occurrence has been resolved to a content
//! address, numeric literals have been wrapped in type-rep applications by
//! inference, and module sugar survives only as transparent wrappers.
//! Parsing and elaboration happen outside this workspace.

use crate::hash::VcHash;
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An identifier as the evaluator distinguishes it: an ordinary lexical
/// name or an implicit-parameter label (`?name`). The two namespaces never
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExtIdent {
    Var(String),
    Implicit(String),
}

impl fmt::Display for ExtIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtIdent::Var(name) => write!(f, "{}", name),
            ExtIdent::Implicit(name) => write!(f, "?{}", name),
        }
    }
}

/// Resolution tag on a referenced symbol.
///
/// Only `UnderVc` references contribute to a VC object's dependency set;
/// `Builtin` references resolve through the pinned environment but are
/// provided by the prelude rather than stored objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pinned {
    Local,
    Builtin(VcHash),
    UnderVc(VcHash),
}

impl Pinned {
    /// The resolved content address, if this reference has one.
    pub fn hash(&self) -> Option<VcHash> {
        match self {
            Pinned::Local => None,
            Pinned::Builtin(h) | Pinned::UnderVc(h) => Some(*h),
        }
    }
}

/// Literal constants as they appear in source.
///
/// Integer literals do not carry their runtime representation; inference
/// decides int-vs-double and records the choice as a `TypeRep` application
/// around the literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lit {
    Int(i64),
    Double(f64),
    /// Hex literals are 64-bit words
    Hex(u64),
    Text(String),
}

/// One piece of an interpolated string: verbatim text or a spliced
/// expression rendered through the canonical pretty form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextChunk {
    Str(String),
    Expr(Expr),
}

/// Source comments preserved by the parser. Evaluation ignores them and
/// content addressing strips them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comment {
    Line(String),
    Block(String),
}

/// A `case` pattern. Patterns are linear: a name binds at most once per
/// pattern, so merged bindings never collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pat {
    /// `_` when `None`, a binder otherwise
    Var(Option<String>),
    Lit(Lit),
    /// `#tag` with the owning enum's address
    Enum(Pinned, String),
    One(Box<Pat>),
    Empty,
    Tuple(Vec<Pat>),
}

/// The elaborated expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Lit(Lit),
    /// A variable occurrence. Pinned references resolve through the
    /// pinned environment; `Local` occurrences resolve through the
    /// lexical or implicit environment depending on the identifier.
    Var(Pinned, ExtIdent),
    /// `#tag`, owner resolved at elaboration time
    Enum(Pinned, String),
    /// Runtime type witness inserted by inference
    TypeRep(Type),
    InterpolatedText(Vec<TextChunk>),
    Array(Vec<Expr>),
    /// `[body | x <- src, y <- src2, cond]`; generators nest left to right
    ArrayComp {
        body: Box<Expr>,
        sources: Vec<(String, Expr)>,
        cond: Option<Box<Expr>>,
    },
    /// Binary operator application; the operator is a curried two-argument
    /// function in the pinned environment
    Op {
        lhs: Box<Expr>,
        pinned: Pinned,
        name: String,
        rhs: Box<Expr>,
    },
    /// Unary (prefix) operator application
    PreOp {
        pinned: Pinned,
        name: String,
        expr: Box<Expr>,
    },
    App(Box<Expr>, Box<Expr>),
    /// Curried lambda; `None` parameters consume and ignore their argument
    Lam(Vec<Option<ExtIdent>>, Box<Expr>),
    /// `let x = e in b`; an implicit identifier extends the implicit
    /// environment for the scope of the body
    Let(ExtIdent, Box<Expr>, Box<Expr>),
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    One(Box<Expr>),
    Empty,
    /// `assert c in e`
    Assert(Box<Expr>, Box<Expr>),
    /// First matching arm wins; falling off the end is a runtime error
    /// (static checking should have prevented it)
    Case(Box<Expr>, Vec<(Pat, Expr)>),
    CommentAbove(Comment, Box<Expr>),
    CommentAfter(Box<Expr>, Comment),
    CommentBelow(Box<Expr>, Comment),
    Bracketed(Box<Expr>),
    RenameModule(String, String, Box<Expr>),
    OpenModule(String, Box<Expr>),
}

impl Expr {
    pub fn app(f: Expr, a: Expr) -> Expr {
        Expr::App(Box::new(f), Box::new(a))
    }

    /// An integer literal already applied to its runtime representation,
    /// the shape elaboration produces.
    pub fn int_with_rep(n: i64, rep: Type) -> Expr {
        Expr::app(Expr::Lit(Lit::Int(n)), Expr::TypeRep(rep))
    }

    pub fn var(name: &str) -> Expr {
        Expr::Var(Pinned::Local, ExtIdent::Var(name.to_string()))
    }

    pub fn implicit(name: &str) -> Expr {
        Expr::Var(Pinned::Local, ExtIdent::Implicit(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_ident_display() {
        assert_eq!(ExtIdent::Var("x".into()).to_string(), "x");
        assert_eq!(ExtIdent::Implicit("cfg".into()).to_string(), "?cfg");
    }

    #[test]
    fn test_implicit_and_var_never_collide() {
        assert_ne!(
            ExtIdent::Var("x".to_string()),
            ExtIdent::Implicit("x".to_string())
        );
    }

    #[test]
    fn test_pinned_hash() {
        let h = VcHash([1; 32]);
        assert_eq!(Pinned::Local.hash(), None);
        assert_eq!(Pinned::Builtin(h).hash(), Some(h));
        assert_eq!(Pinned::UnderVc(h).hash(), Some(h));
    }
}
