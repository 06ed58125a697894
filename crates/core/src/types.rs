//! The Merl type language.
//!
//! A conventional ML type term: base scalars, enums with a fixed
//! constructor set, arrows, arrays, optionals, and tuples. Type variables
//! appear in schemes attached to prelude entries and inferred scripts.
//! Inference itself lives outside this workspace; these terms flow through
//! type reps, hover markup, and the cast bridge's descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A monomorphic type term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Int,
    Double,
    Word16,
    Word32,
    Word64,
    Text,
    /// Seconds since the epoch
    Time,
    /// An enum definition: owner name plus the full constructor set
    Enum {
        name: String,
        constructors: BTreeSet<String>,
    },
    /// Type variable (quantified in a `TypeScheme`)
    Var(u32),
    Arrow(Box<Type>, Box<Type>),
    Array(Box<Type>),
    Optional(Box<Type>),
    /// `Tuple(vec![])` is the unit type
    Tuple(Vec<Type>),
}

impl Type {
    /// The bool enum type, the shape `if`/`assert` conditions require.
    pub fn bool() -> Type {
        Type::Enum {
            name: "bool".to_string(),
            constructors: ["false".to_string(), "true".to_string()].into(),
        }
    }

    pub fn unit() -> Type {
        Type::Tuple(Vec::new())
    }

    /// Right-associated function type over the given argument types.
    pub fn fun(args: Vec<Type>, ret: Type) -> Type {
        args.into_iter()
            .rev()
            .fold(ret, |acc, a| Type::Arrow(Box::new(a), Box::new(acc)))
    }
}

/// Render a type variable as 'a, 'b, ..., 'a1, 'b1, ...
fn fmt_var(f: &mut fmt::Formatter<'_>, v: u32) -> fmt::Result {
    let letter = (b'a' + (v % 26) as u8) as char;
    if v < 26 {
        write!(f, "'{}", letter)
    } else {
        write!(f, "'{}{}", letter, v / 26)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Double => write!(f, "double"),
            Type::Word16 => write!(f, "word16"),
            Type::Word32 => write!(f, "word32"),
            Type::Word64 => write!(f, "word64"),
            Type::Text => write!(f, "text"),
            Type::Time => write!(f, "time"),
            Type::Enum { name, .. } => write!(f, "{}", name),
            Type::Var(v) => fmt_var(f, *v),
            Type::Arrow(a, b) => {
                // Parenthesize arrow arguments so `(int → int) → int`
                // and `int → int → int` stay distinct.
                match a.as_ref() {
                    Type::Arrow(_, _) => write!(f, "({}) → {}", a, b),
                    _ => write!(f, "{} → {}", a, b),
                }
            }
            Type::Array(t) => write!(f, "array of {}", t),
            Type::Optional(t) => write!(f, "option of {}", t),
            Type::Tuple(ts) => {
                write!(f, "(")?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A polymorphic type: the set of quantified variables plus the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeScheme {
    pub vars: Vec<u32>,
    pub body: Type,
}

impl TypeScheme {
    /// A scheme with no quantified variables.
    pub fn mono(ty: Type) -> TypeScheme {
        TypeScheme {
            vars: Vec::new(),
            body: ty,
        }
    }

    /// Quantify every variable mentioned in `vars`.
    pub fn poly(vars: Vec<u32>, ty: Type) -> TypeScheme {
        TypeScheme { vars, body: ty }
    }
}

impl fmt::Display for TypeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.vars.is_empty() {
            write!(f, "forall ")?;
            for (i, v) in self.vars.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                fmt_var(f, *v)?;
            }
            write!(f, ". ")?;
        }
        write!(f, "{}", self.body)
    }
}
