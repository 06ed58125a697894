//! Runtime values.
//!
//! `Value` is what evaluation produces: pure tagged data, cheap to clone
//! (composite payloads share through `Arc` where it matters). Equality is
//! structural on every variant except functions, which never compare equal,
//! and custom values, which compare through their trait hook. The `Display`
//! impl is the language's canonical pretty form and is observable through
//! string interpolation.

use crate::error::EvalError;
use crate::hash::VcHash;
use crate::types::Type;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::ExtIdent;

/// The implicit environment: reader-scoped dynamic bindings (`?x`).
///
/// Callees inherit the caller's bindings unless they rebind; extension
/// copies the underlying map, so held references stay valid across calls.
#[derive(Debug, Clone, Default)]
pub struct ImplEnv {
    bindings: Arc<HashMap<ExtIdent, Value>>,
}

impl ImplEnv {
    pub fn new() -> ImplEnv {
        ImplEnv::default()
    }

    pub fn get(&self, ident: &ExtIdent) -> Option<&Value> {
        self.bindings.get(ident)
    }

    /// A copy of this environment with one extra binding.
    pub fn with(&self, ident: ExtIdent, value: Value) -> ImplEnv {
        let mut map = (*self.bindings).clone();
        map.insert(ident, value);
        ImplEnv {
            bindings: Arc::new(map),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Signature of every callable value: the implicit environment at the call
/// site plus the argument.
pub type NativeFn = dyn Fn(&ImplEnv, Value) -> Result<Value, EvalError> + Send + Sync;

/// A function value: a boxed closure over the implicit-environment
/// contract. Cloning shares the underlying closure.
#[derive(Clone)]
pub struct VFun(Arc<NativeFn>);

impl VFun {
    pub fn new(
        f: impl Fn(&ImplEnv, Value) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> VFun {
        VFun(Arc::new(f))
    }

    pub fn call(&self, implicits: &ImplEnv, arg: Value) -> Result<Value, EvalError> {
        (self.0)(implicits, arg)
    }
}

impl fmt::Debug for VFun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<<function>>")
    }
}

/// Host-defined opaque values (`Value::Custom`).
pub trait CustomValue: fmt::Debug + Send + Sync {
    /// Structural equality hook; return `false` for foreign types.
    fn eq_value(&self, other: &dyn CustomValue) -> bool;
    /// Canonical pretty form.
    fn pretty(&self) -> String;
    /// Downcasting support for hosts retrieving their own types.
    fn as_any(&self) -> &dyn Any;
}

/// A tagged runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Double(f64),
    Word16(u16),
    Word32(u32),
    Word64(u64),
    /// Seconds since the epoch
    EpochTime(i64),
    Text(String),
    /// Constructor tag plus the address of the enum that owns it
    Enum(VcHash, String),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    One(Box<Value>),
    Empty,
    Fun(VFun),
    TypeRep(Type),
    Custom(Arc<dyn CustomValue>),
}

impl Value {
    pub fn unit() -> Value {
        Value::Tuple(Vec::new())
    }

    /// The type-shaped name of this value's variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Word16(_) => "word16",
            Value::Word32(_) => "word32",
            Value::Word64(_) => "word64",
            Value::EpochTime(_) => "time",
            Value::Text(_) => "text",
            Value::Enum(_, _) => "enum",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
            Value::One(_) => "option",
            Value::Empty => "option",
            Value::Fun(_) => "function",
            Value::TypeRep(_) => "type rep",
            Value::Custom(_) => "custom",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Word16(a), Value::Word16(b)) => a == b,
            (Value::Word32(a), Value::Word32(b)) => a == b,
            (Value::Word64(a), Value::Word64(b)) => a == b,
            (Value::EpochTime(a), Value::EpochTime(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Enum(h1, t1), Value::Enum(h2, t2)) => h1 == h2 && t1 == t2,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::One(a), Value::One(b)) => a == b,
            (Value::Empty, Value::Empty) => true,
            (Value::TypeRep(a), Value::TypeRep(b)) => a == b,
            // Function equality is always false, and this is the behavior
            // the language's `==` exposes on functions.
            (Value::Fun(_), Value::Fun(_)) => false,
            (Value::Custom(a), Value::Custom(b)) => a.eq_value(b.as_ref()),
            _ => false,
        }
    }
}

/// Render a double so the int/double distinction survives printing.
fn fmt_double(f: &mut fmt::Formatter<'_>, d: f64) -> fmt::Result {
    if d.is_finite() && d == d.trunc() {
        write!(f, "{:.1}", d)
    } else {
        write!(f, "{}", d)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(d) => fmt_double(f, *d),
            Value::Word16(w) => write!(f, "0x{:x}", w),
            Value::Word32(w) => write!(f, "0x{:x}", w),
            Value::Word64(w) => write!(f, "0x{:x}", w),
            Value::EpochTime(s) => write!(f, "{}s", s),
            Value::Text(t) => write!(f, "{}", t),
            Value::Enum(_, tag) => write!(f, "#{}", tag),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Value::One(v) => write!(f, "Some {}", v),
            Value::Empty => write!(f, "None"),
            Value::Fun(_) => write!(f, "<<function>>"),
            Value::TypeRep(t) => write!(f, "<<type {}>>", t),
            Value::Custom(c) => write!(f, "{}", c.pretty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(Value::Int(3), Value::Int(3));
        assert_ne!(Value::Int(3), Value::Double(3.0));
        assert_eq!(
            Value::Tuple(vec![Value::Int(1), Value::Text("a".into())]),
            Value::Tuple(vec![Value::Int(1), Value::Text("a".into())])
        );
        assert_eq!(
            Value::One(Box::new(Value::Empty)),
            Value::One(Box::new(Value::Empty))
        );
    }

    #[test]
    fn test_functions_never_compare_equal() {
        let id = VFun::new(|_, v| Ok(v));
        let a = Value::Fun(id.clone());
        let b = Value::Fun(id);
        assert_ne!(a, b);
        assert_ne!(a, a.clone());
    }

    #[test]
    fn test_pretty_forms() {
        assert_eq!(Value::Word64(0x1f).to_string(), "0x1f");
        assert_eq!(Value::Word16(255).to_string(), "0xff");
        assert_eq!(Value::EpochTime(120).to_string(), "120s");
        assert_eq!(Value::Fun(VFun::new(|_, v| Ok(v))).to_string(), "<<function>>");
        assert_eq!(Value::One(Box::new(Value::Int(2))).to_string(), "Some 2");
        assert_eq!(Value::Empty.to_string(), "None");
        assert_eq!(Value::Double(7.0).to_string(), "7.0");
        assert_eq!(Value::Double(3.25).to_string(), "3.25");
        assert_eq!(
            Value::Array(vec![Value::Int(1), Value::Int(2)]).to_string(),
            "[1, 2]"
        );
        assert_eq!(Value::unit().to_string(), "()");
    }

    #[test]
    fn test_impl_env_extension_is_persistent() {
        let base = ImplEnv::new();
        let x = ExtIdent::Implicit("x".to_string());
        let extended = base.with(x.clone(), Value::Int(5));
        assert!(base.get(&x).is_none());
        assert_eq!(extended.get(&x), Some(&Value::Int(5)));
    }
}
