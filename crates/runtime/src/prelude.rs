//! The prelude: every operator and builtin the elaborator can pin.
//!
//! Arithmetic, comparison, bit, array, option, text, and time operations
//! are not primitive in the evaluator; they are `VFun`s installed in the
//! pinned environment under deterministic builtin addresses. The module
//! map is also what the LSP core reads for completion and what inference
//! consults for builtin types.

use crate::cast::{EpochSeconds, fun1, fun2};
use merl_core::error::EvalError;
use merl_core::hash::VcHash;
use merl_core::module::{BASE_MODULE, Module, ModuleEntry, ModuleMap};
use merl_core::types::{Type, TypeScheme};
use merl_core::value::{VFun, Value};
use merl_vc::{bool_enum_hash, builtin_hash};
use std::cmp::Ordering;

/// The bool enum value the language's conditionals recognize.
pub fn vbool(b: bool) -> Value {
    let tag = if b { "true" } else { "false" };
    Value::Enum(bool_enum_hash(), tag.to_string())
}

/// Address of an unqualified (base-module) operator or builtin.
pub fn op(name: &str) -> VcHash {
    builtin_hash(BASE_MODULE, name)
}

// ---------------------------------------------------------------------
// Numeric dispatch
// ---------------------------------------------------------------------

type IntOp = fn(i64, i64) -> Result<i64, EvalError>;
type DblOp = fn(f64, f64) -> f64;
type WordOp = fn(u64, u64) -> Result<u64, EvalError>;

fn word_parts(value: &Value) -> Option<(u64, u32)> {
    match value {
        Value::Word16(w) => Some((u64::from(*w), 16)),
        Value::Word32(w) => Some((u64::from(*w), 32)),
        Value::Word64(w) => Some((*w, 64)),
        _ => None,
    }
}

/// Truncate back into the result width. Mixed-width operands widen.
fn word_of(bits: u32, raw: u64) -> Value {
    match bits {
        16 => Value::Word16(raw as u16),
        32 => Value::Word32(raw as u32),
        _ => Value::Word64(raw),
    }
}

fn apply_num2(
    name: &str,
    a: &Value,
    b: &Value,
    int_f: IntOp,
    dbl_f: DblOp,
    word_f: WordOp,
) -> Result<Value, EvalError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => int_f(*x, *y).map(Value::Int),
        (Value::Double(x), Value::Double(y)) => Ok(Value::Double(dbl_f(*x, *y))),
        // Mixed int/double promotes to double
        (Value::Int(x), Value::Double(y)) => Ok(Value::Double(dbl_f(*x as f64, *y))),
        (Value::Double(x), Value::Int(y)) => Ok(Value::Double(dbl_f(*x, *y as f64))),
        _ => match (word_parts(a), word_parts(b)) {
            (Some((x, wa)), Some((y, wb))) => word_f(x, y).map(|r| word_of(wa.max(wb), r)),
            _ => Err(EvalError::runtime(format!(
                "cannot apply {} to {} and {}",
                name,
                a.kind(),
                b.kind()
            ))),
        },
    }
}

fn arith(name: &'static str, int_f: IntOp, dbl_f: DblOp, word_f: WordOp) -> Value {
    fun2(move |a: Value, b: Value| apply_num2(name, &a, &b, int_f, dbl_f, word_f))
}

fn div_by_zero() -> EvalError {
    EvalError::runtime("division by zero")
}

fn compare_values(name: &str, a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Double(x), Value::Double(y)) => Ok(x.total_cmp(y)),
        (Value::Int(x), Value::Double(y)) => Ok((*x as f64).total_cmp(y)),
        (Value::Double(x), Value::Int(y)) => Ok(x.total_cmp(&(*y as f64))),
        (Value::Text(x), Value::Text(y)) => Ok(x.cmp(y)),
        (Value::EpochTime(x), Value::EpochTime(y)) => Ok(x.cmp(y)),
        _ => match (word_parts(a), word_parts(b)) {
            (Some((x, _)), Some((y, _))) => Ok(x.cmp(&y)),
            _ => Err(EvalError::runtime(format!(
                "cannot apply {} to {} and {}",
                name,
                a.kind(),
                b.kind()
            ))),
        },
    }
}

fn comparison(name: &'static str, accepts: fn(Ordering) -> bool) -> Value {
    fun2(move |a: Value, b: Value| compare_values(name, &a, &b).map(accepts))
}

fn extremum(name: &'static str, pick_greater: bool) -> Value {
    fun2(move |a: Value, b: Value| {
        let ord = compare_values(name, &a, &b)?;
        let mixed = matches!(
            (&a, &b),
            (Value::Int(_), Value::Double(_)) | (Value::Double(_), Value::Int(_))
        );
        let chosen = if (ord == Ordering::Less) == pick_greater {
            b
        } else {
            a
        };
        // Keep the result type stable when int and double mix
        if mixed {
            if let Value::Int(n) = chosen {
                return Ok(Value::Double(n as f64));
            }
        }
        Ok(chosen)
    })
}

fn dbl_fun(f: fn(f64) -> f64) -> Value {
    fun1(move |d: f64| Ok(f(d)))
}

// ---------------------------------------------------------------------
// Higher-order builtins (these thread the caller's implicit environment
// into the script functions they apply)
// ---------------------------------------------------------------------

fn as_fun(value: Value) -> Result<VFun, EvalError> {
    match value {
        Value::Fun(f) => Ok(f),
        other => Err(EvalError::cast(format!(
            "could not cast {} to a function",
            other
        ))),
    }
}

fn as_array(value: Value) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(EvalError::cast(format!(
            "could not cast {} to an array",
            other
        ))),
    }
}

fn array_map() -> Value {
    Value::Fun(VFun::new(|_, f| {
        let f = as_fun(f)?;
        Ok(Value::Fun(VFun::new(move |implicits, arr| {
            let items = as_array(arr)?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(f.call(implicits, item)?);
            }
            Ok(Value::Array(out))
        })))
    }))
}

fn array_filter() -> Value {
    Value::Fun(VFun::new(|_, f| {
        let f = as_fun(f)?;
        Ok(Value::Fun(VFun::new(move |implicits, arr| {
            let items = as_array(arr)?;
            let mut out = Vec::new();
            for item in items {
                let verdict = f.call(implicits, item.clone())?;
                match crate::eval::as_bool(&verdict) {
                    Some(true) => out.push(item),
                    Some(false) => {}
                    None => {
                        return Err(EvalError::runtime(format!(
                            "filter predicate must return a bool, got {}",
                            verdict.kind()
                        )));
                    }
                }
            }
            Ok(Value::Array(out))
        })))
    }))
}

fn array_reduce() -> Value {
    Value::Fun(VFun::new(|_, f| {
        let f = as_fun(f)?;
        Ok(Value::Fun(VFun::new(move |_, init| {
            let f = f.clone();
            Ok(Value::Fun(VFun::new(move |implicits, arr| {
                let items = as_array(arr)?;
                let mut acc = init.clone();
                for item in items {
                    let partial = as_fun(f.call(implicits, acc)?)?;
                    acc = partial.call(implicits, item)?;
                }
                Ok(acc)
            })))
        })))
    }))
}

fn array_sum() -> Value {
    fun1(|v: Value| {
        let items = as_array(v)?;
        let mut acc = Value::Int(0);
        for item in items {
            acc = apply_num2(
                "Array.sum",
                &acc,
                &item,
                |x, y| Ok(x.wrapping_add(y)),
                |x, y| x + y,
                |x, y| Ok(x.wrapping_add(y)),
            )?;
        }
        Ok(acc)
    })
}

fn option_map() -> Value {
    Value::Fun(VFun::new(|_, f| {
        let f = as_fun(f)?;
        Ok(Value::Fun(VFun::new(move |implicits, opt| match opt {
            Value::One(v) => Ok(Value::One(Box::new(f.call(implicits, *v)?))),
            Value::Empty => Ok(Value::Empty),
            other => Err(EvalError::cast(format!(
                "could not cast {} to an option",
                other
            ))),
        })))
    }))
}

fn unwrap_option(opt: Value, default: Value) -> Result<Value, EvalError> {
    match opt {
        Value::One(v) => Ok(*v),
        Value::Empty => Ok(default),
        other => Err(EvalError::cast(format!(
            "could not cast {} to an option",
            other
        ))),
    }
}

// ---------------------------------------------------------------------
// Bit operations
// ---------------------------------------------------------------------

fn bit2(name: &'static str, f: fn(u64, u64) -> u64) -> Value {
    fun2(move |a: Value, b: Value| match (word_parts(&a), word_parts(&b)) {
        (Some((x, wa)), Some((y, wb))) => Ok(word_of(wa.max(wb), f(x, y))),
        _ => Err(EvalError::runtime(format!(
            "cannot apply {} to {} and {}",
            name,
            a.kind(),
            b.kind()
        ))),
    })
}

fn shift(name: &'static str, left: bool) -> Value {
    fun2(move |a: Value, n: i64| {
        let (x, bits) = word_parts(&a).ok_or_else(|| {
            EvalError::runtime(format!("cannot apply {} to {}", name, a.kind()))
        })?;
        if !(0..64).contains(&n) {
            return Err(EvalError::runtime(format!(
                "shift amount {} out of range",
                n
            )));
        }
        let r = if left { x << n } else { x >> n };
        Ok(word_of(bits, r))
    })
}

// ---------------------------------------------------------------------
// Module assembly
// ---------------------------------------------------------------------

struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    fn new(name: &str) -> ModuleBuilder {
        ModuleBuilder {
            module: Module::new(name),
        }
    }

    fn add(&mut self, name: &str, scheme: TypeScheme, value: Value) {
        let hash = builtin_hash(&self.module.name, name);
        self.module.entries.insert(
            name.to_string(),
            ModuleEntry {
                scheme,
                value,
                hash,
            },
        );
    }

    fn finish(self) -> Module {
        self.module
    }
}

fn a() -> Type {
    Type::Var(0)
}

fn b() -> Type {
    Type::Var(1)
}

/// forall 'a. 'a → 'a → 'a
fn binop_scheme() -> TypeScheme {
    TypeScheme::poly(vec![0], Type::fun(vec![a(), a()], a()))
}

/// forall 'a. 'a → 'a → bool
fn rel_scheme() -> TypeScheme {
    TypeScheme::poly(vec![0], Type::fun(vec![a(), a()], Type::bool()))
}

fn base_module() -> Module {
    let mut m = ModuleBuilder::new(BASE_MODULE);

    m.add(
        "+",
        binop_scheme(),
        arith("+", |x, y| Ok(x.wrapping_add(y)), |x, y| x + y, |x, y| {
            Ok(x.wrapping_add(y))
        }),
    );
    m.add(
        "-",
        binop_scheme(),
        arith("-", |x, y| Ok(x.wrapping_sub(y)), |x, y| x - y, |x, y| {
            Ok(x.wrapping_sub(y))
        }),
    );
    m.add(
        "*",
        binop_scheme(),
        arith("*", |x, y| Ok(x.wrapping_mul(y)), |x, y| x * y, |x, y| {
            Ok(x.wrapping_mul(y))
        }),
    );
    m.add(
        "/",
        binop_scheme(),
        arith(
            "/",
            |x, y| {
                if y == 0 {
                    Err(div_by_zero())
                } else {
                    Ok(x.wrapping_div(y))
                }
            },
            |x, y| x / y,
            |x, y| if y == 0 { Err(div_by_zero()) } else { Ok(x / y) },
        ),
    );
    m.add(
        "%",
        binop_scheme(),
        arith(
            "%",
            |x, y| {
                if y == 0 {
                    Err(div_by_zero())
                } else {
                    Ok(x.wrapping_rem(y))
                }
            },
            |x, y| x % y,
            |x, y| if y == 0 { Err(div_by_zero()) } else { Ok(x % y) },
        ),
    );

    m.add("==", rel_scheme(), fun2(|x: Value, y: Value| Ok(x == y)));
    m.add("!=", rel_scheme(), fun2(|x: Value, y: Value| Ok(x != y)));
    m.add("<", rel_scheme(), comparison("<", |o| o == Ordering::Less));
    m.add(
        "<=",
        rel_scheme(),
        comparison("<=", |o| o != Ordering::Greater),
    );
    m.add(
        ">",
        rel_scheme(),
        comparison(">", |o| o == Ordering::Greater),
    );
    m.add(">=", rel_scheme(), comparison(">=", |o| o != Ordering::Less));

    let bool2 = TypeScheme::mono(Type::fun(vec![Type::bool(), Type::bool()], Type::bool()));
    m.add("&&", bool2.clone(), fun2(|x: bool, y: bool| Ok(x && y)));
    m.add("||", bool2, fun2(|x: bool, y: bool| Ok(x || y)));
    m.add(
        "!",
        TypeScheme::mono(Type::fun(vec![Type::bool()], Type::bool())),
        fun1(|x: bool| Ok(!x)),
    );

    m.add(
        "..",
        TypeScheme::mono(Type::fun(
            vec![Type::Int, Type::Int],
            Type::Array(Box::new(Type::Int)),
        )),
        fun2(|lo: i64, hi: i64| Ok((lo..=hi).map(Value::Int).collect::<Vec<_>>())),
    );

    m.add(
        "?",
        TypeScheme::poly(
            vec![0],
            Type::fun(vec![Type::Optional(Box::new(a())), a()], a()),
        ),
        fun2(unwrap_option),
    );

    m.add("max", binop_scheme(), extremum("max", true));
    m.add("min", binop_scheme(), extremum("min", false));
    m.add(
        "abs",
        TypeScheme::poly(vec![0], Type::fun(vec![a()], a())),
        fun1(|v: Value| match v {
            Value::Int(n) => Ok(Value::Int(n.wrapping_abs())),
            Value::Double(d) => Ok(Value::Double(d.abs())),
            other => Err(EvalError::runtime(format!(
                "cannot apply abs to {}",
                other.kind()
            ))),
        }),
    );
    m.add(
        "negate",
        TypeScheme::poly(vec![0], Type::fun(vec![a()], a())),
        fun1(|v: Value| match v {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Double(d) => Ok(Value::Double(-d)),
            other => Err(EvalError::runtime(format!(
                "cannot negate {}",
                other.kind()
            ))),
        }),
    );

    let dbl1 = TypeScheme::mono(Type::fun(vec![Type::Double], Type::Double));
    m.add("floor", dbl1.clone(), dbl_fun(f64::floor));
    m.add("ceiling", dbl1.clone(), dbl_fun(f64::ceil));
    m.add("round", dbl1.clone(), dbl_fun(f64::round));
    m.add("sqrt", dbl1.clone(), dbl_fun(f64::sqrt));
    m.add("exp", dbl1.clone(), dbl_fun(f64::exp));
    m.add("ln", dbl1.clone(), dbl_fun(f64::ln));
    m.add("sin", dbl1.clone(), dbl_fun(f64::sin));
    m.add("cos", dbl1.clone(), dbl_fun(f64::cos));
    m.add("tan", dbl1, dbl_fun(f64::tan));

    m.finish()
}

fn array_module() -> Module {
    let mut m = ModuleBuilder::new("Array");
    let arr = |t: Type| Type::Array(Box::new(t));

    m.add(
        "length",
        TypeScheme::poly(vec![0], Type::fun(vec![arr(a())], Type::Int)),
        fun1(|v: Value| Ok(as_array(v)?.len() as i64)),
    );
    m.add(
        "map",
        TypeScheme::poly(
            vec![0, 1],
            Type::fun(vec![Type::fun(vec![a()], b()), arr(a())], arr(b())),
        ),
        array_map(),
    );
    m.add(
        "filter",
        TypeScheme::poly(
            vec![0],
            Type::fun(vec![Type::fun(vec![a()], Type::bool()), arr(a())], arr(a())),
        ),
        array_filter(),
    );
    m.add(
        "reduce",
        TypeScheme::poly(
            vec![0, 1],
            Type::fun(
                vec![Type::fun(vec![a(), b()], a()), a(), arr(b())],
                a(),
            ),
        ),
        array_reduce(),
    );
    m.add(
        "sum",
        TypeScheme::poly(vec![0], Type::fun(vec![arr(a())], a())),
        array_sum(),
    );
    m.add(
        "range",
        TypeScheme::mono(Type::fun(vec![Type::Int, Type::Int], arr(Type::Int))),
        fun2(|lo: i64, hi: i64| Ok((lo..=hi).map(Value::Int).collect::<Vec<_>>())),
    );

    m.finish()
}

fn option_module() -> Module {
    let mut m = ModuleBuilder::new("Option");
    let opt = |t: Type| Type::Optional(Box::new(t));

    m.add(
        "map",
        TypeScheme::poly(
            vec![0, 1],
            Type::fun(vec![Type::fun(vec![a()], b()), opt(a())], opt(b())),
        ),
        option_map(),
    );
    m.add(
        "fromOption",
        TypeScheme::poly(vec![0], Type::fun(vec![a(), opt(a())], a())),
        fun2(|default: Value, o: Value| unwrap_option(o, default)),
    );
    m.add(
        "isSome",
        TypeScheme::poly(vec![0], Type::fun(vec![opt(a())], Type::bool())),
        fun1(|v: Value| match v {
            Value::One(_) => Ok(true),
            Value::Empty => Ok(false),
            other => Err(EvalError::cast(format!(
                "could not cast {} to an option",
                other
            ))),
        }),
    );
    m.add(
        "isNone",
        TypeScheme::poly(vec![0], Type::fun(vec![opt(a())], Type::bool())),
        fun1(|v: Value| match v {
            Value::One(_) => Ok(false),
            Value::Empty => Ok(true),
            other => Err(EvalError::cast(format!(
                "could not cast {} to an option",
                other
            ))),
        }),
    );

    m.finish()
}

fn text_module() -> Module {
    let mut m = ModuleBuilder::new("Text");

    m.add(
        "length",
        TypeScheme::mono(Type::fun(vec![Type::Text], Type::Int)),
        fun1(|s: String| Ok(s.chars().count() as i64)),
    );
    m.add(
        "append",
        TypeScheme::mono(Type::fun(vec![Type::Text, Type::Text], Type::Text)),
        fun2(|x: String, y: String| Ok(format!("{}{}", x, y))),
    );
    m.add(
        "strip",
        TypeScheme::mono(Type::fun(vec![Type::Text], Type::Text)),
        fun1(|s: String| Ok(s.trim().to_string())),
    );

    m.finish()
}

fn time_module() -> Module {
    let mut m = ModuleBuilder::new("Time");
    let to_time = TypeScheme::mono(Type::fun(vec![Type::Int], Type::Time));

    m.add("seconds", to_time.clone(), fun1(|n: i64| Ok(EpochSeconds(n))));
    m.add(
        "minutes",
        to_time.clone(),
        fun1(|n: i64| Ok(EpochSeconds(n.wrapping_mul(60)))),
    );
    m.add(
        "hours",
        to_time.clone(),
        fun1(|n: i64| Ok(EpochSeconds(n.wrapping_mul(3600)))),
    );
    m.add(
        "days",
        to_time,
        fun1(|n: i64| Ok(EpochSeconds(n.wrapping_mul(86_400)))),
    );
    m.add(
        "toSeconds",
        TypeScheme::mono(Type::fun(vec![Type::Time], Type::Int)),
        fun1(|t: EpochSeconds| Ok(t.0)),
    );

    m.finish()
}

fn bits_module() -> Module {
    let mut m = ModuleBuilder::new("Bits");

    m.add("and", binop_scheme(), bit2("Bits.and", |x, y| x & y));
    m.add("or", binop_scheme(), bit2("Bits.or", |x, y| x | y));
    m.add("xor", binop_scheme(), bit2("Bits.xor", |x, y| x ^ y));
    let shift_scheme = TypeScheme::poly(vec![0], Type::fun(vec![a(), Type::Int], a()));
    m.add("shiftL", shift_scheme.clone(), shift("Bits.shiftL", true));
    m.add("shiftR", shift_scheme, shift("Bits.shiftR", false));
    m.add(
        "complement",
        TypeScheme::poly(vec![0], Type::fun(vec![a()], a())),
        fun1(|v: Value| {
            let (x, bits) = word_parts(&v).ok_or_else(|| {
                EvalError::runtime(format!("cannot apply Bits.complement to {}", v.kind()))
            })?;
            Ok(word_of(bits, !x))
        }),
    );

    m.finish()
}

/// Build the full prelude module map.
pub fn prelude() -> ModuleMap {
    let mut map = ModuleMap::new();
    map.insert(base_module());
    map.insert(array_module());
    map.insert(option_module());
    map.insert(text_module());
    map.insert(time_module());
    map.insert(bits_module());
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use merl_core::value::ImplEnv;

    fn call2(v: &Value, a: Value, b: Value) -> Result<Value, EvalError> {
        let implicits = ImplEnv::new();
        match v {
            Value::Fun(f) => match f.call(&implicits, a)? {
                Value::Fun(g) => g.call(&implicits, b),
                other => panic!("expected curried function, got {}", other),
            },
            other => panic!("expected function, got {}", other),
        }
    }

    fn call1(v: &Value, a: Value) -> Result<Value, EvalError> {
        match v {
            Value::Fun(f) => f.call(&ImplEnv::new(), a),
            other => panic!("expected function, got {}", other),
        }
    }

    fn base(name: &str) -> Value {
        prelude().get(BASE_MODULE).unwrap().get(name).unwrap().value.clone()
    }

    fn module_fun(module: &str, name: &str) -> Value {
        prelude().get(module).unwrap().get(name).unwrap().value.clone()
    }

    #[test]
    fn test_arithmetic_promotion() {
        let add = base("+");
        assert_eq!(call2(&add, Value::Int(3), Value::Int(4)), Ok(Value::Int(7)));
        assert_eq!(
            call2(&add, Value::Double(3.0), Value::Int(4)),
            Ok(Value::Double(7.0))
        );
        assert_eq!(
            call2(&add, Value::Int(3), Value::Double(4.5)),
            Ok(Value::Double(7.5))
        );
        assert_eq!(
            call2(&add, Value::Word16(1), Value::Word32(2)),
            Ok(Value::Word32(3))
        );
    }

    #[test]
    fn test_word_arithmetic_wraps_in_width() {
        let add = base("+");
        assert_eq!(
            call2(&add, Value::Word16(0xffff), Value::Word16(1)),
            Ok(Value::Word16(0))
        );
    }

    #[test]
    fn test_division_by_zero() {
        let div = base("/");
        assert_eq!(
            call2(&div, Value::Int(1), Value::Int(0)),
            Err(EvalError::runtime("division by zero"))
        );
        // Double division is IEEE
        assert_eq!(
            call2(&div, Value::Double(1.0), Value::Double(0.0)),
            Ok(Value::Double(f64::INFINITY))
        );
    }

    #[test]
    fn test_arithmetic_rejects_shape_mismatch() {
        let add = base("+");
        assert!(matches!(
            call2(&add, Value::Text("a".to_string()), Value::Int(1)),
            Err(EvalError::RuntimeError(_))
        ));
    }

    #[test]
    fn test_comparisons() {
        let lt = base("<");
        assert_eq!(call2(&lt, Value::Int(1), Value::Int(2)), Ok(vbool(true)));
        assert_eq!(
            call2(&lt, Value::Double(2.5), Value::Int(2)),
            Ok(vbool(false))
        );
        assert_eq!(
            call2(&lt, Value::Text("a".to_string()), Value::Text("b".to_string())),
            Ok(vbool(true))
        );
        assert_eq!(
            call2(&lt, Value::EpochTime(5), Value::EpochTime(9)),
            Ok(vbool(true))
        );
    }

    #[test]
    fn test_equality_is_structural_and_false_on_functions() {
        let eq = base("==");
        assert_eq!(
            call2(&eq, Value::Int(1), Value::Int(1)),
            Ok(vbool(true))
        );
        let f = Value::Fun(VFun::new(|_, v| Ok(v)));
        assert_eq!(call2(&eq, f.clone(), f), Ok(vbool(false)));
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = base("..");
        assert_eq!(
            call2(&range, Value::Int(-1), Value::Int(1)),
            Ok(Value::Array(vec![
                Value::Int(-1),
                Value::Int(0),
                Value::Int(1)
            ]))
        );
        assert_eq!(
            call2(&range, Value::Int(2), Value::Int(1)),
            Ok(Value::Array(vec![]))
        );
    }

    #[test]
    fn test_max_promotes_mixed_operands() {
        let max = base("max");
        assert_eq!(call2(&max, Value::Int(0), Value::Int(3)), Ok(Value::Int(3)));
        assert_eq!(
            call2(&max, Value::Int(0), Value::Double(-1.0)),
            Ok(Value::Double(0.0))
        );
    }

    #[test]
    fn test_option_builtins() {
        let from_option = module_fun("Option", "fromOption");
        assert_eq!(
            call2(
                &from_option,
                Value::Int(0),
                Value::One(Box::new(Value::Int(9)))
            ),
            Ok(Value::Int(9))
        );
        assert_eq!(
            call2(&from_option, Value::Int(0), Value::Empty),
            Ok(Value::Int(0))
        );

        let is_some = module_fun("Option", "isSome");
        assert_eq!(call1(&is_some, Value::Empty), Ok(vbool(false)));
    }

    #[test]
    fn test_array_map_and_filter() {
        let implicits = ImplEnv::new();
        let double = Value::Fun(VFun::new(|_, v| match v {
            Value::Int(n) => Ok(Value::Int(n * 2)),
            other => panic!("unexpected {}", other),
        }));
        let map = module_fun("Array", "map");
        let mapped = match &map {
            Value::Fun(f) => {
                let g = f.call(&implicits, double).unwrap();
                call1(&g, Value::Array(vec![Value::Int(1), Value::Int(2)])).unwrap()
            }
            _ => unreachable!(),
        };
        assert_eq!(mapped, Value::Array(vec![Value::Int(2), Value::Int(4)]));

        let positive = Value::Fun(VFun::new(|_, v| match v {
            Value::Int(n) => Ok(vbool(n > 0)),
            other => panic!("unexpected {}", other),
        }));
        let filter = module_fun("Array", "filter");
        let kept = match &filter {
            Value::Fun(f) => {
                let g = f.call(&implicits, positive).unwrap();
                call1(&g, Value::Array(vec![Value::Int(-1), Value::Int(3)])).unwrap()
            }
            _ => unreachable!(),
        };
        assert_eq!(kept, Value::Array(vec![Value::Int(3)]));
    }

    #[test]
    fn test_array_sum_promotes() {
        let sum = module_fun("Array", "sum");
        assert_eq!(
            call1(&sum, Value::Array(vec![Value::Int(1), Value::Int(2)])),
            Ok(Value::Int(3))
        );
        assert_eq!(
            call1(
                &sum,
                Value::Array(vec![Value::Int(1), Value::Double(0.5)])
            ),
            Ok(Value::Double(1.5))
        );
        assert_eq!(call1(&sum, Value::Array(vec![])), Ok(Value::Int(0)));
    }

    #[test]
    fn test_text_builtins() {
        let length = module_fun("Text", "length");
        assert_eq!(call1(&length, Value::Text("héllo".to_string())), Ok(Value::Int(5)));
        let append = module_fun("Text", "append");
        assert_eq!(
            call2(
                &append,
                Value::Text("ab".to_string()),
                Value::Text("cd".to_string())
            ),
            Ok(Value::Text("abcd".to_string()))
        );
        let strip = module_fun("Text", "strip");
        assert_eq!(
            call1(&strip, Value::Text("  x ".to_string())),
            Ok(Value::Text("x".to_string()))
        );
    }

    #[test]
    fn test_time_builtins() {
        let hours = module_fun("Time", "hours");
        assert_eq!(call1(&hours, Value::Int(2)), Ok(Value::EpochTime(7200)));
        let to_seconds = module_fun("Time", "toSeconds");
        assert_eq!(call1(&to_seconds, Value::EpochTime(90)), Ok(Value::Int(90)));
    }

    #[test]
    fn test_bit_builtins() {
        let and = module_fun("Bits", "and");
        assert_eq!(
            call2(&and, Value::Word16(0xff0f), Value::Word16(0x00ff)),
            Ok(Value::Word16(0x000f))
        );
        let shl = module_fun("Bits", "shiftL");
        assert_eq!(
            call2(&shl, Value::Word16(0x8001), Value::Int(1)),
            Ok(Value::Word16(0x0002))
        );
        let complement = module_fun("Bits", "complement");
        assert_eq!(call1(&complement, Value::Word16(0x00ff)), Ok(Value::Word16(0xff00)));
    }

    #[test]
    fn test_every_entry_is_pinned() {
        let map = prelude();
        let pinned = map.pinned_env();
        for module in map.modules() {
            for (name, entry) in &module.entries {
                assert_eq!(entry.hash, builtin_hash(&module.name, name));
                assert!(pinned.contains_key(&entry.hash));
            }
        }
    }
}
