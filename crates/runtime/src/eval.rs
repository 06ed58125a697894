//! The tree-walking evaluator.
//!
//! Evaluation walks a fully pinned, elaborated expression under three
//! environments: the lexical environment `L`, the pinned environment `P`
//! (content address → value, covering operators, prelude globals, and
//! imported objects), and the implicit environment `I` (reader-scoped
//! `?x` bindings). All errors short-circuit; the evaluator never recovers.

use merl_core::ast::{Expr, ExtIdent, Lit, Pat, TextChunk};
use merl_core::error::EvalError;
use merl_core::module::PinnedEnv;
use merl_core::types::Type;
use merl_core::value::{ImplEnv, VFun, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// The lexical environment: ordinary `let`/lambda bindings. Extension
/// copies the map, so closures capture a stable snapshot.
#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: Arc<HashMap<ExtIdent, Value>>,
}

impl Env {
    pub fn new() -> Env {
        Env::default()
    }

    pub fn get(&self, ident: &ExtIdent) -> Option<&Value> {
        self.bindings.get(ident)
    }

    pub fn with(&self, ident: ExtIdent, value: Value) -> Env {
        let mut map = (*self.bindings).clone();
        map.insert(ident, value);
        Env {
            bindings: Arc::new(map),
        }
    }

    /// Extend with several bindings at once (pattern-match results).
    pub fn with_all(&self, binds: Vec<(ExtIdent, Value)>) -> Env {
        if binds.is_empty() {
            return self.clone();
        }
        let mut map = (*self.bindings).clone();
        for (ident, value) in binds {
            map.insert(ident, value);
        }
        Env {
            bindings: Arc::new(map),
        }
    }
}

/// Recognize the bool enum's values; `if`, `assert`, and comprehension
/// conditions accept nothing else.
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Enum(owner, tag) if *owner == merl_vc::bool_enum_hash() => match tag.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Evaluate a pinned, elaborated expression.
pub fn eval(
    env: &Env,
    pinned: &Arc<PinnedEnv>,
    implicits: &ImplEnv,
    expr: &Expr,
) -> Result<Value, EvalError> {
    match expr {
        // An integer literal is a function awaiting its runtime type
        // witness; inference applies it to the `TypeRep` it elected.
        Expr::Lit(Lit::Int(n)) => {
            let n = *n;
            Ok(Value::Fun(VFun::new(move |_, rep| match rep {
                Value::TypeRep(Type::Int) => Ok(Value::Int(n)),
                Value::TypeRep(Type::Double) => Ok(Value::Double(n as f64)),
                _ => Err(EvalError::runtime(
                    "Invalid runtime rep for numeric constant",
                )),
            })))
        }
        Expr::Lit(Lit::Double(d)) => Ok(Value::Double(*d)),
        Expr::Lit(Lit::Hex(w)) => Ok(Value::Word64(*w)),
        Expr::Lit(Lit::Text(s)) => Ok(Value::Text(s.clone())),

        Expr::TypeRep(ty) => Ok(Value::TypeRep(ty.clone())),

        Expr::Var(pin, ident) => match pin.hash() {
            Some(hash) => pinned.get(&hash).cloned().ok_or_else(|| {
                EvalError::runtime(format!("{} is not in the pinned environment", ident))
            }),
            None => match ident {
                ExtIdent::Var(_) => env
                    .get(ident)
                    .cloned()
                    .ok_or_else(|| EvalError::runtime(format!("unbound variable {}", ident))),
                ExtIdent::Implicit(_) => implicits.get(ident).cloned().ok_or_else(|| {
                    EvalError::runtime(format!("unbound implicit parameter {}", ident))
                }),
            },
        },

        Expr::Enum(pin, tag) => match pin.hash() {
            Some(owner) => Ok(Value::Enum(owner, tag.clone())),
            None => Err(EvalError::runtime("All enums must be pinned")),
        },

        Expr::InterpolatedText(chunks) => {
            let mut out = String::new();
            for chunk in chunks {
                match chunk {
                    TextChunk::Str(s) => out.push_str(s),
                    // Spliced values render through the canonical pretty form
                    TextChunk::Expr(e) => {
                        let v = eval(env, pinned, implicits, e)?;
                        out.push_str(&v.to_string());
                    }
                }
            }
            Ok(Value::Text(out))
        }

        Expr::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval(env, pinned, implicits, item)?);
            }
            Ok(Value::Array(values))
        }

        Expr::ArrayComp {
            body,
            sources,
            cond,
        } => {
            let mut out = Vec::new();
            comprehend(
                env,
                pinned,
                implicits,
                body,
                sources,
                cond.as_deref(),
                &mut out,
            )?;
            Ok(Value::Array(out))
        }

        Expr::Op {
            lhs,
            pinned: pin,
            name,
            rhs,
        } => {
            let op = resolve_fun(pinned, pin.hash(), name)?;
            let lv = eval(env, pinned, implicits, lhs)?;
            let rv = eval(env, pinned, implicits, rhs)?;
            // Binary operators are curried two-argument functions
            match op.call(implicits, lv)? {
                Value::Fun(partial) => partial.call(implicits, rv),
                _ => Err(EvalError::runtime(format!(
                    "operator {} is not a two-argument function",
                    name
                ))),
            }
        }

        Expr::PreOp {
            pinned: pin,
            name,
            expr: operand,
        } => {
            let op = resolve_fun(pinned, pin.hash(), name)?;
            let v = eval(env, pinned, implicits, operand)?;
            op.call(implicits, v)
        }

        Expr::App(f, a) => {
            let fv = eval(env, pinned, implicits, f)?;
            let av = eval(env, pinned, implicits, a)?;
            match fv {
                Value::Fun(g) => g.call(implicits, av),
                other => Err(EvalError::runtime(format!(
                    "application of a non-function ({})",
                    other.kind()
                ))),
            }
        }

        Expr::Lam(params, body) => {
            if params.is_empty() {
                return eval(env, pinned, implicits, body);
            }
            Ok(curry(
                env.clone(),
                pinned.clone(),
                Arc::new(params.clone()),
                0,
                Arc::new((**body).clone()),
            ))
        }

        Expr::Let(ident, bound, body) => {
            let bound_value = eval(env, pinned, implicits, bound)?;
            match ident {
                ExtIdent::Var(_) => {
                    let extended = env.with(ident.clone(), bound_value);
                    eval(&extended, pinned, implicits, body)
                }
                // Implicit lets extend the reader environment for the
                // scope of the body only
                ExtIdent::Implicit(_) => {
                    let extended = implicits.with(ident.clone(), bound_value);
                    eval(env, pinned, &extended, body)
                }
            }
        }

        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let c = eval(env, pinned, implicits, cond)?;
            match as_bool(&c) {
                Some(true) => eval(env, pinned, implicits, then_branch),
                Some(false) => eval(env, pinned, implicits, else_branch),
                None => Err(EvalError::runtime(format!(
                    "if condition must be a bool, got {}",
                    c.kind()
                ))),
            }
        }

        Expr::Tuple(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval(env, pinned, implicits, item)?);
            }
            Ok(Value::Tuple(values))
        }

        Expr::One(inner) => Ok(Value::One(Box::new(eval(env, pinned, implicits, inner)?))),
        Expr::Empty => Ok(Value::Empty),

        Expr::Assert(cond, body) => {
            let c = eval(env, pinned, implicits, cond)?;
            match as_bool(&c) {
                Some(true) => eval(env, pinned, implicits, body),
                Some(false) => Err(EvalError::AssertionFailed),
                None => Err(EvalError::runtime(format!(
                    "assert condition must be a bool, got {}",
                    c.kind()
                ))),
            }
        }

        Expr::Case(scrutinee, arms) => {
            let value = eval(env, pinned, implicits, scrutinee)?;
            for (pat, arm_body) in arms {
                let mut binds = Vec::new();
                if match_pat(pat, &value, &mut binds) {
                    let extended = env.with_all(binds);
                    return eval(&extended, pinned, implicits, arm_body);
                }
            }
            Err(EvalError::runtime("non-exhaustive patterns in case"))
        }

        // Transparent wrappers
        Expr::CommentAbove(_, inner)
        | Expr::CommentAfter(inner, _)
        | Expr::CommentBelow(inner, _)
        | Expr::Bracketed(inner)
        | Expr::RenameModule(_, _, inner)
        | Expr::OpenModule(_, inner) => eval(env, pinned, implicits, inner),
    }
}

fn resolve_fun(
    pinned: &Arc<PinnedEnv>,
    hash: Option<merl_core::hash::VcHash>,
    name: &str,
) -> Result<VFun, EvalError> {
    let hash =
        hash.ok_or_else(|| EvalError::runtime(format!("operator {} is not pinned", name)))?;
    match pinned.get(&hash) {
        Some(Value::Fun(f)) => Ok(f.clone()),
        Some(other) => Err(EvalError::runtime(format!(
            "operator {} resolved to a non-function ({})",
            name,
            other.kind()
        ))),
        None => Err(EvalError::runtime(format!(
            "operator {} is not in the pinned environment",
            name
        ))),
    }
}

/// Build the curried closure chain for a lambda. Bound parameters extend
/// the captured lexical environment when applied; wildcard parameters
/// consume and ignore their argument. The implicit environment is the
/// caller's, taken at each call site.
fn curry(
    env: Env,
    pinned: Arc<PinnedEnv>,
    params: Arc<Vec<Option<ExtIdent>>>,
    index: usize,
    body: Arc<Expr>,
) -> Value {
    Value::Fun(VFun::new(move |implicits, arg| {
        let extended = match &params[index] {
            Some(ident) => env.with(ident.clone(), arg),
            None => env.clone(),
        };
        if index + 1 < params.len() {
            Ok(curry(
                extended,
                pinned.clone(),
                params.clone(),
                index + 1,
                body.clone(),
            ))
        } else {
            eval(&extended, &pinned, implicits, &body)
        }
    }))
}

fn comprehend(
    env: &Env,
    pinned: &Arc<PinnedEnv>,
    implicits: &ImplEnv,
    body: &Expr,
    sources: &[(String, Expr)],
    cond: Option<&Expr>,
    out: &mut Vec<Value>,
) -> Result<(), EvalError> {
    match sources {
        [] => {
            if let Some(c) = cond {
                let cv = eval(env, pinned, implicits, c)?;
                match as_bool(&cv) {
                    Some(true) => {}
                    Some(false) => return Ok(()),
                    None => {
                        return Err(EvalError::runtime(format!(
                            "comprehension condition must be a bool, got {}",
                            cv.kind()
                        )));
                    }
                }
            }
            out.push(eval(env, pinned, implicits, body)?);
            Ok(())
        }
        [(name, source), rest @ ..] => {
            let sv = eval(env, pinned, implicits, source)?;
            let items = match sv {
                Value::Array(items) => items,
                other => {
                    return Err(EvalError::runtime(format!(
                        "comprehension source must be an array, got {}",
                        other.kind()
                    )));
                }
            };
            for item in items {
                let extended = env.with(ExtIdent::Var(name.clone()), item);
                comprehend(&extended, pinned, implicits, body, rest, cond, out)?;
            }
            Ok(())
        }
    }
}

/// Match a value against a pattern, accumulating bindings. Patterns are
/// linear, so accumulated names never collide.
pub fn match_pat(pat: &Pat, value: &Value, binds: &mut Vec<(ExtIdent, Value)>) -> bool {
    match (pat, value) {
        (Pat::Var(None), _) => true,
        (Pat::Var(Some(name)), v) => {
            binds.push((ExtIdent::Var(name.clone()), v.clone()));
            true
        }
        (Pat::Lit(Lit::Int(n)), Value::Int(m)) => n == m,
        (Pat::Lit(Lit::Double(d)), Value::Double(e)) => d == e,
        (Pat::Lit(Lit::Text(s)), Value::Text(t)) => s == t,
        // Hex patterns compare numerically against any word width
        (Pat::Lit(Lit::Hex(w)), Value::Word64(x)) => w == x,
        (Pat::Lit(Lit::Hex(w)), Value::Word32(x)) => *w == u64::from(*x),
        (Pat::Lit(Lit::Hex(w)), Value::Word16(x)) => *w == u64::from(*x),
        (Pat::Enum(pin, tag), Value::Enum(owner, vtag)) => {
            pin.hash() == Some(*owner) && tag == vtag
        }
        (Pat::One(inner), Value::One(v)) => match_pat(inner, v, binds),
        (Pat::Empty, Value::Empty) => true,
        (Pat::Tuple(pats), Value::Tuple(values)) => {
            pats.len() == values.len()
                && pats
                    .iter()
                    .zip(values.iter())
                    .all(|(p, v)| match_pat(p, v, binds))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{op, prelude, vbool};
    use merl_core::ast::Pinned;

    fn setup() -> (Env, Arc<PinnedEnv>, ImplEnv) {
        let modules = prelude();
        (Env::new(), Arc::new(modules.pinned_env()), ImplEnv::new())
    }

    fn run(expr: &Expr) -> Result<Value, EvalError> {
        let (env, pinned, implicits) = setup();
        eval(&env, &pinned, &implicits, expr)
    }

    fn bool_enum(tag: &str) -> Expr {
        Expr::Enum(Pinned::Builtin(merl_vc::bool_enum_hash()), tag.to_string())
    }

    #[test]
    fn test_literals() {
        assert_eq!(run(&Expr::Lit(Lit::Double(2.5))), Ok(Value::Double(2.5)));
        assert_eq!(run(&Expr::Lit(Lit::Hex(0x1f))), Ok(Value::Word64(0x1f)));
        assert_eq!(
            run(&Expr::Lit(Lit::Text("hi".to_string()))),
            Ok(Value::Text("hi".to_string()))
        );
    }

    #[test]
    fn test_int_literal_dispatches_on_type_rep() {
        assert_eq!(run(&Expr::int_with_rep(3, Type::Int)), Ok(Value::Int(3)));
        assert_eq!(
            run(&Expr::int_with_rep(3, Type::Double)),
            Ok(Value::Double(3.0))
        );
        let bad = Expr::app(Expr::Lit(Lit::Int(3)), Expr::TypeRep(Type::Text));
        assert_eq!(
            run(&bad),
            Err(EvalError::runtime("Invalid runtime rep for numeric constant"))
        );
    }

    #[test]
    fn test_unpinned_enum_is_rejected() {
        let expr = Expr::Enum(Pinned::Local, "true".to_string());
        assert_eq!(run(&expr), Err(EvalError::runtime("All enums must be pinned")));
    }

    #[test]
    fn test_lambda_binds_and_wildcards_ignore() {
        // fun x _ -> x
        let lam = Expr::Lam(
            vec![Some(ExtIdent::Var("x".to_string())), None],
            Box::new(Expr::var("x")),
        );
        let applied = Expr::app(
            Expr::app(lam, Expr::Lit(Lit::Text("keep".to_string()))),
            Expr::Lit(Lit::Text("drop".to_string())),
        );
        assert_eq!(run(&applied), Ok(Value::Text("keep".to_string())));
    }

    #[test]
    fn test_application_of_non_function_fails() {
        let expr = Expr::app(Expr::Lit(Lit::Double(1.0)), Expr::Empty);
        assert!(matches!(run(&expr), Err(EvalError::RuntimeError(_))));
    }

    #[test]
    fn test_let_shadowing() {
        // let x = "outer" in let x = "inner" in x
        let expr = Expr::Let(
            ExtIdent::Var("x".to_string()),
            Box::new(Expr::Lit(Lit::Text("outer".to_string()))),
            Box::new(Expr::Let(
                ExtIdent::Var("x".to_string()),
                Box::new(Expr::Lit(Lit::Text("inner".to_string()))),
                Box::new(Expr::var("x")),
            )),
        );
        assert_eq!(run(&expr), Ok(Value::Text("inner".to_string())));
    }

    #[test]
    fn test_implicit_let_scopes_to_body() {
        // let ?x = "bound" in ?x
        let expr = Expr::Let(
            ExtIdent::Implicit("x".to_string()),
            Box::new(Expr::Lit(Lit::Text("bound".to_string()))),
            Box::new(Expr::implicit("x")),
        );
        assert_eq!(run(&expr), Ok(Value::Text("bound".to_string())));
        // ?x alone is unbound
        assert!(matches!(
            run(&Expr::implicit("x")),
            Err(EvalError::RuntimeError(_))
        ));
    }

    #[test]
    fn test_callee_inherits_caller_implicits() {
        // (fun _ -> ?x) applied under let ?x = 7 (Int rep)
        let callee = Expr::Lam(vec![None], Box::new(Expr::implicit("x")));
        let expr = Expr::Let(
            ExtIdent::Implicit("x".to_string()),
            Box::new(Expr::int_with_rep(7, Type::Int)),
            Box::new(Expr::app(callee, Expr::Empty)),
        );
        assert_eq!(run(&expr), Ok(Value::Int(7)));
    }

    #[test]
    fn test_if_requires_bool() {
        let good = Expr::If {
            cond: Box::new(bool_enum("false")),
            then_branch: Box::new(Expr::int_with_rep(1, Type::Int)),
            else_branch: Box::new(Expr::int_with_rep(2, Type::Int)),
        };
        assert_eq!(run(&good), Ok(Value::Int(2)));

        let bad = Expr::If {
            cond: Box::new(Expr::int_with_rep(1, Type::Int)),
            then_branch: Box::new(Expr::Empty),
            else_branch: Box::new(Expr::Empty),
        };
        assert!(matches!(run(&bad), Err(EvalError::RuntimeError(_))));
    }

    #[test]
    fn test_assert_false_fails() {
        let expr = Expr::Assert(Box::new(bool_enum("false")), Box::new(Expr::Tuple(vec![])));
        assert_eq!(run(&expr), Err(EvalError::AssertionFailed));

        let ok = Expr::Assert(Box::new(bool_enum("true")), Box::new(Expr::Tuple(vec![])));
        assert_eq!(run(&ok), Ok(Value::unit()));
    }

    #[test]
    fn test_case_first_match_wins_and_binds() {
        // match Some 3 with { None -> 0 | Some y -> y }
        let expr = Expr::Case(
            Box::new(Expr::One(Box::new(Expr::int_with_rep(3, Type::Int)))),
            vec![
                (Pat::Empty, Expr::int_with_rep(0, Type::Int)),
                (
                    Pat::One(Box::new(Pat::Var(Some("y".to_string())))),
                    Expr::var("y"),
                ),
            ],
        );
        assert_eq!(run(&expr), Ok(Value::Int(3)));
    }

    #[test]
    fn test_case_falls_through_to_runtime_error() {
        let expr = Expr::Case(
            Box::new(Expr::Empty),
            vec![(
                Pat::One(Box::new(Pat::Var(None))),
                Expr::int_with_rep(0, Type::Int),
            )],
        );
        assert_eq!(
            run(&expr),
            Err(EvalError::runtime("non-exhaustive patterns in case"))
        );
    }

    #[test]
    fn test_tuple_pattern_merges_bindings() {
        // match (1, 2) with (a, b) -> a + b
        let scrutinee = Expr::Tuple(vec![
            Expr::int_with_rep(1, Type::Int),
            Expr::int_with_rep(2, Type::Int),
        ]);
        let expr = Expr::Case(
            Box::new(scrutinee),
            vec![(
                Pat::Tuple(vec![
                    Pat::Var(Some("a".to_string())),
                    Pat::Var(Some("b".to_string())),
                ]),
                Expr::Op {
                    lhs: Box::new(Expr::var("a")),
                    pinned: Pinned::Builtin(op("+")),
                    name: "+".to_string(),
                    rhs: Box::new(Expr::var("b")),
                },
            )],
        );
        assert_eq!(run(&expr), Ok(Value::Int(3)));
    }

    #[test]
    fn test_interpolated_text_uses_canonical_pretty() {
        let expr = Expr::InterpolatedText(vec![
            TextChunk::Str("x = ".to_string()),
            TextChunk::Expr(Expr::int_with_rep(7, Type::Double)),
            TextChunk::Str(", f = ".to_string()),
            TextChunk::Expr(Expr::Lam(vec![None], Box::new(Expr::Empty))),
        ]);
        assert_eq!(
            run(&expr),
            Ok(Value::Text("x = 7.0, f = <<function>>".to_string()))
        );
    }

    #[test]
    fn test_array_comprehension_with_condition() {
        // [x + y | x <- [1, 2], y <- [10, 20], x == 2] over Int reps
        let pair = |a: i64, b: i64| Expr::Array(vec![
            Expr::int_with_rep(a, Type::Int),
            Expr::int_with_rep(b, Type::Int),
        ]);
        let expr = Expr::ArrayComp {
            body: Box::new(Expr::Op {
                lhs: Box::new(Expr::var("x")),
                pinned: Pinned::Builtin(op("+")),
                name: "+".to_string(),
                rhs: Box::new(Expr::var("y")),
            }),
            sources: vec![
                ("x".to_string(), pair(1, 2)),
                ("y".to_string(), pair(10, 20)),
            ],
            cond: Some(Box::new(Expr::Op {
                lhs: Box::new(Expr::var("x")),
                pinned: Pinned::Builtin(op("==")),
                name: "==".to_string(),
                rhs: Box::new(Expr::int_with_rep(2, Type::Int)),
            })),
        };
        assert_eq!(
            run(&expr),
            Ok(Value::Array(vec![Value::Int(12), Value::Int(22)]))
        );
    }

    #[test]
    fn test_comprehension_source_must_be_array() {
        let expr = Expr::ArrayComp {
            body: Box::new(Expr::var("x")),
            sources: vec![("x".to_string(), Expr::Lit(Lit::Double(1.0)))],
            cond: None,
        };
        assert!(matches!(run(&expr), Err(EvalError::RuntimeError(_))));
    }

    #[test]
    fn test_wrappers_are_transparent() {
        use merl_core::ast::Comment;
        let inner = Expr::Lit(Lit::Double(4.0));
        let expr = Expr::OpenModule(
            "Array".to_string(),
            Box::new(Expr::CommentBelow(
                Box::new(Expr::Bracketed(Box::new(inner))),
                Comment::Line("done".to_string()),
            )),
        );
        assert_eq!(run(&expr), Ok(Value::Double(4.0)));
    }

    #[test]
    fn test_equality_on_functions_is_false() {
        let lam = || Expr::Lam(vec![Some(ExtIdent::Var("x".to_string()))], Box::new(Expr::var("x")));
        let expr = Expr::Op {
            lhs: Box::new(lam()),
            pinned: Pinned::Builtin(op("==")),
            name: "==".to_string(),
            rhs: Box::new(lam()),
        };
        assert_eq!(run(&expr), Ok(vbool(false)));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let expr = Expr::Op {
            lhs: Box::new(Expr::int_with_rep(3, Type::Int)),
            pinned: Pinned::Builtin(op("*")),
            name: "*".to_string(),
            rhs: Box::new(Expr::int_with_rep(4, Type::Int)),
        };
        let first = run(&expr);
        for _ in 0..10 {
            assert_eq!(run(&expr), first);
        }
    }
}
