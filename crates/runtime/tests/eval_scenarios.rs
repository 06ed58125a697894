//! End-to-end evaluation scenarios over the full prelude.

use merl_core::ast::{Expr, ExtIdent, Lit, Pat, Pinned};
use merl_core::error::EvalError;
use merl_core::module::PinnedEnv;
use merl_core::types::Type;
use merl_core::value::{ImplEnv, Value};
use merl_runtime::eval::{Env, eval};
use merl_runtime::prelude::{op, prelude, vbool};
use merl_vc::builtin_hash;
use std::sync::Arc;

fn pinned_env() -> Arc<PinnedEnv> {
    Arc::new(prelude().pinned_env())
}

fn run(expr: &Expr) -> Result<Value, EvalError> {
    run_with_implicits(expr, &ImplEnv::new())
}

fn run_with_implicits(expr: &Expr, implicits: &ImplEnv) -> Result<Value, EvalError> {
    eval(&Env::new(), &pinned_env(), implicits, expr)
}

fn binop(name: &str, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Op {
        lhs: Box::new(lhs),
        pinned: Pinned::Builtin(op(name)),
        name: name.to_string(),
        rhs: Box::new(rhs),
    }
}

fn base_var(name: &str) -> Expr {
    Expr::Var(Pinned::Builtin(op(name)), ExtIdent::Var(name.to_string()))
}

fn module_var(module: &str, name: &str) -> Expr {
    Expr::Var(
        Pinned::Builtin(builtin_hash(module, name)),
        ExtIdent::Var(format!("{}.{}", module, name)),
    )
}

fn bool_enum(tag: &str) -> Expr {
    Expr::Enum(Pinned::Builtin(merl_vc::bool_enum_hash()), tag.to_string())
}

// 3 + 4 evaluates under the runtime reps inference elected for the two
// literals.
#[test]
fn addition_follows_the_literal_type_reps() {
    let expr = binop(
        "+",
        Expr::int_with_rep(3, Type::Int),
        Expr::int_with_rep(4, Type::Int),
    );
    assert_eq!(run(&expr), Ok(Value::Int(7)));

    let expr = binop(
        "+",
        Expr::int_with_rep(3, Type::Double),
        Expr::int_with_rep(4, Type::Int),
    );
    assert_eq!(run(&expr), Ok(Value::Double(7.0)));
}

// let ?x = 3.2 in ?x + 2
#[test]
fn implicit_let_binds_for_the_body() {
    let expr = Expr::Let(
        ExtIdent::Implicit("x".to_string()),
        Box::new(Expr::Lit(Lit::Double(3.2))),
        Box::new(binop(
            "+",
            Expr::implicit("x"),
            Expr::int_with_rep(2, Type::Double),
        )),
    );
    assert_eq!(run(&expr), Ok(Value::Double(5.2)));
}

// ?x + 2 under an ambient implicit environment {x ↦ 5}
#[test]
fn ambient_implicit_environment_is_read() {
    let implicits = ImplEnv::new().with(ExtIdent::Implicit("x".to_string()), Value::Int(5));
    let expr = binop("+", Expr::implicit("x"), Expr::int_with_rep(2, Type::Int));
    assert_eq!(run_with_implicits(&expr, &implicits), Ok(Value::Int(7)));
}

// match 3.9 - 2.2 with { 0.0 -> #false | _ -> #true }
#[test]
fn case_on_a_double_difference() {
    let scrutinee = binop("-", Expr::Lit(Lit::Double(3.9)), Expr::Lit(Lit::Double(2.2)));
    let expr = Expr::Case(
        Box::new(scrutinee),
        vec![
            (Pat::Lit(Lit::Double(0.0)), bool_enum("false")),
            (Pat::Var(None), bool_enum("true")),
        ],
    );
    assert_eq!(run(&expr), Ok(vbool(true)));
}

// assert #false in ()
#[test]
fn assert_false_raises() {
    let expr = Expr::Assert(
        Box::new(bool_enum("false")),
        Box::new(Expr::Tuple(vec![])),
    );
    assert_eq!(run(&expr), Err(EvalError::AssertionFailed));
}

// Array.reduce (fun x y -> x + max 0 y) 0 ((-3)..3)
fn reduce_scenario(zero_rep: Type) -> Expr {
    let lam = Expr::Lam(
        vec![
            Some(ExtIdent::Var("x".to_string())),
            Some(ExtIdent::Var("y".to_string())),
        ],
        Box::new(binop(
            "+",
            Expr::var("x"),
            Expr::app(
                Expr::app(base_var("max"), Expr::int_with_rep(0, Type::Int)),
                Expr::var("y"),
            ),
        )),
    );
    let range = binop(
        "..",
        Expr::int_with_rep(-3, Type::Int),
        Expr::int_with_rep(3, Type::Int),
    );
    Expr::app(
        Expr::app(
            Expr::app(module_var("Array", "reduce"), lam),
            Expr::int_with_rep(0, zero_rep),
        ),
        range,
    )
}

#[test]
fn reduce_over_a_range() {
    assert_eq!(run(&reduce_scenario(Type::Int)), Ok(Value::Int(6)));
    assert_eq!(run(&reduce_scenario(Type::Double)), Ok(Value::Double(6.0)));
}

// equals (fun x -> x) (fun x -> x) is false by contract
#[test]
fn function_equality_is_always_false() {
    let id = || {
        Expr::Lam(
            vec![Some(ExtIdent::Var("x".to_string()))],
            Box::new(Expr::var("x")),
        )
    };
    let expr = binop("==", id(), id());
    assert_eq!(run(&expr), Ok(vbool(false)));
}

// Interpolation renders through the canonical pretty form.
#[test]
fn interpolation_of_hex_and_time() {
    use merl_core::ast::TextChunk;
    let expr = Expr::InterpolatedText(vec![
        TextChunk::Str("w=".to_string()),
        TextChunk::Expr(Expr::Lit(Lit::Hex(0x2a))),
        TextChunk::Str(" t=".to_string()),
        TextChunk::Expr(Expr::app(
            module_var("Time", "seconds"),
            Expr::int_with_rep(90, Type::Int),
        )),
    ]);
    assert_eq!(run(&expr), Ok(Value::Text("w=0x2a t=90s".to_string())));
}

// A callee sees the caller's implicits at its own call site, not the ones
// from where it was defined.
#[test]
fn implicits_are_dynamically_scoped() {
    // let f = (fun _ -> ?x) in let ?x = 1 in f ()
    let f_def = Expr::Lam(vec![None], Box::new(Expr::implicit("x")));
    let expr = Expr::Let(
        ExtIdent::Var("f".to_string()),
        Box::new(f_def),
        Box::new(Expr::Let(
            ExtIdent::Implicit("x".to_string()),
            Box::new(Expr::int_with_rep(1, Type::Int)),
            Box::new(Expr::app(Expr::var("f"), Expr::Tuple(vec![]))),
        )),
    );
    assert_eq!(run(&expr), Ok(Value::Int(1)));
}
