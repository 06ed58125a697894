//! Host interop: bidirectional conversion between Rust values and Merl
//! values.
//!
//! `ToValue`/`FromValue` are the two dual relations, `ToType` is the type
//! descriptor the elaborator sees for a bridged binding. Host closures are
//! lifted into curried `VFun`s with `fun1`/`fun2`/`fun3`; `with_implicit`
//! additionally binds a labelled implicit parameter resolved from the
//! caller's implicit environment at invocation time.

use crate::prelude::vbool;
use merl_core::ast::ExtIdent;
use merl_core::error::EvalError;
use merl_core::types::Type;
use merl_core::value::{ImplEnv, VFun, Value};
use std::marker::PhantomData;

/// Convert a host value into a Merl value. Fallible: host-sized integers
/// must range-check against `i64`.
pub trait ToValue {
    fn to_value(self) -> Result<Value, EvalError>;
}

/// Recover a host value from a Merl value. Failure names the source value
/// and the target type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, EvalError>;
}

/// The Merl type a bridged host type presents to inference.
pub trait ToType {
    fn to_type() -> Type;
}

fn mismatch<T: ToType>(value: &Value) -> EvalError {
    EvalError::cast(format!(
        "could not cast {} to type {}",
        value,
        T::to_type()
    ))
}

// ---------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------

impl ToValue for Value {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(self)
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Value, EvalError> {
        Ok(value)
    }
}

// ---------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------

impl ToValue for i64 {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(Value::Int(self))
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<i64, EvalError> {
        match value {
            Value::Int(n) => Ok(n),
            other => Err(mismatch::<i64>(&other)),
        }
    }
}

impl ToType for i64 {
    fn to_type() -> Type {
        Type::Int
    }
}

impl ToValue for i32 {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(Value::Int(i64::from(self)))
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<i32, EvalError> {
        match value {
            Value::Int(n) => i32::try_from(n)
                .map_err(|_| EvalError::cast(format!("{} is out of range of a 32-bit int", n))),
            other => Err(mismatch::<i32>(&other)),
        }
    }
}

impl ToType for i32 {
    fn to_type() -> Type {
        Type::Int
    }
}

impl ToValue for usize {
    fn to_value(self) -> Result<Value, EvalError> {
        i64::try_from(self)
            .map(Value::Int)
            .map_err(|_| EvalError::cast(format!("{} is out of range of int", self)))
    }
}

impl FromValue for usize {
    fn from_value(value: Value) -> Result<usize, EvalError> {
        match value {
            Value::Int(n) => usize::try_from(n)
                .map_err(|_| EvalError::cast(format!("{} is out of range of usize", n))),
            other => Err(mismatch::<usize>(&other)),
        }
    }
}

impl ToType for usize {
    fn to_type() -> Type {
        Type::Int
    }
}

impl ToValue for f64 {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(Value::Double(self))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<f64, EvalError> {
        match value {
            Value::Double(d) => Ok(d),
            other => Err(mismatch::<f64>(&other)),
        }
    }
}

impl ToType for f64 {
    fn to_type() -> Type {
        Type::Double
    }
}

macro_rules! word_cast {
    ($ty:ty, $variant:ident, $merl:expr) => {
        impl ToValue for $ty {
            fn to_value(self) -> Result<Value, EvalError> {
                Ok(Value::$variant(self))
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<$ty, EvalError> {
                match value {
                    Value::$variant(w) => Ok(w),
                    other => Err(mismatch::<$ty>(&other)),
                }
            }
        }

        impl ToType for $ty {
            fn to_type() -> Type {
                $merl
            }
        }
    };
}

word_cast!(u16, Word16, Type::Word16);
word_cast!(u32, Word32, Type::Word32);
word_cast!(u64, Word64, Type::Word64);

impl ToValue for bool {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(vbool(self))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<bool, EvalError> {
        crate::eval::as_bool(&value).ok_or_else(|| mismatch::<bool>(&value))
    }
}

impl ToType for bool {
    fn to_type() -> Type {
        Type::bool()
    }
}

impl ToValue for String {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(Value::Text(self))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<String, EvalError> {
        match value {
            Value::Text(t) => Ok(t),
            other => Err(mismatch::<String>(&other)),
        }
    }
}

impl ToType for String {
    fn to_type() -> Type {
        Type::Text
    }
}

impl ToValue for &str {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(Value::Text(self.to_string()))
    }
}

/// Seconds since the epoch, the host-side carrier of time values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EpochSeconds(pub i64);

impl ToValue for EpochSeconds {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(Value::EpochTime(self.0))
    }
}

impl FromValue for EpochSeconds {
    fn from_value(value: Value) -> Result<EpochSeconds, EvalError> {
        match value {
            Value::EpochTime(s) => Ok(EpochSeconds(s)),
            other => Err(mismatch::<EpochSeconds>(&other)),
        }
    }
}

impl ToType for EpochSeconds {
    fn to_type() -> Type {
        Type::Time
    }
}

// ---------------------------------------------------------------------
// Unit, optionals, sums, arrays, tuples
// ---------------------------------------------------------------------

impl ToValue for () {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(Value::unit())
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<(), EvalError> {
        match value {
            Value::Tuple(items) if items.is_empty() => Ok(()),
            other => Err(mismatch::<()>(&other)),
        }
    }
}

impl ToType for () {
    fn to_type() -> Type {
        Type::unit()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(self) -> Result<Value, EvalError> {
        match self {
            Some(v) => Ok(Value::One(Box::new(v.to_value()?))),
            None => Ok(Value::Empty),
        }
    }
}

impl<T: FromValue + ToType> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Option<T>, EvalError> {
        match value {
            Value::One(v) => Ok(Some(T::from_value(*v)?)),
            Value::Empty => Ok(None),
            other => Err(mismatch::<Option<T>>(&other)),
        }
    }
}

impl<T: ToType> ToType for Option<T> {
    fn to_type() -> Type {
        Type::Optional(Box::new(T::to_type()))
    }
}

/// An untagged sum for hosts bridging a two-shape argument. `from_value`
/// tries the left alternative first. There is deliberately no `ToType`:
/// the surface type language has no untagged unions.
#[derive(Debug, Clone, PartialEq)]
pub enum Either<A, B> {
    Left(A),
    Right(B),
}

impl<A: ToValue, B: ToValue> ToValue for Either<A, B> {
    fn to_value(self) -> Result<Value, EvalError> {
        match self {
            Either::Left(a) => a.to_value(),
            Either::Right(b) => b.to_value(),
        }
    }
}

impl<A: FromValue, B: FromValue> FromValue for Either<A, B> {
    fn from_value(value: Value) -> Result<Either<A, B>, EvalError> {
        match A::from_value(value.clone()) {
            Ok(a) => Ok(Either::Left(a)),
            Err(_) => match B::from_value(value.clone()) {
                Ok(b) => Ok(Either::Right(b)),
                Err(_) => Err(EvalError::cast(format!(
                    "could not cast {} to either alternative",
                    value
                ))),
            },
        }
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(self) -> Result<Value, EvalError> {
        let items = self
            .into_iter()
            .map(ToValue::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(items))
    }
}

impl<T: FromValue + ToType> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Vec<T>, EvalError> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch::<Vec<T>>(&other)),
        }
    }
}

impl<T: ToType> ToType for Vec<T> {
    fn to_type() -> Type {
        Type::Array(Box::new(T::to_type()))
    }
}

impl<A: ToValue, B: ToValue> ToValue for (A, B) {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(Value::Tuple(vec![self.0.to_value()?, self.1.to_value()?]))
    }
}

impl<A: FromValue + ToType, B: FromValue + ToType> FromValue for (A, B) {
    fn from_value(value: Value) -> Result<(A, B), EvalError> {
        match value {
            Value::Tuple(items) if items.len() == 2 => {
                let mut it = items.into_iter();
                // Length was just checked
                let a = A::from_value(it.next().unwrap())?;
                let b = B::from_value(it.next().unwrap())?;
                Ok((a, b))
            }
            other => Err(mismatch::<(A, B)>(&other)),
        }
    }
}

impl<A: ToType, B: ToType> ToType for (A, B) {
    fn to_type() -> Type {
        Type::Tuple(vec![A::to_type(), B::to_type()])
    }
}

impl<A: ToValue, B: ToValue, C: ToValue> ToValue for (A, B, C) {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(Value::Tuple(vec![
            self.0.to_value()?,
            self.1.to_value()?,
            self.2.to_value()?,
        ]))
    }
}

impl<A, B, C> FromValue for (A, B, C)
where
    A: FromValue + ToType,
    B: FromValue + ToType,
    C: FromValue + ToType,
{
    fn from_value(value: Value) -> Result<(A, B, C), EvalError> {
        match value {
            Value::Tuple(items) if items.len() == 3 => {
                let mut it = items.into_iter();
                let a = A::from_value(it.next().unwrap())?;
                let b = B::from_value(it.next().unwrap())?;
                let c = C::from_value(it.next().unwrap())?;
                Ok((a, b, c))
            }
            other => Err(mismatch::<(A, B, C)>(&other)),
        }
    }
}

impl<A: ToType, B: ToType, C: ToType> ToType for (A, B, C) {
    fn to_type() -> Type {
        Type::Tuple(vec![A::to_type(), B::to_type(), C::to_type()])
    }
}

// ---------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------

/// A Merl function viewed from the host with typed argument and result.
pub struct TypedFun<A, R> {
    fun: VFun,
    marker: PhantomData<fn(A) -> R>,
}

impl<A: ToValue, R: FromValue> TypedFun<A, R> {
    pub fn call(&self, implicits: &ImplEnv, arg: A) -> Result<R, EvalError> {
        let result = self.fun.call(implicits, arg.to_value()?)?;
        R::from_value(result)
    }
}

impl<A, R> FromValue for TypedFun<A, R> {
    fn from_value(value: Value) -> Result<TypedFun<A, R>, EvalError> {
        match value {
            Value::Fun(fun) => Ok(TypedFun {
                fun,
                marker: PhantomData,
            }),
            other => Err(EvalError::cast(format!(
                "could not cast {} to a function",
                other
            ))),
        }
    }
}

impl<A, R> ToValue for TypedFun<A, R> {
    fn to_value(self) -> Result<Value, EvalError> {
        Ok(Value::Fun(self.fun))
    }
}

impl<A: ToType, R: ToType> ToType for TypedFun<A, R> {
    fn to_type() -> Type {
        Type::Arrow(Box::new(A::to_type()), Box::new(R::to_type()))
    }
}

/// Lift a one-argument host function: the argument is coerced by
/// `from_value`, the result by `to_value`.
pub fn fun1<A, R, F>(f: F) -> Value
where
    A: FromValue,
    R: ToValue,
    F: Fn(A) -> Result<R, EvalError> + Send + Sync + 'static,
{
    Value::Fun(VFun::new(move |_, arg| {
        f(A::from_value(arg)?).and_then(ToValue::to_value)
    }))
}

/// Lift a two-argument host function into a curried `VFun` chain.
pub fn fun2<A, B, R, F>(f: F) -> Value
where
    A: FromValue + Clone + Send + Sync + 'static,
    B: FromValue,
    R: ToValue,
    F: Fn(A, B) -> Result<R, EvalError> + Send + Sync + Clone + 'static,
{
    Value::Fun(VFun::new(move |_, a_val| {
        let a = A::from_value(a_val)?;
        let f = f.clone();
        Ok(Value::Fun(VFun::new(move |_, b_val| {
            f(a.clone(), B::from_value(b_val)?).and_then(ToValue::to_value)
        })))
    }))
}

/// Lift a three-argument host function into a curried `VFun` chain.
pub fn fun3<A, B, C, R, F>(f: F) -> Value
where
    A: FromValue + Clone + Send + Sync + 'static,
    B: FromValue + Clone + Send + Sync + 'static,
    C: FromValue,
    R: ToValue,
    F: Fn(A, B, C) -> Result<R, EvalError> + Send + Sync + Clone + 'static,
{
    Value::Fun(VFun::new(move |_, a_val| {
        let a = A::from_value(a_val)?;
        let f = f.clone();
        Ok(Value::Fun(VFun::new(move |_, b_val| {
            let b = B::from_value(b_val)?;
            let f = f.clone();
            let a = a.clone();
            Ok(Value::Fun(VFun::new(move |_, c_val| {
                f(a.clone(), b.clone(), C::from_value(c_val)?).and_then(ToValue::to_value)
            })))
        })))
    }))
}

/// Lift a host function whose first parameter is a labelled implicit: the
/// label is looked up in the caller's implicit environment on every
/// invocation, coerced, and passed alongside the explicit argument.
pub fn with_implicit<I, A, R, F>(label: &str, f: F) -> Value
where
    I: FromValue,
    A: FromValue,
    R: ToValue,
    F: Fn(I, A) -> Result<R, EvalError> + Send + Sync + 'static,
{
    let label = label.to_string();
    Value::Fun(VFun::new(move |implicits, arg| {
        let key = ExtIdent::Implicit(label.clone());
        let bound = implicits
            .get(&key)
            .cloned()
            .ok_or_else(|| EvalError::NotFoundInImplicitEnv(label.clone()))?;
        f(I::from_value(bound)?, A::from_value(arg)?).and_then(ToValue::to_value)
    }))
}
