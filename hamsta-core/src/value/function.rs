//! Callable values.

use std::fmt;
use std::rc::Rc;

use super::Value;
use crate::error::RuntimeError;
use crate::expr::Callable;

/// A function value: either a compiled closure or a native Rust function.
#[derive(Clone)]
pub struct Function(Rc<dyn Callable>);

impl Function {
    pub fn new(callable: Rc<dyn Callable>) -> Self {
        Self(callable)
    }

    /// Wrap a Rust closure so inline code can call it.
    ///
    /// ```rust
    /// use hamsta_core::value::{Function, Value};
    ///
    /// let double = Function::native("double", |args| {
    ///     Ok(Value::from(args.first().map(Value::to_number).unwrap_or(0.0) * 2.0))
    /// });
    /// assert_eq!(double.call(&[Value::from(4)]).unwrap(), Value::from(8));
    /// ```
    pub fn native<F>(name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    {
        Self(Rc::new(NativeFunction {
            name: name.into(),
            f: Box::new(f),
        }))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        self.0.call(args)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[function {}]", self.name())
    }
}

struct NativeFunction {
    name: Rc<str>,
    f: Box<dyn Fn(&[Value]) -> Result<Value, RuntimeError>>,
}

impl Callable for NativeFunction {
    fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.f)(args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
