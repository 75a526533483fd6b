//! Expression compilation.
//!
//! The binder never evaluates attribute text itself. It hands a [`Source`]
//! to an [`ExpressionCompiler`] and gets back a [`Callable`] taking one
//! positional argument per declared parameter. [`Interpreter`] is the
//! built-in compiler; embedders may plug in their own.
//!
//! ```rust
//! use hamsta_core::expr::{ExpressionCompiler, Interpreter, Mode, Source};
//! use hamsta_core::value::Value;
//!
//! let compiler = Interpreter::new();
//! let add = compiler
//!     .compile(&Source::new("a + b", "sum", &["a", "b"], Mode::Expression))
//!     .unwrap();
//! assert_eq!(add.call(&[Value::from(2), Value::from(3)]).unwrap(), Value::from(5));
//! ```

mod ast;
mod builtins;
mod interp;
mod lexer;
mod parser;

use std::rc::Rc;

pub use interp::Interpreter;

use crate::dom::Element;
use crate::error::{CompileError, RuntimeError};
use crate::value::Value;

/// Something inline code can call.
pub trait Callable {
    fn call(&self, args: &[Value]) -> Result<Value, RuntimeError>;

    fn name(&self) -> &str {
        "anonymous"
    }
}

/// How the source text is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A single expression; its value is the result.
    Expression,
    /// A statement body; the result is whatever `return` yields.
    Statements,
}

/// Text to compile plus what it needs to know about its surroundings.
#[derive(Debug, Clone, Copy)]
pub struct Source<'a> {
    pub code: &'a str,
    /// Used in diagnostics, usually the attribute name.
    pub label: &'a str,
    /// Parameter names, in the order arguments will be passed.
    pub params: &'a [&'a str],
    pub mode: Mode,
    /// The element the text came from, if any.
    pub element: Option<&'a Element>,
}

impl<'a> Source<'a> {
    pub fn new(code: &'a str, label: &'a str, params: &'a [&'a str], mode: Mode) -> Self {
        Self {
            code,
            label,
            params,
            mode,
            element: None,
        }
    }

    pub fn with_element(mut self, element: &'a Element) -> Self {
        self.element = Some(element);
        self
    }
}

/// Turns source text into a callable, or fails with a [`CompileError`].
pub trait ExpressionCompiler {
    fn compile(&self, source: &Source<'_>) -> Result<Rc<dyn Callable>, CompileError>;
}
