//! Hamsta Core
//!
//! Signals plus attribute directives: a document tree kept in sync with
//! reactive state, with no virtual DOM and no compile step.
//!
//! - Reactive primitives (signals, effects, cleanups) with automatic
//!   dependency tracking and synchronous propagation
//! - A named signal and method store shared by every binding of a root
//! - Directives (`h-text`, `h-show`, `h-class`, `h-style`, `h-on-*`, ...)
//!   compiled from attribute text by a pluggable expression compiler
//! - A headless document model the directives write to
//!
//! # Architecture
//!
//! - `reactive`: signals, effects and dependency tracking
//! - `value`: the dynamic values flowing through the store and inline code
//! - `store`: named signal and method registries
//! - `expr`: the expression compiler seam and the built-in interpreter
//! - `dom`: document, elements, events, animation frames
//! - `directive`: directive classification and binding strategies
//! - `root`: two-pass mounting and teardown
//! - `diagnostics`, `config`, `error`: ambient plumbing
//!
//! # Example
//!
//! ```rust
//! use hamsta_core::reactive::{create_effect, create_signal};
//!
//! let (count, set_count) = create_signal(0);
//! let doubled = std::rc::Rc::new(std::cell::Cell::new(0));
//!
//! let out = doubled.clone();
//! let dispose = create_effect(move || out.set(count.get() * 2));
//!
//! set_count.set(5);
//! assert_eq!(doubled.get(), 10);
//! dispose.dispose();
//! ```

pub mod config;
pub mod diagnostics;
pub mod directive;
pub mod dom;
pub mod error;
pub mod expr;
pub mod reactive;
pub mod root;
pub mod store;
pub mod value;

pub use config::Config;
pub use diagnostics::{Collector, Diagnostic, DiagnosticKind, DiagnosticSink, TracingSink};
pub use directive::{Binder, Directive};
pub use dom::{Document, Element, Event};
pub use error::{CompileError, ConfigError, RuntimeError, StoreError};
pub use expr::{Callable, ExpressionCompiler, Interpreter, Mode, Source};
pub use root::{init, Root, RootBuilder};
pub use store::Store;
pub use value::Value;
