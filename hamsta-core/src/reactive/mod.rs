//! Reactive Primitives
//!
//! This module implements the signal store and the effect scheduler.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while an effect runs, the signal registers that effect as a dependent.
//! When the value changes, all dependents re-run before `set` returns.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs once when created and
//! again whenever its dependencies change. Directive bindings are effects that
//! write to the document.
//!
//! # Implementation Notes
//!
//! Propagation is synchronous and depth-first: there is no batching and no
//! deferred queue. The "currently running effect" lives in a thread-local
//! stack (see [`ReactiveContext`]); the whole system is single-threaded and
//! uses `Rc`/`RefCell` throughout.

mod context;
mod effect;
mod equality;
mod signal;
mod subscriber;

pub use context::{untrack, ReactiveContext};
pub use effect::{create_effect, on_cleanup, Disposer, Effect};
pub use equality::{same_value_f32, same_value_f64, SameValue};
pub use signal::{create_signal, ReadSignal, Signal, WriteSignal};
pub use subscriber::{Cleanup, Subscriber, SubscriberId};
