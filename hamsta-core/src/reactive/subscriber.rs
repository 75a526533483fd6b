//! Subscriber types for the reactive system.
//!
//! A Subscriber is any computation that depends on signals. Today that is
//! only effects, but signals talk to their dependents exclusively through the
//! [`Subscriber`] trait.

use std::cell::Cell;

/// A closure that undoes one subscription when invoked.
pub type Cleanup = Box<dyn FnOnce()>;

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. Signals key their
/// subscriber sets by this ID, which makes repeated reads within one run
/// register the dependency only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        thread_local! {
            static COUNTER: Cell<u64> = const { Cell::new(0) };
        }
        COUNTER.with(|counter| {
            let id = counter.get();
            counter.set(id + 1);
            Self(id)
        })
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that can be notified when a signal it read changes.
pub trait Subscriber {
    /// The subscriber's unique ID.
    fn id(&self) -> SubscriberId;

    /// Called synchronously by a signal whose value changed.
    fn notify(&self);

    /// Record how to unsubscribe from a signal read during the current run.
    ///
    /// The subscriber runs every recorded cleanup before its next run and
    /// when it is disposed.
    fn add_dependency(&self, cleanup: Cleanup);

    /// Register a closure to run before the next run and on disposal.
    fn add_cleanup(&self, cleanup: Cleanup);
}
