//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which effects depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while an effect is running, the signal registers
//!    that effect as a subscriber and hands the effect a cleanup closure that
//!    undoes the subscription.
//!
//! 2. When a signal's value changes, every subscriber is notified
//!    synchronously, in the order it subscribed, before `set` returns.
//!
//! 3. Setting a value that is the [`SameValue`] as the current one does
//!    nothing.
//!
//! # Cycles
//!
//! There is no cycle detection. An effect that unconditionally writes a new
//! value into a signal it reads re-runs itself recursively until the values
//! converge or the stack runs out. Avoiding that is the caller's job.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::context::ReactiveContext;
use super::equality::SameValue;
use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static SIGNAL_ID_COUNTER: std::cell::Cell<u64> = const { std::cell::Cell::new(0) };
}

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        id
    })
}

struct SignalInner<T> {
    id: u64,
    value: RefCell<T>,
    /// Subscribers in insertion order. Strong references: an effect lives as
    /// long as some signal it read still holds it, or until it is disposed.
    subscribers: RefCell<IndexMap<SubscriberId, Rc<dyn Subscriber>>>,
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use hamsta_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: next_signal_id(),
                value: RefCell::new(value),
                subscribers: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Borrow the current value without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Register the running effect, if any, as a subscriber.
    fn track(&self) {
        let Some(subscriber) = ReactiveContext::current() else {
            return;
        };
        let id = subscriber.id();

        let newly_added = self
            .inner
            .subscribers
            .borrow_mut()
            .insert(id, Rc::clone(&subscriber))
            .is_none();

        if newly_added {
            let weak: Weak<SignalInner<T>> = Rc::downgrade(&self.inner);
            subscriber.add_dependency(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.subscribers.borrow_mut().shift_remove(&id);
                }
            }));
        }
    }

    /// Replace the value without comparing or notifying.
    fn replace(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
    }

    /// Notify all current subscribers that the value has changed.
    fn notify_subscribers(&self) {
        // Snapshot first: subscribers unsubscribe and resubscribe while they run.
        let snapshot: Vec<Rc<dyn Subscriber>> =
            self.inner.subscribers.borrow().values().cloned().collect();

        for subscriber in snapshot {
            subscriber.notify();
        }
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Whether `subscriber` currently depends on this signal.
    pub fn has_subscriber(&self, subscriber: SubscriberId) -> bool {
        self.inner.subscribers.borrow().contains_key(&subscriber)
    }

    /// Whether two handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Get the current value.
    ///
    /// If called while an effect is running, this also registers that effect
    /// as a subscriber.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: SameValue + 'static> Signal<T> {
    /// Set a new value and notify subscribers.
    ///
    /// A value that is the same as the current one is ignored. Otherwise every
    /// dependent effect re-runs before this call returns.
    pub fn set(&self, value: T) {
        let unchanged = self.inner.value.borrow().same_value(&value);
        if unchanged {
            return;
        }

        self.replace(value);
        self.notify_subscribers();
    }

    /// Update the value using a function of the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = {
            let current = self.inner.value.borrow();
            f(&current)
        };
        self.set(next);
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// The read half returned by [`create_signal`].
pub struct ReadSignal<T: 'static>(Signal<T>);

/// The write half returned by [`create_signal`].
pub struct WriteSignal<T: 'static>(Signal<T>);

impl<T: Clone + 'static> ReadSignal<T> {
    /// Read the value, tracking the read.
    pub fn get(&self) -> T {
        self.0.get()
    }

    pub fn get_untracked(&self) -> T {
        self.0.get_untracked()
    }
}

impl<T: 'static> ReadSignal<T> {
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(f)
    }

    /// The underlying shared cell.
    pub fn signal(&self) -> &Signal<T> {
        &self.0
    }
}

impl<T: SameValue + 'static> WriteSignal<T> {
    /// Replace the value, notifying subscribers unless it is the same value.
    pub fn set(&self, value: T) {
        self.0.set(value);
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.0.update(f);
    }
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: 'static> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Create a signal and return its getter and setter halves.
///
/// ```rust
/// use hamsta_core::reactive::create_signal;
///
/// let (count, set_count) = create_signal(1);
/// set_count.set(2);
/// assert_eq!(count.get(), 2);
/// ```
pub fn create_signal<T: 'static>(value: T) -> (ReadSignal<T>, WriteSignal<T>) {
    let signal = Signal::new(value);
    (ReadSignal(signal.clone()), WriteSignal(signal))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
