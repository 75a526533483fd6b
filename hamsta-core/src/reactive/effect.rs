//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever a signal
//! it read during its last run changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately. That first run
//!    establishes its dependencies (and, for directive bindings, performs the
//!    first DOM write).
//!
//! 2. When any dependency changes, the effect re-runs synchronously, inside
//!    the `set` call that changed it.
//!
//! 3. Before every run, the effect invokes the cleanup recorded for each
//!    signal it read last time, so the dependency set always equals exactly
//!    the signals read by the most recent run.
//!
//! # Cleanup
//!
//! [`on_cleanup`] registers a closure on the running effect. It runs before
//! the next re-run and when the effect is disposed, which is how a binding
//! cancels work (frame callbacks, listeners) scheduled by a superseded run.
//!
//! # Lifetime
//!
//! Dropping an [`Effect`] handle does not stop it. An effect stays alive as
//! long as a signal it depends on holds it. Call [`Effect::dispose`] (or the
//! [`Disposer`] from [`create_effect`]) to stop it and release it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::{Cleanup, Subscriber, SubscriberId};

struct EffectInner {
    id: SubscriberId,
    this: Weak<EffectInner>,
    /// The effect function. Dropped on disposal to break reference cycles.
    body: RefCell<Option<Rc<dyn Fn()>>>,
    /// One unsubscribe closure per signal read during the last run.
    dependencies: RefCell<SmallVec<[Cleanup; 4]>>,
    /// Closures registered through `on_cleanup` during the last run.
    cleanups: RefCell<Vec<Cleanup>>,
    disposed: Cell<bool>,
    run_count: Cell<usize>,
}

impl EffectInner {
    fn run_cleanups(&self) {
        let dependencies = std::mem::take(&mut *self.dependencies.borrow_mut());
        for unsubscribe in dependencies {
            unsubscribe();
        }

        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        for cleanup in cleanups {
            cleanup();
        }
    }

    fn execute(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }

        self.run_cleanups();

        let Some(body) = self.body.borrow().clone() else {
            return;
        };

        let _ctx = ReactiveContext::enter(Rc::clone(self) as Rc<dyn Subscriber>);
        body();

        self.run_count.set(self.run_count.get() + 1);
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.run_cleanups();
        self.body.borrow_mut().take();
    }
}

impl Subscriber for EffectInner {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn notify(&self) {
        if let Some(this) = self.this.upgrade() {
            this.execute();
        }
    }

    fn add_dependency(&self, cleanup: Cleanup) {
        if self.disposed.get() {
            // Disposed mid-run: drop the subscription straight away.
            cleanup();
            return;
        }
        self.dependencies.borrow_mut().push(cleanup);
    }

    fn add_cleanup(&self, cleanup: Cleanup) {
        if self.disposed.get() {
            cleanup();
            return;
        }
        self.cleanups.borrow_mut().push(cleanup);
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use hamsta_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = count.clone();
/// let effect = Effect::new(move || {
///     seen.get();
/// });
///
/// count.set(5);
/// assert_eq!(effect.run_count(), 2);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create a new effect and run it immediately.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create a new effect without running it.
    ///
    /// It has no dependencies until [`Effect::execute`] is called.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        let inner = Rc::new_cyclic(|this| EffectInner {
            id: SubscriberId::new(),
            this: this.clone(),
            body: RefCell::new(Some(Rc::new(run) as Rc<dyn Fn()>)),
            dependencies: RefCell::new(SmallVec::new()),
            cleanups: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
        });
        Self { inner }
    }

    /// Get the subscriber ID of this effect.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Run the effect now, re-collecting its dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Dispose of the effect.
    ///
    /// Unsubscribes from every signal, runs pending cleanups, and makes the
    /// effect inert. Disposing twice is harmless.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Get the number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Get the number of signals read during the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    /// A disposer that disposes this effect.
    pub fn disposer(&self) -> Disposer {
        let inner = Rc::clone(&self.inner);
        Disposer::new(move || inner.dispose())
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A zero-argument operation that reverses a binding's side effects.
#[derive(Default)]
pub struct Disposer(Option<Box<dyn FnOnce()>>);

impl Disposer {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// A disposer that does nothing.
    pub fn noop() -> Self {
        Self(None)
    }

    /// Run the disposal.
    pub fn dispose(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }

    /// Combine several disposers into one that runs them in order.
    pub fn all(disposers: impl IntoIterator<Item = Disposer>) -> Self {
        let disposers: Vec<Disposer> = disposers.into_iter().collect();
        Self::new(move || {
            for disposer in disposers {
                disposer.dispose();
            }
        })
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Disposer").field(&self.0.is_some()).finish()
    }
}

/// Create an effect and return the disposer that stops it.
pub fn create_effect<F>(run: F) -> Disposer
where
    F: Fn() + 'static,
{
    Effect::new(run).disposer()
}

/// Register `f` to run before the current effect's next run and when it is
/// disposed.
///
/// Returns `false`, and runs nothing, when no effect is running.
pub fn on_cleanup(f: impl FnOnce() + 'static) -> bool {
    match ReactiveContext::current() {
        Some(subscriber) => {
            subscriber.add_cleanup(Box::new(f));
            true
        }
        None => false,
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
