//! Host-settled asynchronous results.
//!
//! A [`Deferred`] is what a native function returns when its answer arrives
//! later. Whoever owns the work calls [`Deferred::resolve`] or
//! [`Deferred::reject`]; interested parties attach callbacks. Callbacks
//! attached after settlement run immediately.

use std::cell::RefCell;
use std::rc::Rc;

use super::Value;

type ResolveFn = Box<dyn FnOnce(Value)>;
type RejectFn = Box<dyn FnOnce(String)>;

enum State {
    Pending {
        on_resolve: Vec<ResolveFn>,
        on_reject: Vec<RejectFn>,
    },
    Resolved(Value),
    Rejected(String),
}

#[derive(Clone)]
pub struct Deferred(Rc<RefCell<State>>);

impl Deferred {
    /// A pending deferred.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(State::Pending {
            on_resolve: Vec::new(),
            on_reject: Vec::new(),
        })))
    }

    pub fn resolved(value: Value) -> Self {
        Self(Rc::new(RefCell::new(State::Resolved(value))))
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(State::Rejected(reason.into()))))
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.0.borrow(), State::Pending { .. })
    }

    /// Settle successfully. Ignored if already settled.
    pub fn resolve(&self, value: Value) {
        let callbacks = {
            let mut state = self.0.borrow_mut();
            if !matches!(*state, State::Pending { .. }) {
                return;
            }
            match std::mem::replace(&mut *state, State::Resolved(value.clone())) {
                State::Pending { on_resolve, .. } => on_resolve,
                _ => Vec::new(),
            }
        };

        for callback in callbacks {
            callback(value.clone());
        }
    }

    /// Settle as a failure. Ignored if already settled.
    pub fn reject(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let callbacks = {
            let mut state = self.0.borrow_mut();
            if !matches!(*state, State::Pending { .. }) {
                return;
            }
            match std::mem::replace(&mut *state, State::Rejected(reason.clone())) {
                State::Pending { on_reject, .. } => on_reject,
                _ => Vec::new(),
            }
        };

        for callback in callbacks {
            callback(reason.clone());
        }
    }

    pub fn on_resolve(&self, f: impl FnOnce(Value) + 'static) {
        let settled = {
            let mut state = self.0.borrow_mut();
            match &mut *state {
                State::Pending { on_resolve, .. } => {
                    on_resolve.push(Box::new(f));
                    return;
                }
                State::Resolved(value) => value.clone(),
                State::Rejected(_) => return,
            }
        };
        f(settled);
    }

    pub fn on_reject(&self, f: impl FnOnce(String) + 'static) {
        let settled = {
            let mut state = self.0.borrow_mut();
            match &mut *state {
                State::Pending { on_reject, .. } => {
                    on_reject.push(Box::new(f));
                    return;
                }
                State::Rejected(reason) => reason.clone(),
                State::Resolved(_) => return,
            }
        };
        f(settled);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn reject_runs_registered_callbacks_once() {
        let deferred = Deferred::new();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        deferred.on_reject(move |reason| {
            assert_eq!(reason, "boom");
            h.set(h.get() + 1);
        });

        deferred.reject("boom");
        deferred.reject("again");
        assert_eq!(hits.get(), 1);
        assert!(!deferred.is_pending());
    }

    #[test]
    fn late_callbacks_fire_immediately() {
        let deferred = Deferred::rejected("late");
        let seen = Rc::new(RefCell::new(None));

        let s = seen.clone();
        deferred.on_reject(move |reason| *s.borrow_mut() = Some(reason));
        assert_eq!(seen.borrow().as_deref(), Some("late"));
    }

    #[test]
    fn resolve_skips_reject_callbacks() {
        let deferred = Deferred::new();
        let rejected = Rc::new(Cell::new(false));
        let resolved = Rc::new(Cell::new(false));

        let (r, s) = (rejected.clone(), resolved.clone());
        deferred.on_reject(move |_| r.set(true));
        deferred.on_resolve(move |_| s.set(true));

        deferred.resolve(Value::Null);
        assert!(resolved.get());
        assert!(!rejected.get());
    }
}
