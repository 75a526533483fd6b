//! Named signal and method registries.
//!
//! A [`Store`] is the explicit handle a root hands to the binder and to every
//! compiled callable. It owns:
//!
//! - the named-signal registry: name → [`Signal<Value>`], first registration
//!   wins;
//! - the method registry: name → [`Function`], callables only, first
//!   registration wins;
//! - disposers adopted from embedding code, run at [`Store::clear`].
//!
//! Inline code sees the registries through [`Value::Signals`] and
//! [`Value::Methods`]; reading `signals.count` is a tracked `get`, writing it
//! calls the setter.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{RuntimeError, StoreError};
use crate::reactive::{Disposer, Signal};
use crate::value::{Function, Value};

#[derive(Default)]
struct StoreInner {
    signals: RefCell<IndexMap<String, Signal<Value>>>,
    methods: RefCell<IndexMap<String, Function>>,
    adopted: RefCell<Vec<Disposer>>,
}

#[derive(Clone, Default)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named signal seeded with `value`.
    ///
    /// A name that is already registered is refused and the existing signal
    /// keeps its value, so effects already bound to it are never redirected.
    pub fn register_signal(
        &self,
        name: impl Into<String>,
        value: Value,
    ) -> Result<Signal<Value>, StoreError> {
        let name = name.into();
        let mut signals = self.inner.signals.borrow_mut();
        if signals.contains_key(&name) {
            return Err(StoreError::DuplicateSignal(name));
        }
        let signal = Signal::new(value);
        signals.insert(name, signal.clone());
        Ok(signal)
    }

    pub fn signal(&self, name: &str) -> Option<Signal<Value>> {
        self.inner.signals.borrow().get(name).cloned()
    }

    pub fn contains_signal(&self, name: &str) -> bool {
        self.inner.signals.borrow().contains_key(name)
    }

    /// Read a named signal, tracking the read.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.signal(name).map(|signal| signal.get())
    }

    /// Write a named signal. Dependent effects run before this returns.
    pub fn set(&self, name: &str, value: Value) -> Result<(), StoreError> {
        let signal = self
            .signal(name)
            .ok_or_else(|| StoreError::UnknownSignal(name.to_string()))?;
        signal.set(value);
        Ok(())
    }

    /// Registered signal names in registration order.
    pub fn signal_names(&self) -> Vec<String> {
        self.inner.signals.borrow().keys().cloned().collect()
    }

    /// Register a named method. Only functions are accepted.
    pub fn register_method(&self, name: impl Into<String>, value: Value) -> Result<(), StoreError> {
        let name = name.into();
        let Value::Function(function) = value else {
            return Err(StoreError::NotCallable(name));
        };
        let mut methods = self.inner.methods.borrow_mut();
        if methods.contains_key(&name) {
            return Err(StoreError::DuplicateMethod(name));
        }
        methods.insert(name, function);
        Ok(())
    }

    pub fn method(&self, name: &str) -> Option<Function> {
        self.inner.methods.borrow().get(name).cloned()
    }

    /// Call a registered method by name.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let method = self
            .method(name)
            .ok_or_else(|| RuntimeError::Reference(name.to_string()))?;
        method.call(args)
    }

    pub fn method_names(&self) -> Vec<String> {
        self.inner.methods.borrow().keys().cloned().collect()
    }

    /// The property-accessor view over the signal registry.
    pub fn signals_view(&self) -> Value {
        Value::Signals(self.clone())
    }

    /// The read-only view over the method registry.
    pub fn methods_view(&self) -> Value {
        Value::Methods(self.clone())
    }

    /// Hand a disposer to the store; it runs when the store is cleared.
    pub fn adopt(&self, disposer: Disposer) {
        self.inner.adopted.borrow_mut().push(disposer);
    }

    /// Run adopted disposers and empty both registries.
    pub fn clear(&self) {
        let adopted = std::mem::take(&mut *self.inner.adopted.borrow_mut());
        for disposer in adopted {
            disposer.dispose();
        }
        self.inner.signals.borrow_mut().clear();
        self.inner.methods.borrow_mut().clear();
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("signals", &self.signal_names())
            .field("methods", &self.method_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::cell::Cell;

    #[test]
    fn duplicate_signal_keeps_first_value() {
        let store = Store::new();
        store.register_signal("count", Value::from(1)).unwrap();

        let err = store.register_signal("count", Value::from(99)).unwrap_err();
        assert_eq!(err, StoreError::DuplicateSignal("count".into()));
        assert_eq!(store.get("count"), Some(Value::from(1)));
    }

    #[test]
    fn set_notifies_effects_reading_through_the_store() {
        let store = Store::new();
        store.register_signal("count", Value::from(0)).unwrap();
        let seen = Rc::new(Cell::new(0.0));

        let (s, seen_clone) = (store.clone(), seen.clone());
        let _effect = Effect::new(move || {
            seen_clone.set(s.get("count").unwrap_or_default().to_number());
        });

        store.set("count", Value::from(3)).unwrap();
        assert_eq!(seen.get(), 3.0);
    }

    #[test]
    fn set_unknown_signal_fails() {
        let store = Store::new();
        assert_eq!(
            store.set("missing", Value::Null),
            Err(StoreError::UnknownSignal("missing".into()))
        );
    }

    #[test]
    fn methods_must_be_callable_and_unique() {
        let store = Store::new();
        let f = Function::native("noop", |_| Ok(Value::Undefined));

        assert_eq!(
            store.register_method("inc", Value::from(1)),
            Err(StoreError::NotCallable("inc".into()))
        );
        store.register_method("inc", Value::Function(f.clone())).unwrap();
        assert_eq!(
            store.register_method("inc", Value::Function(f)),
            Err(StoreError::DuplicateMethod("inc".into()))
        );
        assert_eq!(store.method_names(), vec!["inc".to_string()]);
    }

    #[test]
    fn call_invokes_registered_method() {
        let store = Store::new();
        store
            .register_method(
                "sum",
                Value::Function(Function::native("sum", |args| {
                    Ok(Value::from(args.iter().map(Value::to_number).sum::<f64>()))
                })),
            )
            .unwrap();

        let result = store.call("sum", &[Value::from(2), Value::from(3)]).unwrap();
        assert_eq!(result, Value::from(5));
        assert!(store.call("missing", &[]).is_err());
    }

    #[test]
    fn clear_runs_adopted_disposers_and_empties_registries() {
        let store = Store::new();
        store.register_signal("a", Value::Null).unwrap();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        store.adopt(Disposer::new(move || r.set(true)));

        store.clear();
        assert!(ran.get());
        assert!(store.signal_names().is_empty());
        assert!(!store.contains_signal("a"));
    }
}
