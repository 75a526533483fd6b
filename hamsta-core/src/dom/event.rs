//! Events dispatched through the element tree.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::Element;

struct EventInner {
    event_type: String,
    bubbles: bool,
    target: RefCell<Option<Element>>,
    current_target: RefCell<Option<Element>>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

/// An event. Clones share state, so a handler calling
/// [`Event::prevent_default`] is visible to the dispatcher.
#[derive(Clone)]
pub struct Event {
    inner: Rc<EventInner>,
}

impl Event {
    /// A bubbling event of the given type.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self::with_bubbles(event_type, true)
    }

    pub fn with_bubbles(event_type: impl Into<String>, bubbles: bool) -> Self {
        Self {
            inner: Rc::new(EventInner {
                event_type: event_type.into(),
                bubbles,
                target: RefCell::new(None),
                current_target: RefCell::new(None),
                default_prevented: Cell::new(false),
                propagation_stopped: Cell::new(false),
            }),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.inner.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.inner.bubbles
    }

    /// The element the event was dispatched on.
    pub fn target(&self) -> Option<Element> {
        self.inner.target.borrow().clone()
    }

    /// The element whose listeners are currently running.
    pub fn current_target(&self) -> Option<Element> {
        self.inner.current_target.borrow().clone()
    }

    pub(crate) fn set_target(&self, target: &Element) {
        let mut slot = self.inner.target.borrow_mut();
        if slot.is_none() {
            *slot = Some(target.clone());
        }
    }

    pub(crate) fn set_current_target(&self, current: Option<&Element>) {
        *self.inner.current_target.borrow_mut() = current.cloned();
    }

    pub fn prevent_default(&self) {
        self.inner.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.inner.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.inner.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.inner.propagation_stopped.get()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.inner.event_type)
            .field("default_prevented", &self.default_prevented())
            .finish()
    }
}
