//! Visibility with optional enter/leave transitions.
//!
//! Two states, shown and hidden. Each evaluation runs inside the binding's
//! effect, and everything it schedules (the frame that adds enter classes,
//! the listeners waiting for the leave transition to end) is registered with
//! [`on_cleanup`]. The next evaluation therefore starts with nothing in
//! flight.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::dom::{Document, Element, Event, ListenerId};
use crate::reactive::on_cleanup;

pub(super) type ClassList = SmallVec<[String; 4]>;

const END_EVENTS: [&str; 2] = ["transitionend", "animationend"];

pub(super) struct Show {
    el: Element,
    document: Document,
    /// Display value to restore when shown; empty means "no inline value".
    display: String,
    enter: Rc<ClassList>,
    leave: Rc<ClassList>,
}

impl Show {
    pub(super) fn new(el: &Element, document: &Document, enter: ClassList, leave: ClassList) -> Self {
        let display = match el.computed_display() {
            d if d == "none" => String::new(),
            d => d,
        };
        Self {
            el: el.clone(),
            document: document.clone(),
            display,
            enter: Rc::new(enter),
            leave: Rc::new(leave),
        }
    }

    pub(super) fn apply(&self, visible: bool) {
        if visible {
            self.show();
        } else {
            self.hide();
        }
    }

    fn show(&self) {
        if self.display.is_empty() {
            self.el.remove_style_property("display");
        } else {
            self.el.set_style_property("display", &self.display);
        }
        self.el.remove_classes(self.leave.iter().map(String::as_str));

        if self.enter.is_empty() {
            return;
        }
        let (el, enter) = (self.el.clone(), Rc::clone(&self.enter));
        let frame = self
            .document
            .request_animation_frame(move || el.add_classes(enter.iter().map(String::as_str)));

        let document = self.document.clone();
        on_cleanup(move || {
            document.cancel_animation_frame(frame);
        });
    }

    fn hide(&self) {
        if self.leave.is_empty() || self.el.computed_display() == "none" {
            self.el.set_style_property("display", "none");
            return;
        }

        self.el.remove_classes(self.enter.iter().map(String::as_str));
        self.el.add_classes(self.leave.iter().map(String::as_str));

        let pending: Rc<RefCell<SmallVec<[ListenerId; 2]>>> = Rc::default();
        let finish = {
            let (leave, pending) = (Rc::clone(&self.leave), Rc::clone(&pending));
            Rc::new(move |event: &Event| {
                let (Some(target), Some(el)) = (event.target(), event.current_target()) else {
                    return;
                };
                // Transitions of descendants bubble up here; only ours count.
                if target != el {
                    return;
                }
                el.set_style_property("display", "none");
                el.remove_classes(leave.iter().map(String::as_str));
                for id in pending.borrow_mut().drain(..) {
                    el.remove_event_listener(id);
                }
            })
        };

        for event_type in END_EVENTS {
            let finish = Rc::clone(&finish);
            let id = self
                .el
                .add_event_listener(event_type, move |event| finish(event));
            pending.borrow_mut().push(id);
        }

        let el = self.el.clone();
        on_cleanup(move || {
            for id in pending.borrow_mut().drain(..) {
                el.remove_event_listener(id);
            }
        });
    }
}

/// Split a transition attribute into class tokens.
pub(super) fn class_tokens(attribute: Option<String>) -> ClassList {
    attribute
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Effect, Signal};

    fn bound(el: &Element, document: &Document, enter: &str, leave: &str) -> (Signal<bool>, Effect) {
        let visible = Signal::new(true);
        let show = Show::new(
            el,
            document,
            class_tokens(Some(enter.into())),
            class_tokens(Some(leave.into())),
        );
        let v = visible.clone();
        let effect = Effect::new(move || show.apply(v.get()));
        (visible, effect)
    }

    #[test]
    fn hides_immediately_without_leave_classes() {
        let (document, el) = (Document::new(), Element::new("div"));
        let (visible, _effect) = bound(&el, &document, "", "");

        assert_eq!(el.style_property("display"), Some("block".into()));
        visible.set(false);
        assert_eq!(el.style_property("display"), Some("none".into()));
        visible.set(true);
        assert_eq!(el.style_property("display"), Some("block".into()));
    }

    #[test]
    fn initially_hidden_element_restores_to_no_inline_display() {
        let document = Document::new();
        let el = Element::new("div").with_attr("style", "display: none; color: red");
        let (visible, _effect) = bound(&el, &document, "", "");

        assert_eq!(el.style_property("display"), None);
        assert_eq!(el.get_attribute("style"), Some("color: red;".into()));
        visible.set(false);
        assert_eq!(el.style_property("display"), Some("none".into()));
    }

    #[test]
    fn leave_transition_waits_for_own_end_event() {
        let document = Document::new();
        let child = Element::new("span");
        let el = Element::new("div").with_child(child.clone());
        let (visible, _effect) = bound(&el, &document, "fade-in", "fade-out");
        document.run_frame();
        assert!(el.has_class("fade-in"));

        visible.set(false);
        assert!(el.has_class("fade-out"));
        assert!(!el.has_class("fade-in"));
        assert_eq!(el.style_property("display"), Some("block".into()));

        // A descendant's transition bubbles up and is ignored.
        child.dispatch("transitionend");
        assert_eq!(el.style_property("display"), Some("block".into()));

        el.dispatch("animationend");
        assert_eq!(el.style_property("display"), Some("none".into()));
        assert!(!el.has_class("fade-out"));
        assert_eq!(el.listener_count(), 0);
    }

    #[test]
    fn rapid_toggle_cancels_pending_work() {
        let (document, el) = (Document::new(), Element::new("div"));
        let (visible, effect) = bound(&el, &document, "fade-in", "fade-out");
        assert_eq!(document.pending_frames(), 1);

        // Hiding before the frame runs cancels the enter frame.
        visible.set(false);
        assert_eq!(document.pending_frames(), 0);
        assert_eq!(el.listener_count_for("transitionend"), 1);

        // Showing again drops the leave listeners and reschedules enter.
        visible.set(true);
        assert_eq!(el.listener_count(), 0);
        assert!(!el.has_class("fade-out"));
        assert_eq!(document.pending_frames(), 1);

        effect.dispose();
        assert_eq!(document.pending_frames(), 0);
    }
}
