//! Integration Tests for Directive Binding
//!
//! These tests mount real element trees and verify that signals, effects,
//! and directives work together end to end.

use std::cell::Cell;
use std::rc::Rc;

use hamsta_core::reactive::{create_effect, Effect, Signal};
use hamsta_core::value::{Deferred, Function};
use hamsta_core::{
    init, Collector, Config, DiagnosticKind, Document, Element, Root, RuntimeError, Value,
};

/// Mount `tree` under the body of a fresh document, collecting diagnostics.
fn mount(tree: &Element) -> (Document, Root, Collector) {
    let document = Document::new();
    document.body().append_child(tree);
    let collector = Collector::new();
    let root = Root::builder(&document)
        .diagnostics(collector.clone())
        .mount(None);
    (document, root, collector)
}

/// Test that setting a signal to its current value notifies nobody.
#[test]
fn same_value_set_is_a_no_op() {
    let signal = Signal::new(f64::NAN);
    let runs = Rc::new(Cell::new(0));

    let (s, r) = (signal.clone(), runs.clone());
    let _effect = Effect::new(move || {
        s.get();
        r.set(r.get() + 1);
    });

    signal.set(f64::NAN);
    signal.set(f64::NAN);
    assert_eq!(runs.get(), 1);

    // -0 is a different value from +0.
    let zero = Signal::new(0.0);
    let (z, r) = (zero.clone(), runs.clone());
    let _effect = Effect::new(move || {
        z.get();
        r.set(r.get() + 1);
    });
    zero.set(-0.0);
    assert_eq!(runs.get(), 3);
}

/// Test that an effect's dependencies always match its latest run.
#[test]
fn dependency_set_follows_latest_run() {
    let use_a = Signal::new(true);
    let a = Signal::new(1);
    let b = Signal::new(2);

    let (u, a2, b2) = (use_a.clone(), a.clone(), b.clone());
    let effect = Effect::new(move || {
        if u.get() {
            a2.get();
        } else {
            b2.get();
        }
    });
    assert!(a.has_subscriber(effect.id()));
    assert!(!b.has_subscriber(effect.id()));

    use_a.set(false);
    assert!(!a.has_subscriber(effect.id()));
    assert!(b.has_subscriber(effect.id()));
    assert_eq!(effect.dependency_count(), 2);

    let runs = effect.run_count();
    a.set(10);
    assert_eq!(effect.run_count(), runs);
}

/// Test that a disposed effect never runs again.
#[test]
fn disposed_effect_stays_inert() {
    let signal = Signal::new(0);
    let runs = Rc::new(Cell::new(0));

    let (s, r) = (signal.clone(), runs.clone());
    let dispose = create_effect(move || {
        s.get();
        r.set(r.get() + 1);
    });
    dispose.dispose();

    signal.set(1);
    assert_eq!(runs.get(), 1);
    assert_eq!(signal.subscriber_count(), 0);
}

/// Test that re-declaring `count` keeps the first value.
#[test]
fn duplicate_signal_keeps_first_value() {
    let label = Element::new("span").with_attr("h-text", "count");
    let tree = Element::new("div")
        .with_child(Element::new("div").with_attr("h-signals", "{ count: 1 }"))
        .with_child(Element::new("div").with_attr("h-signals", "{ count: 99 }"))
        .with_child(label.clone());

    let (_document, root, collector) = mount(&tree);
    assert_eq!(label.text_content(), "1");
    assert_eq!(root.store().get("count"), Some(Value::from(1)));

    let collisions = collector.of_kind(DiagnosticKind::NameCollision);
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].attribute, "h-signals");
    root.teardown();
}

/// Test the counter scenario: text follows the store synchronously.
#[test]
fn text_follows_signal() {
    let label = Element::new("span").with_attr("h-text", "count");
    let tree = Element::new("div")
        .with_attr("h-signals", "{ count: 0 }")
        .with_child(label.clone());

    let (_document, root, collector) = mount(&tree);
    assert_eq!(label.text_content(), "0");

    root.store().set("count", Value::from(1)).unwrap();
    assert_eq!(label.text_content(), "1");

    root.store().set("count", Value::Null).unwrap();
    assert_eq!(label.text_content(), "");
    assert!(collector.is_empty());
    root.teardown();
}

/// Test that click handlers update signals and methods see the store.
#[test]
fn event_handlers_and_methods() {
    let button = Element::new("button").with_attr("h-on-click", "increment(event.type)");
    let reset = Element::new("button").with_attr("h-on-click", "count = 0; last = el.tagName");
    let label = Element::new("span").with_attr("h-text", "count + ' via ' + last");
    let tree = Element::new("div")
        .with_attr("h-signals", "{ count: 0, last: 'none' }")
        .with_attr("h-methods", "{ increment(kind) { count++; last = kind } }")
        .with_child(button.clone())
        .with_child(reset.clone())
        .with_child(label.clone());

    let (_document, root, collector) = mount(&tree);
    assert_eq!(label.text_content(), "0 via none");

    button.dispatch("click");
    button.dispatch("click");
    assert_eq!(label.text_content(), "2 via click");

    reset.dispatch("click");
    assert_eq!(label.text_content(), "0 via BUTTON");
    assert!(collector.is_empty(), "{:?}", collector.entries());
    root.teardown();
}

/// Test hiding without transition classes: display is `none` immediately.
#[test]
fn show_without_transition() {
    let panel = Element::new("div").with_attr("h-show", "visible");
    let tree = Element::new("main")
        .with_attr("h-signals", "{ visible: true }")
        .with_child(panel.clone());

    let (document, root, _collector) = mount(&tree);
    assert_ne!(panel.style_property("display"), Some("none".into()));

    root.store().set("visible", Value::Bool(false)).unwrap();
    assert_eq!(panel.style_property("display"), Some("none".into()));
    assert_eq!(document.pending_frames(), 0);
    assert_eq!(panel.listener_count(), 0);
    root.teardown();
}

/// Test that showing again during a pending leave transition cancels it.
#[test]
fn show_cancels_pending_leave() {
    let panel = Element::new("div")
        .with_attr("h-show", "visible")
        .with_attr("h-transition-enter", "fade-in")
        .with_attr("h-transition-leave", "fade-out");
    let tree = Element::new("main")
        .with_attr("h-signals", "{ visible: true }")
        .with_child(panel.clone());

    let (document, root, collector) = mount(&tree);
    document.run_frame();
    assert!(panel.has_class("fade-in"));

    // Start leaving: leave classes on, display untouched until the end event.
    root.store().set("visible", Value::Bool(false)).unwrap();
    assert!(panel.has_class("fade-out"));
    assert!(!panel.has_class("fade-in"));
    assert_ne!(panel.style_property("display"), Some("none".into()));
    assert_eq!(panel.listener_count_for("transitionend"), 1);
    assert_eq!(panel.listener_count_for("animationend"), 1);

    // Show again before the transition ends.
    root.store().set("visible", Value::Bool(true)).unwrap();
    assert_eq!(panel.listener_count(), 0);
    assert!(!panel.has_class("fade-out"));
    assert!(!panel.has_class("fade-in"));
    assert_ne!(panel.style_property("display"), Some("none".into()));

    // A stale end event changes nothing.
    panel.dispatch("transitionend");
    assert_ne!(panel.style_property("display"), Some("none".into()));

    // Enter classes land one frame later.
    assert_eq!(document.run_frame(), 1);
    assert!(panel.has_class("fade-in"));

    // Full leave completes on the end event.
    root.store().set("visible", Value::Bool(false)).unwrap();
    panel.dispatch("transitionend");
    assert_eq!(panel.style_property("display"), Some("none".into()));
    assert!(!panel.has_class("fade-out"));
    assert!(collector.is_empty());
    root.teardown();
}

/// Test that reactive class tokens never accumulate across runs.
#[test]
fn class_tokens_are_rederived() {
    let item = Element::new("li")
        .with_attr("class", "item base")
        .with_attr("h-class", "active ? 'on' : 'off'");
    let tree = Element::new("ul")
        .with_attr("h-signals", "{ active: true }")
        .with_child(item.clone());

    let (_document, root, _collector) = mount(&tree);
    assert_eq!(item.class_list(), vec!["item", "base", "on"]);

    root.store().set("active", Value::Bool(false)).unwrap();
    assert_eq!(item.class_list(), vec!["item", "base", "off"]);

    root.store().set("active", Value::Bool(true)).unwrap();
    assert_eq!(item.class_list(), vec!["item", "base", "on"]);
    root.teardown();
}

/// Test style names: camel case is hyphenated, custom properties are not.
#[test]
fn style_property_names() {
    let swatch = Element::new("div").with_attr(
        "h-style",
        "{ backgroundColor: color, '--accent': color, marginTop: null }",
    );
    let tree = Element::new("div")
        .with_attr("h-signals", "{ color: 'teal' }")
        .with_child(swatch.clone());

    let (_document, root, _collector) = mount(&tree);
    assert_eq!(swatch.style_property("background-color"), Some("teal".into()));
    assert_eq!(swatch.style_property("--accent"), Some("teal".into()));
    assert_eq!(swatch.style_property("margin-top"), None);

    root.store().set("color", Value::from("plum")).unwrap();
    assert_eq!(
        swatch.get_attribute("style"),
        Some("background-color: plum; --accent: plum;".into())
    );
    root.teardown();
}

/// Test that generic attribute bindings set, stringify, and remove.
#[test]
fn generic_attribute_binding() {
    let link = Element::new("a")
        .with_attr("h-href", "'/items/' + id")
        .with_attr("h-hidden", "id > 2");
    let tree = Element::new("nav")
        .with_attr("h-signals", "{ id: 1 }")
        .with_child(link.clone());

    let (_document, root, _collector) = mount(&tree);
    assert_eq!(link.get_attribute("href"), Some("/items/1".into()));
    assert!(!link.has_attribute("hidden"));

    root.store().set("id", Value::from(3)).unwrap();
    assert_eq!(link.get_attribute("href"), Some("/items/3".into()));
    assert_eq!(link.get_attribute("hidden"), Some(String::new()));
    root.teardown();
}

/// Test that one bad attribute does not stop the rest of the tree.
#[test]
fn compile_errors_are_isolated() {
    let broken = Element::new("p").with_attr("h-text", "count +");
    let working = Element::new("p").with_attr("h-text", "count * 2");
    let tree = Element::new("div")
        .with_attr("h-signals", "{ count: 4 }")
        .with_child(broken.clone())
        .with_child(working.clone());

    let (_document, root, collector) = mount(&tree);
    assert_eq!(broken.text_content(), "");
    assert_eq!(working.text_content(), "8");

    let errors = collector.of_kind(DiagnosticKind::Compile);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].attribute, "h-text");
    assert_eq!(errors[0].element.as_ref(), Some(&broken));
    assert_eq!(root.binding_count(), 1);
    root.teardown();
}

/// Test that absurdly nested attribute text is a compile error, not a crash.
#[test]
fn deep_nesting_is_a_compile_error() {
    let code = format!("{}1{}", "(".repeat(300), ")".repeat(300));
    let nested = Element::new("p").with_attr("h-text", &code);
    let working = Element::new("p").with_attr("h-text", "'ok'");
    let tree = Element::new("div")
        .with_child(nested.clone())
        .with_child(working.clone());

    let (_document, root, collector) = mount(&tree);
    assert_eq!(working.text_content(), "ok");

    let errors = collector.of_kind(DiagnosticKind::Compile);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("nesting too deep"));
    assert_eq!(errors[0].element.as_ref(), Some(&nested));
    root.teardown();
}

/// Test that an effect writing the signal it reads stops at the call depth
/// limit and is reported, instead of exhausting the stack.
#[test]
fn self_feeding_effect_is_reported() {
    let label = Element::new("span").with_attr("h-text", "count++");
    let tree = Element::new("div")
        .with_attr("h-signals", "{ count: 0 }")
        .with_child(label.clone());

    let (_document, root, collector) = mount(&tree);

    let errors = collector.of_kind(DiagnosticKind::Runtime);
    assert!(!errors.is_empty());
    let expected = RuntimeError::CallDepth(Config::default().max_call_depth).to_string();
    assert!(errors[0].message.contains(&expected));
    assert_eq!(errors[0].element.as_ref(), Some(&label));
    root.teardown();
}

/// Test that a failing handler is reported and later clicks still run.
#[test]
fn handler_errors_are_reported() {
    let button = Element::new("button").with_attr("h-on-click", "if (count > 0) missing(); count++");
    let tree = Element::new("div")
        .with_attr("h-signals", "{ count: 0 }")
        .with_child(button.clone());

    let (_document, root, collector) = mount(&tree);
    button.dispatch("click");
    button.dispatch("click");

    assert_eq!(root.store().get("count"), Some(Value::from(1)));
    let errors = collector.of_kind(DiagnosticKind::Runtime);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, RuntimeError::Reference("missing".into()).to_string());
    root.teardown();
}

/// Test that a rejected asynchronous handler result reaches diagnostics.
#[test]
fn rejected_handler_result_is_reported() {
    let button = Element::new("button").with_attr("h-on-click", "return methods.load()");
    let tree = Element::new("div")
        .with_attr("h-signals", "{}")
        .with_child(button.clone());

    let document = Document::new();
    document.body().append_child(&tree);
    let collector = Collector::new();
    let root = Root::builder(&document)
        .diagnostics(collector.clone())
        .mount(None);

    let pending = Deferred::new();
    let task = pending.clone();
    root.store()
        .register_method(
            "load",
            Value::Function(Function::native("load", move |_| Ok(Value::Deferred(task.clone())))),
        )
        .unwrap();

    button.dispatch("click");
    pending.reject("timeout");

    let errors = collector.of_kind(DiagnosticKind::Runtime);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "rejected: timeout");
    root.teardown();
}

/// Test that teardown stops every binding and clears the store.
#[test]
fn teardown_disposes_everything() {
    let label = Element::new("span").with_attr("h-text", "count");
    let button = Element::new("button").with_attr("h-on-click", "count++");
    let tree = Element::new("div")
        .with_attr("h-signals", "{ count: 0 }")
        .with_child(label.clone())
        .with_child(button.clone());

    let (_document, root, _collector) = mount(&tree);
    let store = root.store().clone();
    let count = store.signal("count").unwrap();
    assert_eq!(count.subscriber_count(), 1);

    root.teardown();
    assert_eq!(button.listener_count(), 0);
    assert_eq!(count.subscriber_count(), 0);
    assert!(store.signal_names().is_empty());

    // The orphaned signal no longer drives the label.
    count.set(Value::from(7));
    assert_eq!(label.text_content(), "0");
    // Elements stay in the document.
    assert_eq!(label.parent(), Some(tree.clone()));
}

/// Test the default entry point with a custom configuration file.
#[test]
fn init_uses_body_by_default() {
    let document = Document::new();
    let label = Element::new("span").with_attr("h-text", "greeting.toUpperCase()");
    document
        .body()
        .append_child(&Element::new("div").with_attr("h-signals", "{ greeting: 'hi' }"));
    document.body().append_child(&label);

    let root = init(&document, None);
    assert_eq!(label.text_content(), "HI");
    root.teardown();

    let config = Config::from_json(r#"{ "prefix": "data-", "event_prefix": "when-" }"#).unwrap();
    assert_eq!(config.attribute("text"), "data-text");
}
