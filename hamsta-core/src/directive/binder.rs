//! One binding strategy per directive kind.

use std::rc::Rc;

use heck::ToKebabCase;
use smallvec::SmallVec;

use super::kind::Directive;
use super::show::{class_tokens, Show};
use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::dom::{Document, Element};
use crate::error::{RuntimeError, StoreError};
use crate::expr::{Callable, ExpressionCompiler, Mode, Source};
use crate::reactive::{create_effect, untrack, Disposer};
use crate::store::Store;
use crate::value::Value;

/// Parameters of reactive directive code.
const REACTIVE_PARAMS: &[&str] = &["signals", "methods", "el"];
/// Parameters of event handler code.
const EVENT_PARAMS: &[&str] = &["event", "signals", "methods", "el"];

/// Attaches directives to elements.
///
/// Every failure is reported to the diagnostics sink and skips only the
/// binding it belongs to.
pub struct Binder {
    document: Document,
    store: Store,
    compiler: Rc<dyn ExpressionCompiler>,
    diagnostics: Rc<dyn DiagnosticSink>,
    config: Config,
}

impl Binder {
    pub fn new(
        document: &Document,
        store: &Store,
        compiler: Rc<dyn ExpressionCompiler>,
        diagnostics: Rc<dyn DiagnosticSink>,
        config: Config,
    ) -> Self {
        Self {
            document: document.clone(),
            store: store.clone(),
            compiler,
            diagnostics,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn report(&self, kind: DiagnosticKind, attribute: &str, message: impl Into<String>, el: &Element) {
        self.diagnostics
            .report(Diagnostic::new(kind, attribute, message, Some(el)));
    }

    fn compile(
        &self,
        el: &Element,
        attribute: &str,
        code: &str,
        params: &[&str],
        mode: Mode,
    ) -> Option<Rc<dyn Callable>> {
        let source = Source::new(code, attribute, params, mode).with_element(el);
        match self.compiler.compile(&source) {
            Ok(callable) => Some(callable),
            Err(err) => {
                self.report(DiagnosticKind::Compile, attribute, err.to_string(), el);
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Evaluate `code` with `args` and expect an object literal result.
    fn declaration_entries(
        &self,
        el: &Element,
        attribute: &str,
        code: &str,
        params: &[&str],
        args: &[Value],
    ) -> Vec<(String, Value)> {
        if code.trim().is_empty() {
            return Vec::new();
        }
        let Some(callable) = self.compile(el, attribute, code, params, Mode::Expression) else {
            return Vec::new();
        };
        match untrack(|| callable.call(args)) {
            Ok(Value::Object(map)) => map
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Ok(_) => {
                self.report(DiagnosticKind::Runtime, attribute, "expected an object literal", el);
                Vec::new()
            }
            Err(err) => {
                self.report(DiagnosticKind::Runtime, attribute, err.to_string(), el);
                Vec::new()
            }
        }
    }

    /// Register every key of the element's `h-signals` object as a named
    /// signal. Returns how many were registered.
    pub fn declare_signals(&self, el: &Element, code: &str) -> usize {
        let attribute = self.config.attribute("signals");
        let mut registered = 0;
        for (name, value) in self.declaration_entries(el, &attribute, code, &[], &[]) {
            match self.store.register_signal(name, value) {
                Ok(_) => registered += 1,
                Err(err) => self.report(DiagnosticKind::NameCollision, &attribute, err.to_string(), el),
            }
        }
        registered
    }

    /// Register every function in the element's `h-methods` object as a
    /// named method. Returns how many were registered.
    pub fn declare_methods(&self, el: &Element, code: &str) -> usize {
        let attribute = self.config.attribute("methods");
        let args = [self.store.signals_view()];
        let mut registered = 0;
        for (name, value) in self.declaration_entries(el, &attribute, code, &["signals"], &args) {
            match self.store.register_method(name, value) {
                Ok(()) => registered += 1,
                Err(err @ StoreError::NotCallable(_)) => {
                    self.report(DiagnosticKind::InvalidEntry, &attribute, err.to_string(), el)
                }
                Err(err) => self.report(DiagnosticKind::NameCollision, &attribute, err.to_string(), el),
            }
        }
        registered
    }

    // ------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------

    /// Bind every non-declaration directive on `el`, in attribute order.
    pub fn bind_element(&self, el: &Element) -> Vec<Disposer> {
        let mut disposers = Vec::new();
        let mut has_show = false;
        let mut companions = SmallVec::<[String; 2]>::new();

        for (name, code) in el.attributes() {
            let Some(directive) = Directive::parse(&name, &self.config) else {
                continue;
            };
            if directive.is_declaration() {
                continue;
            }
            if directive.is_companion() {
                companions.push(name);
                continue;
            }
            has_show |= directive == Directive::Show;
            if let Some(disposer) = self.bind(el, &name, &code, &directive) {
                disposers.push(disposer);
            }
        }

        if !has_show {
            for name in companions {
                self.report(
                    DiagnosticKind::UsagePlacement,
                    &name,
                    format!("has no effect without {}", self.config.attribute("show")),
                    el,
                );
            }
        }
        disposers
    }

    /// Bind one directive. `None` means the binding was skipped and a
    /// diagnostic was reported.
    pub fn bind(
        &self,
        el: &Element,
        attribute: &str,
        code: &str,
        directive: &Directive,
    ) -> Option<Disposer> {
        match directive {
            Directive::Event(event) => self.bind_event(el, attribute, code, event),
            Directive::Text => self.bind_reactive(el, attribute, code, |el, value| {
                if value.is_nullish() {
                    el.set_text_content("");
                } else {
                    el.set_text_content(&value.to_display());
                }
            }),
            Directive::Show => {
                let show = Show::new(
                    el,
                    &self.document,
                    class_tokens(el.get_attribute(&self.config.attribute("transition-enter"))),
                    class_tokens(el.get_attribute(&self.config.attribute("transition-leave"))),
                );
                self.bind_reactive(el, attribute, code, move |_, value| show.apply(value.truthy()))
            }
            Directive::Class => {
                let original = el.class_list();
                self.bind_reactive(el, attribute, code, move |el, value| {
                    el.set_class_list(original.iter().map(String::as_str).chain(
                        class_contribution(&value).iter().map(String::as_str),
                    ));
                })
            }
            Directive::Style => self.bind_reactive(el, attribute, code, apply_style),
            Directive::Attribute(name) => {
                let name = name.clone();
                self.bind_reactive(el, attribute, code, move |el, value| match value {
                    Value::Bool(true) => el.set_attribute(&name, ""),
                    Value::Bool(false) | Value::Undefined | Value::Null => el.remove_attribute(&name),
                    other => el.set_attribute(&name, &other.to_display()),
                })
            }
            Directive::Signals
            | Directive::Methods
            | Directive::TransitionEnter
            | Directive::TransitionLeave => None,
        }
    }

    /// Compile `code` as an expression and apply its value to `el` in an
    /// effect. A failed run reports and leaves the element as it was.
    fn bind_reactive<F>(&self, el: &Element, attribute: &str, code: &str, apply: F) -> Option<Disposer>
    where
        F: Fn(&Element, Value) + 'static,
    {
        let callable = self.compile(el, attribute, code, REACTIVE_PARAMS, Mode::Expression)?;
        let args = [
            self.store.signals_view(),
            self.store.methods_view(),
            Value::Element(el.clone()),
        ];
        let diagnostics = Rc::clone(&self.diagnostics);
        let (el, attribute) = (el.clone(), attribute.to_string());

        tracing::trace!(attribute = %attribute, element = %el, "binding");
        Some(create_effect(move || match callable.call(&args) {
            Ok(value) => apply(&el, value),
            Err(err) => diagnostics.report(Diagnostic::new(
                DiagnosticKind::Runtime,
                attribute.as_str(),
                err.to_string(),
                Some(&el),
            )),
        }))
    }

    fn bind_event(&self, el: &Element, attribute: &str, code: &str, event_type: &str) -> Option<Disposer> {
        let handler = self.compile(el, attribute, code, EVENT_PARAMS, Mode::Statements)?;
        let (signals, methods) = (self.store.signals_view(), self.store.methods_view());
        let diagnostics = Rc::clone(&self.diagnostics);
        let attribute = attribute.to_string();

        let id = el.add_event_listener(event_type, move |event| {
            let target = event.current_target();
            let args = [
                Value::Event(event.clone()),
                signals.clone(),
                methods.clone(),
                target.clone().map(Value::Element).unwrap_or(Value::Null),
            ];
            let report = {
                let (diagnostics, attribute) = (Rc::clone(&diagnostics), attribute.clone());
                move |err: RuntimeError| {
                    diagnostics.report(Diagnostic::new(
                        DiagnosticKind::Runtime,
                        attribute.as_str(),
                        err.to_string(),
                        target.as_ref(),
                    ))
                }
            };

            match untrack(|| handler.call(&args)) {
                Ok(Value::Deferred(deferred)) => {
                    deferred.on_reject(move |reason| report(RuntimeError::Rejected(reason)));
                }
                Ok(_) => {}
                Err(err) => report(err),
            }
        });

        let el = el.clone();
        Some(Disposer::new(move || {
            el.remove_event_listener(id);
        }))
    }
}

/// Class tokens a class directive result adds on top of the original list.
fn class_contribution(value: &Value) -> SmallVec<[String; 4]> {
    match value {
        Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .filter_map(|item| item.as_str())
            .flat_map(str::split_whitespace)
            .map(str::to_string)
            .collect(),
        Value::Object(map) => map
            .borrow()
            .iter()
            .filter(|(_, on)| on.truthy())
            .map(|(class, _)| class.clone())
            .collect(),
        _ => SmallVec::new(),
    }
}

fn apply_style(el: &Element, value: Value) {
    let Value::Object(map) = value else {
        return;
    };
    let entries: Vec<(String, Value)> = map
        .borrow()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (name, value) in entries {
        if value.is_nullish() {
            continue;
        }
        el.set_style_property(&style_property_name(&name), &value.to_display());
    }
}

/// `backgroundColor` → `background-color`; custom properties pass through.
///
/// A leading capital marks a vendor prefix: `WebkitTransform` →
/// `-webkit-transform`.
pub fn style_property_name(name: &str) -> String {
    if name.starts_with("--") {
        name.to_string()
    } else if name.starts_with(|c: char| c.is_ascii_uppercase()) {
        format!("-{}", name.to_kebab_case())
    } else {
        name.to_kebab_case()
    }
}
