//! Root controller.
//!
//! Mounting a root runs two passes over the root element and its
//! descendants, in document order:
//!
//! 1. declarations: each `h-signals`, then the same element's `h-methods`;
//! 2. bindings: every other directive.
//!
//! All signals exist before any binding reads them, so a binding may refer
//! to a signal declared further down the tree. [`Root::teardown`] undoes
//! everything the mount created.

use std::rc::Rc;

use crate::config::Config;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink, TracingSink};
use crate::directive::Binder;
use crate::dom::{Document, Element};
use crate::expr::{ExpressionCompiler, Interpreter};
use crate::reactive::Disposer;
use crate::store::Store;

/// Mount with defaults: built-in interpreter, `tracing` diagnostics,
/// default attribute names. `root` defaults to the document body.
///
/// ```rust
/// use hamsta_core::{init, Document, Element, Value};
///
/// let document = Document::new();
/// let label = Element::new("span").with_attr("h-text", "count");
/// document.body().append_child(
///     &Element::new("div")
///         .with_attr("h-signals", "{ count: 0 }")
///         .with_child(label.clone()),
/// );
///
/// let root = init(&document, None);
/// assert_eq!(label.text_content(), "0");
///
/// root.store().set("count", Value::from(1)).unwrap();
/// assert_eq!(label.text_content(), "1");
///
/// root.teardown();
/// ```
pub fn init(document: &Document, root: Option<&Element>) -> Root {
    Root::builder(document).mount(root)
}

pub struct RootBuilder {
    document: Document,
    config: Config,
    store: Option<Store>,
    diagnostics: Rc<dyn DiagnosticSink>,
    compiler: Option<Rc<dyn ExpressionCompiler>>,
}

impl RootBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Share an existing store instead of creating a fresh one.
    pub fn store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    pub fn diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Rc::new(sink);
        self
    }

    pub fn compiler(mut self, compiler: impl ExpressionCompiler + 'static) -> Self {
        self.compiler = Some(Rc::new(compiler));
        self
    }

    /// Run both passes over `root` (or the body) and return the live root.
    pub fn mount(self, root: Option<&Element>) -> Root {
        let element = root.cloned().unwrap_or_else(|| self.document.body());
        let store = self.store.unwrap_or_default();
        let compiler: Rc<dyn ExpressionCompiler> = match self.compiler {
            Some(compiler) => compiler,
            None => Rc::new(Interpreter::with_config(&self.config)),
        };
        let binder = Binder::new(&self.document, &store, compiler, self.diagnostics, self.config);

        let elements = element.subtree();
        let signals_attr = binder.config().attribute("signals");
        let methods_attr = binder.config().attribute("methods");

        let (mut signals, mut methods) = (0, 0);
        for el in &elements {
            match (el.get_attribute(&signals_attr), el.get_attribute(&methods_attr)) {
                (Some(declared), methods_code) => {
                    signals += binder.declare_signals(el, &declared);
                    if let Some(code) = methods_code {
                        methods += binder.declare_methods(el, &code);
                    }
                }
                (None, Some(_)) => binder.report(
                    DiagnosticKind::UsagePlacement,
                    &methods_attr,
                    format!("ignored without {signals_attr} on the same element"),
                    el,
                ),
                (None, None) => {}
            }
        }

        let disposers: Vec<Disposer> = elements
            .iter()
            .flat_map(|el| binder.bind_element(el))
            .collect();

        tracing::debug!(
            root = %element,
            elements = elements.len(),
            signals,
            methods,
            bindings = disposers.len(),
            "mounted"
        );

        Root { store, disposers }
    }
}

/// A mounted root: the store it populated and every binding it created.
///
/// Dropping a `Root` leaves its bindings live; call [`Root::teardown`].
#[must_use = "bindings stay live until `teardown` is called"]
pub struct Root {
    store: Store,
    disposers: Vec<Disposer>,
}

impl Root {
    pub fn builder(document: &Document) -> RootBuilder {
        RootBuilder {
            document: document.clone(),
            config: Config::default(),
            store: None,
            diagnostics: Rc::new(TracingSink),
            compiler: None,
        }
    }

    /// The live signal and method registries.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn binding_count(&self) -> usize {
        self.disposers.len()
    }

    /// Dispose every effect and listener this mount created, then clear
    /// the store. Elements stay in the document as they are.
    pub fn teardown(self) {
        let count = self.disposers.len();
        for disposer in self.disposers {
            disposer.dispose();
        }
        self.store.clear();
        tracing::debug!(bindings = count, "teardown");
    }
}
