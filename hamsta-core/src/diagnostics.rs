//! Diagnostics channel.
//!
//! Every failure in the binder (bad attribute code, a handler that fails, a
//! name collision) ends up here instead of propagating. The default sink
//! writes structured `tracing` events; [`Collector`] keeps them in memory.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::dom::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Attribute text could not be compiled; the binding was skipped.
    Compile,
    /// Compiled code failed while running.
    Runtime,
    /// A signal or method name was already taken; the first one stays.
    NameCollision,
    /// A directive was used where it has no effect.
    UsagePlacement,
    /// A declared entry has the wrong type, e.g. an `h-methods` entry that
    /// is not a function; it was skipped.
    InvalidEntry,
}

impl DiagnosticKind {
    pub fn is_error(self) -> bool {
        matches!(self, DiagnosticKind::Compile | DiagnosticKind::Runtime)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::Compile => "compile error",
            DiagnosticKind::Runtime => "runtime error",
            DiagnosticKind::NameCollision => "name collision",
            DiagnosticKind::UsagePlacement => "misplaced directive",
            DiagnosticKind::InvalidEntry => "invalid entry",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The offending attribute name, e.g. `h-text`.
    pub attribute: String,
    pub message: String,
    pub element: Option<Element>,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        attribute: impl Into<String>,
        message: impl Into<String>,
        element: Option<&Element>,
    ) -> Self {
        Self {
            kind,
            attribute: attribute.into(),
            message: message.into(),
            element: element.cloned(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.attribute, self.kind, self.message)?;
        if let Some(element) = &self.element {
            write!(f, " on {element}")?;
        }
        Ok(())
    }
}

/// Where diagnostics go.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// Emits each diagnostic as a `tracing` event: errors at `ERROR`,
/// collisions and placement problems at `WARN`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        let element = diagnostic
            .element
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        if diagnostic.kind.is_error() {
            tracing::error!(
                kind = %diagnostic.kind,
                attribute = %diagnostic.attribute,
                element = %element,
                "{}",
                diagnostic.message
            );
        } else {
            tracing::warn!(
                kind = %diagnostic.kind,
                attribute = %diagnostic.attribute,
                element = %element,
                "{}",
                diagnostic.message
            );
        }
    }
}

/// Keeps every diagnostic in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct Collector {
    entries: Rc<RefCell<Vec<Diagnostic>>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.entries
            .borrow()
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DiagnosticSink for Collector {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries.borrow_mut().push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_clones_share_entries() {
        let collector = Collector::new();
        let sink: Rc<dyn DiagnosticSink> = Rc::new(collector.clone());

        sink.report(Diagnostic::new(
            DiagnosticKind::NameCollision,
            "h-signals",
            "signal \"count\" already exists",
            None,
        ));

        assert_eq!(collector.len(), 1);
        assert_eq!(collector.of_kind(DiagnosticKind::NameCollision).len(), 1);
        assert!(collector.of_kind(DiagnosticKind::Compile).is_empty());
    }

    #[test]
    fn display_names_attribute_and_element() {
        let el = Element::new("span").with_attr("id", "label");
        let diagnostic = Diagnostic::new(DiagnosticKind::Compile, "h-text", "bad", Some(&el));
        assert_eq!(
            diagnostic.to_string(),
            "[h-text] compile error: bad on <span id=\"label\">"
        );
    }

    #[test]
    fn tracing_sink_accepts_every_kind() {
        for kind in [
            DiagnosticKind::Compile,
            DiagnosticKind::Runtime,
            DiagnosticKind::NameCollision,
            DiagnosticKind::UsagePlacement,
            DiagnosticKind::InvalidEntry,
        ] {
            TracingSink.report(Diagnostic::new(kind, "h-x", "message", None));
        }
    }
}
