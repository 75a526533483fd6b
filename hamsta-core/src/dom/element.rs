//! Elements.
//!
//! An [`Element`] is a shared handle: clones refer to the same node and
//! compare equal. Inline styles are kept as an ordered property map and
//! mirrored into the `style` attribute; the class list is read from and
//! written to the `class` attribute.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::Event;

/// Identifies one registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        thread_local! {
            static COUNTER: Cell<u64> = const { Cell::new(0) };
        }
        COUNTER.with(|counter| {
            let id = counter.get();
            counter.set(id + 1);
            Self(id)
        })
    }
}

type Handler = Rc<dyn Fn(&Event)>;

struct Listener {
    id: ListenerId,
    event_type: String,
    handler: Handler,
}

/// A child of an element.
#[derive(Clone)]
pub enum Node {
    Element(Element),
    Text(String),
}

struct ElementInner {
    tag: String,
    attributes: RefCell<IndexMap<String, String>>,
    style: RefCell<IndexMap<String, String>>,
    children: RefCell<Vec<Node>>,
    parent: RefCell<Weak<ElementInner>>,
    value: RefCell<String>,
    listeners: RefCell<Vec<Listener>>,
}

#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "details", "dialog", "div", "dl",
    "fieldset", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "html", "main", "nav", "ol", "p", "pre", "section", "ul",
];

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                tag: tag.into().to_ascii_lowercase(),
                attributes: RefCell::new(IndexMap::new()),
                style: RefCell::new(IndexMap::new()),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(Weak::new()),
                value: RefCell::new(String::new()),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Builder form of [`Element::set_attribute`].
    pub fn with_attr(self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder form of [`Element::append_child`].
    pub fn with_child(self, child: Element) -> Self {
        self.append_child(&child);
        self
    }

    /// Builder form of [`Element::set_text_content`].
    pub fn with_text(self, text: &str) -> Self {
        self.set_text_content(text);
        self
    }

    /// Lower-case tag name.
    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.inner.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.inner.attributes.borrow().contains_key(name)
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        if name == "style" {
            let parsed = parse_style(value);
            *self.inner.style.borrow_mut() = parsed;
        }
        self.inner
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attribute(&self, name: &str) {
        if name == "style" {
            self.inner.style.borrow_mut().clear();
        }
        self.inner.attributes.borrow_mut().shift_remove(name);
    }

    /// All attributes in source order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.inner
            .attributes
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    pub fn class_list(&self) -> Vec<String> {
        self.get_attribute("class")
            .map(|classes| classes.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_list().iter().any(|c| c == class)
    }

    /// Replace the whole class list, dropping duplicates.
    pub fn set_class_list<I, S>(&self, classes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens: SmallVec<[String; 8]> = SmallVec::new();
        for class in classes {
            let class = class.as_ref();
            if !class.is_empty() && !tokens.iter().any(|t| t == class) {
                tokens.push(class.to_string());
            }
        }
        self.set_attribute("class", &tokens.join(" "));
    }

    pub fn add_class(&self, class: &str) {
        self.add_classes(std::iter::once(class));
    }

    pub fn add_classes<'a>(&self, classes: impl IntoIterator<Item = &'a str>) {
        let mut list = self.class_list();
        let before = list.len();
        for class in classes {
            if !list.iter().any(|c| c == class) {
                list.push(class.to_string());
            }
        }
        if list.len() != before {
            self.set_class_list(list);
        }
    }

    pub fn remove_class(&self, class: &str) {
        self.remove_classes(std::iter::once(class));
    }

    pub fn remove_classes<'a>(&self, classes: impl IntoIterator<Item = &'a str>) {
        let mut list = self.class_list();
        let before = list.len();
        for class in classes {
            list.retain(|c| c != class);
        }
        if list.len() != before {
            self.set_class_list(list);
        }
    }

    // ------------------------------------------------------------------
    // Inline style
    // ------------------------------------------------------------------

    pub fn style_property(&self, name: &str) -> Option<String> {
        self.inner.style.borrow().get(name).cloned()
    }

    pub fn set_style_property(&self, name: &str, value: &str) {
        self.inner
            .style
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self.sync_style_attribute();
    }

    pub fn remove_style_property(&self, name: &str) {
        let removed = self.inner.style.borrow_mut().shift_remove(name).is_some();
        if removed {
            self.sync_style_attribute();
        }
    }

    fn sync_style_attribute(&self) {
        let serialized = self
            .inner
            .style
            .borrow()
            .iter()
            .map(|(k, v)| format!("{k}: {v};"))
            .collect::<Vec<_>>()
            .join(" ");
        let mut attributes = self.inner.attributes.borrow_mut();
        if serialized.is_empty() {
            attributes.shift_remove("style");
        } else {
            attributes.insert("style".to_string(), serialized);
        }
    }

    /// The effective `display`: the inline value if one is set, otherwise the
    /// default for this tag.
    pub fn computed_display(&self) -> String {
        if let Some(display) = self.style_property("display") {
            if !display.is_empty() {
                return display;
            }
        }
        match self.tag() {
            "li" => "list-item".into(),
            "table" => "table".into(),
            tag if BLOCK_TAGS.contains(&tag) => "block".into(),
            _ => "inline".into(),
        }
    }

    // ------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------

    pub fn append_child(&self, child: &Element) {
        child.remove();
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner
            .children
            .borrow_mut()
            .push(Node::Element(child.clone()));
    }

    pub fn append_text(&self, text: &str) {
        self.inner
            .children
            .borrow_mut()
            .push(Node::Text(text.to_string()));
    }

    /// Detach from the parent, if any.
    pub fn remove(&self) {
        let parent = self.parent();
        if let Some(parent) = parent {
            parent
                .inner
                .children
                .borrow_mut()
                .retain(|node| !matches!(node, Node::Element(el) if el == self));
        }
        *self.inner.parent.borrow_mut() = Weak::new();
    }

    pub fn parent(&self) -> Option<Element> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| Element { inner })
    }

    pub fn child_nodes(&self) -> Vec<Node> {
        self.inner.children.borrow().clone()
    }

    /// Child elements, skipping text.
    pub fn children(&self) -> Vec<Element> {
        self.inner
            .children
            .borrow()
            .iter()
            .filter_map(|node| match node {
                Node::Element(el) => Some(el.clone()),
                Node::Text(_) => None,
            })
            .collect()
    }

    /// Every element below this one, in document order.
    pub fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let mut stack: Vec<Element> = self.children().into_iter().rev().collect();
        while let Some(el) = stack.pop() {
            stack.extend(el.children().into_iter().rev());
            out.push(el);
        }
        out
    }

    /// This element followed by its descendants.
    pub fn subtree(&self) -> Vec<Element> {
        let mut out = vec![self.clone()];
        out.extend(self.descendants());
        out
    }

    pub fn text_content(&self) -> String {
        let mut text = String::new();
        for node in self.inner.children.borrow().iter() {
            match node {
                Node::Text(t) => text.push_str(t),
                Node::Element(el) => text.push_str(&el.text_content()),
            }
        }
        text
    }

    /// Replace all children with a single text node.
    pub fn set_text_content(&self, text: &str) {
        let old = std::mem::take(&mut *self.inner.children.borrow_mut());
        for node in old {
            if let Node::Element(el) = node {
                *el.inner.parent.borrow_mut() = Weak::new();
            }
        }
        if !text.is_empty() {
            self.append_text(text);
        }
    }

    /// The form-control value.
    pub fn value(&self) -> String {
        self.inner.value.borrow().clone()
    }

    pub fn set_value(&self, value: &str) {
        *self.inner.value.borrow_mut() = value.to_string();
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener<F>(&self, event_type: &str, handler: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        let id = ListenerId::next();
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            event_type: event_type.to_string(),
            handler: Rc::new(handler),
        });
        id
    }

    /// Returns whether the listener was registered here.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    pub fn listener_count_for(&self, event_type: &str) -> usize {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|listener| listener.event_type == event_type)
            .count()
    }

    fn has_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow().iter().any(|l| l.id == id)
    }

    /// Dispatch `event` here, then on each ancestor while it bubbles.
    ///
    /// Returns `false` if a handler called `prevent_default`.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        event.set_target(self);

        let mut path = vec![self.clone()];
        if event.bubbles() {
            let mut cursor = self.parent();
            while let Some(el) = cursor {
                cursor = el.parent();
                path.push(el);
            }
        }

        for el in path {
            event.set_current_target(Some(&el));
            let handlers: Vec<(ListenerId, Handler)> = el
                .inner
                .listeners
                .borrow()
                .iter()
                .filter(|listener| listener.event_type == event.event_type())
                .map(|listener| (listener.id, Rc::clone(&listener.handler)))
                .collect();

            for (id, handler) in handlers {
                // A handler earlier in this dispatch may have removed it.
                if el.has_listener(id) {
                    handler(event);
                }
            }

            if event.propagation_stopped() {
                break;
            }
        }
        event.set_current_target(None);

        !event.default_prevented()
    }

    /// Convenience: dispatch a fresh bubbling event of `event_type`.
    pub fn dispatch(&self, event_type: &str) -> Event {
        let event = Event::new(event_type);
        self.dispatch_event(&event);
        event
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Element {}

/// Short form used in diagnostics: `<div id="app" class="a b">`.
impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag())?;
        for name in ["id", "class"] {
            if let Some(value) = self.get_attribute(name) {
                write!(f, " {name}=\"{value}\"")?;
            }
        }
        f.write_str(">")
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

fn parse_style(text: &str) -> IndexMap<String, String> {
    text.split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let (name, value) = (name.trim(), value.trim());
            (!name.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}
