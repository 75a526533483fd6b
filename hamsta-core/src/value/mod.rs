//! Dynamic values.
//!
//! Everything that flows through the named-signal registry, through compiled
//! attribute code, and into directive bindings is a [`Value`]. Conversions
//! (truthiness, numbers, display strings, equality) follow the usual
//! JavaScript rules, since the attribute surface is written in a
//! JavaScript-like language.
//!
//! Arrays and objects are shared and mutable. Cloning a `Value` clones the
//! handle, not the contents, and identity comparison sees through clones.

mod deferred;
mod function;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

pub use deferred::Deferred;
pub use function::Function;

use crate::dom::{Element, Event};
use crate::error::RuntimeError;
use crate::reactive::{same_value_f64, SameValue};
use crate::store::Store;

pub type Array = Rc<RefCell<Vec<Value>>>;
pub type Object = Rc<RefCell<IndexMap<String, Value>>>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Array),
    Object(Object),
    Function(Function),
    /// Property-accessor view over the named-signal registry.
    Signals(Store),
    /// Read-only view over the method registry.
    Methods(Store),
    Element(Element),
    Event(Event),
    Deferred(Deferred),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !(*n == 0.0 || n.is_nan()),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Array(_) => parse_number(&self.to_display()),
            _ => f64::NAN,
        }
    }

    /// The string conversion used for text content and attribute values.
    pub fn to_display(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => join(items, &mut Vec::new()),
            Value::Object(_) | Value::Signals(_) | Value::Methods(_) => "[object Object]".into(),
            Value::Function(f) => format!("function {}() {{ [code] }}", f.name()),
            Value::Element(_) => "[object Element]".into(),
            Value::Event(_) => "[object Event]".into(),
            Value::Deferred(_) => "[object Promise]".into(),
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            _ => "object",
        }
    }

    fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
        )
    }

    /// `===`: no coercion, IEEE comparison for numbers, identity for references.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.same_value(other),
        }
    }

    /// `==`: nullish values equal each other, primitives coerce to numbers.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_))
                if self.is_primitive() && other.is_primitive() =>
            {
                self.to_number() == other.to_number()
            }
            (Value::Bool(b), reference) | (reference, Value::Bool(b)) => {
                Value::Number(f64::from(u8::from(*b))).loose_eq(reference)
            }
            (a, b) if a.is_primitive() && !b.is_primitive() => {
                a.loose_eq(&Value::string(b.to_display()))
            }
            (a, b) if !a.is_primitive() && b.is_primitive() => {
                Value::string(a.to_display()).loose_eq(b)
            }
            _ => self.strict_eq(other),
        }
    }

    /// Convert from JSON, e.g. to seed signals from configuration.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s.as_str()),
            serde_json::Value::Array(items) => Value::array(items.iter().map(Value::from_json)),
            serde_json::Value::Object(map) => {
                Value::object(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
            }
        }
    }

    /// Convert to JSON. Values with no JSON form (functions, elements,
    /// `undefined`, non-finite numbers) yield `None`. Inside an array they
    /// become `null`; inside an object the entry is dropped. A container
    /// that contains itself is a type error.
    pub fn to_json(&self) -> Result<Option<serde_json::Value>, RuntimeError> {
        self.json_in(&mut Vec::new())
    }

    fn json_in(&self, ancestors: &mut Vec<*const ()>) -> Result<Option<serde_json::Value>, RuntimeError> {
        Ok(Some(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serde_json::Value::from(*n as i64)
            }
            Value::Number(n) => match serde_json::Number::from_f64(*n) {
                Some(n) => serde_json::Value::Number(n),
                None => return Ok(None),
            },
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => {
                enter_json(ancestors, Rc::as_ptr(items).cast())?;
                let out = items
                    .borrow()
                    .iter()
                    .map(|item| {
                        item.json_in(ancestors)
                            .map(|json| json.unwrap_or(serde_json::Value::Null))
                    })
                    .collect::<Result<Vec<_>, RuntimeError>>();
                ancestors.pop();
                serde_json::Value::Array(out?)
            }
            Value::Object(map) => {
                enter_json(ancestors, Rc::as_ptr(map).cast())?;
                let out = map
                    .borrow()
                    .iter()
                    .filter_map(|(k, v)| {
                        v.json_in(ancestors)
                            .transpose()
                            .map(|json| json.map(|json| (k.clone(), json)))
                    })
                    .collect::<Result<serde_json::Map<_, _>, RuntimeError>>();
                ancestors.pop();
                serde_json::Value::Object(out?)
            }
            _ => return Ok(None),
        }))
    }
}

/// `Array.prototype.join(",")`. An array met again inside itself prints
/// as empty.
fn join(items: &Array, ancestors: &mut Vec<*const RefCell<Vec<Value>>>) -> String {
    let ptr = Rc::as_ptr(items);
    if ancestors.contains(&ptr) {
        return String::new();
    }
    ancestors.push(ptr);
    let parts: Vec<String> = items
        .borrow()
        .iter()
        .map(|item| match item {
            Value::Undefined | Value::Null => String::new(),
            Value::Array(inner) => join(inner, ancestors),
            other => other.to_display(),
        })
        .collect();
    ancestors.pop();
    parts.join(",")
}

fn enter_json(ancestors: &mut Vec<*const ()>, ptr: *const ()) -> Result<(), RuntimeError> {
    if ancestors.contains(&ptr) {
        return Err(RuntimeError::Type("converting circular structure to JSON".into()));
    }
    ancestors.push(ptr);
    Ok(())
}

impl SameValue for Value {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => same_value_f64(*a, *b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Signals(a), Value::Signals(b)) | (Value::Methods(a), Value::Methods(b)) => {
                a.ptr_eq(b)
            }
            (Value::Element(a), Value::Element(b)) => a == b,
            (Value::Event(a), Value::Event(b)) => a.ptr_eq(b),
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Equality in tests and maps is identity, the same comparison `set` uses.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Shown {
            value: self,
            ancestors: &RefCell::new(Vec::new()),
        }
        .fmt(f)
    }
}

/// Debug view that prints a container met again inside itself as `[..]`.
struct Shown<'a> {
    value: &'a Value,
    ancestors: &'a RefCell<Vec<*const ()>>,
}

impl Shown<'_> {
    fn nested<'b>(&'b self, value: &'b Value) -> Shown<'b> {
        Shown {
            value,
            ancestors: self.ancestors,
        }
    }

    fn container(
        &self,
        f: &mut fmt::Formatter<'_>,
        ptr: *const (),
        write: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
    ) -> fmt::Result {
        if self.ancestors.borrow().contains(&ptr) {
            return f.write_str("[..]");
        }
        self.ancestors.borrow_mut().push(ptr);
        let result = write(f);
        self.ancestors.borrow_mut().pop();
        result
    }
}

impl fmt::Debug for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&number_to_string(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => self.container(f, Rc::as_ptr(items).cast(), |f| {
                f.debug_list()
                    .entries(items.borrow().iter().map(|item| self.nested(item)))
                    .finish()
            }),
            Value::Object(map) => self.container(f, Rc::as_ptr(map).cast(), |f| {
                f.debug_map()
                    .entries(map.borrow().iter().map(|(k, v)| (k, self.nested(v))))
                    .finish()
            }),
            Value::Function(func) => write!(f, "{func:?}"),
            Value::Signals(_) => f.write_str("[signals]"),
            Value::Methods(_) => f.write_str("[methods]"),
            Value::Element(el) => write!(f, "{el}"),
            Value::Event(ev) => write!(f, "[event {}]", ev.event_type()),
            Value::Deferred(_) => f.write_str("[deferred]"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Element> for Value {
    fn from(el: Element) -> Self {
        Value::Element(el)
    }
}

impl From<Deferred> for Value {
    fn from(d: Deferred) -> Self {
        Value::Deferred(d)
    }
}

/// Number-to-string conversion: integral values print without a fraction.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".into()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

/// String-to-number conversion: blank is zero, anything malformed is NaN.
pub fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let well_formed = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !well_formed {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        for falsy in [
            Value::Undefined,
            Value::Null,
            Value::Bool(false),
            Value::from(0),
            Value::from(-0.0),
            Value::from(f64::NAN),
            Value::from(""),
        ] {
            assert!(!falsy.truthy(), "{falsy:?} should be falsy");
        }
        assert!(Value::from("0").truthy());
        assert!(Value::array([]).truthy());
        assert!(Value::object::<&str>([]).truthy());
    }

    #[test]
    fn number_formatting() {
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(-3.0), "-3");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn string_to_number() {
        assert_eq!(parse_number(" 42 "), 42.0);
        assert_eq!(parse_number(""), 0.0);
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("12px").is_nan());
        assert_eq!(parse_number("1e3"), 1000.0);
    }

    #[test]
    fn display_of_containers() {
        let arr = Value::array([Value::from(1), Value::Null, Value::from("x")]);
        assert_eq!(arr.to_display(), "1,,x");
        assert_eq!(Value::object([("a", Value::from(1))]).to_display(), "[object Object]");
    }

    #[test]
    fn same_value_semantics() {
        assert!(Value::from(f64::NAN).same_value(&Value::from(f64::NAN)));
        assert!(!Value::from(0.0).same_value(&Value::from(-0.0)));
        assert!(Value::from("a").same_value(&Value::from("a")));

        let obj = Value::object([("a", Value::from(1))]);
        assert!(obj.same_value(&obj.clone()));
        assert!(!obj.same_value(&Value::object([("a", Value::from(1))])));
    }

    #[test]
    fn strict_and_loose_equality() {
        assert!(!Value::from(f64::NAN).strict_eq(&Value::from(f64::NAN)));
        assert!(Value::from(0.0).strict_eq(&Value::from(-0.0)));
        assert!(!Value::from(1).strict_eq(&Value::from("1")));

        assert!(Value::from(1).loose_eq(&Value::from("1")));
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.loose_eq(&Value::from(0)));
        assert!(Value::Bool(true).loose_eq(&Value::from(1)));
        assert!(Value::array([Value::from(2)]).loose_eq(&Value::from(2)));
    }

    #[test]
    fn json_conversion() {
        let json = serde_json::json!({ "count": 1, "tags": ["a", null], "on": true });
        let value = Value::from_json(&json);
        assert_eq!(value.to_json().unwrap(), Some(json));
        assert_eq!(Value::Undefined.to_json().unwrap(), None);

        // Shared, but not circular.
        let shared = Value::array([Value::from(1)]);
        let pair = Value::array([shared.clone(), shared]);
        assert_eq!(pair.to_json().unwrap(), Some(serde_json::json!([[1], [1]])));
    }

    #[test]
    fn circular_containers() {
        let items: Array = Rc::new(RefCell::new(vec![Value::from(1)]));
        items.borrow_mut().push(Value::Array(items.clone()));
        let array = Value::Array(items.clone());

        assert_eq!(array.to_display(), "1,");
        assert!(array.to_number().is_nan());
        assert!(matches!(array.to_json(), Err(RuntimeError::Type(_))));
        assert_eq!(format!("{array:?}"), "[1, [..]]");

        let object = Value::object([("a", Value::from(1))]);
        if let Value::Object(map) = &object {
            map.borrow_mut().insert("me".into(), object.clone());
        }
        assert!(matches!(object.to_json(), Err(RuntimeError::Type(_))));
        assert_eq!(format!("{object:?}"), r#"{"a": 1, "me": [..]}"#);

        // Break the cycles so the test does not leak.
        items.borrow_mut().clear();
        if let Value::Object(map) = &object {
            map.borrow_mut().clear();
        }
    }
}
