//! Globals visible to every compiled body, and the bound methods of
//! built-in value types.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::reactive::{create_effect, SameValue, Signal};
use crate::value::{Deferred, Function, Value};

pub(super) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn callback(args: &[Value], index: usize, what: &str) -> Result<Function, RuntimeError> {
    match args.get(index) {
        Some(Value::Function(f)) => Ok(f.clone()),
        _ => Err(RuntimeError::Type(format!("{what} expects a function"))),
    }
}

pub(super) fn globals() -> IndexMap<&'static str, Value> {
    let mut globals = IndexMap::new();

    globals.insert(
        "createSignal",
        Value::Function(Function::native("createSignal", |args| {
            let signal = Signal::new(arg(args, 0));
            let read = signal.clone();
            let getter = Function::native("get", move |_| Ok(read.get()));
            let setter = Function::native("set", move |args| {
                signal.set(arg(args, 0));
                Ok(Value::Undefined)
            });
            Ok(Value::array([Value::Function(getter), Value::Function(setter)]))
        })),
    );

    globals.insert(
        "createEffect",
        Value::Function(Function::native("createEffect", |args| {
            let body = callback(args, 0, "createEffect")?;
            let disposer = create_effect(move || {
                if let Err(err) = body.call(&[]) {
                    tracing::error!(error = %err, "effect failed");
                }
            });
            let slot = RefCell::new(Some(disposer));
            Ok(Value::Function(Function::native("dispose", move |_| {
                let disposer = slot.borrow_mut().take();
                if let Some(disposer) = disposer {
                    disposer.dispose();
                }
                Ok(Value::Undefined)
            })))
        })),
    );

    globals.insert("Math", math());
    globals.insert("console", console());
    globals.insert("JSON", json());

    globals.insert(
        "String",
        Value::Function(Function::native("String", |args| {
            Ok(Value::string(arg(args, 0).to_display()))
        })),
    );
    globals.insert(
        "Number",
        Value::Function(Function::native("Number", |args| {
            Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))
        })),
    );
    globals.insert(
        "Boolean",
        Value::Function(Function::native("Boolean", |args| {
            Ok(Value::Bool(arg(args, 0).truthy()))
        })),
    );
    globals.insert("NaN", Value::Number(f64::NAN));
    globals.insert("Infinity", Value::Number(f64::INFINITY));

    globals
}

fn math() -> Value {
    fn unary(name: &str, f: fn(f64) -> f64) -> (&str, Value) {
        (
            name,
            Value::Function(Function::native(name, move |args| {
                Ok(Value::Number(f(arg(args, 0).to_number())))
            })),
        )
    }

    Value::object([
        ("PI", Value::Number(std::f64::consts::PI)),
        unary("abs", f64::abs),
        unary("floor", f64::floor),
        unary("ceil", f64::ceil),
        // Halves round up, towards positive infinity.
        unary("round", |n| (n + 0.5).floor()),
        (
            "min",
            Value::Function(Function::native("min", |args| {
                Ok(Value::Number(args.iter().map(Value::to_number).fold(
                    f64::INFINITY,
                    |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(n) },
                )))
            })),
        ),
        (
            "max",
            Value::Function(Function::native("max", |args| {
                Ok(Value::Number(args.iter().map(Value::to_number).fold(
                    f64::NEG_INFINITY,
                    |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(n) },
                )))
            })),
        ),
    ])
}

fn console() -> Value {
    fn join(args: &[Value]) -> String {
        args.iter()
            .map(Value::to_display)
            .collect::<Vec<_>>()
            .join(" ")
    }

    Value::object([
        (
            "log",
            Value::Function(Function::native("log", |args| {
                tracing::info!(target: "hamsta::console", "{}", join(args));
                Ok(Value::Undefined)
            })),
        ),
        (
            "warn",
            Value::Function(Function::native("warn", |args| {
                tracing::warn!(target: "hamsta::console", "{}", join(args));
                Ok(Value::Undefined)
            })),
        ),
        (
            "error",
            Value::Function(Function::native("error", |args| {
                tracing::error!(target: "hamsta::console", "{}", join(args));
                Ok(Value::Undefined)
            })),
        ),
    ])
}

fn json() -> Value {
    Value::object([
        (
            "stringify",
            Value::Function(Function::native("stringify", |args| {
                Ok(match arg(args, 0).to_json()? {
                    Some(json) => Value::string(json.to_string()),
                    None => Value::Undefined,
                })
            })),
        ),
        (
            "parse",
            Value::Function(Function::native("parse", |args| {
                let text = arg(args, 0).to_display();
                serde_json::from_str::<serde_json::Value>(&text)
                    .map(|json| Value::from_json(&json))
                    .map_err(|err| RuntimeError::Thrown(format!("SyntaxError: {err}")))
            })),
        ),
    ])
}

/// Methods and properties of strings.
pub(super) fn string_member(s: &str, property: &str) -> Value {
    fn bind(s: &Rc<str>, name: &str, f: fn(&str, &[Value]) -> Value) -> Value {
        let s = Rc::clone(s);
        Value::Function(Function::native(name, move |args| Ok(f(&s, args))))
    }

    let s: Rc<str> = s.into();

    match property {
        "length" => Value::Number(s.encode_utf16().count() as f64),
        "trim" => bind(&s, "trim", |s, _| Value::string(s.trim())),
        "toUpperCase" => bind(&s, "toUpperCase", |s, _| Value::string(s.to_uppercase())),
        "toLowerCase" => bind(&s, "toLowerCase", |s, _| Value::string(s.to_lowercase())),
        "includes" => bind(&s, "includes", |s, args| {
            Value::Bool(s.contains(arg(args, 0).to_display().as_str()))
        }),
        "startsWith" => bind(&s, "startsWith", |s, args| {
            Value::Bool(s.starts_with(arg(args, 0).to_display().as_str()))
        }),
        "split" => bind(&s, "split", |s, args| match arg(args, 0) {
            Value::Undefined => Value::array([Value::string(s)]),
            sep => {
                let sep = sep.to_display();
                if sep.is_empty() {
                    Value::array(s.chars().map(|c| Value::string(c.to_string())))
                } else {
                    Value::array(s.split(sep.as_str()).map(Value::from))
                }
            }
        }),
        "toString" => bind(&s, "toString", |s, _| Value::string(s)),
        _ => Value::Undefined,
    }
}

/// Methods and properties of arrays.
pub(super) fn array_member(array: &crate::value::Array, property: &str) -> Value {
    let items = array.clone();
    match property {
        "length" => Value::Number(array.borrow().len() as f64),
        "push" => Value::Function(Function::native("push", move |args| {
            let mut items = items.borrow_mut();
            items.extend(args.iter().cloned());
            Ok(Value::Number(items.len() as f64))
        })),
        "includes" => Value::Function(Function::native("includes", move |args| {
            let needle = arg(args, 0);
            // NaN is found, and +0 matches -0.
            Ok(Value::Bool(items
                .borrow()
                .iter()
                .any(|item| item.strict_eq(&needle) || item.same_value(&needle))))
        })),
        "indexOf" => Value::Function(Function::native("indexOf", move |args| {
            let needle = arg(args, 0);
            let index = items.borrow().iter().position(|item| item.strict_eq(&needle));
            Ok(Value::Number(index.map_or(-1.0, |i| i as f64)))
        })),
        "join" => Value::Function(Function::native("join", move |args| {
            let sep = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                sep => sep.to_display(),
            };
            let joined = items
                .borrow()
                .iter()
                .map(|item| if item.is_nullish() { String::new() } else { item.to_display() })
                .collect::<Vec<_>>()
                .join(&sep);
            Ok(Value::string(joined))
        })),
        "map" => Value::Function(Function::native("map", move |args| {
            let f = callback(args, 0, "map")?;
            let snapshot = items.borrow().clone();
            let mapped = snapshot
                .into_iter()
                .enumerate()
                .map(|(i, item)| f.call(&[item, Value::Number(i as f64)]))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::array(mapped))
        })),
        "filter" => Value::Function(Function::native("filter", move |args| {
            let f = callback(args, 0, "filter")?;
            let snapshot = items.borrow().clone();
            let mut kept = Vec::new();
            for (i, item) in snapshot.into_iter().enumerate() {
                if f.call(&[item.clone(), Value::Number(i as f64)])?.truthy() {
                    kept.push(item);
                }
            }
            Ok(Value::array(kept))
        })),
        _ => Value::Undefined,
    }
}

/// `then` and `catch` on a deferred result. Both return a new deferred.
pub(super) fn deferred_member(deferred: &Deferred, property: &str) -> Value {
    let source = deferred.clone();
    match property {
        "then" => Value::Function(Function::native("then", move |args| {
            let on_resolve = callback(args, 0, "then")?;
            let next = Deferred::new();
            let (resolved, rejected) = (next.clone(), next.clone());
            source.on_resolve(move |value| match on_resolve.call(&[value]) {
                Ok(result) => resolved.resolve(result),
                Err(err) => resolved.reject(err.to_string()),
            });
            source.on_reject(move |reason| rejected.reject(reason));
            Ok(Value::Deferred(next))
        })),
        "catch" => Value::Function(Function::native("catch", move |args| {
            let on_reject = callback(args, 0, "catch")?;
            let next = Deferred::new();
            let (resolved, recovered) = (next.clone(), next.clone());
            source.on_resolve(move |value| resolved.resolve(value));
            source.on_reject(move |reason| match on_reject.call(&[Value::string(reason)]) {
                Ok(result) => recovered.resolve(result),
                Err(err) => recovered.reject(err.to_string()),
            });
            Ok(Value::Deferred(next))
        })),
        _ => Value::Undefined,
    }
}
