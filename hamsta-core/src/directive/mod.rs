//! Directives: reserved attributes bound to the store.
//!
//! [`Directive::parse`] resolves an attribute name to one variant, and
//! [`Binder`] maps each variant to a binding strategy:
//!
//! | Directive | Binding |
//! |---|---|
//! | `h-on-<event>` | listener running statements with `event, signals, methods, el` |
//! | `h-text` | effect writing text content (`""` for null/undefined) |
//! | `h-show` | effect driving the show/hide transition machine |
//! | `h-class` | effect writing original classes plus the result's tokens |
//! | `h-style` | effect writing inline style properties |
//! | `h-<name>` | effect writing or removing attribute `<name>` |
//!
//! `h-signals` and `h-methods` are declarations, handled before any binding.

mod binder;
mod kind;
mod show;

pub use binder::{style_property_name, Binder};
pub use kind::Directive;
