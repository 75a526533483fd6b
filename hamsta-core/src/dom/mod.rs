//! Headless document model.
//!
//! Just enough of a DOM for directive bindings to drive: elements with
//! ordered attributes, a class list, inline styles, text content and event
//! listeners, plus a document owning an animation-frame queue. Everything is
//! single-threaded and reference-counted; an embedding that renders to a
//! real browser mirrors these nodes outward.

mod document;
mod element;
mod event;

pub use document::{Document, FrameId};
pub use element::{Element, ListenerId, Node};
pub use event::Event;
