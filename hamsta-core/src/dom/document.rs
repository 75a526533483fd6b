//! The document and its animation-frame queue.
//!
//! Frames never advance on their own: the host calls [`Document::run_frame`]
//! when it renders. Callbacks requested while a frame runs land in the next
//! frame.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::Element;

/// Identifies a pending animation-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

#[derive(Default)]
struct FrameQueue {
    next_id: u64,
    pending: IndexMap<FrameId, Box<dyn FnOnce()>>,
}

struct DocumentInner {
    html: Element,
    body: Element,
    frames: RefCell<FrameQueue>,
}

#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl Document {
    pub fn new() -> Self {
        let html = Element::new("html");
        let body = Element::new("body");
        html.append_child(&body);
        Self {
            inner: Rc::new(DocumentInner {
                html,
                body,
                frames: RefCell::new(FrameQueue::default()),
            }),
        }
    }

    /// The root `<html>` element.
    pub fn document_element(&self) -> Element {
        self.inner.html.clone()
    }

    pub fn body(&self) -> Element {
        self.inner.body.clone()
    }

    /// Schedule `f` for the next frame.
    pub fn request_animation_frame(&self, f: impl FnOnce() + 'static) -> FrameId {
        let mut frames = self.inner.frames.borrow_mut();
        let id = FrameId(frames.next_id);
        frames.next_id += 1;
        frames.pending.insert(id, Box::new(f));
        id
    }

    /// Returns whether the callback was still pending.
    pub fn cancel_animation_frame(&self, id: FrameId) -> bool {
        self.inner
            .frames
            .borrow_mut()
            .pending
            .shift_remove(&id)
            .is_some()
    }

    /// Run every callback scheduled before this call, in request order.
    /// Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let due = std::mem::take(&mut self.inner.frames.borrow_mut().pending);
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        count
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.frames.borrow().pending.len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("pending_frames", &self.pending_frames())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn frames_run_in_order_and_can_be_cancelled() {
        let doc = Document::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        doc.request_animation_frame(move || l1.borrow_mut().push(1));
        let l2 = log.clone();
        let cancelled = doc.request_animation_frame(move || l2.borrow_mut().push(2));
        let l3 = log.clone();
        doc.request_animation_frame(move || l3.borrow_mut().push(3));

        assert!(doc.cancel_animation_frame(cancelled));
        assert_eq!(doc.run_frame(), 2);
        assert_eq!(*log.borrow(), vec![1, 3]);
        assert!(!doc.cancel_animation_frame(cancelled));
    }

    #[test]
    fn frames_requested_during_a_frame_wait_for_the_next() {
        let doc = Document::new();
        let hits = Rc::new(Cell::new(0));

        let (d, h) = (doc.clone(), hits.clone());
        doc.request_animation_frame(move || {
            let h2 = h.clone();
            d.request_animation_frame(move || h2.set(h2.get() + 1));
        });

        doc.run_frame();
        assert_eq!(hits.get(), 0);
        assert_eq!(doc.pending_frames(), 1);
        doc.run_frame();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn body_is_attached_to_html() {
        let doc = Document::new();
        assert_eq!(doc.body().parent().map(|p| p.tag().to_string()), Some("html".into()));
    }
}
