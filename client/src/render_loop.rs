use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces map repaints onto `requestAnimationFrame`.
///
/// Any number of `mark_dirty()` calls between two frames produce one paint.
/// The paint function returns `true` while it still needs frames (e.g. tiles
/// are still streaming in), which keeps the loop running.
pub struct FrameScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    dirty: Cell<bool>,
    pending_frame: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl Inner {
    fn request_frame(&self) {
        if self.pending_frame.get().is_some() {
            return;
        }
        let Some(window) = self.window.as_ref() else {
            return;
        };
        let cb_ref = self.callback.borrow();
        let Some(cb) = cb_ref.as_ref() else {
            return;
        };
        if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            self.pending_frame.set(Some(id));
        }
    }
}

impl FrameScheduler {
    pub fn new(paint: impl Fn() -> bool + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            dirty: Cell::new(false),
            pending_frame: Cell::new(None),
            callback: RefCell::new(None),
        });

        // The closure holds a weak handle so dropping the scheduler frees it.
        let weak = Rc::downgrade(&inner);
        let cb = Closure::<dyn FnMut()>::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.pending_frame.set(None);
            if !inner.dirty.replace(false) {
                return;
            }
            if paint() {
                inner.dirty.set(true);
                inner.request_frame();
            }
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    /// Ask for a repaint on the next frame.
    pub fn mark_dirty(&self) {
        self.inner.dirty.set(true);
        self.inner.request_frame();
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        if let Some(id) = self.inner.pending_frame.take()
            && let Some(window) = self.inner.window.as_ref()
        {
            let _ = window.cancel_animation_frame(id);
        }
        self.inner.dirty.set(false);
        self.inner.callback.borrow_mut().take();
    }
}
