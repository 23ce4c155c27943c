//! 回调事件
//!
//! An event source with a single replaceable callback. Registering a new
//! callback drops the previous one; triggering with nothing registered is a
//! no-op.
//!
//! ```rust
//! use event_patterns::callbacks::CallbackEvent;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&hits);
//!
//! let mut event = CallbackEvent::new();
//! event.set_callback(move || {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//! assert!(event.trigger());
//! assert_eq!(hits.load(Ordering::Relaxed), 1);
//! ```

use crate::shared::metrics::{kind, METRICS};

/// 回调函数类型
pub type Callback = Box<dyn FnMut() + Send>;

/// Event source holding at most one callback.
#[derive(Default)]
pub struct CallbackEvent {
    callback: Option<Callback>,
}

impl CallbackEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `cb`, replacing whatever was registered before.
    pub fn set_callback<F>(&mut self, cb: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.callback = Some(Box::new(cb));
    }

    /// Removes the registered callback, if any.
    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Invokes the callback. Returns `false` when none is registered.
    pub fn trigger(&mut self) -> bool {
        match self.callback.as_mut() {
            Some(cb) => {
                cb();
                METRICS.record_notification(kind::CALLBACK);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for CallbackEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackEvent")
            .field("has_callback", &self.has_callback())
            .finish()
    }
}
