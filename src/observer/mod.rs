//! Observer pattern
//!
//! A [`Subject`] broadcasts string messages to every registered
//! [`Observer`]. The subject only keeps weak references: registering an
//! observer never extends its lifetime, and observers that were dropped are
//! skipped and pruned on the next notification.
//!
//! ## Modules
//! - `subject`: the broadcaster

pub mod subject;

pub use subject::Subject;

use parking_lot::Mutex;

/// 观察者接口
pub trait Observer: Send + Sync {
    /// Called by [`Subject::notify`] with the broadcast message.
    fn on_notify(&self, message: &str);
}

/// Observer that stores every message it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    messages: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the messages received so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }
}

impl Observer for RecordingObserver {
    fn on_notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// Observer that logs each message under a fixed name.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    name: String,
}

impl LoggingObserver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Observer for LoggingObserver {
    fn on_notify(&self, message: &str) {
        println!("{} received: {}", self.name, message);
        tracing::debug!(observer = %self.name, message, "notified");
    }
}
