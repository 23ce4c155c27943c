//! Thread-safe FIFO event queue
//!
//! Decouples event production from event handling: producers on any thread
//! call [`EventQueue::push_event`], and whoever owns the loop calls
//! [`EventQueue::process_events`] to run everything that is pending.
//!
//! Each event is popped under the lock and executed after the lock is
//! released, so a running event may push further events (they are run in the
//! same `process_events` call) and producers never wait on a slow handler.
//!
//! ```rust
//! use event_patterns::event_queue::EventQueue;
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//!
//! let queue = EventQueue::new();
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! for i in 1..=3 {
//!     let log = Arc::clone(&log);
//!     queue.push_event(move || log.lock().push(i)).unwrap();
//! }
//!
//! assert_eq!(queue.process_events(), 3);
//! assert!(queue.is_empty());
//! assert_eq!(*log.lock(), vec![1, 2, 3]);
//! ```

use crate::error::{EventError, Result};
use crate::shared::metrics::METRICS;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// 事件类型：无参数、一次性执行的闭包
pub type Event = Box<dyn FnOnce() + Send>;

/// 线程安全的事件队列
pub struct EventQueue {
    events: Mutex<VecDeque<Event>>,
    /// None 表示无界队列
    capacity: Option<usize>,
    /// queue_depth 指标的标签
    label: String,
}

impl EventQueue {
    /// Creates an unbounded queue.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: None,
            label: "event_queue".to_string(),
        }
    }

    /// Creates a queue that rejects pushes once `capacity` events are pending.
    ///
    /// # Errors
    /// `InvalidConfig` if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(EventError::InvalidConfig(
                "event queue capacity must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
            label: "event_queue".to_string(),
        })
    }

    /// Sets the label reported on the `queue_depth` gauge.
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Appends an event to the back of the queue.
    ///
    /// # Errors
    /// `QueueFull` on a bounded queue that has no room left.
    pub fn push_event<F>(&self, event: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.push_boxed(Box::new(event))
    }

    /// Same as [`push_event`](Self::push_event) for an already boxed event.
    pub fn push_boxed(&self, event: Event) -> Result<()> {
        let depth = {
            let mut events = self.events.lock();
            if let Some(capacity) = self.capacity {
                if events.len() >= capacity {
                    METRICS.record_error("queue_full");
                    return Err(EventError::QueueFull { capacity });
                }
            }
            events.push_back(event);
            events.len()
        };

        METRICS.events_pushed_total.inc();
        METRICS
            .queue_depth
            .with_label_values(&[self.label.as_str()])
            .set(depth as i64);
        Ok(())
    }

    /// Runs pending events in FIFO order until the queue is observed empty.
    ///
    /// Returns the number of events executed.
    pub fn process_events(&self) -> usize {
        let mut processed = 0;

        loop {
            // 只在取出事件时持有锁
            let event = match self.events.lock().pop_front() {
                Some(event) => event,
                None => break,
            };

            // 在锁外执行事件，避免执行期间阻塞生产者
            event();
            processed += 1;
        }

        if processed > 0 {
            METRICS.events_processed_total.inc_by(processed as u64);
            tracing::debug!(queue = %self.label, processed, "event queue drained");
        }
        METRICS
            .queue_depth
            .with_label_values(&[self.label.as_str()])
            .set(self.len() as i64);

        processed
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Capacity of a bounded queue, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("label", &self.label)
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
