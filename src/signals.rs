//! Signals and slots
//!
//! Qt-style signal/slot wiring without a meta-object compiler:
//! - **direct** connections run the slot inside [`Signal::emit`]
//! - **queued** connections post the call onto an [`EventQueue`]; the slot
//!   runs when the owner of that queue calls `process_events`, which plays the
//!   role of the application event loop
//!
//! ```rust
//! use event_patterns::signals::Signal;
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//!
//! let received = Arc::new(Mutex::new(None));
//! let sink = Arc::clone(&received);
//!
//! let signal: Signal<String> = Signal::new();
//! signal.connect(move |msg: &String| *sink.lock() = Some(msg.clone()));
//! signal.emit(&"Test message".to_string());
//!
//! assert_eq!(received.lock().as_deref(), Some("Test message"));
//! ```

use crate::event_queue::EventQueue;
use crate::shared::metrics::{kind, METRICS};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 槽函数类型
pub type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifies one connection; pass it to [`Signal::disconnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

/// 连接类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Direct,
    Queued,
}

enum Target<T> {
    Direct(Slot<T>),
    Queued { queue: Arc<EventQueue>, slot: Slot<T> },
}

impl<T> Clone for Target<T> {
    fn clone(&self) -> Self {
        match self {
            Target::Direct(slot) => Target::Direct(Arc::clone(slot)),
            Target::Queued { queue, slot } => Target::Queued {
                queue: Arc::clone(queue),
                slot: Arc::clone(slot),
            },
        }
    }
}

struct Connection<T> {
    id: SlotId,
    target: Target<T>,
}

/// 信号
pub struct Signal<T> {
    connections: RwLock<Vec<Connection<T>>>,
    next_id: AtomicU64,
}

impl<T> Signal<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn attach(&self, target: Target<T>) -> SlotId {
        let id = SlotId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.connections.write().push(Connection { id, target });
        id
    }

    /// Connects `slot` so it runs synchronously inside [`emit`](Self::emit).
    pub fn connect<F>(&self, slot: F) -> SlotId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.attach(Target::Direct(Arc::new(slot)))
    }

    /// Connects `slot` through `queue`: each emit posts one call carrying a
    /// clone of the argument.
    pub fn connect_queued<F>(&self, queue: &Arc<EventQueue>, slot: F) -> SlotId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.attach(Target::Queued {
            queue: Arc::clone(queue),
            slot: Arc::new(slot),
        })
    }

    /// Removes one connection. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: SlotId) -> bool {
        let mut connections = self.connections.write();
        let before = connections.len();
        connections.retain(|c| c.id != id);
        connections.len() != before
    }

    pub fn disconnect_all(&self) {
        self.connections.write().clear();
    }

    pub fn slot_count(&self) -> usize {
        self.connections.read().len()
    }

    /// How `id` is connected, if it still is.
    pub fn connection_type(&self, id: SlotId) -> Option<ConnectionType> {
        self.connections
            .read()
            .iter()
            .find(|c| c.id == id)
            .map(|c| match c.target {
                Target::Direct(_) => ConnectionType::Direct,
                Target::Queued { .. } => ConnectionType::Queued,
            })
    }

    /// Emits `value` to every connection in connection order.
    ///
    /// Returns the number of slots reached: direct slots that ran plus queued
    /// calls that were posted. A queued post that fails is logged and skipped.
    pub fn emit(&self, value: &T) -> usize {
        // 先拷贝连接列表，允许槽函数在执行期间连接/断开
        let targets: Vec<Target<T>> = self
            .connections
            .read()
            .iter()
            .map(|c| c.target.clone())
            .collect();

        let mut reached = 0;
        for target in targets {
            match target {
                Target::Direct(slot) => {
                    slot(value);
                    METRICS.record_notification(kind::SIGNAL_DIRECT);
                    reached += 1;
                }
                Target::Queued { queue, slot } => {
                    let arg = value.clone();
                    let posted = queue.push_event(move || {
                        slot(&arg);
                        METRICS.record_notification(kind::SIGNAL_QUEUED);
                    });
                    match posted {
                        Ok(()) => reached += 1,
                        Err(e) => {
                            METRICS.record_error(e.kind());
                            tracing::warn!("queued slot dropped: {}", e);
                        }
                    }
                }
            }
        }
        reached
    }
}

impl<T> Default for Signal<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Object with one signal and one built-in slot.
pub struct SignalsExample {
    pub my_signal: Signal<String>,
}

impl SignalsExample {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            my_signal: Signal::new(),
        })
    }

    /// 发射信号
    pub fn emit_signal(&self, message: impl Into<String>) -> usize {
        self.my_signal.emit(&message.into())
    }

    /// 内置槽函数
    pub fn on_my_signal(&self, message: &str) {
        tracing::info!("Received signal with message: {:?}", message);
    }

    /// Wires `my_signal` to `on_my_signal` on this same object.
    ///
    /// The slot holds a weak reference, so the connection does not keep the
    /// object alive.
    pub fn connect_default_slot(self: &Arc<Self>) -> SlotId {
        let weak = Arc::downgrade(self);
        self.my_signal.connect(move |msg: &String| {
            if let Some(this) = weak.upgrade() {
                this.on_my_signal(msg);
            }
        })
    }

    /// Queued variant of [`connect_default_slot`](Self::connect_default_slot).
    pub fn connect_default_slot_queued(self: &Arc<Self>, queue: &Arc<EventQueue>) -> SlotId {
        let weak = Arc::downgrade(self);
        self.my_signal.connect_queued(queue, move |msg: &String| {
            if let Some(this) = weak.upgrade() {
                this.on_my_signal(msg);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_direct_connection() {
        let signal: Signal<String> = Signal::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&received);
        let id = signal.connect(move |msg: &String| sink.lock().push(msg.clone()));
        assert_eq!(signal.connection_type(id), Some(ConnectionType::Direct));

        assert_eq!(signal.emit(&"Test message".to_string()), 1);
        assert_eq!(*received.lock(), vec!["Test message".to_string()]);
    }

    #[test]
    fn test_emit_without_slots() {
        let signal: Signal<u32> = Signal::default();
        assert_eq!(signal.emit(&7), 0);
    }

    #[test]
    fn test_connection_order() {
        let signal: Signal<u32> = Signal::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let order = Arc::clone(&order);
            signal.connect(move |v: &u32| order.lock().push(format!("{}{}", tag, v)));
        }

        signal.emit(&1);
        assert_eq!(*order.lock(), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn test_disconnect() {
        let signal: Signal<u32> = Signal::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        let id = signal.connect(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        signal.emit(&1);

        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        assert_eq!(signal.connection_type(id), None);
        signal.emit(&2);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(signal.slot_count(), 0);
    }

    #[test]
    fn test_queued_connection_runs_on_process() {
        let queue = Arc::new(EventQueue::new());
        let signal: Signal<String> = Signal::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&received);
        let id = signal.connect_queued(&queue, move |msg: &String| sink.lock().push(msg.clone()));
        assert_eq!(signal.connection_type(id), Some(ConnectionType::Queued));

        assert_eq!(signal.emit(&"later".to_string()), 1);
        // 排队连接：emit 时槽函数尚未执行
        assert!(received.lock().is_empty());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.process_events(), 1);
        assert_eq!(*received.lock(), vec!["later".to_string()]);
    }

    #[test]
    fn test_queued_connection_full_queue() {
        let queue = Arc::new(EventQueue::with_capacity(1).unwrap());
        let signal: Signal<u32> = Signal::new();
        signal.connect_queued(&queue, |_| {});

        assert_eq!(signal.emit(&1), 1);
        // 队列已满，第二次投递被丢弃
        assert_eq!(signal.emit(&2), 0);
        assert_eq!(queue.process_events(), 1);
    }

    #[test]
    fn test_disconnect_all() {
        let signal: Signal<u32> = Signal::new();
        signal.connect(|_| {});
        signal.connect(|_| {});
        assert_eq!(signal.slot_count(), 2);

        signal.disconnect_all();
        assert_eq!(signal.emit(&0), 0);
    }

    #[test]
    fn test_signals_example_default_slot() {
        let example = SignalsExample::new();
        example.connect_default_slot();
        assert_eq!(example.my_signal.slot_count(), 1);
        assert_eq!(example.emit_signal("Hello from Qt Signals & Slots!"), 1);
    }

    #[test]
    fn test_signals_example_does_not_leak() {
        let example = SignalsExample::new();
        example.connect_default_slot();
        let weak = Arc::downgrade(&example);
        drop(example);
        assert!(weak.upgrade().is_none());
    }
}
