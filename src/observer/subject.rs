/// Subject - 被观察者
///
/// Holds `Weak<dyn Observer>` entries in registration order. Identity is the
/// allocation address, so the same `Arc` registered twice is notified twice
/// and removed in one call.

use super::Observer;
use crate::shared::metrics::{kind, METRICS};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

#[derive(Default)]
pub struct Subject {
    observers: RwLock<Vec<Weak<dyn Observer>>>,
}

/// Address of the observer allocation, without the vtable part.
#[inline]
fn identity(observer: &Arc<dyn Observer>) -> *const () {
    Arc::as_ptr(observer) as *const ()
}

impl Subject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` at the end of the notification order.
    pub fn add_observer(&self, observer: &Arc<dyn Observer>) {
        self.observers.write().push(Arc::downgrade(observer));
    }

    /// Removes every registration of `observer`. Returns how many were removed.
    pub fn remove_observer(&self, observer: &Arc<dyn Observer>) -> usize {
        let target = identity(observer);
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|weak| weak.as_ptr() as *const () != target);
        before - observers.len()
    }

    /// Sends `message` to every live observer, in registration order.
    ///
    /// The list is snapshotted first, so observers may (un)register from
    /// inside `on_notify`; such changes apply from the next call.
    /// Returns the number of observers notified.
    pub fn notify(&self, message: &str) -> usize {
        let snapshot: Vec<Weak<dyn Observer>> = self.observers.read().clone();

        let mut notified = 0;
        let mut saw_dead = false;
        for weak in &snapshot {
            match weak.upgrade() {
                Some(observer) => {
                    observer.on_notify(message);
                    notified += 1;
                }
                None => saw_dead = true,
            }
        }

        if saw_dead {
            self.observers.write().retain(|weak| weak.strong_count() > 0);
        }

        if notified > 0 {
            METRICS
                .notifications_total
                .with_label_values(&[kind::OBSERVER])
                .inc_by(notified as u64);
        }
        notified
    }

    /// Registered observers, including ones that died since the last notify.
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }
}

impl std::fmt::Debug for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.observer_count())
            .finish()
    }
}
