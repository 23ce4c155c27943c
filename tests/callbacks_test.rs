use event_patterns::callbacks::CallbackEvent;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_trigger_without_callback_is_safe() {
    let mut event = CallbackEvent::new();
    assert!(!event.trigger());
}

#[test]
fn test_callback_called_on_trigger() {
    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);

    let mut event = CallbackEvent::new();
    event.set_callback(move || flag.store(true, Ordering::SeqCst));
    event.trigger();

    assert!(called.load(Ordering::SeqCst), "回调应该在 trigger 后被调用");
}

#[test]
fn test_new_callback_replaces_previous() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut event = CallbackEvent::new();

    let c = Arc::clone(&counter);
    event.set_callback(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    event.trigger();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let c = Arc::clone(&counter);
    event.set_callback(move || {
        c.fetch_add(2, Ordering::SeqCst);
    });
    event.trigger();
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_event_moves_across_threads() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);

    let mut event = CallbackEvent::new();
    event.set_callback(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    std::thread::spawn(move || {
        event.trigger();
        event.trigger();
    })
    .join()
    .unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}
