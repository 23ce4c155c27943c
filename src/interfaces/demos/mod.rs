//! Demo scenarios
//!
//! One function per pattern, each printing a short narrative to stdout. The
//! CLI subcommands call these; they also serve as runnable usage examples.

use crate::callbacks::CallbackEvent;
use crate::dispatcher::{Dispatcher, DispatcherConfig, DispatcherStats};
use crate::error::Result;
use crate::event_queue::EventQueue;
use crate::observer::{LoggingObserver, Observer, Subject};
use crate::signals::SignalsExample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// 回调演示
pub fn callbacks_demo() -> Result<()> {
    let mut event = CallbackEvent::new();
    event.set_callback(|| {
        println!("Callback triggered: Hello from the Event!");
    });
    event.trigger();
    Ok(())
}

/// 事件队列演示
pub fn event_queue_demo() -> Result<usize> {
    let queue = EventQueue::new();

    queue.push_event(|| println!("Event 1: Hello, world!"))?;
    queue.push_event(|| println!("Event 2: Processing the event queue."))?;
    queue.push_event(|| println!("Event 3: Demonstrating event-driven programming in Rust."))?;

    // 模拟异步产生的事件
    thread::sleep(Duration::from_millis(500));
    queue.push_event(|| println!("Event 4: Added after a delay."))?;

    println!("Processing events...");
    let processed = queue.process_events();

    if queue.is_empty() {
        println!("All events have been processed. The event queue is now empty.");
    } else {
        println!("There are still events remaining in the queue.");
    }
    Ok(processed)
}

/// 分发器演示：多个生产者线程向同一个事件循环投递事件
pub fn dispatcher_demo(
    config: DispatcherConfig,
    producers: usize,
    events_per_producer: usize,
) -> Result<DispatcherStats> {
    let dispatcher = Dispatcher::spawn(config)?;
    let total = Arc::new(AtomicU64::new(0));

    let workers: Vec<_> = (0..producers)
        .map(|producer| {
            let handle = dispatcher.handle();
            let total = Arc::clone(&total);
            thread::spawn(move || -> Result<()> {
                for seq in 0..events_per_producer {
                    let total = Arc::clone(&total);
                    handle.post(move || {
                        total.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(producer, seq, "event handled");
                    })?;
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        match worker.join() {
            Ok(result) => result?,
            Err(_) => tracing::error!("producer thread panicked"),
        }
    }

    let backlog = dispatcher.handle().pending();
    println!("Producers done; {} events still queued.", backlog);

    let stats = dispatcher.shutdown()?;
    println!(
        "Dispatcher handled {} events in {} batches ({} producers).",
        total.load(Ordering::Relaxed),
        stats.batches,
        producers
    );
    println!("{}", serde_json::to_string(&stats)?);
    Ok(stats)
}

/// 观察者演示
pub fn observer_demo() -> Result<usize> {
    let subject = Subject::new();
    let observer1: Arc<dyn Observer> = Arc::new(LoggingObserver::new("Observer 1"));
    let observer2: Arc<dyn Observer> = Arc::new(LoggingObserver::new("Observer 2"));

    subject.add_observer(&observer1);
    subject.add_observer(&observer2);

    println!("Notifying observers (first time):");
    let mut notified = subject.notify("Event 1: Something happened!");

    subject.remove_observer(&observer1);

    println!("Notifying observers (second time):");
    notified += subject.notify("Event 2: Observer 1 removed!");
    Ok(notified)
}

/// 信号槽演示
///
/// With `queued`, the slot call goes through an event queue that is drained
/// afterwards, like a Qt application event loop.
pub fn signals_demo(queued: bool) -> Result<usize> {
    let example = SignalsExample::new();
    let app_queue = Arc::new(EventQueue::new().labelled("signals_app"));

    if queued {
        example.connect_default_slot_queued(&app_queue);
    } else {
        example.connect_default_slot();
    }

    let reached = example.emit_signal("Hello from Qt Signals & Slots!");
    let ran = app_queue.process_events();
    println!("Signal reached {} slot(s); {} queued call(s) ran.", reached, ran);
    Ok(reached)
}
