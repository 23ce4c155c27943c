/// 后台事件分发器
///
/// A dedicated worker thread that owns the event loop:
/// 1. producers post closures through a cloneable [`DispatcherHandle`]
/// 2. a bounded crossbeam channel carries them (back-pressure when full)
/// 3. the worker drains up to `batch_size` events per wake-up and runs them
///    in arrival order
///
/// Shutdown is an in-band message, so everything posted before
/// [`Dispatcher::shutdown`] still runs before the thread exits. A post that
/// returned `Ok` is always run; a post racing with shutdown either runs or
/// gets `ChannelClosed`.

use crate::error::{EventError, Result};
use crate::event_queue::Event;
use crate::shared::metrics::METRICS;
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;
use smallvec::SmallVec;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// 分发器配置
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 线程名
    pub name: String,

    /// 通道容量
    pub queue_capacity: usize,

    /// 每批最多处理的事件数
    pub batch_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "dispatcher".to_string(),
            queue_capacity: 1024,
            batch_size: 64,
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(EventError::InvalidConfig(
                "dispatcher queue_capacity must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EventError::InvalidConfig(
                "dispatcher batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 分发器统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub events_processed: u64,
    pub batches: u64,
    pub panics: u64,
}

#[derive(Default)]
struct SharedStats {
    events_processed: AtomicU64,
    batches: AtomicU64,
    panics: AtomicU64,
}

impl SharedStats {
    fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            events_processed: self.events_processed.load(Ordering::Acquire),
            batches: self.batches.load(Ordering::Acquire),
            panics: self.panics.load(Ordering::Acquire),
        }
    }
}

enum Message {
    Run(Event),
    Shutdown,
}

/// Cloneable producer side of a [`Dispatcher`].
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: Sender<Message>,
    closed: Arc<AtomicBool>,
    /// 已通过关闭检查、尚未完成发送的投递数
    inflight: Arc<AtomicUsize>,
    capacity: usize,
}

/// Marks one post as in flight until dropped.
struct InflightGuard<'a>(&'a AtomicUsize);

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DispatcherHandle {
    fn enter(&self) -> Result<InflightGuard<'_>> {
        // 先登记再检查：worker 看到 inflight == 0 时，所有通过检查的投递都已入队
        self.inflight.fetch_add(1, Ordering::SeqCst);
        let guard = InflightGuard(&self.inflight);
        if self.closed.load(Ordering::SeqCst) {
            return Err(EventError::ChannelClosed("dispatcher"));
        }
        Ok(guard)
    }

    /// Posts an event, blocking while the channel is full.
    ///
    /// # Errors
    /// `ChannelClosed` once the dispatcher has been shut down.
    pub fn post<F>(&self, event: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let _inflight = self.enter()?;
        self.tx
            .send(Message::Run(Box::new(event)))
            .map_err(|_| EventError::ChannelClosed("dispatcher"))?;
        METRICS.events_pushed_total.inc();
        Ok(())
    }

    /// Posts an event without blocking.
    ///
    /// # Errors
    /// `QueueFull` when the channel has no room, `ChannelClosed` after shutdown.
    pub fn try_post<F>(&self, event: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let _inflight = self.enter()?;
        match self.tx.try_send(Message::Run(Box::new(event))) {
            Ok(()) => {
                METRICS.events_pushed_total.inc();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                METRICS.record_error("queue_full");
                Err(EventError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Disconnected(_)) => Err(EventError::ChannelClosed("dispatcher")),
        }
    }

    /// Events posted but not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// 分发器工作线程
struct DispatcherWorker {
    name: String,
    rx: Receiver<Message>,
    stats: Arc<SharedStats>,
    inflight: Arc<AtomicUsize>,
    batch_size: usize,
}

impl DispatcherWorker {
    /// 运行事件循环，直到收到 Shutdown 或所有发送端关闭
    fn run(self) {
        tracing::debug!(dispatcher = %self.name, "dispatcher loop started");

        // 阻塞等待第一条消息，再批量取出后续消息，减少唤醒次数
        while let Ok(first) = self.rx.recv() {
            let mut batch: SmallVec<[Message; 32]> = SmallVec::new();
            batch.push(first);
            batch.extend(self.rx.try_iter().take(self.batch_size - 1));

            let mut shutdown = false;
            let mut ran = 0u64;
            for message in batch {
                match message {
                    Message::Run(event) => {
                        self.execute(event);
                        ran += 1;
                    }
                    Message::Shutdown => shutdown = true,
                }
            }
            self.record_batch(ran);

            if shutdown {
                self.drain_after_shutdown();
                break;
            }
        }

        tracing::debug!(dispatcher = %self.name, "dispatcher loop stopped");
    }

    /// Runs posts that slipped in behind the Shutdown message.
    ///
    /// `closed` is already set, so new posts are refused; only posts that
    /// passed the check before it was set can still arrive.
    fn drain_after_shutdown(&self) {
        loop {
            let idle = self.inflight.load(Ordering::SeqCst) == 0;

            let mut ran = 0u64;
            for message in self.rx.try_iter() {
                if let Message::Run(event) = message {
                    self.execute(event);
                    ran += 1;
                }
            }
            self.record_batch(ran);

            if idle {
                break;
            }
            thread::yield_now();
        }
    }

    fn record_batch(&self, ran: u64) {
        if ran > 0 {
            self.stats.events_processed.fetch_add(ran, Ordering::AcqRel);
            self.stats.batches.fetch_add(1, Ordering::AcqRel);
            METRICS.events_processed_total.inc_by(ran);
        }
        METRICS
            .queue_depth
            .with_label_values(&[self.name.as_str()])
            .set(self.rx.len() as i64);
    }

    #[inline]
    fn execute(&self, event: Event) {
        if panic::catch_unwind(AssertUnwindSafe(event)).is_err() {
            self.stats.panics.fetch_add(1, Ordering::AcqRel);
            METRICS.record_error("event_panic");
            tracing::error!(dispatcher = %self.name, "event panicked; dispatcher continues");
        }
    }
}

/// Background event loop running on its own thread.
pub struct Dispatcher {
    handle: DispatcherHandle,
    stats: Arc<SharedStats>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Starts the worker thread.
    ///
    /// # Errors
    /// `InvalidConfig` for a zero capacity or batch size, `Io` if the thread
    /// cannot be spawned.
    pub fn spawn(config: DispatcherConfig) -> Result<Self> {
        config.validate()?;

        let (tx, rx) = bounded(config.queue_capacity);
        let stats = Arc::new(SharedStats::default());
        let inflight = Arc::new(AtomicUsize::new(0));

        let worker = DispatcherWorker {
            name: config.name.clone(),
            rx,
            stats: Arc::clone(&stats),
            inflight: Arc::clone(&inflight),
            batch_size: config.batch_size,
        };
        let join = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || worker.run())?;

        tracing::info!(
            dispatcher = %config.name,
            capacity = config.queue_capacity,
            batch_size = config.batch_size,
            "dispatcher started"
        );

        Ok(Self {
            handle: DispatcherHandle {
                tx,
                closed: Arc::new(AtomicBool::new(false)),
                inflight,
                capacity: config.queue_capacity,
            },
            stats,
            worker: Some(join),
        })
    }

    /// Returns a producer handle; clone it freely across threads.
    pub fn handle(&self) -> DispatcherHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> DispatcherStats {
        self.stats.snapshot()
    }

    /// Runs every event posted so far, then stops and joins the worker.
    pub fn shutdown(mut self) -> Result<DispatcherStats> {
        self.stop()?;
        Ok(self.stats.snapshot())
    }

    fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.handle.closed.store(true, Ordering::SeqCst);
        // 工作线程已退出时发送会失败，这里忽略即可
        let _ = self.handle.tx.send(Message::Shutdown);

        worker
            .join()
            .map_err(|_| EventError::ChannelClosed("dispatcher worker panicked"))
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("dispatcher stop on drop failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_invalid_config() {
        let config = DispatcherConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            Dispatcher::spawn(config),
            Err(EventError::InvalidConfig(_))
        ));

        let config = DispatcherConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fifo_on_worker_thread() {
        let dispatcher = Dispatcher::spawn(DispatcherConfig::default()).unwrap();
        let handle = dispatcher.handle();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..100 {
            let seen = Arc::clone(&seen);
            handle.post(move || seen.lock().push(i)).unwrap();
        }

        let stats = dispatcher.shutdown().unwrap();
        assert_eq!(stats.events_processed, 100);
        assert!(stats.batches >= 1);
        assert_eq!(*seen.lock(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_post_after_shutdown() {
        let dispatcher = Dispatcher::spawn(DispatcherConfig::default()).unwrap();
        let handle = dispatcher.handle();
        dispatcher.shutdown().unwrap();

        assert!(handle.is_closed());
        assert!(matches!(
            handle.post(|| {}),
            Err(EventError::ChannelClosed(_))
        ));
        assert!(matches!(
            handle.try_post(|| {}),
            Err(EventError::ChannelClosed(_))
        ));
    }

    #[test]
    fn test_panicking_event_does_not_stop_loop() {
        let dispatcher = Dispatcher::spawn(DispatcherConfig::default()).unwrap();
        let handle = dispatcher.handle();
        let counter = Arc::new(AtomicUsize::new(0));

        handle.post(|| panic!("boom")).unwrap();
        let c = Arc::clone(&counter);
        handle
            .post(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let stats = dispatcher.shutdown().unwrap();
        assert_eq!(stats.panics, 1);
        assert_eq!(stats.events_processed, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_post_full() {
        let config = DispatcherConfig {
            name: "test_try_post_full".to_string(),
            queue_capacity: 1,
            batch_size: 1,
        };
        let dispatcher = Dispatcher::spawn(config).unwrap();
        let handle = dispatcher.handle();

        // 用一个阻塞事件占住工作线程
        let (release_tx, release_rx) = crossbeam::channel::bounded::<()>(0);
        let (started_tx, started_rx) = crossbeam::channel::bounded::<()>(0);
        handle
            .post(move || {
                let _ = started_tx.send(());
                let _ = release_rx.recv();
            })
            .unwrap();
        started_rx.recv().unwrap();

        handle.try_post(|| {}).unwrap();
        assert_eq!(handle.pending(), 1);
        assert!(matches!(
            handle.try_post(|| {}),
            Err(EventError::QueueFull { capacity: 1 })
        ));

        release_tx.send(()).unwrap();
        let stats = dispatcher.shutdown().unwrap();
        assert_eq!(stats.events_processed, 2);
    }

    #[test]
    fn test_drop_joins_worker() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let dispatcher = Dispatcher::spawn(DispatcherConfig::default()).unwrap();
            let c = Arc::clone(&counter);
            dispatcher
                .handle()
                .post(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
