// 全局内存分配器：使用 jemalloc
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

// 所有模块都是公共的，这样二进制文件、测试和基准测试都能访问它们
pub mod error;
pub mod logging;
pub mod shared;

pub mod callbacks;
pub mod event_queue;
pub mod dispatcher;
pub mod observer;
pub mod signals;
pub mod io_loop;

pub mod infrastructure;
pub mod interfaces;

pub use callbacks::CallbackEvent;
pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherHandle, DispatcherStats};
pub use error::{EventError, Result};
pub use event_queue::{Event, EventQueue};
pub use io_loop::{IoLoopConfig, IoServer, IoSummary};
pub use observer::{Observer, RecordingObserver, Subject};
pub use signals::{Signal, SignalsExample, SlotId};
