//! Logging setup
//!
//! Thin layer over `tracing-subscriber`: a four-level [`LogLevel`] and a
//! reloadable `EnvFilter`, so the level can be raised or lowered while the
//! process is running through [`LogHandle::set_level`].
//!
//! `RUST_LOG` wins over the level passed to [`init`] when it is set.

use crate::error::{EventError, Result};
use parking_lot::RwLock;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as tfmt, reload, EnvFilter, Registry};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Upper-case name printed in banners and config dumps.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    /// `EnvFilter` directive for this level.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Whether a message at `self` passes a filter set to `threshold`.
    pub fn passes(&self, threshold: LogLevel) -> bool {
        *self >= threshold
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trace" | "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(EventError::InvalidConfig(format!("unknown log level '{}'", other))),
        }
    }
}

/// Handle to the installed subscriber
///
/// Cloning is cheap; all clones share the same current level.
#[derive(Clone)]
pub struct LogHandle {
    level: Arc<RwLock<LogLevel>>,
    // None when another subscriber was already installed (tests, embedding apps)
    reload: Option<reload::Handle<EnvFilter, Registry>>,
}

impl LogHandle {
    /// Current level.
    pub fn level(&self) -> LogLevel {
        *self.level.read()
    }

    /// Whether this handle owns the global subscriber.
    pub fn is_installed(&self) -> bool {
        self.reload.is_some()
    }

    /// Changes the active level; messages below it are dropped from now on.
    pub fn set_level(&self, level: LogLevel) -> Result<()> {
        if let Some(handle) = &self.reload {
            handle
                .modify(|filter| *filter = EnvFilter::new(level.directive()))
                .map_err(|e| EventError::InvalidConfig(format!("log reload failed: {}", e)))?;
        }
        *self.level.write() = level;
        Ok(())
    }
}

/// 初始化日志系统
///
/// Safe to call more than once: only the first call installs the global
/// subscriber, later calls get a detached handle that only tracks the level.
pub fn init(level: LogLevel) -> LogHandle {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));
    let (filter_layer, reload_handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(tfmt::layer().with_target(false))
        .try_init()
        .is_ok();

    LogHandle {
        level: Arc::new(RwLock::new(level)),
        reload: installed.then_some(reload_handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(LogLevel::Debug.as_str(), "DEBUG");
        assert_eq!(LogLevel::Info.as_str(), "INFO");
        assert_eq!(LogLevel::Warning.as_str(), "WARNING");
        assert_eq!(LogLevel::Error.as_str(), "ERROR");
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("Error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_threshold() {
        // 默认 Info：Debug 被过滤
        assert!(!LogLevel::Debug.passes(LogLevel::Info));
        assert!(LogLevel::Info.passes(LogLevel::Info));
        assert!(LogLevel::Error.passes(LogLevel::Warning));
        assert!(LogLevel::Debug.passes(LogLevel::Debug));
    }

    #[test]
    fn test_init_twice_and_set_level() {
        let first = init(LogLevel::Info);
        let second = init(LogLevel::Warning);
        // 第二次初始化不会覆盖全局subscriber
        assert!(!(first.is_installed() && second.is_installed()));

        second.set_level(LogLevel::Debug).unwrap();
        assert_eq!(second.level(), LogLevel::Debug);

        let clone = second.clone();
        clone.set_level(LogLevel::Error).unwrap();
        assert_eq!(second.level(), LogLevel::Error);
    }
}
