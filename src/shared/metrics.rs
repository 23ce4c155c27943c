//! Prometheus Metrics Module
//!
//! 事件框架的核心运行指标
//!
//! ## 指标类型
//! - **Counter**: 入队/处理事件数、通知次数、连接数、控制台输入行数、超时次数、错误数
//! - **Gauge**: 队列深度
//!
//! ## 使用示例
//! ```rust,ignore
//! use event_patterns::shared::metrics::METRICS;
//!
//! METRICS.events_pushed_total.inc();
//! METRICS.notifications_total.with_label_values(&["observer"]).inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge_vec, Encoder, IntCounter,
    IntCounterVec, IntGaugeVec, TextEncoder,
};

lazy_static! {
    /// 全局Metrics实例
    pub static ref METRICS: Metrics = Metrics::new();
}

/// Notification kinds used as the `kind` label.
pub mod kind {
    pub const CALLBACK: &str = "callback";
    pub const OBSERVER: &str = "observer";
    pub const SIGNAL_DIRECT: &str = "signal_direct";
    pub const SIGNAL_QUEUED: &str = "signal_queued";
}

/// 事件框架核心指标
pub struct Metrics {
    /// 入队事件总数
    pub events_pushed_total: IntCounter,

    /// 已执行事件总数
    pub events_processed_total: IntCounter,

    /// 通知总数 (按类型: callback/observer/signal_direct/signal_queued)
    pub notifications_total: IntCounterVec,

    /// 已接受的TCP连接总数
    pub connections_accepted_total: IntCounter,

    /// 控制台输入行数
    pub console_lines_total: IntCounter,

    /// I/O循环等待超时次数
    pub poll_timeouts_total: IntCounter,

    /// 错误总数 (按类型)
    pub errors_total: IntCounterVec,

    /// 队列深度 (按队列名)
    pub queue_depth: IntGaugeVec,
}

impl Metrics {
    /// 创建新的Metrics实例
    ///
    /// Registers into the default registry, so it must only run once; use
    /// [`METRICS`] instead of calling this directly.
    fn new() -> Self {
        Self {
            events_pushed_total: register_int_counter!(
                "event_patterns_events_pushed_total",
                "Total number of events pushed onto a queue or dispatcher"
            )
            .expect("register events_pushed_total"),

            events_processed_total: register_int_counter!(
                "event_patterns_events_processed_total",
                "Total number of events executed"
            )
            .expect("register events_processed_total"),

            notifications_total: register_int_counter_vec!(
                "event_patterns_notifications_total",
                "Total number of callback, observer and slot invocations",
                &["kind"]
            )
            .expect("register notifications_total"),

            connections_accepted_total: register_int_counter!(
                "event_patterns_connections_accepted_total",
                "Total number of TCP connections accepted by the I/O loop"
            )
            .expect("register connections_accepted_total"),

            console_lines_total: register_int_counter!(
                "event_patterns_console_lines_total",
                "Total number of console lines read by the I/O loop"
            )
            .expect("register console_lines_total"),

            poll_timeouts_total: register_int_counter!(
                "event_patterns_poll_timeouts_total",
                "Number of I/O loop waits that ended on the poll timeout"
            )
            .expect("register poll_timeouts_total"),

            errors_total: register_int_counter_vec!(
                "event_patterns_errors_total",
                "Total number of errors",
                &["error_type"]
            )
            .expect("register errors_total"),

            queue_depth: register_int_gauge_vec!(
                "event_patterns_queue_depth",
                "Current number of pending events",
                &["queue"]
            )
            .expect("register queue_depth"),
        }
    }

    /// 记录一次通知
    #[inline]
    pub fn record_notification(&self, kind: &str) {
        self.notifications_total.with_label_values(&[kind]).inc();
    }

    /// 记录一次错误
    #[inline]
    pub fn record_error(&self, error_type: &str) {
        self.errors_total.with_label_values(&[error_type]).inc();
    }

    /// 导出Prometheus格式的指标
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("metrics encode failed: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_global() {
        // 使用全局METRICS实例而不是创建新的
        METRICS.events_pushed_total.inc();
        METRICS.record_notification(kind::OBSERVER);

        let output = METRICS.export();
        assert!(output.contains("event_patterns_events_pushed_total"));
        assert!(output.contains("event_patterns_notifications_total"));
    }

    #[test]
    fn test_counters_are_monotonic() {
        // 全局共享，只能断言增量
        let before = METRICS.console_lines_total.get();
        METRICS.console_lines_total.inc();
        assert!(METRICS.console_lines_total.get() > before);
    }

    #[test]
    fn test_gauge_global() {
        METRICS.queue_depth.with_label_values(&["TEST"]).set(7);
        assert_eq!(METRICS.queue_depth.with_label_values(&["TEST"]).get(), 7);

        let output = METRICS.export();
        assert!(output.contains("event_patterns_queue_depth"));
    }

    #[test]
    fn test_error_counter() {
        METRICS.record_error("TEST");
        let output = METRICS.export();
        assert!(output.contains("event_patterns_errors_total"));
    }
}
