/// Shared utilities used across all modules
///
/// - Metrics (Prometheus counters and gauges)

pub mod metrics;

pub use metrics::METRICS;
