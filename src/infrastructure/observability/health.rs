//! Health Check
//!
//! 提供进程健康状态，用于负载均衡器和监控系统
//!
//! ## 响应格式
//! ```json
//! {
//!   "status": "healthy",
//!   "uptime_seconds": 3600,
//!   "version": "0.1.0",
//!   "timestamp": 1234567890
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use parking_lot::RwLock;

/// 健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// 健康
    Healthy,
    /// 降级（部分功能不可用）
    Degraded,
    /// 不健康
    Unhealthy,
}

/// 健康检查响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub uptime_seconds: u64,
    pub version: String,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

/// Event counters attached to a detailed health response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthDetails {
    pub events_pushed: u64,
    pub events_processed: u64,
    pub connections_accepted: u64,
    pub console_lines: u64,
}

/// 健康检查器
pub struct HealthChecker {
    start_time: SystemTime,
    status: Arc<RwLock<HealthStatus>>,
    version: String,
}

impl HealthChecker {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            start_time: SystemTime::now(),
            status: Arc::new(RwLock::new(HealthStatus::Healthy)),
            version: version.into(),
        }
    }

    /// 获取运行时间（秒）
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time
            .elapsed()
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn current_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    pub fn set_status(&self, status: HealthStatus) {
        *self.status.write() = status;
    }

    pub fn get_status(&self) -> HealthStatus {
        *self.status.read()
    }

    pub fn check_health(&self) -> HealthResponse {
        HealthResponse {
            status: self.get_status(),
            uptime_seconds: self.uptime_seconds(),
            version: self.version.clone(),
            timestamp: Self::current_timestamp(),
            details: None,
        }
    }

    pub fn check_health_detailed(&self, details: HealthDetails) -> HealthResponse {
        HealthResponse {
            details: Some(details),
            ..self.check_health()
        }
    }

    /// 存活检查：只要能返回就说明进程还活着
    pub fn check_liveness(&self) -> bool {
        true
    }

    /// 就绪检查：只有 Healthy 才接受流量
    pub fn check_readiness(&self) -> bool {
        matches!(self.get_status(), HealthStatus::Healthy)
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_checker_creation() {
        let checker = HealthChecker::new("1.0.0");
        assert_eq!(checker.version, "1.0.0");
        assert_eq!(checker.get_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_status_change() {
        let checker = HealthChecker::default();
        checker.set_status(HealthStatus::Degraded);
        assert_eq!(checker.get_status(), HealthStatus::Degraded);

        checker.set_status(HealthStatus::Unhealthy);
        assert_eq!(checker.get_status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_health_response_detailed() {
        let checker = HealthChecker::new("1.0.0");
        let details = HealthDetails {
            events_pushed: 10,
            events_processed: 9,
            connections_accepted: 1,
            console_lines: 2,
        };

        let response = checker.check_health_detailed(details.clone());
        assert_eq!(response.status, HealthStatus::Healthy);
        assert_eq!(response.version, "1.0.0");
        assert!(response.timestamp > 0);
        assert_eq!(response.details, Some(details));
    }

    #[test]
    fn test_liveness_and_readiness() {
        let checker = HealthChecker::new("1.0.0");
        assert!(checker.check_readiness());

        checker.set_status(HealthStatus::Degraded);
        assert!(!checker.check_readiness());

        // 即使状态不健康，存活检查也应该通过
        checker.set_status(HealthStatus::Unhealthy);
        assert!(checker.check_liveness());
        assert!(!checker.check_readiness());
    }

    #[test]
    fn test_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            uptime_seconds: 3600,
            version: "1.0.0".to_string(),
            timestamp: 1234567890,
            details: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("3600"));
        assert!(!json.contains("details"));
    }
}
