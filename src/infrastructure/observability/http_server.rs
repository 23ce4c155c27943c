//! HTTP Observability Server
//!
//! 提供Prometheus metrics和健康检查端点
//!
//! ## 端点
//! - `GET /metrics` - Prometheus格式的指标
//! - `GET /health` - 健康检查（附带事件计数）
//! - `GET /health/ready` - 就绪检查
//! - `GET /health/live` - 存活检查

use super::health::{HealthChecker, HealthDetails, HealthStatus};
use crate::error::Result;
use crate::shared::metrics::METRICS;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// 可观测性服务器
pub struct ObservabilityServer {
    addr: SocketAddr,
    health_checker: Arc<HealthChecker>,
}

impl ObservabilityServer {
    pub fn new(port: u16) -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            health_checker: Arc::new(HealthChecker::default()),
        }
    }

    pub fn health_checker(&self) -> Arc<HealthChecker> {
        self.health_checker.clone()
    }

    /// 启动HTTP服务器，直到进程退出
    pub async fn run(self) -> Result<()> {
        let app = router(self.health_checker.clone());

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!("observability server listening on {}", listener.local_addr()?);
        info!("metrics: http://{}/metrics", self.addr);

        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Routes served by [`ObservabilityServer`].
pub fn router(checker: Arc<HealthChecker>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/health/live", get(liveness_handler))
        .with_state(checker)
}

async fn metrics_handler() -> Response {
    (StatusCode::OK, METRICS.export()).into_response()
}

async fn health_handler(State(checker): State<Arc<HealthChecker>>) -> Response {
    let details = HealthDetails {
        events_pushed: METRICS.events_pushed_total.get(),
        events_processed: METRICS.events_processed_total.get(),
        connections_accepted: METRICS.connections_accepted_total.get(),
        console_lines: METRICS.console_lines_total.get(),
    };

    let response = checker.check_health_detailed(details);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response)).into_response()
}

async fn readiness_handler(State(checker): State<Arc<HealthChecker>>) -> Response {
    if checker.check_readiness() {
        StatusCode::OK.into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

async fn liveness_handler(State(checker): State<Arc<HealthChecker>>) -> Response {
    if checker.check_liveness() {
        StatusCode::OK.into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_path(app: Router, path: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_observability_server_creation() {
        let server = ObservabilityServer::new(9090);
        assert_eq!(server.addr.port(), 9090);
        assert_eq!(server.health_checker().get_status(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        METRICS.events_pushed_total.inc();
        let app = router(Arc::new(HealthChecker::default()));

        let (status, body) = get_path(app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("event_patterns_events_pushed_total"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = router(Arc::new(HealthChecker::new("1.0.0")));

        let (status, body) = get_path(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"healthy\""));
        assert!(body.contains("events_pushed"));
    }

    #[tokio::test]
    async fn test_readiness_follows_status() {
        let checker = Arc::new(HealthChecker::new("1.0.0"));
        checker.set_status(HealthStatus::Unhealthy);

        let (status, _) = get_path(router(checker.clone()), "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = get_path(router(checker), "/health/live").await;
        assert_eq!(status, StatusCode::OK);
    }
}
