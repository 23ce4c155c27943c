/// Infrastructure Layer - Technical Implementations
///
/// Pieces that talk to the outside world but carry no event semantics of
/// their own.
///
/// ## Modules
/// - `observability`: Prometheus metrics endpoint and health checks

pub mod observability;

pub use observability::{HealthChecker, ObservabilityServer};
