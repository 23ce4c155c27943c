/// Crate-wide error type
///
/// Every fallible operation in the library returns [`Result`], so callers can
/// use `?` across queue, dispatcher and I/O boundaries alike.

/// 事件框架错误类型
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EventError>;

impl EventError {
    /// Short label used for the `errors_total{error_type}` metric.
    pub fn kind(&self) -> &'static str {
        match self {
            EventError::Io(_) => "io",
            EventError::QueueFull { .. } => "queue_full",
            EventError::ChannelClosed(_) => "channel_closed",
            EventError::InvalidConfig(_) => "invalid_config",
            EventError::AddrParse(_) => "addr_parse",
            EventError::Serialization(_) => "serialization",
        }
    }
}
