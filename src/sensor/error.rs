use thiserror::Error;

/// Sensor subsystem errors.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("failed to open sensor: {0}")]
    Open(String),

    #[error("failed to close sensor: {0}")]
    Close(String),

    #[error("unknown frame subscription: {0}")]
    UnknownSubscription(u64),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, SensorError>;
