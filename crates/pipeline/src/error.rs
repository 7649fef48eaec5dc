//! Pipeline error types

use thiserror::Error;

use tally_sinks::SinkError;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Engine configuration is invalid
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    /// The engine has been stopped
    #[error("flush engine is shutting down")]
    ShuttingDown,

    /// Sink could not be created
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

impl PipelineError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
