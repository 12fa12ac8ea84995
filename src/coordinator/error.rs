//! Coordinator Error Types

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::core::error_handling::ContextualError;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Could not open.")]
    CouldNotOpen,

    #[error("Could not close.")]
    CouldNotClose,

    #[error("Could not start listening.")]
    CouldNotStartListening,

    #[error("Could not stop listening.")]
    CouldNotStopListening,

    #[error("Could not send message.")]
    CouldNotSendMessage,

    #[error("Message completion callback was called multiple times")]
    DuplicateCompletion,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Heartbeat failed: {0}")]
    Heartbeat(BackendError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal coordinator error: {message}")]
    Internal { message: String },

    #[error("Close was abandoned before in-flight messages drained")]
    CloseAbandoned,

    #[error("Could not close connection.")]
    CouldNotCloseConnection {
        #[source]
        source: Box<CoordinatorError>,
    },
}

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

impl CoordinatorError {
    /// The fixed message of an API misuse error
    fn fixed_message(&self) -> Option<&'static str> {
        match self {
            CoordinatorError::CouldNotOpen => Some("Could not open."),
            CoordinatorError::CouldNotClose => Some("Could not close."),
            CoordinatorError::CouldNotStartListening => Some("Could not start listening."),
            CoordinatorError::CouldNotStopListening => Some("Could not stop listening."),
            CoordinatorError::CouldNotSendMessage => Some("Could not send message."),
            CoordinatorError::DuplicateCompletion => {
                Some("Message completion callback was called multiple times")
            }
            _ => None,
        }
    }
}

impl ContextualError for CoordinatorError {
    fn is_user_actionable(&self) -> bool {
        match self {
            CoordinatorError::Config(err) => err.is_user_actionable(),
            other => other.fixed_message().is_some(),
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            CoordinatorError::Config(err) => err.user_message(),
            other => other.fixed_message(),
        }
    }
}
