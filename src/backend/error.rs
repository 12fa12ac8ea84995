//! Backend Error Types

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Backend is not connected")]
    NotConnected,

    #[error("Backend operation '{operation}' failed: {message}")]
    Operation { operation: String, message: String },

    #[error("Unknown backend: {name}")]
    UnknownBackend { name: String },

    #[error("Backend '{name}' is already registered")]
    AlreadyRegistered { name: String },

    #[error("Invalid backend configuration: {message}")]
    Configuration { message: String },
}

impl BackendError {
    pub fn operation(operation: &str, message: impl Into<String>) -> Self {
        BackendError::Operation {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

impl crate::core::error_handling::ContextualError for BackendError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}
