//! Generic error handling utilities
//!
//! Provides unified error reporting across the configuration, backend and
//! coordinator error types while keeping their domain-specific wording.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// Configuration mistakes and misuse of the coordinator API (calling `close`
/// on a closed coordinator, completing a message twice) are user-actionable:
/// the caller can fix them. Backend failures are system errors: the caller
/// decides policy but cannot fix them by changing its own code.
///
/// When `is_user_actionable()` returns `true`, `user_message()` should return
/// `Some(message)`; otherwise it should return `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error carries a specific message that should be
    /// shown directly to the user
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific user message if this is a user-actionable error
    fn user_message(&self) -> Option<&str>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// User-actionable errors log their own message; system errors log the
/// operation context and leave the detail to debug level.
///
/// # Examples
/// ```rust,no_run
/// # use ddq::core::error_handling::log_error_with_context;
/// # use ddq::config::ConfigError;
/// let err = ConfigError::missing("backend");
/// log_error_with_context(&err, "Loading configuration");
/// // Logs: "FATAL: Config.backend must be defined."
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    if error.is_user_actionable() {
        if let Some(user_msg) = error.user_message() {
            log::error!("FATAL: {}", user_msg);
        } else {
            log::error!("FATAL: {}", operation_context);
        }
    } else {
        log::error!("FATAL: {}", operation_context);
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::config::ConfigError;
    use crate::coordinator::CoordinatorError;

    #[test]
    fn test_config_errors_are_user_actionable() {
        let error = ConfigError::missing("heartbeatDelayMs");

        assert!(error.is_user_actionable());
        assert_eq!(
            error.user_message(),
            Some("Config.heartbeatDelayMs must be defined.")
        );
    }

    #[test]
    fn test_backend_errors_use_generic_context() {
        let error = BackendError::Connection {
            message: "Connection refused".to_string(),
        };

        assert!(!error.is_user_actionable());
        assert_eq!(error.user_message(), None);

        // Should not panic without a logger installed
        log_error_with_context(&error, "Opening backend connection");
    }

    #[test]
    fn test_precondition_errors_carry_fixed_message() {
        let error = CoordinatorError::CouldNotOpen;

        assert!(error.is_user_actionable());
        assert_eq!(error.user_message(), Some("Could not open."));
    }
}
