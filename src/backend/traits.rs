//! Backend and wrapped message contracts
//!
//! The coordinator drives a backend through this fixed surface and never
//! looks behind it: connection handling, polling, persistence and
//! deduplication are all backend-internal.

use crate::backend::error::BackendResult;
use async_trait::async_trait;

/// Storage backend driven by the queue coordinator
///
/// Claimed messages and backend-side failures are not returned from these
/// methods; they are pushed through the `BackendEvents` handle the backend
/// received from its factory.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Establish the backend connection
    async fn connect(&self) -> BackendResult<()>;

    /// Tear down the backend connection
    async fn disconnect(&self) -> BackendResult<()>;

    /// Begin polling for messages to claim
    async fn start_listening(&self) -> BackendResult<()>;

    /// Stop polling; messages already claimed stay claimed
    async fn stop_listening(&self) -> BackendResult<()>;

    /// Store a new message, optionally under a topic
    async fn send_message(&self, message: String, topic: Option<String>) -> BackendResult<()>;
}

/// A message claimed by the backend on behalf of this process
///
/// `remove` and `requeue` are mutually exclusive and the coordinator calls
/// exactly one of them, once.
#[async_trait]
pub trait WrappedMessage: Send + Sync {
    /// The payload handed to the application
    fn message(&self) -> &str;

    /// Topic the message was sent under, if any
    fn topic(&self) -> Option<&str> {
        None
    }

    /// Extend the liveness lease of the claim
    async fn heartbeat(&self) -> BackendResult<()>;

    /// Permanently acknowledge successful processing
    async fn remove(&self) -> BackendResult<()>;

    /// Return the message to availability for another claim
    async fn requeue(&self) -> BackendResult<()>;
}
