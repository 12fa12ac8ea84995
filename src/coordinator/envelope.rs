//! In-flight message envelope
//!
//! A `Completion` guards one claimed message. Its first `done` call stops
//! the heartbeat, releases the backpressure slot and removes or requeues
//! the message; every later call only reports `DuplicateCompletion`.

use super::error::CoordinatorError;
use super::heartbeat::HeartbeatHandle;
use super::manager::Coordinator;
use crate::backend::WrappedMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

struct CompletionInner {
    message: Arc<dyn WrappedMessage>,
    done_was_called: AtomicBool,
    heartbeat: HeartbeatHandle,
    coordinator: Weak<Coordinator>,
}

impl Drop for CompletionInner {
    fn drop(&mut self) {
        if self.done_was_called.load(Ordering::Acquire) {
            return;
        }
        // Abandoned without completion: give the slot back and requeue
        self.heartbeat.stop();
        log::warn!("Delivery dropped without completion, requeueing");
        let message = Arc::clone(&self.message);
        let coordinator = self.coordinator.clone();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                settle(&coordinator, message, false).await;
            });
        }
    }
}

/// Completion handle of one claimed message; clones share the guard
#[derive(Clone)]
pub struct Completion {
    inner: Arc<CompletionInner>,
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("message", &self.inner.message.message())
            .field("done", &self.is_done())
            .finish()
    }
}

impl Completion {
    pub(crate) fn new(
        message: Arc<dyn WrappedMessage>,
        heartbeat: HeartbeatHandle,
        coordinator: Weak<Coordinator>,
    ) -> Self {
        Self {
            inner: Arc::new(CompletionInner {
                message,
                done_was_called: AtomicBool::new(false),
                heartbeat,
                coordinator,
            }),
        }
    }

    /// Finish processing: `Ok` removes the message, `Err` requeues it
    pub async fn done<E: std::fmt::Display>(&self, outcome: Result<(), E>) {
        if self.inner.done_was_called.swap(true, Ordering::AcqRel) {
            log::debug!("Duplicate completion ignored");
            if let Some(coordinator) = self.inner.coordinator.upgrade() {
                coordinator.emit_error(CoordinatorError::DuplicateCompletion);
            }
            return;
        }

        self.inner.heartbeat.stop();
        let success = match outcome {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Message processing failed, requeueing: {}", e);
                false
            }
        };
        settle(&self.inner.coordinator, Arc::clone(&self.inner.message), success).await;
    }

    /// Shorthand for a successful `done`
    pub async fn ack(&self) {
        self.done(Ok::<(), std::convert::Infallible>(())).await;
    }

    /// Shorthand for a failed `done`
    pub async fn nack(&self, reason: &str) {
        self.done(Err(reason)).await;
    }

    pub fn is_done(&self) -> bool {
        self.inner.done_was_called.load(Ordering::Acquire)
    }

    pub fn message(&self) -> &str {
        self.inner.message.message()
    }

    pub fn topic(&self) -> Option<&str> {
        self.inner.message.topic()
    }

    pub(crate) fn heartbeat_stopped(&self) -> bool {
        self.inner.heartbeat.is_stopped()
    }
}

async fn settle(coordinator: &Weak<Coordinator>, message: Arc<dyn WrappedMessage>, success: bool) {
    match coordinator.upgrade() {
        Some(coordinator) => coordinator.complete(message, success).await,
        None => {
            let result = if success {
                message.remove().await
            } else {
                message.requeue().await
            };
            if let Err(e) = result {
                log::warn!("Completion after coordinator shutdown failed: {}", e);
            }
        }
    }
}

/// A message handed to the application
#[derive(Debug)]
pub struct Delivery {
    completion: Completion,
}

impl Delivery {
    pub(crate) fn new(completion: Completion) -> Self {
        Self { completion }
    }

    pub fn message(&self) -> &str {
        self.completion.message()
    }

    pub fn topic(&self) -> Option<&str> {
        self.completion.topic()
    }

    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    pub async fn done<E: std::fmt::Display>(&self, outcome: Result<(), E>) {
        self.completion.done(outcome).await;
    }

    pub async fn ack(&self) {
        self.completion.ack().await;
    }

    pub async fn nack(&self, reason: &str) {
        self.completion.nack(reason).await;
    }
}
