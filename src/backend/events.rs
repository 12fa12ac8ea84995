//! Backend event channel
//!
//! A backend receives a `BackendEvents` handle at construction and pushes
//! claimed messages and asynchronous failures through it. The coordinator
//! holds the single receiving end, so listeners are attached exactly once
//! per backend instance.

use crate::backend::error::BackendError;
use crate::backend::traits::WrappedMessage;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Events emitted by a backend
pub enum BackendEvent {
    /// A message was claimed and is ready for processing
    Data(Arc<dyn WrappedMessage>),
    /// A failure that happened outside any coordinator call
    Error(BackendError),
}

impl std::fmt::Debug for BackendEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendEvent::Data(message) => f
                .debug_tuple("Data")
                .field(&message.message())
                .finish(),
            BackendEvent::Error(err) => f.debug_tuple("Error").field(err).finish(),
        }
    }
}

pub type BackendEventReceiver = UnboundedReceiver<BackendEvent>;

/// Sending half of the backend event channel
#[derive(Clone, Debug)]
pub struct BackendEvents {
    sender: UnboundedSender<BackendEvent>,
}

impl BackendEvents {
    /// Create a connected sender/receiver pair
    pub fn channel() -> (Self, BackendEventReceiver) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Emit a claimed message. Returns false if nobody is listening any more.
    pub fn data(&self, message: Arc<dyn WrappedMessage>) -> bool {
        self.sender.send(BackendEvent::Data(message)).is_ok()
    }

    /// Emit a backend-side failure. Returns false if nobody is listening any more.
    pub fn error(&self, error: BackendError) -> bool {
        self.sender.send(BackendEvent::Error(error)).is_ok()
    }
}
