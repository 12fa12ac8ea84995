//! Coordinator state machine
//!
//! All fields live behind one mutex in the coordinator. Every check-then-act
//! transition happens inside a single critical section.

use super::backpressure::Backpressure;
use super::error::CoordinatorResult;
use tokio::sync::oneshot;

/// Connection lifecycle; exactly one state at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Opening,
    Open,
    Closing,
}

impl ConnectionState {
    /// An open or close is in progress
    pub fn is_busy(self) -> bool {
        matches!(self, ConnectionState::Opening | ConnectionState::Closing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningState {
    NotListening,
    Listening,
    StoppingListening,
}

/// Resolved with the result of the deferred close
pub(crate) type CloseWaiter = oneshot::Sender<CoordinatorResult<()>>;

#[derive(Debug)]
pub(crate) struct CoordinatorState {
    pub connection: ConnectionState,
    pub listening: ListeningState,
    pub paused_by_user: bool,
    pub backpressure: Backpressure,
    /// Completions whose remove/requeue has not returned yet
    pub settling: usize,
    /// What the backend was last successfully told
    pub backend_polling: bool,
    pub close_waiter: Option<CloseWaiter>,
}

impl CoordinatorState {
    pub fn new(max_processing_messages: usize) -> Self {
        Self {
            connection: ConnectionState::Closed,
            listening: ListeningState::NotListening,
            paused_by_user: false,
            backpressure: Backpressure::new(max_processing_messages),
            settling: 0,
            backend_polling: false,
            close_waiter: None,
        }
    }

    /// Whether claimed messages are admitted, and equally whether the backend
    /// should be polling
    pub fn is_accepting(&self) -> bool {
        self.connection == ConnectionState::Open
            && self.listening == ListeningState::Listening
            && !self.paused_by_user
            && !self.backpressure.is_paused()
    }

    pub fn is_drained(&self) -> bool {
        self.backpressure.in_transit() == 0 && self.settling == 0
    }

    /// Hand out the deferred close once a closing coordinator has drained
    pub fn take_close_waiter_if_drained(&mut self) -> Option<CloseWaiter> {
        if self.connection == ConnectionState::Closing && self.is_drained() {
            self.close_waiter.take()
        } else {
            None
        }
    }

    /// Successful disconnect
    pub fn reset_closed(&mut self) {
        self.connection = ConnectionState::Closed;
        self.listening = ListeningState::NotListening;
        self.paused_by_user = false;
        self.backend_polling = false;
    }
}
