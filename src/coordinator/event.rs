//! Events relayed to the application

use super::envelope::Delivery;
use super::error::CoordinatorError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug)]
pub enum CoordinatorEvent {
    /// An admitted message; complete it exactly once
    Data(Delivery),
    /// A failure with no caller waiting for it
    Error(CoordinatorError),
}

pub type EventReceiver = UnboundedReceiver<CoordinatorEvent>;

#[derive(Clone, Debug)]
pub(crate) struct EventSender {
    sender: UnboundedSender<CoordinatorEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, EventReceiver) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Hand a delivery to the application, or give it back if the receiver
    /// is gone
    pub fn data(&self, delivery: Delivery) -> Result<(), Delivery> {
        match self.sender.send(CoordinatorEvent::Data(delivery)) {
            Ok(()) => Ok(()),
            Err(err) => match err.0 {
                CoordinatorEvent::Data(delivery) => Err(delivery),
                CoordinatorEvent::Error(_) => Ok(()),
            },
        }
    }

    pub fn error(&self, error: CoordinatorError) {
        if let Err(err) = self.sender.send(CoordinatorEvent::Error(error)) {
            if let CoordinatorEvent::Error(error) = err.0 {
                log::warn!("Coordinator error with no receiver: {}", error);
            }
        }
    }
}
