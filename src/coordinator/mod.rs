//! Queue coordinator
//!
//! Sits between the application and a storage backend: admits claimed
//! messages, keeps their claims alive with heartbeats, enforces the
//! processing limit, and guarantees each message is completed once.

mod backpressure;
mod envelope;
mod error;
mod event;
mod heartbeat;
mod manager;
mod state;

pub use backpressure::Backpressure;
pub use envelope::{Completion, Delivery};
pub use error::{CoordinatorError, CoordinatorResult};
pub use event::{CoordinatorEvent, EventReceiver};
pub use manager::{Coordinator, CoordinatorStatus};
pub use state::{ConnectionState, ListeningState};

#[cfg(test)]
mod tests;
