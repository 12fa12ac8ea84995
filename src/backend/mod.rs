//! Storage backends
//!
//! The coordinator only sees the `Backend` and `WrappedMessage` traits.
//! Concrete adapters are created by name through the `BackendRegistry`;
//! the in-memory `mock` backend ships with the crate.

mod error;
mod events;
pub mod mock;
mod registry;
mod traits;

pub use error::{BackendError, BackendResult};
pub use events::{BackendEvent, BackendEventReceiver, BackendEvents};
pub use registry::{BackendFactory, BackendRegistry};
pub use traits::{Backend, WrappedMessage};
