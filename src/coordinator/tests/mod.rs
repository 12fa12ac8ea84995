//! Coordinator Tests
//!
//! Organized by concern; all tests drive the coordinator through the mock
//! backend captured by `helpers::Harness`.

mod backpressure_flow;
mod helpers;
