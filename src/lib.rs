pub mod app;
pub mod backend;
pub mod config;
pub mod coordinator;
pub mod core;
