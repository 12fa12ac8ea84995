//! Command line and configuration file handling

pub mod args;
pub mod config;

pub use args::Args;
