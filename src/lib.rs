//! Flowrunner CLI library
//!
//! Exposes settings loading and command implementations for integration testing

pub mod commands;
pub mod config;

pub use config::Settings;
