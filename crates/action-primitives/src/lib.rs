//! Action primitives - typed automation operations and their dispatch
//!
//! This crate provides:
//! - Typed action descriptors decoded from `{type, ...fields}` records
//! - The `AutomationDriver` capability an external browser driver implements
//! - `ActionDispatcher`, mapping each action variant onto a driver call

pub mod dispatcher;
pub mod driver;
pub mod errors;
pub mod types;

pub use dispatcher::*;
pub use driver::*;
pub use errors::*;
pub use types::*;
