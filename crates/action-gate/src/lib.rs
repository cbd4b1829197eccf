//! Step assertions
//!
//! Declarative checks evaluated once a step's actions have run:
//! - `visible` / `hidden`: bounded wait for the element state
//! - `text`, `value`, `attribute`: exact string match
//! - `count`: exact number of matching elements
//! - `url`: current location contains the expected substring

pub mod errors;
pub mod types;
pub mod validator;

pub use errors::*;
pub use types::*;
pub use validator::*;
