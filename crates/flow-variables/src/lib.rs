//! Variable interpolation for flow and action definitions
//!
//! `${name}` placeholders are replaced with:
//! - time values (`timestamp`, `date`, `time`, `year`, ...)
//! - random values (`random`, `randomNumber`, `uniqueId`, `uuid`)
//! - configuration values (`baseUrl`, `username`, `password`)
//! - caller-supplied custom variables and `env.NAME` lookups
//! - synthetic data (`generator.person.firstName`, `generator.number.int(1, 9)`)
//!
//! Names that resolve to nothing are left in place untouched.

pub mod context;
pub mod generator;
pub mod interpolator;

pub use context::{Credentials, VariableContext};
pub use generator::DataGenerator;
pub use interpolator::Interpolator;
