//! Storage backends for flow definitions and run reports
//!
//! File-system stores write atomically and keep one directory per run;
//! in-memory stores back tests and embedded use.

pub mod definitions;
pub mod errors;
pub mod fs;
pub mod reports;

pub use definitions::{FsDefinitionStore, InMemoryDefinitionStore};
pub use errors::{StoreErrKind, StoreError};
pub use reports::{FsReportStore, InMemoryReportStore};
