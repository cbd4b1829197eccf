//! Dependency resolution for flows and reusable actions
//!
//! - `validate`: existence, self-reference, cycles, depth and redundancy
//! - `build_graph`: forward and reverse edges
//! - `execution_order`: Kahn ordering, dependencies before dependents
//!
//! Ordering among nodes that become ready together follows insertion order
//! of the dependency map.

pub mod errors;
pub mod graph;
pub mod validate;

pub use errors::ResolveError;
pub use graph::{
    build_graph, dependency_depth, detect_cycle, execution_order, ordered_dependencies,
    transitive_dependencies, DependencyMap, DependencyNode,
};
pub use validate::{DependencyResolver, DependencyValidation, ItemKind, DEFAULT_MAX_DEPTH};
