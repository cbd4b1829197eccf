//! Dependency validation

use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use crate::graph::{dependency_depth, detect_cycle, transitive_dependencies, DependencyMap};

/// Chains deeper than this draw a warning
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// What kind of item is being validated; only used for messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Flow,
    Action,
}

impl ItemKind {
    fn label(&self) -> &'static str {
        match self {
            ItemKind::Flow => "Flow",
            ItemKind::Action => "Action",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Flow => f.write_str("flow"),
            ItemKind::Action => f.write_str("action"),
        }
    }
}

/// Result of checking one item's dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub circular_paths: Vec<Vec<String>>,
}

/// Validates declared dependencies against the full dependency map
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    max_depth: usize,
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl DependencyResolver {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Validate `dependencies` as the dependency list of `id`.
    ///
    /// `dependencies` replaces whatever `all_items` declares for `id`, so an
    /// edit can be checked before it is saved. Missing ids, self-reference and
    /// cycles are errors; excessive depth and redundant edges are warnings.
    pub fn validate(
        &self,
        id: &str,
        dependencies: &[String],
        all_items: &DependencyMap,
        kind: ItemKind,
    ) -> DependencyValidation {
        let mut result = DependencyValidation::default();

        for dep in dependencies {
            if dep == id {
                result
                    .errors
                    .push(format!("{} '{}' cannot depend on itself", kind.label(), id));
            } else if !all_items.contains_key(dep) {
                result.errors.push(format!(
                    "{} '{}' depends on missing {} '{}'",
                    kind.label(),
                    id,
                    kind,
                    dep
                ));
            }
        }

        // Self edges are reported above; keep them out of the cycle search.
        let mut effective = all_items.clone();
        effective.insert(
            id.to_string(),
            dependencies
                .iter()
                .filter(|dep| dep.as_str() != id)
                .cloned()
                .collect(),
        );

        let cycle = detect_cycle(&effective, Some(id));
        if let Some(path) = cycle {
            result.errors.push(format!(
                "Circular dependency detected: {}",
                path.join(" -> ")
            ));
            result.circular_paths.push(path);
        } else {
            let depth = dependency_depth(&effective, id);
            if depth > self.max_depth {
                result.warnings.push(format!(
                    "{} '{}' has dependency depth {} (recommended maximum {})",
                    kind.label(),
                    id,
                    depth,
                    self.max_depth
                ));
            }
        }

        for dep in dependencies {
            if dep == id || !effective.contains_key(dep) {
                continue;
            }
            let via = dependencies.iter().find(|other| {
                *other != dep
                    && other.as_str() != id
                    && transitive_dependencies(&effective, other).contains(dep)
            });
            if let Some(via) = via {
                result.warnings.push(format!(
                    "Dependency '{}' is redundant: already required through '{}'",
                    dep, via
                ));
            }
        }

        result.valid = result.errors.is_empty();
        if result.valid {
            debug!(
                id,
                warnings = result.warnings.len(),
                "Dependencies validated"
            );
        } else {
            warn!(id, errors = ?result.errors, "Dependency validation failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &[&str])]) -> DependencyMap {
        entries
            .iter()
            .map(|(id, deps)| {
                (
                    id.to_string(),
                    deps.iter().map(|d| d.to_string()).collect(),
                )
            })
            .collect()
    }

    fn deps(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn valid_dependencies_pass() {
        let items = map(&[("login", &[]), ("checkout", &["login"])]);
        let result = DependencyResolver::default().validate(
            "checkout",
            &deps(&["login"]),
            &items,
            ItemKind::Flow,
        );
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn self_dependency_always_fails() {
        let items = map(&[("a", &[])]);
        let result =
            DependencyResolver::default().validate("a", &deps(&["a"]), &items, ItemKind::Flow);
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Flow 'a' cannot depend on itself"]);
        assert!(result.circular_paths.is_empty());
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let items = map(&[("a", &[])]);
        let result =
            DependencyResolver::default().validate("a", &deps(&["ghost"]), &items, ItemKind::Action);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec!["Action 'a' depends on missing action 'ghost'"]
        );
    }

    #[test]
    fn cycle_is_reported_with_path() {
        let items = map(&[("A", &["B"]), ("B", &["A"])]);
        let result =
            DependencyResolver::default().validate("A", &deps(&["B"]), &items, ItemKind::Flow);
        assert!(!result.valid);
        assert_eq!(result.circular_paths, vec![deps(&["A", "B", "A"])]);
    }

    #[test]
    fn proposed_edit_can_introduce_a_cycle() {
        let items = map(&[("A", &[]), ("B", &["A"])]);
        let result =
            DependencyResolver::default().validate("A", &deps(&["B"]), &items, ItemKind::Flow);
        assert!(!result.valid);
        assert_eq!(result.circular_paths.len(), 1);
    }

    #[test]
    fn deep_chain_warns() {
        let items = map(&[
            ("f1", &["f2"]),
            ("f2", &["f3"]),
            ("f3", &["f4"]),
            ("f4", &[]),
        ]);
        let result =
            DependencyResolver::new(2).validate("f1", &deps(&["f2"]), &items, ItemKind::Flow);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("depth 3"));
    }

    #[test]
    fn redundant_dependency_warns() {
        let items = map(&[("a", &["b", "c"]), ("b", &["c"]), ("c", &[])]);
        let result = DependencyResolver::default().validate(
            "a",
            &deps(&["b", "c"]),
            &items,
            ItemKind::Flow,
        );
        assert!(result.valid);
        assert_eq!(
            result.warnings,
            vec!["Dependency 'c' is redundant: already required through 'b'"]
        );
    }

    #[test]
    fn validation_serializes_camel_case() {
        let result = DependencyValidation {
            valid: false,
            errors: vec!["x".into()],
            warnings: vec![],
            circular_paths: vec![deps(&["a", "a"])],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("circularPaths").is_some());
    }
}
