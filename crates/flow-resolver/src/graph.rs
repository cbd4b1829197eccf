//! Dependency graph construction and traversal

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::errors::ResolveError;

/// Item id to its declared dependencies, in definition order
pub type DependencyMap = IndexMap<String, Vec<String>>;

/// One node of a dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub id: String,
    /// Items this node depends on
    pub dependencies: Vec<String>,
    /// Items that depend on this node
    pub dependents: Vec<String>,
}

/// Build graph nodes, deriving reverse edges from the declared ones.
///
/// Dependencies on ids missing from `items` are kept on the node but get no
/// reverse edge.
pub fn build_graph(items: &DependencyMap) -> IndexMap<String, DependencyNode> {
    let mut nodes: IndexMap<String, DependencyNode> = items
        .iter()
        .map(|(id, deps)| {
            let dependencies: IndexSet<String> = deps.iter().cloned().collect();
            (
                id.clone(),
                DependencyNode {
                    id: id.clone(),
                    dependencies: dependencies.into_iter().collect(),
                    dependents: Vec::new(),
                },
            )
        })
        .collect();

    for (id, deps) in items {
        for dep in deps {
            if let Some(node) = nodes.get_mut(dep) {
                if !node.dependents.contains(id) {
                    node.dependents.push(id.clone());
                }
            }
        }
    }

    nodes
}

/// Order node ids so every dependency precedes its dependents (Kahn).
///
/// Fails when fewer ids come out than went in, which means the leftover
/// nodes sit on a cycle.
pub fn execution_order(
    nodes: &IndexMap<String, DependencyNode>,
) -> Result<Vec<String>, ResolveError> {
    let mut in_degree: IndexMap<&str, usize> = nodes
        .values()
        .map(|node| {
            let degree = node
                .dependencies
                .iter()
                .filter(|dep| nodes.contains_key(dep.as_str()))
                .count();
            (node.id.as_str(), degree)
        })
        .collect();

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        if let Some(node) = nodes.get(id) {
            for dependent in &node.dependents {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent.as_str());
                    }
                }
            }
        }
    }

    if order.len() < nodes.len() {
        let remaining = in_degree
            .iter()
            .filter(|(_, &degree)| degree > 0)
            .map(|(id, _)| id.to_string())
            .collect();
        return Err(ResolveError::Cycle { remaining });
    }

    Ok(order)
}

/// Depth-first search for the first cycle reachable from `from`, or from any
/// node when `from` is `None`.
///
/// The returned path starts and ends on the node that closed the cycle,
/// e.g. `["a", "b", "a"]`.
pub fn detect_cycle(items: &DependencyMap, from: Option<&str>) -> Option<Vec<String>> {
    fn visit<'a>(
        id: &'a str,
        items: &'a DependencyMap,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(id);
        stack.push(id);

        if let Some(deps) = items.get(id) {
            for dep in deps {
                if let Some(position) = stack.iter().position(|entry| *entry == dep.as_str()) {
                    let mut path: Vec<String> =
                        stack[position..].iter().map(|s| s.to_string()).collect();
                    path.push(dep.clone());
                    return Some(path);
                }
                if !visited.contains(dep.as_str()) {
                    if let Some(path) = visit(dep, items, visited, stack) {
                        return Some(path);
                    }
                }
            }
        }

        stack.pop();
        None
    }

    let mut visited = HashSet::new();
    let mut stack = Vec::new();

    match from {
        Some(start) => visit(start, items, &mut visited, &mut stack),
        None => {
            for id in items.keys() {
                if visited.contains(id.as_str()) {
                    continue;
                }
                if let Some(path) = visit(id, items, &mut visited, &mut stack) {
                    return Some(path);
                }
            }
            None
        }
    }
}

/// Length of the longest dependency chain below `id`, in edges.
///
/// Back edges are ignored so the walk terminates on cyclic input.
pub fn dependency_depth(items: &DependencyMap, id: &str) -> usize {
    fn depth<'a>(
        id: &'a str,
        items: &'a DependencyMap,
        memo: &mut HashMap<&'a str, usize>,
        on_path: &mut HashSet<&'a str>,
    ) -> usize {
        if let Some(known) = memo.get(id) {
            return *known;
        }
        on_path.insert(id);
        let mut deepest = 0;
        if let Some(deps) = items.get(id) {
            for dep in deps {
                if on_path.contains(dep.as_str()) || !items.contains_key(dep.as_str()) {
                    continue;
                }
                deepest = deepest.max(1 + depth(dep, items, memo, on_path));
            }
        }
        on_path.remove(id);
        memo.insert(id, deepest);
        deepest
    }

    let mut memo = HashMap::new();
    let mut on_path = HashSet::new();
    depth(id, items, &mut memo, &mut on_path)
}

/// Every id reachable from `id` through dependency edges, in discovery order
pub fn transitive_dependencies(items: &DependencyMap, id: &str) -> IndexSet<String> {
    let mut found = IndexSet::new();
    let mut to_visit: Vec<&str> = vec![id];

    while let Some(current) = to_visit.pop() {
        if let Some(deps) = items.get(current) {
            for dep in deps {
                if found.insert(dep.clone()) {
                    to_visit.push(dep.as_str());
                }
            }
        }
    }

    found
}

/// Transitive dependencies of `id` in execution order, `id` itself excluded.
///
/// Only the sub-graph reachable from `id` is ordered, so unrelated cycles
/// elsewhere in `items` do not affect the result.
pub fn ordered_dependencies(items: &DependencyMap, id: &str) -> Result<Vec<String>, ResolveError> {
    if !items.contains_key(id) {
        return Err(ResolveError::Unknown {
            kind: "item".to_string(),
            id: id.to_string(),
        });
    }
    let reachable = transitive_dependencies(items, id);
    if reachable.contains(id) {
        return Err(ResolveError::Cycle {
            remaining: vec![id.to_string()],
        });
    }
    let sub: DependencyMap = items
        .iter()
        .filter(|(key, _)| reachable.contains(key.as_str()))
        .map(|(key, deps)| (key.clone(), deps.clone()))
        .collect();
    execution_order(&build_graph(&sub))
}
