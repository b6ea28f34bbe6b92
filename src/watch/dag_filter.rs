// src/watch/dag_filter.rs

//! DAG-aware filtering for watch events.
//!
//! Triggering a task pulls its dependencies into the run, so when one path
//! matches several tasks only the most downstream ones need a trigger.

use std::collections::{HashMap, HashSet};

/// Return true if some *other* task in `matching_names` depends on `task`,
/// directly or transitively, via the dependency lists in `dep_map`.
pub fn has_dependent_in_matching(
    task: &str,
    matching_names: &HashSet<String>,
    dep_map: &HashMap<String, Vec<String>>,
) -> bool {
    matching_names
        .iter()
        .filter(|candidate| candidate.as_str() != task)
        .any(|candidate| depends_on(candidate, task, dep_map))
}

fn depends_on(from: &str, target: &str, dep_map: &HashMap<String, Vec<String>>) -> bool {
    let mut stack: Vec<&str> = dep_map
        .get(from)
        .map(|deps| deps.iter().map(String::as_str).collect())
        .unwrap_or_default();
    let mut visited: HashSet<&str> = HashSet::new();

    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(deps) = dep_map.get(current) {
            stack.extend(deps.iter().map(String::as_str));
        }
    }

    false
}
