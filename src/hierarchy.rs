//! Parent/child invariants for tasks.
//!
//! A task's parent chain must end at a root without revisiting the task. The
//! configured depth bound applies when a parent link is created or changed;
//! stored chains are only required to exist and be acyclic.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::task::TaskRecord;

const PARENT_FIELD: &str = "parent";

/// Check that `task_id` may take `parent` as its parent.
///
/// `task_id` may be an id that is not stored yet (task creation). The new
/// chain, counted from the deepest descendant of `task_id` up to the root,
/// may not exceed `max_depth` hops.
pub fn check_parent(
    tasks: &BTreeMap<u64, TaskRecord>,
    task_id: u64,
    parent: u64,
    max_depth: usize,
) -> Result<()> {
    if parent == task_id {
        return Err(Error::validation(
            PARENT_FIELD,
            "a task cannot be its own parent",
        ));
    }
    if !tasks.contains_key(&parent) {
        return Err(Error::validation(
            PARENT_FIELD,
            format!("parent task {parent} does not exist"),
        ));
    }

    let below = subtree_height(tasks, task_id);
    let mut current = Some(parent);
    let mut depth = below;
    while let Some(id) = current {
        if id == task_id {
            return Err(Error::validation(
                PARENT_FIELD,
                format!("parent {parent} would create a cycle through task {task_id}"),
            ));
        }
        depth += 1;
        if depth > max_depth {
            return Err(Error::validation(
                PARENT_FIELD,
                format!("hierarchy deeper than {max_depth} levels"),
            ));
        }
        current = tasks.get(&id).and_then(|task| task.parent);
    }
    Ok(())
}

/// Levels of descendants below `task_id` (0 for a leaf or an unknown id).
pub fn subtree_height(tasks: &BTreeMap<u64, TaskRecord>, task_id: u64) -> usize {
    let mut height = 0;
    let mut level = vec![task_id];
    let mut seen = HashSet::from([task_id]);
    loop {
        let next: Vec<u64> = tasks
            .values()
            .filter(|task| task.parent.is_some_and(|parent| level.contains(&parent)))
            .map(|task| task.id)
            .filter(|id| seen.insert(*id))
            .collect();
        if next.is_empty() {
            return height;
        }
        height += 1;
        level = next;
    }
}

/// Check that every stored parent exists and no chain loops back on itself.
pub fn validate_all(tasks: &BTreeMap<u64, TaskRecord>) -> Result<()> {
    for task in tasks.values() {
        let mut seen = HashSet::from([task.id]);
        let mut current = task.parent;
        while let Some(id) = current {
            let Some(parent) = tasks.get(&id) else {
                return Err(Error::validation(
                    PARENT_FIELD,
                    format!("task {} has missing parent {id}", task.id),
                ));
            };
            if !seen.insert(id) {
                return Err(Error::validation(
                    PARENT_FIELD,
                    format!("task {} is part of a parent cycle", task.id),
                ));
            }
            current = parent.parent;
        }
    }
    Ok(())
}

/// Ancestors of `task_id`, nearest first.
pub fn ancestors(tasks: &BTreeMap<u64, TaskRecord>, task_id: u64) -> Vec<u64> {
    let mut chain = Vec::new();
    let mut current = tasks.get(&task_id).and_then(|task| task.parent);
    while let Some(id) = current {
        if id == task_id || chain.contains(&id) {
            break; // cycle guard
        }
        chain.push(id);
        current = tasks.get(&id).and_then(|task| task.parent);
    }
    chain
}

/// Direct children of `task_id`, by id.
pub fn children(tasks: &BTreeMap<u64, TaskRecord>, task_id: u64) -> Vec<u64> {
    tasks
        .values()
        .filter(|task| task.parent == Some(task_id))
        .map(|task| task.id)
        .collect()
}
