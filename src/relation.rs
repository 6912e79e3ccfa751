//! Typed directed links between tasks.
//!
//! A link is unique per (source, destination, type) and never points a task at
//! itself. Cycles across links are allowed: a `blocks` chain may loop back.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{Error, Result, NON_FIELD};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Blocks,
    Depends,
    Relates,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Blocks => "blocks",
            LinkType::Depends => "depends",
            LinkType::Relates => "relates",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            LinkType::Blocks => "Bloque",
            LinkType::Depends => "Dépend",
            LinkType::Relates => "Relatif à",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocks" => Ok(LinkType::Blocks),
            "depends" => Ok(LinkType::Depends),
            "relates" => Ok(LinkType::Relates),
            other => Err(Error::validation(
                "link_type",
                format!("invalid link type '{other}' (expected blocks|depends|relates)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRelation {
    pub id: u64,
    pub src_task: u64,
    pub dst_task: u64,
    pub link_type: LinkType,
    pub created_at: DateTime<Utc>,
}

pub fn create(
    dataset: &mut Dataset,
    src_task: u64,
    dst_task: u64,
    link_type: LinkType,
) -> Result<TaskRelation> {
    if src_task == dst_task {
        return Err(Error::validation("dst_task", "cannot link task to itself"));
    }
    if !dataset.tasks.contains_key(&src_task) {
        return Err(Error::validation(
            "src_task",
            format!("task {src_task} does not exist"),
        ));
    }
    if !dataset.tasks.contains_key(&dst_task) {
        return Err(Error::validation(
            "dst_task",
            format!("task {dst_task} does not exist"),
        ));
    }
    let exists = dataset.relations.values().any(|relation| {
        relation.src_task == src_task
            && relation.dst_task == dst_task
            && relation.link_type == link_type
    });
    if exists {
        return Err(Error::validation(NON_FIELD, "relation already exists"));
    }

    let relation = TaskRelation {
        id: dataset.ids.next_relation(),
        src_task,
        dst_task,
        link_type,
        created_at: Utc::now(),
    };
    dataset.relations.insert(relation.id, relation.clone());
    tracing::debug!(relation = relation.id, src_task, dst_task, %link_type, "relation created");
    Ok(relation)
}

pub fn delete(dataset: &mut Dataset, id: u64) -> Result<TaskRelation> {
    dataset
        .relations
        .remove(&id)
        .ok_or_else(|| Error::not_found("relation", id))
}

#[derive(Debug, Clone, Default)]
pub struct RelationFilter {
    pub link_type: Option<LinkType>,
    pub src_task: Option<u64>,
    pub dst_task: Option<u64>,
}

pub fn list(dataset: &Dataset, filter: &RelationFilter) -> Vec<TaskRelation> {
    let mut relations: Vec<TaskRelation> = dataset
        .relations
        .values()
        .filter(|relation| filter.link_type.map_or(true, |kind| relation.link_type == kind))
        .filter(|relation| filter.src_task.map_or(true, |id| relation.src_task == id))
        .filter(|relation| filter.dst_task.map_or(true, |id| relation.dst_task == id))
        .cloned()
        .collect();
    relations.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    relations
}

/// Links touching one task, split by direction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskLinks {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outgoing: Vec<TaskRelation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub incoming: Vec<TaskRelation>,
}

impl TaskLinks {
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }
}

pub fn links_for(dataset: &Dataset, task_id: u64) -> TaskLinks {
    let mut links = TaskLinks::default();
    for relation in dataset.relations.values() {
        if relation.src_task == task_id {
            links.outgoing.push(relation.clone());
        } else if relation.dst_task == task_id {
            links.incoming.push(relation.clone());
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskRecord;

    fn dataset_with_tasks(count: u64) -> Dataset {
        let mut dataset = Dataset::seeded();
        for id in 1..=count {
            dataset
                .tasks
                .insert(id, TaskRecord::bare(id, &format!("t{id}"), "task"));
        }
        dataset.reconcile_ids();
        dataset
    }

    #[test]
    fn self_link_is_rejected_for_every_type() {
        let mut dataset = dataset_with_tasks(1);
        for kind in [LinkType::Blocks, LinkType::Depends, LinkType::Relates] {
            let err = create(&mut dataset, 1, 1, kind).unwrap_err();
            assert_eq!(err.field(), Some("dst_task"));
            assert!(err.to_string().contains("cannot link task to itself"));
        }
        assert!(dataset.relations.is_empty());
    }

    #[test]
    fn duplicate_triple_is_rejected() {
        let mut dataset = dataset_with_tasks(2);
        create(&mut dataset, 1, 2, LinkType::Blocks).unwrap();
        let err = create(&mut dataset, 1, 2, LinkType::Blocks).unwrap_err();
        assert!(err.to_string().contains("relation already exists"));

        // Same pair with another type, or reversed, is a different triple.
        create(&mut dataset, 1, 2, LinkType::Relates).unwrap();
        create(&mut dataset, 2, 1, LinkType::Blocks).unwrap();
        assert_eq!(dataset.relations.len(), 3);
    }

    #[test]
    fn cycles_across_links_are_accepted() {
        let mut dataset = dataset_with_tasks(3);
        create(&mut dataset, 1, 2, LinkType::Blocks).unwrap();
        create(&mut dataset, 2, 3, LinkType::Blocks).unwrap();
        create(&mut dataset, 3, 1, LinkType::Blocks).unwrap();
        dataset
            .validate(&crate::config::TasksConfig::default())
            .expect("valid");
    }

    #[test]
    fn missing_tasks_are_rejected() {
        let mut dataset = dataset_with_tasks(1);
        let err = create(&mut dataset, 1, 9, LinkType::Depends).unwrap_err();
        assert_eq!(err.field(), Some("dst_task"));
    }

    #[test]
    fn list_filters_and_links_split_direction() {
        let mut dataset = dataset_with_tasks(3);
        create(&mut dataset, 1, 2, LinkType::Blocks).unwrap();
        create(&mut dataset, 3, 1, LinkType::Relates).unwrap();

        let filter = RelationFilter {
            link_type: Some(LinkType::Blocks),
            ..Default::default()
        };
        assert_eq!(list(&dataset, &filter).len(), 1);

        let links = links_for(&dataset, 1);
        assert_eq!(links.outgoing.len(), 1);
        assert_eq!(links.incoming.len(), 1);
        assert!(links_for(&dataset, 2).outgoing.is_empty());
    }

    #[test]
    fn delete_unknown_relation_is_not_found() {
        let mut dataset = dataset_with_tasks(2);
        assert!(matches!(
            delete(&mut dataset, 5),
            Err(Error::NotFound { .. })
        ));
    }
}
