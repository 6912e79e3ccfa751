//! In-memory dataset persisted as one JSON document.
//!
//! Every mutation runs against a [`Dataset`] loaded inside a store transaction
//! (see [`crate::storage::Storage::transaction`]); the dataset is validated as a
//! whole before it is written back.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::config::TasksConfig;
use crate::error::{Error, Result};
use crate::hierarchy;
use crate::message::Message;
use crate::need::NeedRecord;
use crate::project::ProjectRecord;
use crate::relation::TaskRelation;
use crate::task::{TaskRecord, TaskType};
use crate::user::UserRecord;

pub const DATASET_SCHEMA_VERSION: &str = "taskflow.dataset.v1";

/// Monotonic id allocators; ids are never reused after deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdCounters {
    #[serde(default = "first_id")]
    pub task: u64,
    #[serde(default = "first_id")]
    pub need: u64,
    #[serde(default = "first_id")]
    pub relation: u64,
    #[serde(default = "first_id")]
    pub message: u64,
    #[serde(default = "first_id")]
    pub project: u64,
    #[serde(default = "first_id")]
    pub attachment: u64,
}

fn first_id() -> u64 {
    1
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            task: 1,
            need: 1,
            relation: 1,
            message: 1,
            project: 1,
            attachment: 1,
        }
    }
}

fn take(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}

fn bump_past(counter: &mut u64, used: u64) {
    if *counter <= used {
        *counter = used + 1;
    }
}

impl IdCounters {
    pub fn next_task(&mut self) -> u64 {
        take(&mut self.task)
    }

    pub fn next_need(&mut self) -> u64 {
        take(&mut self.need)
    }

    pub fn next_relation(&mut self) -> u64 {
        take(&mut self.relation)
    }

    pub fn next_message(&mut self) -> u64 {
        take(&mut self.message)
    }

    pub fn next_project(&mut self) -> u64 {
        take(&mut self.project)
    }

    pub fn next_attachment(&mut self) -> u64 {
        take(&mut self.attachment)
    }
}

/// Snapshot currently considered authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveCommit {
    pub name: String,
    pub activated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub schema_version: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub ids: IdCounters,
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
    #[serde(default)]
    pub task_types: BTreeMap<String, TaskType>,
    #[serde(default)]
    pub projects: BTreeMap<u64, ProjectRecord>,
    #[serde(default)]
    pub tasks: BTreeMap<u64, TaskRecord>,
    #[serde(default)]
    pub relations: BTreeMap<u64, TaskRelation>,
    #[serde(default)]
    pub needs: BTreeMap<u64, NeedRecord>,
    #[serde(default)]
    pub messages: BTreeMap<u64, Message>,
    #[serde(default)]
    pub attachments: BTreeMap<u64, Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_commit: Option<ActiveCommit>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::empty()
    }
}

impl Dataset {
    pub fn empty() -> Self {
        Self {
            schema_version: DATASET_SCHEMA_VERSION.to_string(),
            updated_at: Utc::now(),
            ids: IdCounters::default(),
            users: BTreeMap::new(),
            task_types: BTreeMap::new(),
            projects: BTreeMap::new(),
            tasks: BTreeMap::new(),
            relations: BTreeMap::new(),
            needs: BTreeMap::new(),
            messages: BTreeMap::new(),
            attachments: BTreeMap::new(),
            active_commit: None,
        }
    }

    /// A fresh dataset with the standard task types.
    pub fn seeded() -> Self {
        let mut dataset = Self::empty();
        crate::task::seed_task_types(&mut dataset);
        dataset
    }

    pub fn task(&self, id: u64) -> Result<&TaskRecord> {
        self.tasks.get(&id).ok_or_else(|| Error::not_found("task", id))
    }

    pub fn need(&self, id: u64) -> Result<&NeedRecord> {
        self.needs.get(&id).ok_or_else(|| Error::not_found("need", id))
    }

    pub fn message(&self, id: u64) -> Result<&Message> {
        self.messages
            .get(&id)
            .ok_or_else(|| Error::not_found("message", id))
    }

    /// Move every allocator past the highest id in use.
    ///
    /// Needed after records were inserted with caller-chosen ids.
    pub fn reconcile_ids(&mut self) {
        if let Some(id) = self.tasks.keys().next_back() {
            bump_past(&mut self.ids.task, *id);
        }
        if let Some(id) = self.needs.keys().next_back() {
            bump_past(&mut self.ids.need, *id);
        }
        if let Some(id) = self.relations.keys().next_back() {
            bump_past(&mut self.ids.relation, *id);
        }
        if let Some(id) = self.messages.keys().next_back() {
            bump_past(&mut self.ids.message, *id);
        }
        if let Some(id) = self.projects.keys().next_back() {
            bump_past(&mut self.ids.project, *id);
        }
        if let Some(id) = self.attachments.keys().next_back() {
            bump_past(&mut self.ids.attachment, *id);
        }
    }

    /// Whole-dataset integrity check run before every write.
    pub fn validate(&self, config: &TasksConfig) -> Result<()> {
        for (id, task) in &self.tasks {
            if task.id != *id {
                return Err(Error::OperationFailed(format!(
                    "task key {id} does not match record id {}",
                    task.id
                )));
            }
            if !self.task_types.contains_key(&task.task_type) {
                return Err(Error::validation(
                    "task_type",
                    format!("unknown task type '{}' on task {id}", task.task_type),
                ));
            }
            if let Some(project) = task.project {
                if !self.projects.contains_key(&project) {
                    return Err(Error::validation(
                        "project",
                        format!("task {id} references missing project {project}"),
                    ));
                }
            }
            for user in [task.owner.as_ref(), task.reporter.as_ref()]
                .into_iter()
                .flatten()
            {
                if !self.users.contains_key(user) {
                    return Err(Error::OperationFailed(format!(
                        "task {id} references unknown user '{user}'"
                    )));
                }
            }
        }
        hierarchy::validate_all(&self.tasks)?;

        let mut triples = HashSet::new();
        for relation in self.relations.values() {
            if relation.src_task == relation.dst_task {
                return Err(Error::validation(
                    "dst_task",
                    "cannot link task to itself",
                ));
            }
            if !self.tasks.contains_key(&relation.src_task)
                || !self.tasks.contains_key(&relation.dst_task)
            {
                return Err(Error::OperationFailed(format!(
                    "relation {} references a missing task",
                    relation.id
                )));
            }
            if !triples.insert((relation.src_task, relation.dst_task, relation.link_type)) {
                return Err(Error::validation(
                    crate::error::NON_FIELD,
                    "relation already exists",
                ));
            }
        }

        for need in self.needs.values() {
            for user in [need.owner.as_ref(), need.converted_by.as_ref()]
                .into_iter()
                .flatten()
            {
                if !self.users.contains_key(user) {
                    return Err(Error::OperationFailed(format!(
                        "need {} references unknown user '{user}'",
                        need.id
                    )));
                }
            }
        }

        for message in self.messages.values() {
            if let Some(task) = message.task {
                if !self.tasks.contains_key(&task) {
                    return Err(Error::OperationFailed(format!(
                        "message {} references missing task {task}",
                        message.id
                    )));
                }
            }
            if let Some(need) = message.need {
                if !self.needs.contains_key(&need) {
                    return Err(Error::OperationFailed(format!(
                        "message {} references missing need {need}",
                        message.id
                    )));
                }
            }
        }

        for attachment in self.attachments.values() {
            if !self.tasks.contains_key(&attachment.task) {
                return Err(Error::OperationFailed(format!(
                    "attachment {} references missing task {}",
                    attachment.id, attachment.task
                )));
            }
        }

        Ok(())
    }

    /// Drop attachment records whose task is gone.
    ///
    /// Files stay on disk until [`crate::attachment::sweep_orphans`] runs.
    pub fn prune_attachments(&mut self) -> usize {
        let before = self.attachments.len();
        let tasks = &self.tasks;
        self.attachments
            .retain(|_, attachment| tasks.contains_key(&attachment.task));
        before - self.attachments.len()
    }

    /// Remove messages attached to missing tasks/needs and detach orphaned replies.
    ///
    /// Returns how many messages were removed.
    pub fn prune_messages(&mut self) -> usize {
        let before = self.messages.len();
        let tasks = &self.tasks;
        let needs = &self.needs;
        self.messages.retain(|_, message| {
            let task_ok = message.task.map_or(true, |id| tasks.contains_key(&id));
            let need_ok = message.need.map_or(true, |id| needs.contains_key(&id));
            task_ok && need_ok
        });
        let remaining: HashSet<u64> = self.messages.keys().copied().collect();
        for message in self.messages.values_mut() {
            if message.parent.is_some_and(|parent| !remaining.contains(&parent)) {
                message.parent = None;
            }
        }
        before - self.messages.len()
    }

    /// Remove relations whose endpoints no longer exist.
    pub fn prune_relations(&mut self) -> usize {
        let before = self.relations.len();
        let tasks = &self.tasks;
        self.relations.retain(|_, relation| {
            tasks.contains_key(&relation.src_task) && tasks.contains_key(&relation.dst_task)
        });
        before - self.relations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_never_reuse_ids() {
        let mut ids = IdCounters::default();
        assert_eq!(ids.next_task(), 1);
        assert_eq!(ids.next_task(), 2);
        assert_eq!(ids.next_need(), 1);
    }

    #[test]
    fn reconcile_moves_past_inserted_ids() {
        let mut dataset = Dataset::seeded();
        let task = crate::task::TaskRecord::bare(42, "Restored", "task");
        dataset.tasks.insert(42, task);
        dataset.reconcile_ids();
        assert_eq!(dataset.ids.next_task(), 43);
    }

    #[test]
    fn seeded_dataset_validates() {
        let dataset = Dataset::seeded();
        dataset.validate(&TasksConfig::default()).expect("valid");
        assert!(dataset.task_types.contains_key("task"));
        assert_eq!(dataset.task_types.len(), 5);
    }

    #[test]
    fn dataset_round_trips_through_json() {
        let mut dataset = Dataset::seeded();
        dataset
            .tasks
            .insert(7, crate::task::TaskRecord::bare(7, "Seven", "task"));
        let json = serde_json::to_string(&dataset).expect("serialize");
        let back: Dataset = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.tasks[&7].title, "Seven");
    }
}
