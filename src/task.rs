//! Tasks and task types.
//!
//! Tasks live in the dataset keyed by numeric id. Every create and update goes
//! through the hierarchy check, so the parent graph stays a forest no matter
//! which command wrote it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TasksConfig;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::hierarchy;
use crate::message;
use crate::user;

pub const TITLE_MAX_LEN: usize = 200;
pub const PROGRESS_MAX: u8 = 100;

/// Standard task types: code, label. Order is spaced by ten.
pub const DEFAULT_TASK_TYPES: [(&str, &str); 5] = [
    ("epic", "Epic"),
    ("story", "User Story"),
    ("feature", "Feature"),
    ("task", "Tâche"),
    ("subtask", "Sous-tâche"),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskStatus {
    #[serde(rename = "A faire")]
    Todo,
    #[serde(rename = "En cours")]
    InProgress,
    #[serde(rename = "Fait")]
    Done,
}

impl TaskStatus {
    /// Workflow order; the first entry is the initial state.
    pub const WORKFLOW: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn initial() -> Self {
        Self::WORKFLOW[0]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "A faire",
            TaskStatus::InProgress => "En cours",
            TaskStatus::Done => "Fait",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "a faire" | "todo" | "to do" => Ok(TaskStatus::Todo),
            "en cours" | "in progress" | "doing" => Ok(TaskStatus::InProgress),
            "fait" | "done" => Ok(TaskStatus::Done),
            _ => Err(Error::validation(
                "status",
                format!(
                    "invalid status '{}', expected one of \"A faire\", \"En cours\", \"Fait\"",
                    s.trim()
                ),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskType {
    pub code: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: u64,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub progress: u8,
}

impl TaskRecord {
    /// A task with only the required fields set.
    pub fn bare(id: u64, title: &str, task_type: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            status: TaskStatus::initial(),
            created_at: Utc::now(),
            owner: None,
            reporter: None,
            task_type: task_type.to_string(),
            parent: None,
            project: None,
            priority: None,
            target_version: None,
            module: None,
            start_date: None,
            due_date: None,
            progress: 0,
        }
    }
}

/// Input for [`create`].
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub status: Option<TaskStatus>,
    pub task_type: Option<String>,
    pub parent: Option<u64>,
    pub project: Option<u64>,
    pub priority: Option<String>,
    pub target_version: Option<String>,
    pub module: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub progress: Option<u8>,
    pub initial_message: Option<String>,
}

/// Partial update for [`update`]. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub task_type: Option<String>,
    pub owner: Option<Option<String>>,
    pub parent: Option<Option<u64>>,
    pub project: Option<Option<u64>>,
    pub priority: Option<Option<String>>,
    pub target_version: Option<Option<String>>,
    pub module: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub progress: Option<u8>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.task_type.is_none()
            && self.owner.is_none()
            && self.parent.is_none()
            && self.project.is_none()
            && self.priority.is_none()
            && self.target_version.is_none()
            && self.module.is_none()
            && self.start_date.is_none()
            && self.due_date.is_none()
            && self.progress.is_none()
    }
}

/// Insert the standard task types that are missing.
pub fn seed_task_types(dataset: &mut Dataset) {
    for (index, (code, label)) in DEFAULT_TASK_TYPES.iter().enumerate() {
        dataset
            .task_types
            .entry(code.to_string())
            .or_insert_with(|| TaskType {
                code: code.to_string(),
                label: label.to_string(),
                description: None,
                order: index as u32 * 10,
            });
    }
}

/// Return the default type code, creating the type if it went missing.
pub fn ensure_default_type(dataset: &mut Dataset, config: &TasksConfig) -> String {
    let code = config.default_type.trim().to_string();
    if !dataset.task_types.contains_key(&code) {
        let (label, order) = DEFAULT_TASK_TYPES
            .iter()
            .position(|(known, _)| *known == code)
            .map(|index| (DEFAULT_TASK_TYPES[index].1.to_string(), index as u32 * 10))
            .unwrap_or_else(|| (code.clone(), 0));
        tracing::info!(code = %code, "creating missing default task type");
        dataset.task_types.insert(
            code.clone(),
            TaskType {
                code: code.clone(),
                label,
                description: None,
                order,
            },
        );
    }
    code
}

fn resolve_task_type(
    dataset: &mut Dataset,
    requested: Option<&str>,
    config: &TasksConfig,
) -> Result<String> {
    let requested = requested.map(str::trim).filter(|code| !code.is_empty());
    match requested {
        None => Ok(ensure_default_type(dataset, config)),
        Some(code) if code == config.default_type.trim() => {
            Ok(ensure_default_type(dataset, config))
        }
        Some(code) => {
            if dataset.task_types.contains_key(code) {
                Ok(code.to_string())
            } else {
                Err(Error::validation(
                    "task_type",
                    format!("unknown task type '{code}'"),
                ))
            }
        }
    }
}

pub fn add_task_type(
    dataset: &mut Dataset,
    code: &str,
    label: &str,
    description: Option<String>,
    order: Option<u32>,
) -> Result<TaskType> {
    let code = code.trim();
    if code.is_empty()
        || !code
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(Error::validation(
            "code",
            format!("invalid task type code '{code}'"),
        ));
    }
    if dataset.task_types.contains_key(code) {
        return Err(Error::Conflict(format!("task type already exists: {code}")));
    }
    let label = label.trim();
    if label.is_empty() {
        return Err(Error::validation("label", "label cannot be empty"));
    }
    let order = order.unwrap_or_else(|| {
        dataset
            .task_types
            .values()
            .map(|existing| existing.order + 10)
            .max()
            .unwrap_or(0)
    });
    let task_type = TaskType {
        code: code.to_string(),
        label: label.to_string(),
        description: description.filter(|text| !text.trim().is_empty()),
        order,
    };
    dataset
        .task_types
        .insert(task_type.code.clone(), task_type.clone());
    Ok(task_type)
}

/// Task types ordered for display.
pub fn list_task_types(dataset: &Dataset) -> Vec<TaskType> {
    let mut types: Vec<TaskType> = dataset.task_types.values().cloned().collect();
    types.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.code.cmp(&b.code)));
    types
}

fn normalize_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("title", "title cannot be empty"));
    }
    if trimmed.chars().count() > TITLE_MAX_LEN {
        return Err(Error::validation(
            "title",
            format!("title longer than {TITLE_MAX_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn check_progress(progress: u8) -> Result<u8> {
    if progress > PROGRESS_MAX {
        return Err(Error::validation(
            "progress",
            format!("progress must be between 0 and {PROGRESS_MAX}"),
        ));
    }
    Ok(progress)
}

fn check_project(dataset: &Dataset, project: Option<u64>) -> Result<()> {
    if let Some(project) = project {
        if !dataset.projects.contains_key(&project) {
            return Err(Error::validation(
                "project",
                format!("project {project} does not exist"),
            ));
        }
    }
    Ok(())
}

/// Create a task owned and reported by `actor`.
pub fn create(
    dataset: &mut Dataset,
    draft: TaskDraft,
    actor: Option<&str>,
    config: &TasksConfig,
) -> Result<TaskRecord> {
    let title = normalize_title(&draft.title)?;
    let task_type = resolve_task_type(dataset, draft.task_type.as_deref(), config)?;
    check_project(dataset, draft.project)?;
    let progress = check_progress(draft.progress.unwrap_or(0))?;
    let actor = user::ensure_actor(dataset, actor)?;

    // Peek rather than allocate so a rejected parent does not burn an id.
    let id = dataset.ids.task;
    if let Some(parent) = draft.parent {
        hierarchy::check_parent(&dataset.tasks, id, parent, config.max_depth)?;
    }
    let id = dataset.ids.next_task();

    let task = TaskRecord {
        id,
        title,
        status: draft.status.unwrap_or_else(TaskStatus::initial),
        created_at: Utc::now(),
        owner: actor.clone(),
        reporter: actor.clone(),
        task_type,
        parent: draft.parent,
        project: draft.project,
        priority: normalize_text(draft.priority),
        target_version: normalize_text(draft.target_version),
        module: normalize_text(draft.module),
        start_date: draft.start_date,
        due_date: draft.due_date,
        progress,
    };
    dataset.tasks.insert(id, task.clone());
    tracing::debug!(task = id, parent = ?task.parent, "task created");

    if let Some(content) = normalize_text(draft.initial_message) {
        message::create(
            dataset,
            message::MessageDraft {
                content,
                task: Some(id),
                ..Default::default()
            },
            actor.as_deref(),
        )?;
    }

    Ok(task)
}

pub fn get(dataset: &Dataset, id: u64) -> Result<TaskRecord> {
    dataset.task(id).cloned()
}

/// Apply `patch` to task `id`, re-running every task invariant.
pub fn update(
    dataset: &mut Dataset,
    id: u64,
    patch: TaskPatch,
    config: &TasksConfig,
) -> Result<TaskRecord> {
    let mut task = dataset.task(id)?.clone();

    if let Some(title) = patch.title {
        task.title = normalize_title(&title)?;
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(code) = patch.task_type {
        task.task_type = resolve_task_type(dataset, Some(&code), config)?;
    }
    if let Some(owner) = patch.owner {
        task.owner = user::ensure_actor(dataset, owner.as_deref())?;
    }
    if let Some(project) = patch.project {
        check_project(dataset, project)?;
        task.project = project;
    }
    if let Some(priority) = patch.priority {
        task.priority = normalize_text(priority);
    }
    if let Some(target_version) = patch.target_version {
        task.target_version = normalize_text(target_version);
    }
    if let Some(module) = patch.module {
        task.module = normalize_text(module);
    }
    if let Some(start_date) = patch.start_date {
        task.start_date = start_date;
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = due_date;
    }
    if let Some(progress) = patch.progress {
        task.progress = check_progress(progress)?;
    }
    if let Some(parent) = patch.parent {
        if let Some(new_parent) = parent.filter(|new| task.parent != Some(*new)) {
            hierarchy::check_parent(&dataset.tasks, id, new_parent, config.max_depth)?;
        }
        task.parent = parent;
    }

    dataset.tasks.insert(id, task.clone());
    tracing::debug!(task = id, "task updated");
    Ok(task)
}

/// What a task deletion removed or detached.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDeletion {
    pub id: u64,
    pub detached_children: Vec<u64>,
    pub removed_relations: usize,
    pub removed_messages: usize,
    pub removed_attachments: usize,
}

/// Delete a task. Tasks still in progress cannot be deleted.
pub fn delete(dataset: &mut Dataset, id: u64) -> Result<TaskDeletion> {
    let task = dataset.task(id)?;
    if task.status == TaskStatus::InProgress {
        return Err(Error::Conflict(format!(
            "task {id} is still in progress ({}); deletion is forbidden",
            TaskStatus::InProgress
        )));
    }

    dataset.tasks.remove(&id);
    let mut detached_children = Vec::new();
    for child in dataset.tasks.values_mut() {
        if child.parent == Some(id) {
            child.parent = None;
            detached_children.push(child.id);
        }
    }
    let removed_relations = dataset.prune_relations();
    let removed_messages = dataset.prune_messages();
    let removed_attachments = dataset.prune_attachments();
    tracing::debug!(task = id, removed_relations, removed_messages, "task deleted");

    Ok(TaskDeletion {
        id,
        detached_children,
        removed_relations,
        removed_messages,
        removed_attachments,
    })
}

/// Sort key accepted by [`list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrderKey {
    Id,
    CreatedAt,
    Title,
    TypeOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOrdering {
    pub key: TaskOrderKey,
    pub descending: bool,
}

impl Default for TaskOrdering {
    fn default() -> Self {
        Self {
            key: TaskOrderKey::Id,
            descending: true,
        }
    }
}

impl FromStr for TaskOrdering {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (descending, name) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let key = match name {
            "id" => TaskOrderKey::Id,
            "created_at" => TaskOrderKey::CreatedAt,
            "title" => TaskOrderKey::Title,
            "task_type__order" | "type_order" => TaskOrderKey::TypeOrder,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "unknown ordering '{trimmed}' (expected id, created_at, title, task_type__order)"
                )))
            }
        };
        Ok(Self { key, descending })
    }
}

/// Filters for [`list`]. Text filters match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub task_type: Option<String>,
    pub parent: Option<u64>,
    pub project: Option<u64>,
    pub priority: Option<String>,
    pub module: Option<String>,
    pub target_version: Option<String>,
    pub ordering: TaskOrdering,
}

fn eq_ignore_case(value: Option<&str>, wanted: &str) -> bool {
    value.is_some_and(|value| value.eq_ignore_ascii_case(wanted.trim()))
}

fn matches_search(dataset: &Dataset, task: &TaskRecord, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    if task.title.to_lowercase().contains(&needle)
        || task.status.as_str().to_lowercase().contains(&needle)
        || task.task_type.to_lowercase().contains(&needle)
    {
        return true;
    }
    dataset
        .task_types
        .get(&task.task_type)
        .is_some_and(|task_type| task_type.label.to_lowercase().contains(&needle))
}

pub fn list(dataset: &Dataset, query: &TaskQuery) -> Vec<TaskRecord> {
    let mut tasks: Vec<TaskRecord> = dataset
        .tasks
        .values()
        .filter(|task| query.status.map_or(true, |status| task.status == status))
        .filter(|task| {
            query
                .task_type
                .as_deref()
                .map_or(true, |code| eq_ignore_case(Some(&task.task_type), code))
        })
        .filter(|task| query.parent.map_or(true, |parent| task.parent == Some(parent)))
        .filter(|task| query.project.map_or(true, |project| task.project == Some(project)))
        .filter(|task| {
            query
                .priority
                .as_deref()
                .map_or(true, |wanted| eq_ignore_case(task.priority.as_deref(), wanted))
        })
        .filter(|task| {
            query
                .module
                .as_deref()
                .map_or(true, |wanted| eq_ignore_case(task.module.as_deref(), wanted))
        })
        .filter(|task| {
            query.target_version.as_deref().map_or(true, |wanted| {
                eq_ignore_case(task.target_version.as_deref(), wanted)
            })
        })
        .filter(|task| {
            query
                .search
                .as_deref()
                .map_or(true, |needle| matches_search(dataset, task, needle))
        })
        .cloned()
        .collect();

    let type_order = |task: &TaskRecord| {
        dataset
            .task_types
            .get(&task.task_type)
            .map(|task_type| task_type.order)
            .unwrap_or(u32::MAX)
    };
    tasks.sort_by(|a, b| {
        let ordering = match query.ordering.key {
            TaskOrderKey::Id => Ordering::Equal,
            TaskOrderKey::CreatedAt => a.created_at.cmp(&b.created_at),
            TaskOrderKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            TaskOrderKey::TypeOrder => type_order(a).cmp(&type_order(b)),
        }
        .then_with(|| a.id.cmp(&b.id));
        if query.ordering.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    tasks
}

/// A task with its hierarchy neighbourhood and links.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetails {
    pub task: TaskRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type_label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<u64>,
    pub links: crate::relation::TaskLinks,
    pub messages: usize,
    pub attachments: usize,
}

pub fn details(dataset: &Dataset, id: u64) -> Result<TaskDetails> {
    let task = get(dataset, id)?;
    Ok(TaskDetails {
        task_type_label: dataset
            .task_types
            .get(&task.task_type)
            .map(|task_type| task_type.label.clone()),
        ancestors: hierarchy::ancestors(&dataset.tasks, id),
        children: hierarchy::children(&dataset.tasks, id),
        links: crate::relation::links_for(dataset, id),
        messages: dataset
            .messages
            .values()
            .filter(|message| message.task == Some(id))
            .count(),
        attachments: dataset
            .attachments
            .values()
            .filter(|attachment| attachment.task == id)
            .count(),
        task,
    })
}
