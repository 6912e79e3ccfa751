//! Needs and their one-way conversion into tasks.
//!
//! A need flips from unconverted to converted exactly once. Both conversion
//! paths run against a dataset loaded inside a store transaction, so the
//! exclusive store lock plays the role of a row lock: two conversions of the
//! same need serialize and the second one observes `converted = true`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TasksConfig;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::message;
use crate::task::{self, TaskDraft, TaskRecord, TaskStatus};
use crate::user;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub converted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_by: Option<String>,
}

impl NeedRecord {
    pub fn bare(id: u64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: String::new(),
            owner: None,
            created_at: Utc::now(),
            converted: false,
            converted_at: None,
            converted_by: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NeedDraft {
    pub title: String,
    pub description: Option<String>,
    pub initial_message: Option<String>,
}

pub fn create(dataset: &mut Dataset, draft: NeedDraft, actor: Option<&str>) -> Result<NeedRecord> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(Error::validation("title", "title cannot be empty"));
    }
    if title.chars().count() > task::TITLE_MAX_LEN {
        return Err(Error::validation(
            "title",
            format!("title longer than {} characters", task::TITLE_MAX_LEN),
        ));
    }
    let owner = user::ensure_actor(dataset, actor)?;

    let mut need = NeedRecord::bare(dataset.ids.next_need(), title);
    need.description = draft.description.unwrap_or_default().trim().to_string();
    need.owner = owner.clone();
    dataset.needs.insert(need.id, need.clone());

    if let Some(content) = draft.initial_message.filter(|text| !text.trim().is_empty()) {
        message::create(
            dataset,
            message::MessageDraft {
                content,
                need: Some(need.id),
                ..Default::default()
            },
            owner.as_deref(),
        )?;
    }
    Ok(need)
}

pub fn get(dataset: &Dataset, id: u64) -> Result<NeedRecord> {
    dataset.need(id).cloned()
}

/// Needs, newest first, optionally restricted by conversion state.
pub fn list(dataset: &Dataset, converted: Option<bool>) -> Vec<NeedRecord> {
    let mut needs: Vec<NeedRecord> = dataset
        .needs
        .values()
        .filter(|need| converted.map_or(true, |wanted| need.converted == wanted))
        .cloned()
        .collect();
    needs.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    needs
}

/// Delete a need and its messages. Only staff may delete needs.
pub fn delete(dataset: &mut Dataset, id: u64, actor: Option<&str>) -> Result<NeedRecord> {
    dataset.need(id)?;
    if !user::is_staff(dataset, actor) {
        return Err(Error::PermissionDenied(format!(
            "only staff users may delete needs (actor: {})",
            actor.unwrap_or("anonymous")
        )));
    }
    let need = dataset
        .needs
        .remove(&id)
        .ok_or_else(|| Error::not_found("need", id))?;
    let removed = dataset.prune_messages();
    tracing::debug!(need = id, removed_messages = removed, "need deleted");
    Ok(need)
}

fn convert_unchecked(
    dataset: &mut Dataset,
    id: u64,
    actor: Option<&str>,
    config: &TasksConfig,
) -> Result<TaskRecord> {
    let need = dataset.need(id)?.clone();
    let converter = user::ensure_actor(dataset, actor)?;

    let mut task = task::create(
        dataset,
        TaskDraft {
            title: need.title.clone(),
            status: Some(TaskStatus::initial()),
            ..Default::default()
        },
        converter.as_deref(),
        config,
    )?;
    // The task belongs to whoever owned the need.
    task.owner = need.owner.clone();
    dataset.tasks.insert(task.id, task.clone());

    let copied = message::copy_need_thread(dataset, need.id, task.id);

    if let Some(stored) = dataset.needs.get_mut(&id) {
        stored.converted = true;
        stored.converted_at = Some(Utc::now());
        stored.converted_by = converter;
    }
    tracing::info!(need = id, task = task.id, messages = copied.len(), "need converted");
    Ok(task)
}

/// Convert one need into a task.
///
/// Fails with [`Error::AlreadyConverted`] when the need was converted before.
pub fn convert_need(
    dataset: &mut Dataset,
    id: u64,
    actor: Option<&str>,
    config: &TasksConfig,
) -> Result<TaskRecord> {
    if dataset.need(id)?.converted {
        return Err(Error::AlreadyConverted(id));
    }
    convert_unchecked(dataset, id, actor, config)
}

/// Result of a batch conversion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchConversion {
    pub converted: usize,
    pub skipped: Vec<u64>,
    pub tasks: Vec<u64>,
}

/// Convert every listed need (all needs when `ids` is `None`).
///
/// Needs that are already converted are skipped; unknown ids are an error and
/// nothing is converted.
pub fn convert_needs(
    dataset: &mut Dataset,
    ids: Option<&[u64]>,
    actor: Option<&str>,
    config: &TasksConfig,
) -> Result<BatchConversion> {
    let targets: BTreeSet<u64> = match ids {
        Some(ids) => {
            for id in ids {
                dataset.need(*id)?;
            }
            ids.iter().copied().collect()
        }
        None => dataset.needs.keys().copied().collect(),
    };

    let mut outcome = BatchConversion::default();
    for id in targets {
        if dataset.need(id)?.converted {
            outcome.skipped.push(id);
            continue;
        }
        let task = convert_unchecked(dataset, id, actor, config)?;
        outcome.converted += 1;
        outcome.tasks.push(task.id);
    }
    tracing::info!(
        converted = outcome.converted,
        skipped = outcome.skipped.len(),
        "batch conversion finished"
    );
    Ok(outcome)
}
