//! Files uploaded onto tasks.
//!
//! The dataset keeps one record per upload; the bytes live under
//! `<store>/attachments/<task>/<id>-<name>`. Records go away with their task
//! (delete or snapshot activation) and [`sweep_orphans`] then removes the
//! files no record points at.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::storage::{Storage, ATTACHMENTS_DIR};
use crate::user;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    pub task: u64,
    /// Name of the uploaded file
    pub filename: String,
    /// Location relative to the store directory
    pub stored_path: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// File name reduced to characters that are safe in a path component.
fn safe_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

fn stored_path(task: u64, id: u64, filename: &str) -> String {
    format!("{ATTACHMENTS_DIR}/{task}/{id}-{}", safe_name(filename))
}

/// Copy `source` into the store and record it on `task`.
///
/// The copy happens inside the store transaction, so a failed copy leaves
/// no record behind.
pub fn attach(
    storage: &Storage,
    task: u64,
    source: &Path,
    actor: Option<&str>,
) -> Result<Attachment> {
    if !source.is_file() {
        return Err(Error::validation(
            "file",
            format!("{} is not a readable file", source.display()),
        ));
    }
    let filename = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::validation("file", "path has no file name"))?;

    let attachment = storage.transaction(|dataset| {
        dataset.task(task)?;
        let uploaded_by = user::ensure_actor(dataset, actor)?;
        let id = dataset.ids.next_attachment();
        let stored_path = stored_path(task, id, &filename);

        let target = storage.store_dir().join(&stored_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let size = fs::copy(source, &target)?;

        let attachment = Attachment {
            id,
            task,
            filename: filename.clone(),
            stored_path,
            size,
            uploaded_by,
            uploaded_at: Utc::now(),
        };
        dataset.attachments.insert(id, attachment.clone());
        Ok(attachment)
    })?;

    tracing::debug!(task, attachment = attachment.id, size = attachment.size, "file attached");
    Ok(attachment)
}

/// Attachments of one task, oldest first.
pub fn list(dataset: &Dataset, task: u64) -> Result<Vec<Attachment>> {
    dataset.task(task)?;
    Ok(dataset
        .attachments
        .values()
        .filter(|attachment| attachment.task == task)
        .cloned()
        .collect())
}

/// Delete attachment files that no record references.
///
/// Runs after the transaction that dropped the records; failures are logged
/// and leave the file in place. Returns how many files were removed.
pub fn sweep_orphans(storage: &Storage) -> usize {
    let dataset = match storage.read() {
        Ok(dataset) => dataset,
        Err(err) => {
            tracing::warn!(error = %err, "skipping attachment cleanup");
            return 0;
        }
    };
    let store_dir = storage.store_dir();
    let referenced: HashSet<PathBuf> = dataset
        .attachments
        .values()
        .map(|attachment| store_dir.join(&attachment.stored_path))
        .collect();

    let base = glob::Pattern::escape(&storage.attachments_dir().to_string_lossy());
    let mut removed = 0;
    for path in glob::glob(&format!("{base}/*/*")).into_iter().flatten().flatten() {
        if !path.is_file() || referenced.contains(&path) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "attachment not removed")
            }
        }
    }
    // Empty task directories only; remove_dir fails on the others.
    for dir in glob::glob(&format!("{base}/*")).into_iter().flatten().flatten() {
        let _ = fs::remove_dir(&dir);
    }
    removed
}
