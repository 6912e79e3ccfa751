//! Commit snapshots: full JSON exports of users, tasks and needs.
//!
//! A commit is written once into the commits directory and never modified.
//! Activating a commit makes the store match it: records are upserted by
//! key and every task or need absent from the snapshot is deleted. The whole
//! activation is one store transaction.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::attachment;
use crate::config::TasksConfig;
use crate::dataset::{ActiveCommit, Dataset};
use crate::error::{Error, Result};
use crate::hierarchy;
use crate::need::NeedRecord;
use crate::storage::Storage;
use crate::task::{self, TaskRecord, TaskStatus, PROGRESS_MAX};
use crate::user::UserRecord;

const UNNAMED: &str = "unnamed";

/// Creator recorded when no user made the commit.
pub const ANONYMOUS_CREATOR: &str = "anonymous";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotMeta {
    pub created_by: String,
    pub created_at: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskEntry {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedEntry {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub owner: Option<String>,
    pub converted: bool,
    pub converted_at: Option<String>,
    pub converted_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserEntry {
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    pub date_joined: Option<String>,
}

/// On-disk commit document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub tasks: Vec<TaskEntry>,
    pub needs: Vec<NeedEntry>,
    pub users: Vec<UserEntry>,
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a snapshot timestamp. Naive values are taken as UTC; anything
/// unparseable yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|value| NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok())
}

impl Snapshot {
    /// Export `dataset` as a snapshot.
    pub fn capture(dataset: &Dataset, name: &str, creator: Option<&str>) -> Self {
        let tasks = dataset
            .tasks
            .values()
            .map(|task| TaskEntry {
                id: Some(task.id),
                title: Some(task.title.clone()),
                status: Some(task.status.as_str().to_string()),
                created_at: Some(iso(task.created_at)),
                owner: task.owner.clone(),
                reporter: task.reporter.clone(),
                task_type: Some(task.task_type.clone()),
                parent: task.parent,
                project: task.project,
                priority: task.priority.clone(),
                target_version: task.target_version.clone(),
                module: task.module.clone(),
                start_date: task.start_date.map(|date| date.to_string()),
                due_date: task.due_date.map(|date| date.to_string()),
                progress: Some(task.progress),
            })
            .collect();
        let needs = dataset
            .needs
            .values()
            .map(|need| NeedEntry {
                id: Some(need.id),
                title: Some(need.title.clone()),
                description: Some(need.description.clone()),
                created_at: Some(iso(need.created_at)),
                owner: need.owner.clone(),
                converted: need.converted,
                converted_at: need.converted_at.map(iso),
                converted_by: need.converted_by.clone(),
            })
            .collect();
        let users = dataset
            .users
            .values()
            .map(|user| UserEntry {
                username: Some(user.username.clone()),
                email: Some(user.email.clone()),
                is_staff: Some(user.is_staff),
                is_active: Some(user.is_active),
                date_joined: Some(iso(user.date_joined)),
            })
            .collect();

        Snapshot {
            meta: SnapshotMeta {
                created_by: creator.unwrap_or(ANONYMOUS_CREATOR).to_string(),
                created_at: format!("{}Z", Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f")),
                name: name.to_string(),
            },
            tasks,
            needs,
            users,
        }
    }
}

fn sanitize_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, ' ' | '_' | '-'))
        .collect();
    let safe = safe.trim_end();
    if safe.is_empty() {
        UNNAMED.to_string()
    } else {
        safe.to_string()
    }
}

/// `commit_<YYYYMMDDTHHMMSSZ>_<8 hex>_<safe name>.json`
pub fn commit_filename(name: &str, now: DateTime<Utc>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "commit_{}_{}_{}.json",
        now.format("%Y%m%dT%H%M%SZ"),
        &token[..8],
        sanitize_name(name)
    )
}

/// A written commit
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub name: String,
    pub path: PathBuf,
    pub meta: SnapshotMeta,
    pub tasks: usize,
    pub needs: usize,
    pub users: usize,
}

/// Snapshot the current dataset into a new commit file.
pub fn create_commit(storage: &Storage, name: &str, creator: Option<&str>) -> Result<CommitInfo> {
    let dataset = storage.read()?;
    let snapshot = Snapshot::capture(&dataset, name, creator);

    let filename = commit_filename(name, Utc::now());
    let path = storage.commits_dir().join(&filename);
    storage.write_json(&path, &snapshot)?;
    tracing::info!(commit = %filename, tasks = snapshot.tasks.len(), "commit created");

    Ok(CommitInfo {
        name: filename,
        path,
        tasks: snapshot.tasks.len(),
        needs: snapshot.needs.len(),
        users: snapshot.users.len(),
        meta: snapshot.meta,
    })
}

/// One file in the commits directory
#[derive(Debug, Clone, Serialize)]
pub struct CommitEntry {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub active: bool,
}

/// Commit files, most recently modified first.
pub fn list_commits(storage: &Storage) -> Result<Vec<CommitEntry>> {
    let dir = storage.commits_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let active = active_commit(storage)?.map(|commit| commit.name);

    let pattern = format!(
        "{}/*.json",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern)
        .map_err(|err| Error::OperationFailed(format!("invalid commit pattern: {err}")))?;

    let mut entries = Vec::new();
    for path in paths {
        let path = path.map_err(|err| Error::Io(err.into_error()))?;
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        let metadata = fs::metadata(&path)?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push(CommitEntry {
            active: active.as_deref() == Some(name.as_str()),
            name,
            size: metadata.len(),
            modified: DateTime::<Utc>::from(modified),
        });
    }
    entries.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.name.cmp(&a.name))
    });
    Ok(entries)
}

fn commit_path(storage: &Storage, name: &str) -> Result<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument("commit name cannot be empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(Error::InvalidArgument(format!(
            "invalid commit name '{name}': path components are not allowed"
        )));
    }
    let path = storage.commits_dir().join(name);
    if !path.is_file() {
        return Err(Error::not_found("commit", name));
    }
    Ok(path)
}

fn read_commit<T: DeserializeOwned>(storage: &Storage, name: &str) -> Result<T> {
    let path = commit_path(storage, name)?;
    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content).map_err(|err| Error::InvalidSnapshot {
        name: name.trim().to_string(),
        reason: err.to_string(),
    })
}

/// Raw JSON content of a commit.
pub fn read_raw(storage: &Storage, name: &str) -> Result<serde_json::Value> {
    read_commit(storage, name)
}

/// Read and parse a commit.
pub fn load_snapshot(storage: &Storage, name: &str) -> Result<Snapshot> {
    read_commit(storage, name)
}

/// Counts of what an activation changed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivationReport {
    pub fname: String,
    pub created_users: usize,
    pub updated_users: usize,
    pub created_tasks: usize,
    pub updated_tasks: usize,
    pub deleted_tasks: usize,
    pub created_needs: usize,
    pub updated_needs: usize,
    pub deleted_needs: usize,
    pub removed_relations: usize,
    pub removed_messages: usize,
    pub removed_attachments: usize,
}

struct UserLookup(HashSet<String>);

impl UserLookup {
    fn resolve(&self, name: Option<&String>) -> Option<String> {
        name.map(|name| name.trim())
            .filter(|name| self.0.contains(*name))
            .map(str::to_string)
    }
}

fn normalize_text(value: Option<&String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn task_from_entry(
    dataset: &mut Dataset,
    id: u64,
    entry: &TaskEntry,
    users: &UserLookup,
    config: &TasksConfig,
    invalid: &dyn Fn(String) -> Error,
) -> Result<TaskRecord> {
    let title = normalize_text(entry.title.as_ref())
        .ok_or_else(|| invalid(format!("task {id} has no title")))?;
    let status = match entry.status.as_deref() {
        Some(raw) => raw
            .parse::<TaskStatus>()
            .map_err(|_| invalid(format!("task {id} has invalid status '{raw}'")))?,
        None => TaskStatus::initial(),
    };
    let created_at = entry
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| dataset.tasks.get(&id).map(|task| task.created_at))
        .unwrap_or_else(Utc::now);
    let task_type = match entry.task_type.as_deref().map(str::trim) {
        Some(code) if dataset.task_types.contains_key(code) => code.to_string(),
        _ => task::ensure_default_type(dataset, config),
    };

    let mut task = TaskRecord::bare(id, &title, &task_type);
    task.status = status;
    task.created_at = created_at;
    task.owner = users.resolve(entry.owner.as_ref());
    task.reporter = users.resolve(entry.reporter.as_ref());
    task.parent = entry.parent;
    task.project = entry
        .project
        .filter(|project| dataset.projects.contains_key(project));
    task.priority = normalize_text(entry.priority.as_ref());
    task.target_version = normalize_text(entry.target_version.as_ref());
    task.module = normalize_text(entry.module.as_ref());
    task.start_date = parse_date(entry.start_date.as_deref());
    task.due_date = parse_date(entry.due_date.as_deref());
    task.progress = entry.progress.unwrap_or(0).min(PROGRESS_MAX);
    Ok(task)
}

fn need_from_entry(
    dataset: &Dataset,
    id: u64,
    entry: &NeedEntry,
    users: &UserLookup,
    invalid: &dyn Fn(String) -> Error,
) -> Result<NeedRecord> {
    let title = normalize_text(entry.title.as_ref())
        .ok_or_else(|| invalid(format!("need {id} has no title")))?;
    let mut need = NeedRecord::bare(id, &title);
    need.description = entry.description.clone().unwrap_or_default();
    need.created_at = entry
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| dataset.needs.get(&id).map(|need| need.created_at))
        .unwrap_or_else(Utc::now);
    need.owner = users.resolve(entry.owner.as_ref());
    need.converted = entry.converted;
    need.converted_at = entry.converted_at.as_deref().and_then(parse_timestamp);
    need.converted_by = users.resolve(entry.converted_by.as_ref());
    Ok(need)
}

/// Make `dataset` match `snapshot`.
///
/// Users are upserted by username and never deleted. Tasks and needs are
/// replaced by id; those missing from the snapshot are deleted along with
/// their relations and messages. When a snapshot repeats a key the last
/// entry wins and the key is counted once.
pub fn apply_snapshot(
    dataset: &mut Dataset,
    snapshot: &Snapshot,
    name: &str,
    actor: Option<&str>,
    config: &TasksConfig,
) -> Result<ActivationReport> {
    let invalid = |reason: String| Error::InvalidSnapshot {
        name: name.to_string(),
        reason,
    };
    let mut report = ActivationReport {
        fname: name.to_string(),
        ..Default::default()
    };

    let mut known = HashSet::new();
    for entry in &snapshot.users {
        let Some(username) = entry
            .username
            .as_deref()
            .map(str::trim)
            .filter(|username| !username.is_empty())
        else {
            continue;
        };
        if username.chars().any(char::is_whitespace) {
            return Err(invalid(format!("invalid username '{username}'")));
        }
        if known.insert(username.to_string()) {
            if dataset.users.contains_key(username) {
                report.updated_users += 1;
            } else {
                report.created_users += 1;
            }
        }
        let user = dataset
            .users
            .entry(username.to_string())
            .or_insert_with(|| UserRecord::new(username));
        user.email = entry.email.clone().unwrap_or_default();
        user.is_staff = entry.is_staff.unwrap_or(false);
        user.is_active = entry.is_active.unwrap_or(true);
        if let Some(joined) = entry.date_joined.as_deref().and_then(parse_timestamp) {
            user.date_joined = joined;
        }
    }
    let users = UserLookup(known);

    let mut keep_tasks = BTreeSet::new();
    let mut without_id = Vec::new();
    for entry in &snapshot.tasks {
        let Some(id) = entry.id else {
            without_id.push(entry);
            continue;
        };
        let task = task_from_entry(dataset, id, entry, &users, config, &invalid)?;
        let replaced = dataset.tasks.insert(id, task).is_some();
        if keep_tasks.insert(id) {
            if replaced {
                report.updated_tasks += 1;
            } else {
                report.created_tasks += 1;
            }
        }
    }
    dataset.reconcile_ids();
    for entry in without_id {
        let id = dataset.ids.next_task();
        let task = task_from_entry(dataset, id, entry, &users, config, &invalid)?;
        dataset.tasks.insert(id, task);
        report.created_tasks += 1;
        keep_tasks.insert(id);
    }

    let mut keep_needs = BTreeSet::new();
    let mut without_id = Vec::new();
    for entry in &snapshot.needs {
        let Some(id) = entry.id else {
            without_id.push(entry);
            continue;
        };
        let need = need_from_entry(dataset, id, entry, &users, &invalid)?;
        let replaced = dataset.needs.insert(id, need).is_some();
        if keep_needs.insert(id) {
            if replaced {
                report.updated_needs += 1;
            } else {
                report.created_needs += 1;
            }
        }
    }
    dataset.reconcile_ids();
    for entry in without_id {
        let id = dataset.ids.next_need();
        let need = need_from_entry(dataset, id, entry, &users, &invalid)?;
        dataset.needs.insert(id, need);
        report.created_needs += 1;
        keep_needs.insert(id);
    }

    let before = dataset.tasks.len();
    dataset.tasks.retain(|id, _| keep_tasks.contains(id));
    report.deleted_tasks = before - dataset.tasks.len();

    let before = dataset.needs.len();
    dataset.needs.retain(|id, _| keep_needs.contains(id));
    report.deleted_needs = before - dataset.needs.len();

    for task in dataset.tasks.values_mut() {
        if task.parent.is_some_and(|parent| !keep_tasks.contains(&parent)) {
            task.parent = None;
        }
    }
    report.removed_relations = dataset.prune_relations();
    report.removed_messages = dataset.prune_messages();
    report.removed_attachments = dataset.prune_attachments();
    dataset.reconcile_ids();

    hierarchy::validate_all(&dataset.tasks)
        .map_err(|err| invalid(err.to_string()))?;

    dataset.active_commit = Some(ActiveCommit {
        name: name.to_string(),
        activated_at: Utc::now(),
        activated_by: actor.map(str::to_string),
    });
    Ok(report)
}

/// Restore the store from a commit and mark it active.
///
/// The commit is read and parsed before the store is locked; a bad file
/// leaves the store untouched.
pub fn activate_commit(
    storage: &Storage,
    name: &str,
    actor: Option<&str>,
) -> Result<ActivationReport> {
    let name = name.trim();
    let snapshot = load_snapshot(storage, name)?;
    let config = storage.config().tasks.clone();
    let report = storage.transaction(|dataset| {
        apply_snapshot(dataset, &snapshot, name, actor, &config)
    })?;
    if report.removed_attachments > 0 {
        attachment::sweep_orphans(storage);
    }
    tracing::info!(
        commit = name,
        deleted_tasks = report.deleted_tasks,
        deleted_needs = report.deleted_needs,
        "commit activated"
    );
    Ok(report)
}

/// The commit last activated, if any.
pub fn active_commit(storage: &Storage) -> Result<Option<ActiveCommit>> {
    if !storage.is_initialized() {
        return Ok(None);
    }
    Ok(storage.read()?.active_commit)
}
