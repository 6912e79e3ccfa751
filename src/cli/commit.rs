//! taskflow commit command implementations
//!
//! A commit is a JSON snapshot of tasks, needs and users written under the
//! commits directory. Activating one replaces the live dataset with it.

use serde::Serialize;

use crate::cli::{load_context, Globals};
use crate::commit::{self, CommitEntry};
use crate::dataset::ActiveCommit;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct CommitListOutput {
    total: usize,
    commits: Vec<CommitEntry>,
}

#[derive(Serialize)]
struct CommitShowOutput {
    name: String,
    snapshot: serde_json::Value,
}

#[derive(Serialize)]
struct CommitActiveOutput {
    active: Option<ActiveCommit>,
}

fn count(snapshot: &serde_json::Value, key: &str) -> usize {
    snapshot
        .get(key)
        .and_then(serde_json::Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

pub fn run_new(globals: &Globals, name: &str) -> Result<()> {
    let ctx = load_context(globals)?;
    let info = commit::create_commit(&ctx.storage, name, ctx.user())?;

    let mut human = HumanOutput::new("Commit created");
    human.push_summary("File", info.name.clone());
    human.push_summary("Tasks", info.tasks.to_string());
    human.push_summary("Needs", info.needs.to_string());
    human.push_summary("Users", info.users.to_string());
    human.push_next_step(format!("taskflow commit activate {}", info.name));

    emit_success(ctx.output, "commit new", &info, Some(&human))
}

pub fn run_list(globals: &Globals) -> Result<()> {
    let ctx = load_context(globals)?;
    let commits = commit::list_commits(&ctx.storage)?;

    let mut human = HumanOutput::new("Commits");
    human.push_summary("Total", commits.len().to_string());
    for entry in &commits {
        let marker = if entry.active { "*" } else { " " };
        human.push_detail(format!(
            "{marker} {} ({} bytes, {})",
            entry.name,
            entry.size,
            entry.modified.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    let output = CommitListOutput {
        total: commits.len(),
        commits,
    };
    emit_success(ctx.output, "commit list", &output, Some(&human))
}

pub fn run_show(globals: &Globals, name: &str) -> Result<()> {
    let ctx = load_context(globals)?;
    let snapshot = commit::read_raw(&ctx.storage, name)?;

    let mut human = HumanOutput::new(format!("Commit {}", name.trim()));
    if let Some(meta) = snapshot.get("meta") {
        for key in ["name", "created_by", "created_at"] {
            if let Some(value) = meta.get(key).and_then(serde_json::Value::as_str) {
                human.push_summary(key, value);
            }
        }
    }
    human.push_summary("tasks", count(&snapshot, "tasks").to_string());
    human.push_summary("needs", count(&snapshot, "needs").to_string());
    human.push_summary("users", count(&snapshot, "users").to_string());

    let output = CommitShowOutput {
        name: name.trim().to_string(),
        snapshot,
    };
    emit_success(ctx.output, "commit show", &output, Some(&human))
}

pub fn run_activate(globals: &Globals, name: &str) -> Result<()> {
    let ctx = load_context(globals)?;
    let report = commit::activate_commit(&ctx.storage, name, ctx.user())?;

    let mut human = HumanOutput::new(format!("Commit {} activated", report.fname));
    human.push_summary(
        "Tasks",
        format!(
            "{} created, {} updated, {} deleted",
            report.created_tasks, report.updated_tasks, report.deleted_tasks
        ),
    );
    human.push_summary(
        "Needs",
        format!(
            "{} created, {} updated, {} deleted",
            report.created_needs, report.updated_needs, report.deleted_needs
        ),
    );
    human.push_summary(
        "Users",
        format!(
            "{} created, {} updated",
            report.created_users, report.updated_users
        ),
    );
    if report.removed_relations > 0 || report.removed_messages > 0 {
        human.push_warning(format!(
            "removed {} relations and {} messages attached to deleted records",
            report.removed_relations, report.removed_messages
        ));
    }
    if report.removed_attachments > 0 {
        human.push_warning(format!(
            "removed {} attachments of deleted tasks",
            report.removed_attachments
        ));
    }

    emit_success(ctx.output, "commit activate", &report, Some(&human))
}

pub fn run_active(globals: &Globals) -> Result<()> {
    let ctx = load_context(globals)?;
    let active = commit::active_commit(&ctx.storage)?;

    let mut human = match &active {
        Some(current) => {
            let mut human = HumanOutput::new(format!("Active commit: {}", current.name));
            human.push_summary("Activated at", current.activated_at.to_rfc3339());
            if let Some(by) = current.activated_by.as_deref() {
                human.push_summary("Activated by", by);
            }
            human
        }
        None => HumanOutput::new("No active commit"),
    };
    if active.is_none() {
        human.push_next_step("taskflow commit list");
    }

    let output = CommitActiveOutput { active };
    emit_success(ctx.output, "commit active", &output, Some(&human))
}
