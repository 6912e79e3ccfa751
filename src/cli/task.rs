//! taskflow task and type command implementations.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::attachment::{self, Attachment};
use crate::cli::{load_context, Globals};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::project;
use crate::task::{self, TaskDraft, TaskOrdering, TaskPatch, TaskQuery, TaskRecord, TaskStatus};

pub struct NewOptions {
    pub title: String,
    pub status: Option<String>,
    pub task_type: Option<String>,
    pub parent: Option<u64>,
    pub project: Option<String>,
    pub priority: Option<String>,
    pub target_version: Option<String>,
    pub module: Option<String>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub progress: Option<u8>,
    pub message: Option<String>,
}

pub struct ListOptions {
    pub search: Option<String>,
    pub status: Option<String>,
    pub task_type: Option<String>,
    pub parent: Option<u64>,
    pub project: Option<String>,
    pub priority: Option<String>,
    pub module: Option<String>,
    pub target_version: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<usize>,
}

pub struct EditOptions {
    pub id: u64,
    pub title: Option<String>,
    pub status: Option<String>,
    pub task_type: Option<String>,
    pub owner: Option<String>,
    pub project: Option<String>,
    pub priority: Option<String>,
    pub target_version: Option<String>,
    pub module: Option<String>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub progress: Option<u8>,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<TaskRecord>,
}

#[derive(Serialize)]
struct AttachmentListOutput {
    task: u64,
    total: usize,
    attachments: Vec<Attachment>,
}

#[derive(Serialize)]
struct TaskParentOutput {
    child: u64,
    parent: Option<u64>,
    previous: Option<u64>,
}

fn parse_status(value: Option<&str>) -> Result<Option<TaskStatus>> {
    value.map(str::parse::<TaskStatus>).transpose()
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        Error::validation(field, format!("invalid date '{}', expected YYYY-MM-DD", value.trim()))
    })
}

fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    value.map(|raw| parse_date(field, raw)).transpose()
}

/// Edit semantics: absent leaves the field alone, empty clears it.
fn parse_date_patch(field: &str, value: Option<&str>) -> Result<Option<Option<NaiveDate>>> {
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(Some(None)),
        Some(raw) => Ok(Some(Some(parse_date(field, raw)?))),
    }
}

fn text_patch(value: Option<String>) -> Option<Option<String>> {
    value.map(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn task_line(task: &TaskRecord) -> String {
    let mut line = format!("[{}][{}] {} {}", task.status, task.task_type, task.id, task.title);
    if let Some(parent) = task.parent {
        line.push_str(&format!(" (parent: {parent})"));
    }
    if let Some(owner) = task.owner.as_deref() {
        line.push_str(&format!(" (owner: {owner})"));
    }
    line
}

fn push_task_summary(human: &mut HumanOutput, task: &TaskRecord) {
    human.push_summary("ID", task.id.to_string());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Type", task.task_type.clone());
    if let Some(parent) = task.parent {
        human.push_summary("Parent", parent.to_string());
    }
    if let Some(project) = task.project {
        human.push_summary("Project", project.to_string());
    }
    if let Some(owner) = task.owner.as_deref() {
        human.push_summary("Owner", owner);
    }
    if let Some(priority) = task.priority.as_deref() {
        human.push_summary("Priority", priority);
    }
    if let Some(module) = task.module.as_deref() {
        human.push_summary("Module", module);
    }
    if let Some(version) = task.target_version.as_deref() {
        human.push_summary("Target version", version);
    }
    match (task.start_date, task.due_date) {
        (None, None) => {}
        (start, due) => human.push_summary(
            "Schedule",
            format!(
                "{} -> {}",
                start.map(|d| d.to_string()).unwrap_or_else(|| "?".into()),
                due.map(|d| d.to_string()).unwrap_or_else(|| "?".into())
            ),
        ),
    }
    if task.progress > 0 {
        human.push_summary("Progress", format!("{}%", task.progress));
    }
}

pub fn run_new(globals: &Globals, options: NewOptions) -> Result<()> {
    let ctx = load_context(globals)?;
    let status = parse_status(options.status.as_deref())?;
    let start_date = parse_optional_date("start_date", options.start_date.as_deref())?;
    let due_date = parse_optional_date("due_date", options.due_date.as_deref())?;
    let config = ctx.storage.config().tasks.clone();

    let created = ctx.storage.transaction(|dataset| {
        let project = options
            .project
            .as_deref()
            .map(|value| project::resolve(dataset, value))
            .transpose()?;
        task::create(
            dataset,
            TaskDraft {
                title: options.title,
                status,
                task_type: options.task_type,
                parent: options.parent,
                project,
                priority: options.priority,
                target_version: options.target_version,
                module: options.module,
                start_date,
                due_date,
                progress: options.progress,
                initial_message: options.message,
            },
            ctx.user(),
            &config,
        )
    })?;

    let mut human = HumanOutput::new("Task created");
    push_task_summary(&mut human, &created);
    human.push_next_step(format!("taskflow task show {}", created.id));

    emit_success(ctx.output, "task new", &created, Some(&human))
}

pub fn run_list(globals: &Globals, options: ListOptions) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let project = options
        .project
        .as_deref()
        .map(|value| project::resolve(&dataset, value))
        .transpose()?;
    let query = TaskQuery {
        search: options.search,
        status: parse_status(options.status.as_deref())?,
        task_type: options.task_type,
        parent: options.parent,
        project,
        priority: options.priority,
        module: options.module,
        target_version: options.target_version,
        ordering: options
            .ordering
            .as_deref()
            .map(str::parse::<TaskOrdering>)
            .transpose()?
            .unwrap_or_default(),
    };

    let mut tasks = task::list(&dataset, &query);
    if let Some(limit) = options.limit {
        if limit == 0 {
            return Err(Error::InvalidArgument("limit must be >= 1".to_string()));
        }
        tasks.truncate(limit);
    }

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(task_line(task));
    }

    let output = TaskListOutput {
        total: tasks.len(),
        tasks,
    };
    emit_success(ctx.output, "task list", &output, Some(&human))
}

pub fn run_show(globals: &Globals, id: u64) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let details = task::details(&dataset, id)?;

    let mut human = HumanOutput::new(format!("Task {id}"));
    push_task_summary(&mut human, &details.task);
    if let Some(label) = details.task_type_label.as_deref() {
        human.push_summary("Type label", label);
    }
    if !details.ancestors.is_empty() {
        let chain: Vec<String> = details.ancestors.iter().map(u64::to_string).collect();
        human.push_summary("Ancestors", chain.join(" <- "));
    }
    if !details.children.is_empty() {
        let children: Vec<String> = details.children.iter().map(u64::to_string).collect();
        human.push_summary("Children", children.join(", "));
    }
    for link in &details.links.outgoing {
        human.push_detail(format!("{} {} (link {})", link.link_type.label(), link.dst_task, link.id));
    }
    for link in &details.links.incoming {
        human.push_detail(format!(
            "{} <- {} (link {})",
            link.link_type.label(),
            link.src_task,
            link.id
        ));
    }
    human.push_summary("Messages", details.messages.to_string());
    human.push_summary("Attachments", details.attachments.to_string());

    emit_success(ctx.output, "task show", &details, Some(&human))
}

pub fn run_edit(globals: &Globals, options: EditOptions) -> Result<()> {
    let ctx = load_context(globals)?;
    let patch = TaskPatch {
        title: options.title,
        status: parse_status(options.status.as_deref())?,
        task_type: options.task_type,
        owner: text_patch(options.owner),
        parent: None,
        project: None,
        priority: text_patch(options.priority),
        target_version: text_patch(options.target_version),
        module: text_patch(options.module),
        start_date: parse_date_patch("start_date", options.start_date.as_deref())?,
        due_date: parse_date_patch("due_date", options.due_date.as_deref())?,
        progress: options.progress,
    };
    if patch.is_empty() && options.project.is_none() {
        return Err(Error::InvalidArgument("nothing to edit".to_string()));
    }
    let config = ctx.storage.config().tasks.clone();

    let updated = ctx.storage.transaction(|dataset| {
        let mut patch = patch;
        if let Some(value) = options.project.as_deref() {
            patch.project = Some(if value.trim().is_empty() {
                None
            } else {
                Some(project::resolve(dataset, value)?)
            });
        }
        task::update(dataset, options.id, patch, &config)
    })?;

    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, &updated);
    emit_success(ctx.output, "task edit", &updated, Some(&human))
}

pub fn run_delete(globals: &Globals, id: u64) -> Result<()> {
    let ctx = load_context(globals)?;
    let deletion = ctx.storage.transaction(|dataset| task::delete(dataset, id))?;
    if deletion.removed_attachments > 0 {
        attachment::sweep_orphans(&ctx.storage);
    }

    let mut human = HumanOutput::new(format!("Task {id} deleted"));
    if !deletion.detached_children.is_empty() {
        let children: Vec<String> = deletion
            .detached_children
            .iter()
            .map(u64::to_string)
            .collect();
        human.push_warning(format!("children detached: {}", children.join(", ")));
    }
    human.push_summary("Relations removed", deletion.removed_relations.to_string());
    human.push_summary("Messages removed", deletion.removed_messages.to_string());
    human.push_summary(
        "Attachments removed",
        deletion.removed_attachments.to_string(),
    );

    emit_success(ctx.output, "task delete", &deletion, Some(&human))
}

/// `task parent set` (Some) and `task parent clear` (None)
pub fn run_parent_set(globals: &Globals, child: u64, parent: Option<u64>) -> Result<()> {
    let ctx = load_context(globals)?;
    let config = ctx.storage.config().tasks.clone();

    let previous = ctx.storage.transaction(|dataset| {
        let previous = dataset.task(child)?.parent;
        if parent.is_none() && previous.is_none() {
            return Err(Error::InvalidArgument(format!("task has no parent: {child}")));
        }
        task::update(
            dataset,
            child,
            TaskPatch {
                parent: Some(parent),
                ..Default::default()
            },
            &config,
        )?;
        Ok(previous)
    })?;

    let output = TaskParentOutput {
        child,
        parent,
        previous,
    };
    let (command, header) = match parent {
        Some(_) => ("task parent set", "Parent set"),
        None => ("task parent clear", "Parent cleared"),
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Child", child.to_string());
    match parent {
        Some(parent) => human.push_summary("Parent", parent.to_string()),
        None => human.push_summary("Parent", "none"),
    }
    if let Some(previous) = previous {
        human.push_summary("Previous parent", previous.to_string());
    }

    emit_success(ctx.output, command, &output, Some(&human))
}

pub fn run_type_list(globals: &Globals) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let types = task::list_task_types(&dataset);

    let mut human = HumanOutput::new("Task types");
    for task_type in &types {
        human.push_detail(format!(
            "{:>4} {} ({})",
            task_type.order, task_type.code, task_type.label
        ));
    }
    emit_success(ctx.output, "type list", &types, Some(&human))
}

pub fn run_type_add(
    globals: &Globals,
    code: &str,
    label: &str,
    description: Option<String>,
    order: Option<u32>,
) -> Result<()> {
    let ctx = load_context(globals)?;
    let task_type = ctx.storage.transaction(|dataset| {
        task::add_task_type(dataset, code, label, description, order)
    })?;

    let mut human = HumanOutput::new("Task type added");
    human.push_summary("Code", task_type.code.clone());
    human.push_summary("Label", task_type.label.clone());
    human.push_summary("Order", task_type.order.to_string());
    emit_success(ctx.output, "type add", &task_type, Some(&human))
}

pub fn run_attach(globals: &Globals, id: u64, path: &Path) -> Result<()> {
    let ctx = load_context(globals)?;
    let attached = attachment::attach(&ctx.storage, id, path, ctx.user())?;

    let mut human = HumanOutput::new(format!("Attached {} to task {id}", attached.filename));
    human.push_summary("ID", attached.id.to_string());
    human.push_summary("Size", format!("{} bytes", attached.size));
    human.push_summary("Stored at", attached.stored_path.clone());
    emit_success(ctx.output, "task attach", &attached, Some(&human))
}

pub fn run_attachments(globals: &Globals, id: u64) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let attachments = attachment::list(&dataset, id)?;

    let mut human = HumanOutput::new(format!("Attachments of task {id}"));
    human.push_summary("Total", attachments.len().to_string());
    for item in &attachments {
        human.push_detail(format!("{} {} ({} bytes)", item.id, item.filename, item.size));
    }

    let output = AttachmentListOutput {
        task: id,
        total: attachments.len(),
        attachments,
    };
    emit_success(ctx.output, "task attachments", &output, Some(&human))
}
