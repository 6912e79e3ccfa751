//! taskflow view command implementations

use crate::cli::{load_context, Globals};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::views;

pub fn run_kanban(globals: &Globals) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let board = views::kanban(&dataset);

    let mut human = HumanOutput::new("Kanban");
    for column in &board {
        human.push_summary(column.status.to_string(), column.tasks.len().to_string());
        for task in &column.tasks {
            human.push_detail(format!("[{}] {} {}", column.status, task.id, task.title));
        }
    }
    emit_success(ctx.output, "view kanban", &board, Some(&human))
}

pub fn run_gantt(globals: &Globals) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let chart = views::gantt(&dataset);

    let mut human = HumanOutput::new("Gantt");
    for project in &chart {
        human.push_summary(project.title.clone(), project.tasks.len().to_string());
        for task in &project.tasks {
            let start = task.start_date.map(|d| d.to_string()).unwrap_or_else(|| "?".into());
            let due = task.due_date.map(|d| d.to_string()).unwrap_or_else(|| "?".into());
            human.push_detail(format!(
                "{} {} {start} -> {due} {}%",
                project.title, task.id, task.progress
            ));
        }
    }
    emit_success(ctx.output, "view gantt", &chart, Some(&human))
}

pub fn run_filters(globals: &Globals) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let meta = views::filters(&dataset);

    let mut human = HumanOutput::new("Filters");
    let types: Vec<&str> = meta.task_types.iter().map(|t| t.code.as_str()).collect();
    let projects: Vec<&str> = meta.projects.iter().map(|p| p.name.as_str()).collect();
    human.push_summary("Types", types.join(", "));
    human.push_summary("Statuses", meta.statuses.join(", "));
    human.push_summary("Modules", meta.modules.join(", "));
    human.push_summary("Projects", projects.join(", "));
    emit_success(ctx.output, "view filters", &meta, Some(&human))
}
