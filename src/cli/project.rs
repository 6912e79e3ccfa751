//! taskflow project command implementations

use serde::Serialize;

use crate::cli::{load_context, Globals};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::project::{self, ProjectRecord};

#[derive(Serialize)]
struct ProjectListOutput {
    total: usize,
    projects: Vec<ProjectSummary>,
}

#[derive(Serialize)]
struct ProjectSummary {
    #[serde(flatten)]
    project: ProjectRecord,
    tasks: usize,
}

#[derive(Serialize)]
struct ProjectDeleteOutput {
    project: ProjectRecord,
    detached_tasks: Vec<u64>,
}

pub fn run_new(globals: &Globals, name: &str, description: Option<String>) -> Result<()> {
    let ctx = load_context(globals)?;
    let created = ctx
        .storage
        .transaction(|dataset| project::create(dataset, name, description))?;

    let mut human = HumanOutput::new("Project created");
    human.push_summary("ID", created.id.to_string());
    human.push_summary("Name", created.name.clone());
    if let Some(description) = created.description.as_deref() {
        human.push_summary("Description", description);
    }
    human.push_next_step(format!("taskflow task new <title> --project {}", created.id));

    emit_success(ctx.output, "project new", &created, Some(&human))
}

pub fn run_list(globals: &Globals) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let projects: Vec<ProjectSummary> = project::list(&dataset)
        .into_iter()
        .map(|project| {
            let tasks = dataset
                .tasks
                .values()
                .filter(|task| task.project == Some(project.id))
                .count();
            ProjectSummary { project, tasks }
        })
        .collect();

    let mut human = HumanOutput::new("Projects");
    human.push_summary("Total", projects.len().to_string());
    for summary in &projects {
        human.push_detail(format!(
            "{} {} ({} tasks)",
            summary.project.id, summary.project.name, summary.tasks
        ));
    }

    let output = ProjectListOutput {
        total: projects.len(),
        projects,
    };
    emit_success(ctx.output, "project list", &output, Some(&human))
}

pub fn run_delete(globals: &Globals, input: &str) -> Result<()> {
    let ctx = load_context(globals)?;
    let (project, detached_tasks) = ctx.storage.transaction(|dataset| {
        let id = project::resolve(dataset, input)?;
        project::delete(dataset, id)
    })?;

    let mut human = HumanOutput::new(format!("Project {} deleted", project.name));
    if !detached_tasks.is_empty() {
        let ids: Vec<String> = detached_tasks.iter().map(u64::to_string).collect();
        human.push_warning(format!("tasks left without project: {}", ids.join(", ")));
    }

    let output = ProjectDeleteOutput {
        project,
        detached_tasks,
    };
    emit_success(ctx.output, "project delete", &output, Some(&human))
}
