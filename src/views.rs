//! Read-only aggregations over tasks: kanban board, gantt chart, filter metadata.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::task::{TaskRecord, TaskStatus};

/// Bucket title for tasks without a project.
pub const NO_PROJECT: &str = "Sans projet";

#[derive(Debug, Clone, Serialize)]
pub struct KanbanColumn {
    pub status: TaskStatus,
    pub tasks: Vec<TaskRecord>,
}

/// Tasks grouped by status, one column per workflow state (empty columns kept).
pub fn kanban(dataset: &Dataset) -> Vec<KanbanColumn> {
    TaskStatus::WORKFLOW
        .iter()
        .map(|status| KanbanColumn {
            status: *status,
            tasks: dataset
                .tasks
                .values()
                .filter(|task| task.status == *status)
                .cloned()
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct GanttTask {
    pub id: u64,
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct GanttProject {
    pub id: Option<u64>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tasks: Vec<GanttTask>,
}

/// Tasks grouped by project; tasks without one land in a trailing bucket.
pub fn gantt(dataset: &Dataset) -> Vec<GanttProject> {
    let mut grouped: BTreeMap<Option<u64>, Vec<GanttTask>> = BTreeMap::new();
    for task in dataset.tasks.values() {
        let project = task
            .project
            .filter(|id| dataset.projects.contains_key(id));
        grouped.entry(project).or_default().push(GanttTask {
            id: task.id,
            title: task.title.clone(),
            start_date: task.start_date,
            due_date: task.due_date,
            progress: task.progress,
        });
    }

    let unassigned = grouped.remove(&None);
    let mut projects: Vec<GanttProject> = grouped
        .into_iter()
        .filter_map(|(id, tasks)| {
            let project = dataset.projects.get(&id?)?;
            Some(GanttProject {
                id: Some(project.id),
                title: project.name.clone(),
                description: project.description.clone(),
                tasks,
            })
        })
        .collect();
    if let Some(tasks) = unassigned {
        projects.push(GanttProject {
            id: None,
            title: NO_PROJECT.to_string(),
            description: None,
            tasks,
        });
    }
    projects
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TypeOption {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProjectOption {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterMetadata {
    pub task_types: Vec<TypeOption>,
    pub modules: Vec<String>,
    pub statuses: Vec<String>,
    pub projects: Vec<ProjectOption>,
}

/// Distinct values used by the stored tasks, for building list filters.
pub fn filters(dataset: &Dataset) -> FilterMetadata {
    let mut task_types = BTreeMap::new();
    let mut modules = BTreeSet::new();
    let mut statuses = BTreeSet::new();
    let mut projects = BTreeMap::new();

    for task in dataset.tasks.values() {
        if let Some(task_type) = dataset.task_types.get(&task.task_type) {
            task_types.insert(task_type.code.clone(), task_type.label.clone());
        }
        if let Some(module) = task.module.as_deref() {
            modules.insert(module.to_string());
        }
        statuses.insert(task.status.as_str().to_string());
        if let Some(project) = task.project.and_then(|id| dataset.projects.get(&id)) {
            projects.insert(project.id, project.name.clone());
        }
    }

    let mut projects: Vec<ProjectOption> = projects
        .into_iter()
        .map(|(id, name)| ProjectOption { id, name })
        .collect();
    projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    FilterMetadata {
        task_types: task_types
            .into_iter()
            .map(|(code, label)| TypeOption { code, label })
            .collect(),
        modules: modules.into_iter().collect(),
        statuses: statuses.into_iter().collect(),
        projects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project;

    fn sample() -> Dataset {
        let mut dataset = Dataset::seeded();
        let web = project::create(&mut dataset, "Web", None).unwrap();

        let mut one = TaskRecord::bare(1, "Login page", "story");
        one.project = Some(web.id);
        one.module = Some("auth".into());
        one.progress = 40;
        let mut two = TaskRecord::bare(2, "Fix crash", "task");
        two.status = TaskStatus::Done;
        let three = TaskRecord::bare(3, "Plan", "epic");
        for task in [one, two, three] {
            dataset.tasks.insert(task.id, task);
        }
        dataset
    }

    #[test]
    fn kanban_keeps_workflow_columns() {
        let board = kanban(&sample());
        let statuses: Vec<TaskStatus> = board.iter().map(|column| column.status).collect();
        assert_eq!(statuses, TaskStatus::WORKFLOW.to_vec());
        assert_eq!(board[0].tasks.len(), 2);
        assert!(board[1].tasks.is_empty());
        assert_eq!(board[2].tasks[0].id, 2);
    }

    #[test]
    fn gantt_groups_by_project_with_unassigned_bucket_last() {
        let chart = gantt(&sample());
        assert_eq!(chart.len(), 2);
        assert_eq!(chart[0].title, "Web");
        assert_eq!(chart[0].tasks[0].progress, 40);
        assert_eq!(chart[1].id, None);
        assert_eq!(chart[1].title, NO_PROJECT);
        assert_eq!(chart[1].tasks.len(), 2);
    }

    #[test]
    fn filters_list_distinct_sorted_values() {
        let meta = filters(&sample());
        let codes: Vec<&str> = meta.task_types.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, vec!["epic", "story", "task"]);
        assert_eq!(meta.modules, vec!["auth".to_string()]);
        assert_eq!(meta.statuses, vec!["A faire".to_string(), "Fait".to_string()]);
        assert_eq!(
            meta.projects,
            vec![ProjectOption {
                id: 1,
                name: "Web".into()
            }]
        );
    }
}
