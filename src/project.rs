//! Projects group tasks. Names are unique ignoring case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn normalize_description(description: Option<String>) -> Option<String> {
    let description = description?;
    if description.trim().is_empty() {
        None
    } else {
        Some(description.trim().to_string())
    }
}

pub fn create(
    dataset: &mut Dataset,
    name: &str,
    description: Option<String>,
) -> Result<ProjectRecord> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "project name cannot be empty"));
    }
    if find_by_name(dataset, name).is_some() {
        return Err(Error::Conflict(format!("project already exists: {name}")));
    }
    let project = ProjectRecord {
        id: dataset.ids.next_project(),
        name: name.to_string(),
        description: normalize_description(description),
        created_at: Utc::now(),
    };
    dataset.projects.insert(project.id, project.clone());
    Ok(project)
}

fn find_by_name<'a>(dataset: &'a Dataset, name: &str) -> Option<&'a ProjectRecord> {
    let needle = name.trim().to_lowercase();
    dataset
        .projects
        .values()
        .find(|project| project.name.to_lowercase() == needle)
}

/// Resolve a project given as numeric id or as name.
pub fn resolve(dataset: &Dataset, input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(
            "project cannot be empty".to_string(),
        ));
    }
    if let Ok(id) = trimmed.parse::<u64>() {
        if dataset.projects.contains_key(&id) {
            return Ok(id);
        }
    }
    find_by_name(dataset, trimmed)
        .map(|project| project.id)
        .ok_or_else(|| Error::not_found("project", trimmed))
}

pub fn get(dataset: &Dataset, id: u64) -> Result<ProjectRecord> {
    dataset
        .projects
        .get(&id)
        .cloned()
        .ok_or_else(|| Error::not_found("project", id))
}

/// Projects sorted by name.
pub fn list(dataset: &Dataset) -> Vec<ProjectRecord> {
    let mut projects: Vec<ProjectRecord> = dataset.projects.values().cloned().collect();
    projects.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    projects
}

/// Delete a project; its tasks lose their project reference.
///
/// Returns the deleted project and the ids of the tasks that were detached.
pub fn delete(dataset: &mut Dataset, id: u64) -> Result<(ProjectRecord, Vec<u64>)> {
    let project = dataset
        .projects
        .remove(&id)
        .ok_or_else(|| Error::not_found("project", id))?;
    let mut detached = Vec::new();
    for task in dataset.tasks.values_mut() {
        if task.project == Some(id) {
            task.project = None;
            detached.push(task.id);
        }
    }
    Ok((project, detached))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskRecord;

    #[test]
    fn names_are_unique_ignoring_case() {
        let mut dataset = Dataset::empty();
        create(&mut dataset, "Website", None).unwrap();
        let err = create(&mut dataset, "  website ", None).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn resolve_accepts_id_or_name() {
        let mut dataset = Dataset::empty();
        let project = create(&mut dataset, "Mobile App", Some("  ".into())).unwrap();
        assert!(project.description.is_none());
        assert_eq!(resolve(&dataset, "1").unwrap(), project.id);
        assert_eq!(resolve(&dataset, "mobile app").unwrap(), project.id);
        assert!(resolve(&dataset, "desktop").is_err());
    }

    #[test]
    fn delete_clears_task_references() {
        let mut dataset = Dataset::seeded();
        let project = create(&mut dataset, "Backend", None).unwrap();
        let mut task = TaskRecord::bare(1, "API", "task");
        task.project = Some(project.id);
        dataset.tasks.insert(1, task);

        let (_, detached) = delete(&mut dataset, project.id).unwrap();
        assert_eq!(detached, vec![1]);
        assert_eq!(dataset.tasks[&1].project, None);
        assert!(dataset.projects.is_empty());
    }
}
