//! Threaded messages attached to tasks and needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::user;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageDraft {
    pub content: String,
    pub task: Option<u64>,
    pub need: Option<u64>,
    pub parent: Option<u64>,
}

pub fn create(dataset: &mut Dataset, draft: MessageDraft, author: Option<&str>) -> Result<Message> {
    let content = draft.content.trim();
    if content.is_empty() {
        return Err(Error::validation("content", "content required"));
    }
    if let Some(task) = draft.task {
        if !dataset.tasks.contains_key(&task) {
            return Err(Error::validation("task", format!("task {task} does not exist")));
        }
    }
    if let Some(need) = draft.need {
        if !dataset.needs.contains_key(&need) {
            return Err(Error::validation("need", format!("need {need} does not exist")));
        }
    }
    if let Some(parent) = draft.parent {
        if !dataset.messages.contains_key(&parent) {
            return Err(Error::validation(
                "parent",
                format!("message {parent} does not exist"),
            ));
        }
    }
    let author = user::ensure_actor(dataset, author)?;

    let message = Message {
        id: dataset.ids.next_message(),
        content: content.to_string(),
        author,
        created_at: Utc::now(),
        task: draft.task,
        need: draft.need,
        parent: draft.parent,
    };
    dataset.messages.insert(message.id, message.clone());
    Ok(message)
}

/// Reply to a message; the reply joins the same task and need thread.
pub fn reply(
    dataset: &mut Dataset,
    parent_id: u64,
    content: &str,
    author: Option<&str>,
) -> Result<Message> {
    let parent = dataset.message(parent_id)?.clone();
    create(
        dataset,
        MessageDraft {
            content: content.to_string(),
            task: parent.task,
            need: parent.need,
            parent: Some(parent.id),
        },
        author,
    )
}

/// Messages, newest first.
pub fn list(dataset: &Dataset, task: Option<u64>, need: Option<u64>) -> Vec<Message> {
    let mut messages: Vec<Message> = dataset
        .messages
        .values()
        .filter(|message| task.map_or(true, |id| message.task == Some(id)))
        .filter(|message| need.map_or(true, |id| message.need == Some(id)))
        .cloned()
        .collect();
    messages.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    messages
}

/// Copy a need's messages, oldest first, onto a task.
///
/// Copies are top-level messages with the original author; threading is not
/// carried over.
pub fn copy_need_thread(dataset: &mut Dataset, need_id: u64, task_id: u64) -> Vec<u64> {
    let mut source: Vec<Message> = dataset
        .messages
        .values()
        .filter(|message| message.need == Some(need_id))
        .cloned()
        .collect();
    source.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut copied = Vec::with_capacity(source.len());
    for original in source {
        let message = Message {
            id: dataset.ids.next_message(),
            content: original.content,
            author: original.author,
            created_at: Utc::now(),
            task: Some(task_id),
            need: None,
            parent: None,
        };
        copied.push(message.id);
        dataset.messages.insert(message.id, message);
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskRecord;

    fn dataset_with_task() -> Dataset {
        let mut dataset = Dataset::seeded();
        dataset.tasks.insert(1, TaskRecord::bare(1, "t1", "task"));
        dataset.reconcile_ids();
        dataset
    }

    #[test]
    fn empty_content_is_rejected() {
        let mut dataset = dataset_with_task();
        let err = create(&mut dataset, MessageDraft::default(), None).unwrap_err();
        assert_eq!(err.field(), Some("content"));
    }

    #[test]
    fn reply_inherits_thread() {
        let mut dataset = dataset_with_task();
        let root = create(
            &mut dataset,
            MessageDraft {
                content: "first".into(),
                task: Some(1),
                ..Default::default()
            },
            Some("alice"),
        )
        .unwrap();
        let answer = reply(&mut dataset, root.id, "second", Some("bob")).unwrap();
        assert_eq!(answer.task, Some(1));
        assert_eq!(answer.parent, Some(root.id));
        assert_eq!(answer.author.as_deref(), Some("bob"));
        assert_eq!(list(&dataset, Some(1), None)[0].id, answer.id);
    }

    #[test]
    fn reply_to_missing_message_is_not_found() {
        let mut dataset = dataset_with_task();
        assert!(matches!(
            reply(&mut dataset, 40, "hello", None),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn links_must_exist() {
        let mut dataset = dataset_with_task();
        let err = create(
            &mut dataset,
            MessageDraft {
                content: "x".into(),
                need: Some(3),
                ..Default::default()
            },
            None,
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("need"));
    }
}
