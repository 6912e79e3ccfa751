//! taskflow message command implementations

use serde::Serialize;

use crate::cli::{load_context, Globals};
use crate::error::Result;
use crate::message::{self, Message, MessageDraft};
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct MessageListOutput {
    total: usize,
    messages: Vec<Message>,
}

fn message_line(item: &Message) -> String {
    let mut line = format!(
        "#{} {}: {}",
        item.id,
        item.author.as_deref().unwrap_or("anonymous"),
        item.content
    );
    if let Some(parent) = item.parent {
        line.push_str(&format!(" (reply to #{parent})"));
    }
    line
}

fn push_message_summary(human: &mut HumanOutput, item: &Message) {
    human.push_summary("ID", item.id.to_string());
    if let Some(task) = item.task {
        human.push_summary("Task", task.to_string());
    }
    if let Some(need) = item.need {
        human.push_summary("Need", need.to_string());
    }
    if let Some(parent) = item.parent {
        human.push_summary("Reply to", parent.to_string());
    }
}

pub fn run_new(
    globals: &Globals,
    content: String,
    task: Option<u64>,
    need: Option<u64>,
) -> Result<()> {
    let ctx = load_context(globals)?;
    let created = ctx.storage.transaction(|dataset| {
        message::create(
            dataset,
            MessageDraft {
                content,
                task,
                need,
                parent: None,
            },
            ctx.user(),
        )
    })?;

    let mut human = HumanOutput::new("Message posted");
    push_message_summary(&mut human, &created);
    emit_success(ctx.output, "message new", &created, Some(&human))
}

pub fn run_list(globals: &Globals, task: Option<u64>, need: Option<u64>) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let messages = message::list(&dataset, task, need);

    let mut human = HumanOutput::new("Messages");
    human.push_summary("Total", messages.len().to_string());
    for item in &messages {
        human.push_detail(message_line(item));
    }

    let output = MessageListOutput {
        total: messages.len(),
        messages,
    };
    emit_success(ctx.output, "message list", &output, Some(&human))
}

pub fn run_reply(globals: &Globals, parent: u64, content: &str) -> Result<()> {
    let ctx = load_context(globals)?;
    let created = ctx
        .storage
        .transaction(|dataset| message::reply(dataset, parent, content, ctx.user()))?;

    let mut human = HumanOutput::new("Reply posted");
    push_message_summary(&mut human, &created);
    emit_success(ctx.output, "message reply", &created, Some(&human))
}
