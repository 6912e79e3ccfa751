//! taskflow need command implementations

use serde::Serialize;

use crate::cli::{load_context, Globals};
use crate::error::Result;
use crate::message::{self, Message};
use crate::need::{self, BatchConversion, NeedDraft, NeedRecord};
use crate::output::{emit_success, HumanOutput};
use crate::task::TaskRecord;

#[derive(Serialize)]
struct NeedListOutput {
    total: usize,
    needs: Vec<NeedRecord>,
}

#[derive(Serialize)]
struct NeedShowOutput {
    need: NeedRecord,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct NeedConvertOutput {
    need: u64,
    task: TaskRecord,
}

fn need_line(need: &NeedRecord) -> String {
    let state = if need.converted { "converted" } else { "open" };
    format!("[{state}] {} {}", need.id, need.title)
}

pub fn run_new(
    globals: &Globals,
    title: String,
    description: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let ctx = load_context(globals)?;
    let created = ctx.storage.transaction(|dataset| {
        need::create(
            dataset,
            NeedDraft {
                title,
                description,
                initial_message: message,
            },
            ctx.user(),
        )
    })?;

    let mut human = HumanOutput::new("Need created");
    human.push_summary("ID", created.id.to_string());
    human.push_summary("Title", created.title.clone());
    if let Some(owner) = created.owner.as_deref() {
        human.push_summary("Owner", owner);
    }
    human.push_next_step(format!("taskflow need convert {}", created.id));
    emit_success(ctx.output, "need new", &created, Some(&human))
}

pub fn run_list(globals: &Globals, converted: Option<bool>) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let needs = need::list(&dataset, converted);

    let mut human = HumanOutput::new("Needs");
    human.push_summary("Total", needs.len().to_string());
    for record in &needs {
        human.push_detail(need_line(record));
    }

    let output = NeedListOutput {
        total: needs.len(),
        needs,
    };
    emit_success(ctx.output, "need list", &output, Some(&human))
}

pub fn run_show(globals: &Globals, id: u64) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let record = need::get(&dataset, id)?;
    let messages = message::list(&dataset, None, Some(id));

    let mut human = HumanOutput::new(format!("Need {id}"));
    human.push_summary("Title", record.title.clone());
    if !record.description.is_empty() {
        human.push_summary("Description", record.description.clone());
    }
    if let Some(owner) = record.owner.as_deref() {
        human.push_summary("Owner", owner);
    }
    human.push_summary("Converted", if record.converted { "yes" } else { "no" });
    if let Some(by) = record.converted_by.as_deref() {
        human.push_summary("Converted by", by);
    }
    for item in &messages {
        human.push_detail(format!(
            "#{} {}: {}",
            item.id,
            item.author.as_deref().unwrap_or("anonymous"),
            item.content
        ));
    }

    let output = NeedShowOutput {
        need: record,
        messages,
    };
    emit_success(ctx.output, "need show", &output, Some(&human))
}

pub fn run_convert(globals: &Globals, id: u64) -> Result<()> {
    let ctx = load_context(globals)?;
    let config = ctx.storage.config().tasks.clone();
    let task = ctx
        .storage
        .transaction(|dataset| need::convert_need(dataset, id, ctx.user(), &config))?;

    let mut human = HumanOutput::new("Need converted");
    human.push_summary("Need", id.to_string());
    human.push_summary("Task", task.id.to_string());
    human.push_summary("Title", task.title.clone());
    human.push_next_step(format!("taskflow task show {}", task.id));

    let output = NeedConvertOutput { need: id, task };
    emit_success(ctx.output, "need convert", &output, Some(&human))
}

pub fn run_convert_all(globals: &Globals, ids: Vec<u64>) -> Result<()> {
    let ctx = load_context(globals)?;
    let config = ctx.storage.config().tasks.clone();
    let selection = if ids.is_empty() { None } else { Some(ids.as_slice()) };
    let outcome: BatchConversion = ctx
        .storage
        .transaction(|dataset| need::convert_needs(dataset, selection, ctx.user(), &config))?;

    let mut human = HumanOutput::new("Needs converted");
    human.push_summary("Converted", outcome.converted.to_string());
    if !outcome.tasks.is_empty() {
        let tasks: Vec<String> = outcome.tasks.iter().map(u64::to_string).collect();
        human.push_summary("Tasks", tasks.join(", "));
    }
    if !outcome.skipped.is_empty() {
        let skipped: Vec<String> = outcome.skipped.iter().map(u64::to_string).collect();
        human.push_warning(format!("already converted: {}", skipped.join(", ")));
    }
    emit_success(ctx.output, "need convert-all", &outcome, Some(&human))
}

pub fn run_delete(globals: &Globals, id: u64) -> Result<()> {
    let ctx = load_context(globals)?;
    let removed = ctx
        .storage
        .transaction(|dataset| need::delete(dataset, id, ctx.user()))?;

    let human = HumanOutput::new(format!("Need {} deleted", removed.id));
    emit_success(ctx.output, "need delete", &removed, Some(&human))
}
