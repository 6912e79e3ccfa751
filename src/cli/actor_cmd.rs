//! taskflow actor command implementation
//!
//! Provides actor identity helpers (set/show).

use std::path::PathBuf;

use crate::actor::{self, ANONYMOUS};
use crate::cli::{load_context, Globals};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

#[derive(serde::Serialize)]
struct ActorSetReport {
    actor: String,
    path: PathBuf,
}

#[derive(serde::Serialize)]
struct ActorShowReport {
    actor: String,
    anonymous: bool,
}

pub fn run_set(globals: &Globals, name: &str) -> Result<()> {
    let ctx = load_context(globals)?;
    let actor_name = actor::persist_actor(&ctx.storage, name)?;
    let actor_path = ctx.storage.actor_file();

    let report = ActorSetReport {
        actor: actor_name.clone(),
        path: actor_path.clone(),
    };

    let mut human = HumanOutput::new(format!("taskflow actor set: {actor_name}"));
    human.push_summary("actor", actor_name);
    human.push_summary("path", actor_path.display().to_string());
    if globals.actor.is_some() {
        human.push_warning("--actor still overrides the persisted actor for this command");
    }
    human.push_next_step("taskflow actor show");

    emit_success(ctx.output, "actor set", &report, Some(&human))
}

pub fn run_show(globals: &Globals) -> Result<()> {
    let ctx = load_context(globals)?;
    let anonymous = ctx.user().is_none();

    let report = ActorShowReport {
        actor: ctx.actor.clone(),
        anonymous,
    };

    let header = if anonymous {
        "taskflow actor: not set".to_string()
    } else {
        format!("taskflow actor: {}", ctx.actor)
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("actor", ctx.actor.clone());
    if anonymous {
        human.push_warning(format!("actor not set; writes are recorded as {ANONYMOUS}"));
        human.push_next_step("taskflow actor set <name>");
    }

    emit_success(ctx.output, "actor show", &report, Some(&human))
}
