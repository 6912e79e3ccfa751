//! Actor identity management.
//!
//! Actor resolution order:
//! 1) CLI --actor (explicit)
//! 2) TASKFLOW_ACTOR environment variable
//! 3) Persisted value in .taskflow/actor
//! 4) Config default (actor.default), "anonymous" unless configured
//!
//! The name "anonymous" stands for no user: records written by it carry no
//! owner and snapshots report it as their creator.

use crate::error::{Error, Result};
use crate::storage::Storage;

pub const ACTOR_ENV: &str = "TASKFLOW_ACTOR";

pub const ANONYMOUS: &str = "anonymous";

/// Resolve the current actor using CLI, environment, persisted value, and config.
pub fn resolve_actor(storage: &Storage, cli_actor: Option<&str>) -> String {
    if let Some(actor) = non_empty(cli_actor) {
        return actor.to_string();
    }

    if let Ok(env_actor) = std::env::var(ACTOR_ENV) {
        if let Some(actor) = non_empty(Some(env_actor.as_str())) {
            return actor.to_string();
        }
    }

    if let Some(actor) = storage.read_actor() {
        return actor;
    }

    non_empty(Some(storage.config().actor.default.as_str()))
        .unwrap_or(ANONYMOUS)
        .to_string()
}

/// The username to record for `actor`, or `None` when anonymous.
pub fn as_user(actor: &str) -> Option<&str> {
    non_empty(Some(actor)).filter(|name| !name.eq_ignore_ascii_case(ANONYMOUS))
}

/// Persist the actor identity in the store directory.
pub fn persist_actor(storage: &Storage, actor: &str) -> Result<String> {
    let actor = non_empty(Some(actor))
        .ok_or_else(|| Error::InvalidArgument("actor name cannot be empty".to_string()))?;
    if actor.chars().any(char::is_whitespace) {
        return Err(Error::InvalidArgument(format!(
            "actor name cannot contain whitespace: '{actor}'"
        )));
    }
    storage.write_actor(actor)?;
    Ok(actor.to_string())
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
