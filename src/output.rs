//! Result reporting for taskflow CLI commands.
//!
//! With `--json` every outcome, success or failure, is one envelope on stdout:
//!
//! ```json
//! {"schema_version": "taskflow.v1", "command": "task new", "status": "success", "data": {...}}
//! {"schema_version": "taskflow.v1", "command": "task new", "status": "error", "error": {...}}
//! ```
//!
//! Without it, commands print a [`HumanOutput`] report unless `--quiet` is set.
//! Errors always go to stderr in human mode.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, JsonError, Result};

pub const SCHEMA_VERSION: &str = "taskflow.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Plain-text report: a header line followed by optional bulleted sections.
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, line: impl Into<String>) {
        self.details.push(line.into());
    }

    pub fn push_warning(&mut self, line: impl Into<String>) {
        self.warnings.push(line.into());
    }

    pub fn push_next_step(&mut self, step: impl Into<String>) {
        self.next_steps.push(step.into());
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;

        let summary: Vec<String> = self
            .summary
            .iter()
            .map(|(key, value)| match value.as_str() {
                "" => key.clone(),
                value => format!("{key}: {value}"),
            })
            .collect();

        let sections = [
            ("Summary", summary.as_slice()),
            ("Details", self.details.as_slice()),
            ("Warnings", self.warnings.as_slice()),
            ("Next steps", self.next_steps.as_slice()),
        ];
        for (title, items) in sections.into_iter().filter(|(_, items)| !items.is_empty()) {
            write!(f, "\n\n{title}:")?;
            for item in items {
                write!(f, "\n- {item}")?;
            }
        }
        Ok(())
    }
}

pub fn format_human(output: &HumanOutput) -> String {
    output.to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome<'a, T: Serialize> {
    Data(&'a T),
    Error(JsonError),
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
    #[serde(skip_serializing_if = "no_items")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "no_items")]
    next_steps: &'a [String],
}

fn no_items(items: &&[String]) -> bool {
    items.is_empty()
}

impl<T: Serialize> Envelope<'_, T> {
    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let (warnings, next_steps) = human
            .map(|h| (h.warnings.as_slice(), h.next_steps.as_slice()))
            .unwrap_or_default();
        return Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            outcome: Outcome::Data(data),
            warnings,
            next_steps,
        }
        .print();
    }

    match human {
        Some(human) if !options.quiet => println!("{human}"),
        _ => {}
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps: Vec<String> = recovery_hint(err).map(str::to_string).into_iter().collect();

    if json {
        return Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            outcome: Outcome::Error(JsonError::from(err)),
            warnings: &[],
            next_steps: &next_steps,
        }
        .print();
    }

    eprintln!("error: {err}");
    for step in &next_steps {
        eprintln!("hint: {step}");
    }
    Ok(())
}

/// The one command the user should try next, when the error suggests one.
fn recovery_hint(err: &Error) -> Option<&'static str> {
    let hint = match err {
        Error::NotInitialized(_) => "taskflow init",
        Error::InvalidConfig(_) => "fix .taskflow.toml then retry",
        Error::AlreadyConverted(_) => "taskflow need list --converted",
        Error::NotFound { kind: "commit", .. } => "taskflow commit list",
        Error::LockFailed(_) => "retry once the other taskflow process finishes",
        Error::PermissionDenied(_) => "retry with --actor <staff user>",
        _ => return None,
    };
    Some(hint)
}

/// Global flags that consume the following argument as their value.
const VALUE_FLAGS: [&str; 2] = ["--root", "--actor"];

/// Command groups whose name includes a subcommand.
const GROUPS: [&str; 10] = [
    "task", "type", "project", "relation", "need", "message", "view", "user", "actor", "commit",
];

/// Best-effort command name from argv, used to label error envelopes when
/// clap parsing or the command itself fails.
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl Iterator<Item = String>) -> String {
    let words = positionals(args);
    let words: Vec<&str> = words.iter().map(String::as_str).collect();
    match words.as_slice() {
        [] => "taskflow".to_string(),
        ["task", "parent", action, ..] => format!("task parent {action}"),
        [group, sub, ..] if GROUPS.contains(group) => format!("{group} {sub}"),
        [command, ..] => command.to_string(),
    }
}

/// The first three non-flag arguments, skipping values of global flags.
fn positionals(args: impl Iterator<Item = String>) -> Vec<String> {
    let mut words = Vec::new();
    let mut skip_value = false;
    for arg in args {
        if std::mem::take(&mut skip_value) {
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_value = true;
        } else if !arg.starts_with('-') {
            words.push(arg);
            if words.len() == 3 {
                break;
            }
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(argv: &[&str]) -> String {
        command_name(argv.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn command_name_skips_global_flag_values() {
        assert_eq!(name(&["--root", "/tmp/x", "--json", "task", "new", "A"]), "task new");
        assert_eq!(name(&["--actor", "alice", "init"]), "init");
        assert_eq!(name(&["task", "parent", "clear", "4"]), "task parent clear");
        assert_eq!(name(&[]), "taskflow");
    }

    #[test]
    fn error_envelope_carries_field_and_hint() {
        let err = Error::InvalidConfig("tasks.max_depth must be >= 1".to_string());
        let envelope = Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command: "init",
            status: "error",
            outcome: Outcome::Error(JsonError::from(&err)),
            warnings: &[],
            next_steps: &["fix .taskflow.toml then retry".to_string()],
        };
        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(value["error"]["code"], 2);
        assert_eq!(value["error"]["kind"], "user_error");
        assert!(value.get("data").is_none());
        assert!(value.get("warnings").is_none());
        assert_eq!(value["next_steps"][0], "fix .taskflow.toml then retry");
        assert_eq!(recovery_hint(&err), Some("fix .taskflow.toml then retry"));
    }
}
