//! taskflow user command implementations

use crate::cli::{load_context, Globals};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::user;

pub fn run_add(globals: &Globals, username: &str, email: Option<String>, staff: bool) -> Result<()> {
    let ctx = load_context(globals)?;
    let record = ctx
        .storage
        .transaction(|dataset| user::add(dataset, username, email, staff))?;

    let mut human = HumanOutput::new("User added");
    human.push_summary("Username", record.username.clone());
    if !record.email.is_empty() {
        human.push_summary("Email", record.email.clone());
    }
    if record.is_staff {
        human.push_summary("Staff", "yes");
    }
    emit_success(ctx.output, "user add", &record, Some(&human))
}

pub fn run_list(globals: &Globals) -> Result<()> {
    let ctx = load_context(globals)?;
    let dataset = ctx.storage.read()?;
    let users = user::list(&dataset);

    let mut human = HumanOutput::new("Users");
    human.push_summary("Total", users.len().to_string());
    for record in &users {
        let mut line = record.username.clone();
        if record.is_staff {
            line.push_str(" [staff]");
        }
        if !record.is_active {
            line.push_str(" [inactive]");
        }
        human.push_detail(line);
    }
    emit_success(ctx.output, "user list", &users, Some(&human))
}
