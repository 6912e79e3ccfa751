//! taskflow init command implementation
//!
//! Creates the `.taskflow.toml` config and the seeded store under the root.

use std::path::{Path, PathBuf};

use crate::cli::Globals;
use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::storage::Storage;

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    store: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    store: bool,
}

pub fn run(globals: &Globals) -> Result<()> {
    let root = globals.resolve_root()?;
    std::fs::create_dir_all(&root)?;

    let created_config = ensure_config(&root)?;
    let storage = Storage::open(root.clone())?;
    let created_store = storage.init()?;

    let report = InitReport {
        root: root.clone(),
        store: storage.store_dir(),
        created: InitCreated {
            config: created_config,
            store: created_store,
        },
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }
    if created_store {
        created_items.push(format!("{}/", storage.config().store.dir));
    }

    let header = if created_items.is_empty() {
        "taskflow init: nothing to do"
    } else {
        "taskflow init: initialized store"
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("root", root.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("taskflow actor set <name>");
    human.push_next_step("taskflow task new <title>");

    emit_success(globals.output(), "init", &report, Some(&human))
}

fn ensure_config(root: &Path) -> Result<bool> {
    let path = root.join(CONFIG_FILE);
    if path.exists() {
        return Ok(false);
    }
    Config::default().save(&path)?;
    Ok(true)
}
