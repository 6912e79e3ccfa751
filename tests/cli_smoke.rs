mod support;

use predicates::prelude::*;

use support::{taskflow_cmd, TestStore};

#[test]
fn help_lists_command_groups() {
    taskflow_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("task"))
        .stdout(predicate::str::contains("need"))
        .stdout(predicate::str::contains("commit"));
}

#[test]
fn init_creates_config_and_store() {
    let store = TestStore::empty();
    let value = store.json(&["init"]);
    assert_eq!(value["schema_version"], "taskflow.v1");
    assert_eq!(value["command"], "init");
    assert_eq!(value["data"]["created"]["config"], true);
    assert_eq!(value["data"]["created"]["store"], true);
    assert!(store.path().join(".taskflow.toml").is_file());
    assert!(store.store_dir().join("db.json").is_file());
    assert!(store.commits_dir().is_dir());

    let again = store.json(&["init"]);
    assert_eq!(again["data"]["created"]["config"], false);
    assert_eq!(again["data"]["created"]["store"], false);
}

#[test]
fn commands_require_init() {
    let store = TestStore::empty();
    let value = store.json_err(&["task", "list"], 2);
    assert_eq!(value["status"], "error");
    assert_eq!(value["command"], "task list");
    assert_eq!(value["next_steps"][0], "taskflow init");
}

#[test]
fn human_output_prints_header_and_summary() {
    let store = TestStore::init();
    store
        .cmd()
        .args(["task", "new", "Write docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Task created"))
        .stdout(predicate::str::contains("- Title: Write docs"));

    store
        .cmd()
        .args(["--quiet", "task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn seeded_task_types_are_listed_in_order() {
    let store = TestStore::init();
    let value = store.json(&["type", "list"]);
    let codes: Vec<&str> = value["data"]
        .as_array()
        .expect("types")
        .iter()
        .map(|t| t["code"].as_str().expect("code"))
        .collect();
    assert!(codes.contains(&"task"));
    assert_eq!(codes.len(), 5);

    store.json(&["type", "add", "spike", "Spike"]);
    let value = store.json(&["type", "list"]);
    let last = value["data"].as_array().expect("types").last().cloned();
    assert_eq!(last.expect("last type")["code"], "spike");

    store.json_err(&["type", "add", "spike", "Again"], 3);
}

#[test]
fn actor_set_is_used_for_ownership() {
    let store = TestStore::init();
    let shown = store.json(&["actor", "show"]);
    assert_eq!(shown["data"]["anonymous"], true);

    store.json(&["actor", "set", "alice"]);
    let shown = store.json(&["actor", "show"]);
    assert_eq!(shown["data"]["actor"], "alice");

    let task = store.json(&["task", "new", "Owned"]);
    assert_eq!(task["data"]["owner"], "alice");
    assert_eq!(task["data"]["reporter"], "alice");

    let users = store.json(&["user", "list"]);
    assert_eq!(users["data"][0]["username"], "alice");
}
