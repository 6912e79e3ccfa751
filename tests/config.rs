mod support;

use support::TestStore;

#[test]
fn custom_store_dir_and_default_type_are_honored() {
    let store = TestStore::empty();
    store
        .write_file(
            ".taskflow.toml",
            "[store]\ndir = \"data\"\n\n[tasks]\ndefault_type = \"chore\"\n",
        )
        .expect("write config");

    store.json(&["init"]);
    assert!(store.path().join("data").join("db.json").is_file());
    assert!(!store.store_dir().exists());

    // The configured default type is created on first use.
    let task = store.json(&["task", "new", "Sweep"]);
    assert_eq!(task["data"]["task_type"], "chore");
}

#[test]
fn max_depth_limits_hierarchy() {
    let store = TestStore::empty();
    store
        .write_file(".taskflow.toml", "[tasks]\nmax_depth = 2\n")
        .expect("write config");
    store.json(&["init"]);

    let a = store.new_task("A", &[]);
    let b = store.new_task("B", &["--parent", &a.to_string()]);
    let c = store.new_task("C", &["--parent", &b.to_string()]);
    let err = store.json_err(&["task", "new", "D", "--parent", &c.to_string()], 2);
    assert_eq!(err["error"]["field"], "parent");
}

#[test]
fn lowering_max_depth_keeps_existing_deep_trees_writable() {
    let store = TestStore::init();
    let a = store.new_task("A", &[]);
    let b = store.new_task("B", &["--parent", &a.to_string()]);
    let c = store.new_task("C", &["--parent", &b.to_string()]);
    let d = store.new_task("D", &["--parent", &c.to_string()]);
    let e = store.new_task("E", &["--parent", &c.to_string()]);

    store
        .write_file(".taskflow.toml", "[tasks]\nmax_depth = 2\n")
        .expect("write config");

    // Unrelated writes still validate the whole dataset.
    store.new_need("Unrelated", &[]);
    store.json(&["task", "edit", &e.to_string(), "--title", "E renamed"]);
    store.json(&["task", "parent", "clear", &d.to_string()]);

    // New links are still bounded.
    let err = store.json_err(&["task", "parent", "set", &d.to_string(), &c.to_string()], 2);
    assert_eq!(err["error"]["field"], "parent");
}

#[test]
fn invalid_config_is_reported_instead_of_ignored() {
    let store = TestStore::empty();
    store
        .write_file(
            ".taskflow.toml",
            "[store]\ndir = \"state\"\n\n[tasks]\nmax_depth = 0\n",
        )
        .expect("write config");

    let err = store.json_err(&["init"], 2);
    assert_eq!(err["error"]["kind"], "user_error");
    assert_eq!(err["next_steps"][0], "fix .taskflow.toml then retry");
    assert!(!store.store_dir().exists());
    assert!(!store.path().join("state").exists());
}

#[test]
fn broken_config_blocks_commands_on_an_existing_store() {
    let store = TestStore::init();
    store.new_task("Before", &[]);
    store
        .write_file(".taskflow.toml", "[tasks\nmax_depth = 4\n")
        .expect("write config");

    let err = store.json_err(&["task", "list"], 2);
    assert_eq!(err["error"]["kind"], "user_error");
}
