mod support;

use std::fs;

use support::TestStore;

#[test]
fn commit_new_writes_named_snapshot_file() {
    let store = TestStore::init();
    store.new_task("Kept", &["--actor", "alice"]);

    let created = store.json(&["--actor", "alice", "commit", "new", "release 1.0!"]);
    let name = created["data"]["name"].as_str().expect("commit name").to_string();
    assert!(name.starts_with("commit_"));
    assert!(name.ends_with("_release 10.json"));
    assert_eq!(created["data"]["meta"]["created_by"], "alice");
    assert_eq!(created["data"]["tasks"], 1);

    let raw = fs::read_to_string(store.commits_dir().join(&name)).expect("commit file");
    let snapshot: serde_json::Value = serde_json::from_str(&raw).expect("snapshot json");
    assert_eq!(snapshot["meta"]["name"], "release 1.0!");
    assert_eq!(snapshot["tasks"][0]["title"], "Kept");
    assert_eq!(snapshot["tasks"][0]["status"], "A faire");
    assert_eq!(snapshot["users"][0]["username"], "alice");

    let unnamed = store.json(&["commit", "new"]);
    let file = unnamed["data"]["name"].as_str().expect("commit name");
    assert!(file.ends_with("_unnamed.json"));
    assert_eq!(unnamed["data"]["meta"]["created_by"], "anonymous");
}

#[test]
fn activate_restores_snapshot_and_prunes_newer_records() {
    let store = TestStore::init();
    let one = store.new_task("One", &[]);
    let two = store.new_task("Two", &[]);
    let need = store.new_need("Keep me", &[]);

    let created = store.json(&["commit", "new", "base"]);
    let name = created["data"]["name"].as_str().expect("commit name").to_string();

    let three = store.new_task("Three", &[]);
    store.json(&["relation", "add", &one.to_string(), "blocks", &three.to_string()]);
    store.json(&["message", "new", "about three", "--task", &three.to_string()]);
    store.json(&["task", "edit", &one.to_string(), "--title", "Renamed"]);
    store.new_need("Later need", &[]);

    let report = store.json(&["commit", "activate", &name]);
    assert_eq!(report["data"]["fname"], name.as_str());
    assert_eq!(report["data"]["updated_tasks"], 2);
    assert_eq!(report["data"]["deleted_tasks"], 1);
    assert_eq!(report["data"]["deleted_needs"], 1);
    assert_eq!(report["data"]["removed_relations"], 1);
    assert_eq!(report["data"]["removed_messages"], 1);

    let tasks = store.json(&["task", "list", "--ordering", "id"]);
    let ids: Vec<u64> = tasks["data"]["tasks"]
        .as_array()
        .expect("tasks")
        .iter()
        .map(|t| t["id"].as_u64().expect("id"))
        .collect();
    assert_eq!(ids, vec![one, two]);
    assert_eq!(tasks["data"]["tasks"][0]["title"], "One");

    let needs = store.json(&["need", "list"]);
    assert_eq!(needs["data"]["total"], 1);
    assert_eq!(needs["data"]["needs"][0]["id"], need);

    let active = store.json(&["commit", "active"]);
    assert_eq!(active["data"]["active"]["name"], name.as_str());

    let listed = store.json(&["commit", "list"]);
    assert_eq!(listed["data"]["commits"][0]["active"], true);

    // Ids keep growing past the deleted task.
    let four = store.new_task("Four", &[]);
    assert!(four > two);
}

#[test]
fn activation_of_cyclic_snapshot_leaves_store_untouched() {
    let store = TestStore::init();
    store.new_task("Existing", &[]);
    let snapshot = r#"{
        "meta": {"created_by": "anonymous", "created_at": "2024-01-01T00:00:00Z", "name": "bad"},
        "tasks": [
            {"id": 1, "title": "A", "status": "A faire", "parent": 2},
            {"id": 2, "title": "B", "status": "A faire", "parent": 1}
        ],
        "needs": [],
        "users": []
    }"#;
    store
        .write_file(".taskflow/commits/cyclic.json", snapshot)
        .expect("write snapshot");

    let err = store.json_err(&["commit", "activate", "cyclic.json"], 4);
    assert_eq!(err["error"]["kind"], "operation_failed");

    let tasks = store.json(&["task", "list"]);
    assert_eq!(tasks["data"]["total"], 1);
    assert_eq!(tasks["data"]["tasks"][0]["title"], "Existing");
    let active = store.json(&["commit", "active"]);
    assert!(active["data"]["active"].is_null());
}

#[test]
fn commit_names_cannot_escape_the_commits_directory() {
    let store = TestStore::init();
    store.json_err(&["commit", "show", "../db.json"], 2);
    let err = store.json_err(&["commit", "activate", "missing.json"], 2);
    assert_eq!(err["next_steps"][0], "taskflow commit list");
}

#[test]
fn commit_show_prints_raw_snapshot() {
    let store = TestStore::init();
    store.new_need("Need", &[]);
    let created = store.json(&["commit", "new", "peek"]);
    let name = created["data"]["name"].as_str().expect("commit name");

    let shown = store.json(&["commit", "show", name]);
    assert_eq!(shown["data"]["snapshot"]["needs"][0]["title"], "Need");
    assert_eq!(shown["data"]["snapshot"]["meta"]["name"], "peek");
}
