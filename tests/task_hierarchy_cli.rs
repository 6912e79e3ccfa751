mod support;

use support::TestStore;

#[test]
fn parent_cycle_is_rejected_on_the_parent_field() {
    let store = TestStore::init();
    let a = store.new_task("A", &[]);
    let b = store.new_task("B", &["--parent", &a.to_string()]);
    let c = store.new_task("C", &["--parent", &b.to_string()]);

    let err = store.json_err(&["task", "parent", "set", &a.to_string(), &c.to_string()], 2);
    assert_eq!(err["command"], "task parent set");
    assert_eq!(err["error"]["kind"], "user_error");
    assert_eq!(err["error"]["field"], "parent");
    assert!(err["error"]["details"]["parent"].is_array());

    let shown = store.json(&["task", "show", &a.to_string()]);
    assert!(shown["data"]["task"].get("parent").map_or(true, |p| p.is_null()));
}

#[test]
fn self_parent_and_missing_parent_are_rejected() {
    let store = TestStore::init();
    let a = store.new_task("A", &[]);

    let err = store.json_err(&["task", "parent", "set", &a.to_string(), &a.to_string()], 2);
    assert_eq!(err["error"]["field"], "parent");

    let err = store.json_err(&["task", "new", "Orphan", "--parent", "99"], 2);
    assert_eq!(err["error"]["field"], "parent");

    // A rejected create does not consume an id.
    let next = store.new_task("Next", &[]);
    assert_eq!(next, a + 1);
}

#[test]
fn show_reports_ancestors_and_children() {
    let store = TestStore::init();
    let root = store.new_task("Root", &[]);
    let mid = store.new_task("Mid", &["--parent", &root.to_string()]);
    let leaf = store.new_task("Leaf", &["--parent", &mid.to_string()]);

    let shown = store.json(&["task", "show", &mid.to_string()]);
    assert_eq!(shown["data"]["ancestors"], serde_json::json!([root]));
    assert_eq!(shown["data"]["children"], serde_json::json!([leaf]));

    let cleared = store.json(&["task", "parent", "clear", &mid.to_string()]);
    assert_eq!(cleared["command"], "task parent clear");
    assert_eq!(cleared["data"]["previous"], root);
}

#[test]
fn in_progress_task_cannot_be_deleted() {
    let store = TestStore::init();
    let id = store.new_task("Busy", &["--status", "En cours"]);

    let err = store.json_err(&["task", "delete", &id.to_string()], 3);
    assert_eq!(err["error"]["kind"], "conflict");

    store.json(&["task", "edit", &id.to_string(), "--status", "done"]);
    let deleted = store.json(&["task", "delete", &id.to_string()]);
    assert_eq!(deleted["data"]["id"], id);
    store.json_err(&["task", "show", &id.to_string()], 2);
}

#[test]
fn delete_detaches_children_and_drops_links() {
    let store = TestStore::init();
    let parent = store.new_task("Parent", &[]);
    let child = store.new_task("Child", &["--parent", &parent.to_string()]);
    let other = store.new_task("Other", &[]);
    store.json(&["relation", "add", &parent.to_string(), "blocks", &other.to_string()]);

    let deleted = store.json(&["task", "delete", &parent.to_string()]);
    assert_eq!(deleted["data"]["detached_children"], serde_json::json!([child]));
    assert_eq!(deleted["data"]["removed_relations"], 1);

    let relations = store.json(&["relation", "list"]);
    assert_eq!(relations["data"]["total"], 0);
}

#[test]
fn invalid_status_and_title_are_field_errors() {
    let store = TestStore::init();
    let err = store.json_err(&["task", "new", "X", "--status", "Blocked"], 2);
    assert_eq!(err["error"]["field"], "status");

    let err = store.json_err(&["task", "new", "   "], 2);
    assert_eq!(err["error"]["field"], "title");

    let long = "x".repeat(201);
    let err = store.json_err(&["task", "new", &long], 2);
    assert_eq!(err["error"]["field"], "title");

    let err = store.json_err(&["task", "new", "X", "--progress", "101"], 2);
    assert_eq!(err["error"]["field"], "progress");

    let err = store.json_err(&["task", "new", "X", "--due-date", "2024-13-01"], 2);
    assert_eq!(err["error"]["field"], "due_date");
}

#[test]
fn list_filters_and_orders_tasks() {
    let store = TestStore::init();
    store.json(&["project", "new", "Web"]);
    store.new_task("Login page", &["--project", "Web", "--module", "auth"]);
    store.new_task("Fix crash", &["--status", "done"]);
    store.new_task("Logout", &["--project", "Web"]);

    let web = store.json(&["task", "list", "--project", "web"]);
    assert_eq!(web["data"]["total"], 2);

    let searched = store.json(&["task", "list", "--search", "log", "--ordering", "-title"]);
    let titles: Vec<&str> = searched["data"]["tasks"]
        .as_array()
        .expect("tasks")
        .iter()
        .map(|t| t["title"].as_str().expect("title"))
        .collect();
    assert_eq!(titles, vec!["Logout", "Login page"]);

    let done = store.json(&["task", "list", "--status", "Fait"]);
    assert_eq!(done["data"]["tasks"][0]["title"], "Fix crash");

    let limited = store.json(&["task", "list", "--limit", "1"]);
    assert_eq!(limited["data"]["total"], 1);
}
