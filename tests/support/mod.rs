#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    /// A temp root with `taskflow init` already run.
    pub fn init() -> Self {
        let store = Self::empty();
        store.cmd().arg("init").assert().success();
        store
    }

    /// A temp root without a store.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_dir(&self) -> PathBuf {
        self.dir.path().join(".taskflow")
    }

    pub fn commits_dir(&self) -> PathBuf {
        self.store_dir().join("commits")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = taskflow_cmd();
        cmd.arg("--root").arg(self.path());
        cmd
    }

    /// Run a command with `--json` and return the parsed envelope, asserting success.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    /// Run a command with `--json`, asserting the given exit code, and return the error envelope.
    pub fn json_err(&self, args: &[&str], code: i32) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .code(code)
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json error envelope")
    }

    pub fn new_task(&self, title: &str, extra: &[&str]) -> u64 {
        let mut args = vec!["task", "new", title];
        args.extend_from_slice(extra);
        let value = self.json(&args);
        value["data"]["id"].as_u64().expect("task id")
    }

    pub fn new_need(&self, title: &str, extra: &[&str]) -> u64 {
        let mut args = vec!["need", "new", title];
        args.extend_from_slice(extra);
        let value = self.json(&args);
        value["data"]["id"].as_u64().expect("need id")
    }

    pub fn read_dataset(&self) -> Value {
        let raw = fs::read_to_string(self.store_dir().join("db.json")).expect("read db.json");
        serde_json::from_str(&raw).expect("parse db.json")
    }
}

pub fn taskflow_cmd() -> Command {
    let mut cmd = Command::cargo_bin("taskflow").expect("taskflow binary");
    cmd.env_remove("TASKFLOW_ROOT")
        .env_remove("TASKFLOW_ACTOR")
        .env_remove("RUST_LOG");
    cmd
}
