//! Storage layer for taskflow
//!
//! All state lives under the store directory at the project root:
//!
//! ```text
//! .taskflow.toml               # Optional configuration
//! .taskflow/                   # Store directory (store.dir)
//!   db.json                    # The dataset (tasks, needs, users, ...)
//!   db.lock                    # Exclusive lock guarding db.json
//!   actor                      # Persisted actor identity
//!   attachments/<task>/        # Files uploaded onto tasks
//!   commits/                   # Snapshot files (commits.dir)
//!     commit_<ts>_<hex>_<name>.json
//! ```
//!
//! Every read and write of `db.json` happens while holding `db.lock`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::{Config, CONFIG_FILE};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::lock::{self, FileLock};

/// Dataset file name inside the store directory
pub const DATASET_FILE: &str = "db.json";

/// Lock file name inside the store directory
pub const LOCK_FILE: &str = "db.lock";

const ACTOR_FILE: &str = "actor";

/// Attachment directory inside the store directory
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Storage manager for one taskflow root
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    config: Config,
}

impl Storage {
    pub fn new(root: PathBuf, config: Config) -> Self {
        Self { root, config }
    }

    /// Open the store at `root`, reading `.taskflow.toml` when present
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = Config::load_from_root(&root)?;
        Ok(Self::new(root, config))
    }

    /// Find the root for `start`: the nearest ancestor holding a config file
    /// or a store directory, else `start` itself.
    pub fn discover_root(start: &Path) -> PathBuf {
        for dir in start.ancestors() {
            if dir.join(CONFIG_FILE).is_file() {
                return dir.to_path_buf();
            }
            if Config::default().store_dir(dir).join(DATASET_FILE).is_file() {
                return dir.to_path_buf();
            }
        }
        start.to_path_buf()
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path to the store directory
    pub fn store_dir(&self) -> PathBuf {
        self.config.store_dir(&self.root)
    }

    pub fn dataset_file(&self) -> PathBuf {
        self.store_dir().join(DATASET_FILE)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.store_dir().join(LOCK_FILE)
    }

    /// Path to the commit snapshot directory
    pub fn commits_dir(&self) -> PathBuf {
        self.store_dir().join(&self.config.commits.dir)
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.store_dir().join(ATTACHMENTS_DIR)
    }

    pub fn actor_file(&self) -> PathBuf {
        self.store_dir().join(ACTOR_FILE)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Create the store directory and a seeded dataset.
    ///
    /// Returns `false` when the store already existed (nothing is overwritten).
    pub fn init(&self) -> Result<bool> {
        fs::create_dir_all(self.store_dir())?;
        fs::create_dir_all(self.commits_dir())?;

        let _lock = self.lock()?;
        if self.dataset_file().exists() {
            return Ok(false);
        }
        self.write_json(&self.dataset_file(), &Dataset::seeded())?;
        tracing::info!(root = %self.root.display(), "store initialized");
        Ok(true)
    }

    pub fn is_initialized(&self) -> bool {
        self.dataset_file().is_file()
    }

    // =========================================================================
    // Dataset access (locked)
    // =========================================================================

    fn lock(&self) -> Result<FileLock> {
        FileLock::acquire(self.lock_file(), self.config.store.lock_timeout_ms)
    }

    fn load_unlocked(&self) -> Result<Dataset> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized(self.root.clone()));
        }
        self.read_json(&self.dataset_file())
    }

    /// Consistent read of the dataset
    pub fn read(&self) -> Result<Dataset> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized(self.root.clone()));
        }
        let _lock = self.lock()?;
        self.load_unlocked()
    }

    /// Run `f` against the dataset inside one locked transaction.
    ///
    /// The dataset is loaded under the lock, mutated by `f`, validated, then
    /// written atomically. When `f` or validation fails nothing is written.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Dataset) -> Result<T>,
    {
        if !self.is_initialized() {
            return Err(Error::NotInitialized(self.root.clone()));
        }
        let _lock = self.lock()?;
        let mut dataset = self.load_unlocked()?;

        let result = match f(&mut dataset) {
            Ok(result) => result,
            Err(err) => {
                tracing::debug!(error = %err, "transaction rolled back");
                return Err(err);
            }
        };
        dataset.validate(&self.config.tasks)?;
        dataset.updated_at = Utc::now();

        self.write_json(&self.dataset_file(), &dataset)?;
        tracing::trace!(path = %self.dataset_file().display(), "transaction committed");
        Ok(result)
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write JSON atomically (temp file, then rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    // =========================================================================
    // Actor persistence
    // =========================================================================

    /// Read the persisted actor identity
    pub fn read_actor(&self) -> Option<String> {
        fs::read_to_string(self.actor_file())
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|actor| !actor.is_empty())
    }

    /// Persist the actor identity
    pub fn write_actor(&self, actor: &str) -> Result<()> {
        fs::create_dir_all(self.store_dir())?;
        lock::write_atomic(self.actor_file(), format!("{actor}\n").as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{self, TaskDraft};
    use tempfile::TempDir;

    fn init_store() -> (TempDir, Storage) {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path()).expect("open storage");
        assert!(storage.init().unwrap());
        (temp, storage)
    }

    #[test]
    fn test_storage_paths() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let storage = Storage::open(&root).expect("open storage");

        assert_eq!(storage.store_dir(), root.join(".taskflow"));
        assert_eq!(storage.dataset_file(), root.join(".taskflow/db.json"));
        assert_eq!(storage.lock_file(), root.join(".taskflow/db.lock"));
        assert_eq!(storage.commits_dir(), root.join(".taskflow/commits"));
    }

    #[test]
    fn test_init_is_idempotent() {
        let (_temp, storage) = init_store();
        assert!(!storage.init().unwrap());
        let dataset = storage.read().unwrap();
        assert_eq!(dataset.task_types.len(), 5);
        assert!(storage.commits_dir().is_dir());
    }

    #[test]
    fn test_uninitialized_store_is_reported() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path()).expect("open storage");
        assert!(matches!(storage.read(), Err(Error::NotInitialized(_))));
        assert!(matches!(
            storage.transaction(|_| Ok(())),
            Err(Error::NotInitialized(_))
        ));
    }

    #[test]
    fn test_failed_transaction_leaves_file_untouched() {
        let (_temp, storage) = init_store();
        let before = fs::read(storage.dataset_file()).unwrap();

        let result: Result<()> = storage.transaction(|dataset| {
            task::create(
                dataset,
                TaskDraft {
                    title: "Doomed".into(),
                    ..Default::default()
                },
                None,
                &storage.config().tasks,
            )?;
            Err(Error::OperationFailed("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(fs::read(storage.dataset_file()).unwrap(), before);
    }

    #[test]
    fn test_invalid_dataset_is_not_written() {
        let (_temp, storage) = init_store();
        let result = storage.transaction(|dataset| {
            let mut orphan = task::TaskRecord::bare(1, "Orphan", "task");
            orphan.parent = Some(1);
            dataset.tasks.insert(1, orphan);
            Ok(())
        });
        assert!(result.is_err());
        assert!(storage.read().unwrap().tasks.is_empty());
    }

    #[test]
    fn test_transaction_persists_changes() {
        let (_temp, storage) = init_store();
        let id = storage
            .transaction(|dataset| {
                let task = task::create(
                    dataset,
                    TaskDraft {
                        title: "Kept".into(),
                        ..Default::default()
                    },
                    Some("alice"),
                    &storage.config().tasks,
                )?;
                Ok(task.id)
            })
            .unwrap();
        let dataset = storage.read().unwrap();
        assert_eq!(dataset.tasks[&id].title, "Kept");
        assert!(dataset.users.contains_key("alice"));
    }

    #[test]
    fn test_actor_persistence() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path()).expect("open storage");
        assert!(storage.read_actor().is_none());
        storage.write_actor("agent1").unwrap();
        assert_eq!(storage.read_actor().as_deref(), Some("agent1"));
    }

    #[test]
    fn test_discover_root_walks_up() {
        let (temp, _storage) = init_store();
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(Storage::discover_root(&nested), temp.path());
    }

    #[test]
    fn test_custom_store_dir_from_config() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "[store]\ndir = \"state\"\n[commits]\ndir = \"snaps\"\n",
        )
        .unwrap();
        let storage = Storage::open(temp.path()).expect("open storage");
        assert_eq!(storage.commits_dir(), temp.path().join("state/snaps"));
    }
}
