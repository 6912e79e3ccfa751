//! taskflow - task and need tracker library
//!
//! This library provides the core functionality for the taskflow CLI tool:
//! a local, file-backed tracker of hierarchical tasks and the needs they
//! come from.
//!
//! # Core Concepts
//!
//! - **Tasks**: typed work items forming an acyclic parent hierarchy
//! - **Relations**: typed links between two tasks (blocks, depends, relates)
//! - **Needs**: requests that convert exactly once into a task
//! - **Commits**: JSON snapshots of the dataset that can be re-activated
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskflow.toml`
//! - `error`: Error types and result aliases
//! - `storage`: Dataset file, transactions and store layout
//! - `lock`: File locking and atomic writes
//! - `dataset`: In-memory dataset and whole-dataset invariants
//! - `hierarchy`: Parent/child checks over tasks
//! - `task`, `relation`, `need`, `message`, `project`, `user`: record operations
//! - `commit`: Snapshot create, list and activate
//! - `views`: Kanban, gantt and filter aggregations
//! - `attachment`: Files uploaded onto tasks
//! - `actor`: Actor identity management
//! - `output`: Human and JSON output

pub mod actor;
pub mod attachment;
pub mod cli;
pub mod commit;
pub mod config;
pub mod dataset;
pub mod error;
pub mod hierarchy;
pub mod lock;
pub mod message;
pub mod need;
pub mod output;
pub mod project;
pub mod relation;
pub mod storage;
pub mod task;
pub mod user;
pub mod views;

pub use error::{Error, Result};
