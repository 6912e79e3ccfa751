//! Command-line interface for taskflow
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::actor;
use crate::error::{Error, Result};
use crate::output::OutputOptions;
use crate::storage::Storage;

mod actor_cmd;
mod commit;
mod init;
mod message;
mod need;
mod project;
mod relation;
mod task;
mod user;
mod view;

/// taskflow - task and need tracker
///
/// Hierarchical tasks, typed links between tasks, needs that convert into
/// tasks, and JSON commit snapshots of the whole dataset.
#[derive(Parser, Debug)]
#[command(name = "taskflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root holding .taskflow/ (defaults to discovery from the current directory)
    #[arg(long, global = true, env = "TASKFLOW_ROOT")]
    pub root: Option<PathBuf>,

    /// Actor identity recorded on writes
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the store and a default .taskflow.toml
    Init,

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Task types
    #[command(subcommand)]
    Type(TypeCommands),

    /// Projects
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Typed links between tasks
    #[command(subcommand)]
    Relation(RelationCommands),

    /// Needs and their conversion into tasks
    #[command(subcommand)]
    Need(NeedCommands),

    /// Threaded messages on tasks and needs
    #[command(subcommand)]
    Message(MessageCommands),

    /// Aggregated views
    #[command(subcommand)]
    View(ViewCommands),

    /// Users
    #[command(subcommand)]
    User(UserCommands),

    /// Actor identity
    #[command(subcommand)]
    Actor(ActorCommands),

    /// Commit snapshots
    #[command(subcommand)]
    Commit(CommitCommands),
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    New {
        /// Task title
        title: String,

        /// Status: "A faire", "En cours", "Fait" (or todo, in_progress, done)
        #[arg(long)]
        status: Option<String>,

        /// Task type code (defaults to tasks.default_type)
        #[arg(long = "type")]
        task_type: Option<String>,

        /// Parent task id
        #[arg(long)]
        parent: Option<u64>,

        /// Project id or name
        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        target_version: Option<String>,

        #[arg(long)]
        module: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due_date: Option<String>,

        /// Progress, 0 to 100
        #[arg(long)]
        progress: Option<u8>,

        /// Initial message attached to the task
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List tasks
    List {
        /// Search title, status and type
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long = "type")]
        task_type: Option<String>,

        #[arg(long)]
        parent: Option<u64>,

        /// Project id or name
        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        module: Option<String>,

        #[arg(long)]
        target_version: Option<String>,

        /// Ordering: id, created_at, title, task_type__order; prefix with - for descending
        #[arg(long, allow_hyphen_values = true)]
        ordering: Option<String>,

        /// Maximum number of tasks to show
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show a task with its hierarchy and links
    Show {
        id: u64,
    },

    /// Edit a task (an empty value clears an optional field)
    Edit {
        id: u64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long = "type")]
        task_type: Option<String>,

        /// Owner username
        #[arg(long)]
        owner: Option<String>,

        /// Project id or name
        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        target_version: Option<String>,

        #[arg(long)]
        module: Option<String>,

        #[arg(long)]
        start_date: Option<String>,

        #[arg(long)]
        due_date: Option<String>,

        #[arg(long)]
        progress: Option<u8>,
    },

    /// Delete a task (refused while it is in progress)
    Delete {
        id: u64,
    },

    /// Parent management
    #[command(subcommand)]
    Parent(ParentCommands),

    /// Upload a file onto a task
    Attach {
        id: u64,
        /// File to copy into the store
        path: PathBuf,
    },

    /// List files attached to a task
    Attachments {
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ParentCommands {
    /// Set the parent of a task
    Set {
        /// Child task id
        child: u64,
        /// Parent task id
        parent: u64,
    },

    /// Detach a task from its parent
    Clear {
        child: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum TypeCommands {
    /// List task types in display order
    List,

    /// Add a task type
    Add {
        code: String,
        label: String,

        #[arg(long)]
        description: Option<String>,

        /// Sort position (defaults to after the last type)
        #[arg(long)]
        order: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    New {
        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// List projects
    List,

    /// Delete a project; its tasks keep existing without a project
    Delete {
        /// Project id or name
        project: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RelationCommands {
    /// Link two tasks
    Add {
        /// Source task id
        src: u64,
        /// Link type: blocks, depends, relates
        link_type: String,
        /// Destination task id
        dst: u64,
    },

    /// List links
    List {
        #[arg(long = "type")]
        link_type: Option<String>,

        #[arg(long)]
        src: Option<u64>,

        #[arg(long)]
        dst: Option<u64>,
    },

    /// Delete a link
    Delete {
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum NeedCommands {
    /// Record a need
    New {
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Initial message attached to the need
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List needs
    List {
        /// Only converted needs
        #[arg(long, conflicts_with = "open")]
        converted: bool,

        /// Only needs not converted yet
        #[arg(long)]
        open: bool,
    },

    /// Show a need and its messages
    Show {
        id: u64,
    },

    /// Convert a need into a task
    Convert {
        id: u64,
    },

    /// Convert several needs (all when no id is given), skipping converted ones
    ConvertAll {
        ids: Vec<u64>,
    },

    /// Delete a need (staff only)
    Delete {
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum MessageCommands {
    /// Post a message on a task or a need
    New {
        content: String,

        #[arg(long, required_unless_present = "need")]
        task: Option<u64>,

        #[arg(long)]
        need: Option<u64>,
    },

    /// List messages, newest first
    List {
        #[arg(long)]
        task: Option<u64>,

        #[arg(long)]
        need: Option<u64>,
    },

    /// Reply to a message
    Reply {
        /// Message id to answer
        parent: u64,
        content: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ViewCommands {
    /// Tasks grouped by status
    Kanban,
    /// Tasks grouped by project with planning dates
    Gantt,
    /// Values available for task filters
    Filters,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a user
    Add {
        username: String,

        #[arg(long)]
        email: Option<String>,

        /// Grant staff rights
        #[arg(long)]
        staff: bool,
    },

    /// List users
    List,
}

#[derive(Subcommand, Debug)]
pub enum ActorCommands {
    /// Persist the actor identity for this root
    Set {
        name: String,
    },

    /// Show the resolved actor identity
    Show,
}

#[derive(Subcommand, Debug)]
pub enum CommitCommands {
    /// Snapshot tasks, needs and users into a commit file
    New {
        /// Commit name
        #[arg(default_value = "")]
        name: String,
    },

    /// List commits, newest first
    List,

    /// Print the raw content of a commit
    Show {
        name: String,
    },

    /// Restore the store from a commit (tasks and needs missing from it are deleted)
    Activate {
        name: String,
    },

    /// Show the active commit
    Active,
}

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct Globals {
    pub root: Option<PathBuf>,
    pub actor: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl Globals {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    fn resolve_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => Ok(Storage::discover_root(&std::env::current_dir()?)),
        }
    }
}

/// Resolved store and identity for one command
pub(crate) struct CommandContext {
    pub storage: Storage,
    pub actor: String,
    pub output: OutputOptions,
}

impl CommandContext {
    /// The acting username, `None` when anonymous
    pub fn user(&self) -> Option<&str> {
        actor::as_user(&self.actor)
    }
}

pub(crate) fn load_context(globals: &Globals) -> Result<CommandContext> {
    let root = globals.resolve_root()?;
    let storage = Storage::open(root)?;
    if !storage.is_initialized() {
        return Err(Error::NotInitialized(storage.root().to_path_buf()));
    }
    let actor = actor::resolve_actor(&storage, globals.actor.as_deref());
    Ok(CommandContext {
        storage,
        actor,
        output: globals.output(),
    })
}

impl Cli {
    fn globals(&self) -> Globals {
        Globals {
            root: self.root.clone(),
            actor: self.actor.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = self.globals();
        match self.command {
            Commands::Init => init::run(&globals),
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    title,
                    status,
                    task_type,
                    parent,
                    project,
                    priority,
                    target_version,
                    module,
                    start_date,
                    due_date,
                    progress,
                    message,
                } => task::run_new(
                    &globals,
                    task::NewOptions {
                        title,
                        status,
                        task_type,
                        parent,
                        project,
                        priority,
                        target_version,
                        module,
                        start_date,
                        due_date,
                        progress,
                        message,
                    },
                ),
                TaskCommands::List {
                    search,
                    status,
                    task_type,
                    parent,
                    project,
                    priority,
                    module,
                    target_version,
                    ordering,
                    limit,
                } => task::run_list(
                    &globals,
                    task::ListOptions {
                        search,
                        status,
                        task_type,
                        parent,
                        project,
                        priority,
                        module,
                        target_version,
                        ordering,
                        limit,
                    },
                ),
                TaskCommands::Show { id } => task::run_show(&globals, id),
                TaskCommands::Edit {
                    id,
                    title,
                    status,
                    task_type,
                    owner,
                    project,
                    priority,
                    target_version,
                    module,
                    start_date,
                    due_date,
                    progress,
                } => task::run_edit(
                    &globals,
                    task::EditOptions {
                        id,
                        title,
                        status,
                        task_type,
                        owner,
                        project,
                        priority,
                        target_version,
                        module,
                        start_date,
                        due_date,
                        progress,
                    },
                ),
                TaskCommands::Delete { id } => task::run_delete(&globals, id),
                TaskCommands::Parent(ParentCommands::Set { child, parent }) => {
                    task::run_parent_set(&globals, child, Some(parent))
                }
                TaskCommands::Parent(ParentCommands::Clear { child }) => {
                    task::run_parent_set(&globals, child, None)
                }
                TaskCommands::Attach { id, path } => task::run_attach(&globals, id, &path),
                TaskCommands::Attachments { id } => task::run_attachments(&globals, id),
            },
            Commands::Type(cmd) => match cmd {
                TypeCommands::List => task::run_type_list(&globals),
                TypeCommands::Add {
                    code,
                    label,
                    description,
                    order,
                } => task::run_type_add(&globals, &code, &label, description, order),
            },
            Commands::Project(cmd) => match cmd {
                ProjectCommands::New { name, description } => {
                    project::run_new(&globals, &name, description)
                }
                ProjectCommands::List => project::run_list(&globals),
                ProjectCommands::Delete { project } => project::run_delete(&globals, &project),
            },
            Commands::Relation(cmd) => match cmd {
                RelationCommands::Add {
                    src,
                    link_type,
                    dst,
                } => relation::run_add(&globals, src, &link_type, dst),
                RelationCommands::List {
                    link_type,
                    src,
                    dst,
                } => relation::run_list(&globals, link_type.as_deref(), src, dst),
                RelationCommands::Delete { id } => relation::run_delete(&globals, id),
            },
            Commands::Need(cmd) => match cmd {
                NeedCommands::New {
                    title,
                    description,
                    message,
                } => need::run_new(&globals, title, description, message),
                NeedCommands::List { converted, open } => {
                    let filter = match (converted, open) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    };
                    need::run_list(&globals, filter)
                }
                NeedCommands::Show { id } => need::run_show(&globals, id),
                NeedCommands::Convert { id } => need::run_convert(&globals, id),
                NeedCommands::ConvertAll { ids } => need::run_convert_all(&globals, ids),
                NeedCommands::Delete { id } => need::run_delete(&globals, id),
            },
            Commands::Message(cmd) => match cmd {
                MessageCommands::New {
                    content,
                    task,
                    need,
                } => message::run_new(&globals, content, task, need),
                MessageCommands::List { task, need } => message::run_list(&globals, task, need),
                MessageCommands::Reply { parent, content } => {
                    message::run_reply(&globals, parent, &content)
                }
            },
            Commands::View(cmd) => match cmd {
                ViewCommands::Kanban => view::run_kanban(&globals),
                ViewCommands::Gantt => view::run_gantt(&globals),
                ViewCommands::Filters => view::run_filters(&globals),
            },
            Commands::User(cmd) => match cmd {
                UserCommands::Add {
                    username,
                    email,
                    staff,
                } => user::run_add(&globals, &username, email, staff),
                UserCommands::List => user::run_list(&globals),
            },
            Commands::Actor(cmd) => match cmd {
                ActorCommands::Set { name } => actor_cmd::run_set(&globals, &name),
                ActorCommands::Show => actor_cmd::run_show(&globals),
            },
            Commands::Commit(cmd) => match cmd {
                CommitCommands::New { name } => commit::run_new(&globals, &name),
                CommitCommands::List => commit::run_list(&globals),
                CommitCommands::Show { name } => commit::run_show(&globals, &name),
                CommitCommands::Activate { name } => commit::run_activate(&globals, &name),
                CommitCommands::Active => commit::run_active(&globals),
            },
        }
    }
}
