//! CoreTask Core Library
//!
//! This crate provides the storage side of CoreTask, including:
//! - Namespaced key/value persistence (SQLite)
//! - Collection storage engine (users, projects, tasks, webhooks)
//! - Activity log with capped history
//! - Session and authorization gate
//! - Statistics, export/import/reset
//! - Configs and integration settings

pub mod error;
pub mod models;
pub mod session;
pub mod storage;
pub mod validate;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        ActivityAction, ActivityLog, Audit, EntityKind, NewActivity, NewProject, NewTask,
        NewUser, NewWebhook, Priority, Project, ProjectPatch, ProjectStatus, Task, TaskFilter,
        TaskKind, TaskPatch, TaskStatus, User, UserPatch, UserRole, UserStatus, Webhook,
        WebhookPatch,
    };
    pub use crate::session::Session;
    pub use crate::storage::{Snapshot, Stats, Storage};
}
