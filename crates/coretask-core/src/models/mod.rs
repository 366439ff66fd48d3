//! Entity types for the CoreTask collections

pub mod activity;
pub mod project;
pub mod task;
pub mod user;
pub mod webhook;

pub use activity::{
    ActivityAction, ActivityLog, Audit, EntityKind, IntegrationSource, NewActivity,
};
pub use project::{NewProject, Project, ProjectPatch, ProjectStatus};
pub use task::{Comment, NewTask, Task, TaskFilter, TaskKind, TaskPatch, TaskStatus};
pub use user::{NewUser, User, UserPatch, UserRole, UserStatus};
pub use webhook::{NewWebhook, Webhook, WebhookPatch};

use serde::{Deserialize, Serialize};

/// Priority scale shared by projects and tasks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];
}
