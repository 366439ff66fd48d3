//! Aggregate statistics over the stored collections
//!
//! Every call scans the collections fresh; nothing here is cached or kept in
//! sync incrementally.

use serde::Serialize;

use crate::error::Result;
use crate::models::{ActivityLog, Priority, TaskStatus, UserRole};

use super::engine::Storage;

/// Dashboard snapshot of collection sizes and breakdowns.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub counts: Counts,
    pub tasks_by_status: TasksByStatus,
    pub tasks_by_priority: TasksByPriority,
    pub users_by_role: UsersByRole,
    pub recent_activity: Vec<ActivityLog>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Counts {
    pub users: usize,
    pub projects: usize,
    pub tasks: usize,
    pub logs: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TasksByStatus {
    pub todo: usize,
    pub in_progress: usize,
    pub review: usize,
    pub done: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TasksByPriority {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UsersByRole {
    pub admin: usize,
    pub manager: usize,
    pub user: usize,
}

/// Per-user task completion rollup.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserActivitySummary {
    pub user_id: u64,
    pub name: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Rounded percent; 0 when the user has no tasks.
    pub completion_rate: u32,
}

/// Per-project completion rollup.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProgress {
    pub project_id: u64,
    pub name: String,
    pub key: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Rounded percent; 0 when the project has no tasks.
    pub progress: u32,
}

fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

impl Storage {
    pub fn stats(&self) -> Result<Stats> {
        let users = self.users()?;
        let projects = self.projects()?;
        let tasks = self.tasks()?;
        let logs = self.activity_logs()?;

        let mut by_status = TasksByStatus::default();
        let mut by_priority = TasksByPriority::default();
        for task in &tasks {
            match task.status {
                TaskStatus::Todo => by_status.todo += 1,
                TaskStatus::InProgress => by_status.in_progress += 1,
                TaskStatus::Review => by_status.review += 1,
                TaskStatus::Done => by_status.done += 1,
            }
            match task.priority {
                Priority::Low => by_priority.low += 1,
                Priority::Medium => by_priority.medium += 1,
                Priority::High => by_priority.high += 1,
                Priority::Critical => by_priority.critical += 1,
            }
        }

        let mut by_role = UsersByRole::default();
        for user in &users {
            match user.role {
                UserRole::Admin => by_role.admin += 1,
                UserRole::Manager => by_role.manager += 1,
                UserRole::User => by_role.user += 1,
            }
        }

        Ok(Stats {
            counts: Counts {
                users: users.len(),
                projects: projects.len(),
                tasks: tasks.len(),
                logs: logs.len(),
            },
            tasks_by_status: by_status,
            tasks_by_priority: by_priority,
            users_by_role: by_role,
            recent_activity: logs.into_iter().take(10).collect(),
        })
    }

    /// Task totals and completion rate per user, keyed by assignment.
    pub fn user_activity_summary(&self) -> Result<Vec<UserActivitySummary>> {
        let tasks = self.tasks()?;
        Ok(self
            .users()?
            .into_iter()
            .map(|user| {
                let assigned: Vec<_> = tasks
                    .iter()
                    .filter(|t| t.assignee_id == Some(user.id))
                    .collect();
                let completed = assigned
                    .iter()
                    .filter(|t| t.status == TaskStatus::Done)
                    .count();
                UserActivitySummary {
                    user_id: user.id,
                    name: user.name,
                    total_tasks: assigned.len(),
                    completed_tasks: completed,
                    completion_rate: percent(completed, assigned.len()),
                }
            })
            .collect())
    }

    pub fn project_progress(&self) -> Result<Vec<ProjectProgress>> {
        let tasks = self.tasks()?;
        Ok(self
            .projects()?
            .into_iter()
            .map(|project| {
                let in_project: Vec<_> = tasks
                    .iter()
                    .filter(|t| t.project_id == Some(project.id))
                    .collect();
                let completed = in_project
                    .iter()
                    .filter(|t| t.status == TaskStatus::Done)
                    .count();
                ProjectProgress {
                    project_id: project.id,
                    name: project.name,
                    key: project.key,
                    total_tasks: in_project.len(),
                    completed_tasks: completed,
                    progress: percent(completed, in_project.len()),
                }
            })
            .collect())
    }
}
