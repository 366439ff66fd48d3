//! Task collection operations

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::models::{
    ActivityAction, Audit, Comment, EntityKind, NewTask, Task, TaskFilter, TaskPatch,
};

use super::activity;
use super::engine::{KEY_TASKS, Storage, collection, max_id, next_id, save_collection};

impl Storage {
    /// All tasks in insertion order.
    pub fn tasks(&self) -> Result<Vec<Task>> {
        collection(&self.kv.view(), KEY_TASKS)
    }

    pub fn task(&self, id: u64) -> Result<Option<Task>> {
        Ok(self.tasks()?.into_iter().find(|t| t.id == id))
    }

    pub fn tasks_by_project(&self, project_id: u64) -> Result<Vec<Task>> {
        Ok(self
            .tasks()?
            .into_iter()
            .filter(|t| t.project_id == Some(project_id))
            .collect())
    }

    pub fn tasks_by_assignee(&self, assignee_id: u64) -> Result<Vec<Task>> {
        Ok(self
            .tasks()?
            .into_iter()
            .filter(|t| t.assignee_id == Some(assignee_id))
            .collect())
    }

    /// Case-insensitive substring match over title, description and tags.
    pub fn search_tasks(&self, query: &str) -> Result<Vec<Task>> {
        let needle = query.to_lowercase();
        Ok(self
            .tasks()?
            .into_iter()
            .filter(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
                    || t.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// Exact-match conjunction over the provided criteria; `overdue` adds the
    /// derived past-due-and-not-done predicate.
    pub fn filter_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let today = Utc::now().date_naive();
        Ok(self
            .tasks()?
            .into_iter()
            .filter(|t| {
                filter.status.is_none_or(|s| t.status == s)
                    && filter.priority.is_none_or(|p| t.priority == p)
                    && filter.assignee_id.is_none_or(|a| t.assignee_id == Some(a))
                    && filter.project_id.is_none_or(|p| t.project_id == Some(p))
                    && filter.kind.is_none_or(|k| t.kind == k)
                    && (!filter.overdue || t.is_overdue(today))
            })
            .collect())
    }

    pub fn create_task(&mut self, input: NewTask, audit: Option<&Audit>) -> Result<Task> {
        let task = self.kv.transaction(|kv| {
            let mut tasks: Vec<Task> = collection(kv, KEY_TASKS)?;
            let id = next_id(kv, KEY_TASKS, max_id(&tasks, |t| t.id))?;
            let task = build_task(id, input);
            tasks.push(task.clone());
            save_collection(kv, KEY_TASKS, &tasks)?;
            if let Some(audit) = audit {
                activity::record(kv, audit, ActivityAction::Created, EntityKind::Task, Some(id))?;
            }
            Ok(task)
        })?;
        info!(task_id = task.id, title = %task.title, "task created");
        Ok(task)
    }

    /// Shallow merge: only `Some` fields are applied, `updated_at` is always
    /// refreshed, everything else is preserved as stored.
    pub fn update_task(
        &mut self,
        id: u64,
        patch: TaskPatch,
        audit: Option<&Audit>,
    ) -> Result<Option<Task>> {
        self.kv.transaction(|kv| {
            let mut tasks: Vec<Task> = collection(kv, KEY_TASKS)?;
            let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
                return Ok(None);
            };
            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(description) = patch.description {
                task.description = description;
            }
            if let Some(project_id) = patch.project_id {
                task.project_id = Some(project_id);
            }
            if let Some(assignee_id) = patch.assignee_id {
                task.assignee_id = Some(assignee_id);
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(kind) = patch.kind {
                task.kind = kind;
            }
            if let Some(status) = patch.status {
                task.status = status;
            }
            if let Some(due_date) = patch.due_date {
                task.due_date = Some(due_date);
            }
            if let Some(estimated_hours) = patch.estimated_hours {
                task.estimated_hours = Some(estimated_hours);
            }
            if let Some(tags) = patch.tags {
                task.tags = tags;
            }
            if let Some(attachments) = patch.attachments {
                task.attachments = attachments;
            }
            if let Some(custom_fields) = patch.custom_fields {
                task.custom_fields = custom_fields;
            }
            task.updated_at = Utc::now();
            let updated = task.clone();
            save_collection(kv, KEY_TASKS, &tasks)?;
            if let Some(audit) = audit {
                activity::record(kv, audit, ActivityAction::Updated, EntityKind::Task, Some(id))?;
            }
            Ok(Some(updated))
        })
    }

    pub fn delete_task(&mut self, id: u64, audit: Option<&Audit>) -> Result<bool> {
        let removed = self.kv.transaction(|kv| {
            let tasks: Vec<Task> = collection(kv, KEY_TASKS)?;
            let before = tasks.len();
            let remaining: Vec<Task> = tasks.into_iter().filter(|t| t.id != id).collect();
            let removed = remaining.len() < before;
            if removed {
                save_collection(kv, KEY_TASKS, &remaining)?;
                if let Some(audit) = audit {
                    activity::record(
                        kv,
                        audit,
                        ActivityAction::Deleted,
                        EntityKind::Task,
                        Some(id),
                    )?;
                }
            }
            Ok(removed)
        })?;
        if removed {
            info!(task_id = id, "task deleted");
        }
        Ok(removed)
    }

    /// Append a comment to a task; comment ids are local to the task.
    pub fn add_comment(
        &mut self,
        task_id: u64,
        author: &str,
        text: &str,
        audit: Option<&Audit>,
    ) -> Result<Option<Task>> {
        self.kv.transaction(|kv| {
            let mut tasks: Vec<Task> = collection(kv, KEY_TASKS)?;
            let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) else {
                return Ok(None);
            };
            let next = task.comments.iter().map(|c| c.id).max().unwrap_or(0) + 1;
            task.comments.push(Comment {
                id: next,
                text: text.to_string(),
                author: author.to_string(),
                created_at: Utc::now(),
            });
            task.updated_at = Utc::now();
            let updated = task.clone();
            save_collection(kv, KEY_TASKS, &tasks)?;
            if let Some(audit) = audit {
                activity::record(
                    kv,
                    audit,
                    ActivityAction::Updated,
                    EntityKind::Task,
                    Some(task_id),
                )?;
            }
            Ok(Some(updated))
        })
    }
}

pub(crate) fn build_task(id: u64, input: NewTask) -> Task {
    let now = Utc::now();
    Task {
        id,
        title: input.title,
        description: input.description,
        project_id: input.project_id,
        assignee_id: input.assignee_id,
        created_by: input.created_by,
        priority: input.priority,
        kind: input.kind,
        status: input.status,
        due_date: input.due_date,
        estimated_hours: input.estimated_hours,
        tags: input.tags,
        attachments: input.attachments,
        custom_fields: input.custom_fields,
        comments: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}
