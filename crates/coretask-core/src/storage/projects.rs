//! Project collection operations
//!
//! Project keys are derived once from the name at creation and never change.
//! Deleting a project cascades to every task carrying its id, in the same
//! transaction.

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::models::{ActivityAction, Audit, EntityKind, NewProject, Project, ProjectPatch, Task};

use super::activity;
use super::engine::{
    KEY_PROJECTS, KEY_TASKS, Storage, collection, max_id, next_id, save_collection,
};

/// Maximum length of the derived project key before de-duplication counters.
const PROJECT_KEY_LEN: usize = 5;

impl Storage {
    /// All projects in insertion order.
    pub fn projects(&self) -> Result<Vec<Project>> {
        collection(&self.kv.view(), KEY_PROJECTS)
    }

    pub fn project(&self, id: u64) -> Result<Option<Project>> {
        Ok(self.projects()?.into_iter().find(|p| p.id == id))
    }

    /// Case-insensitive substring match over name, description and key.
    pub fn search_projects(&self, query: &str) -> Result<Vec<Project>> {
        let needle = query.to_lowercase();
        Ok(self
            .projects()?
            .into_iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
                    || p.key.to_lowercase().contains(&needle)
            })
            .collect())
    }

    pub fn create_project(&mut self, input: NewProject, audit: Option<&Audit>) -> Result<Project> {
        let project = self.kv.transaction(|kv| {
            let mut projects: Vec<Project> = collection(kv, KEY_PROJECTS)?;
            let key = generate_project_key(&input.name, &projects);
            let id = next_id(kv, KEY_PROJECTS, max_id(&projects, |p| p.id))?;
            let project = build_project(id, key, input);
            projects.push(project.clone());
            save_collection(kv, KEY_PROJECTS, &projects)?;
            if let Some(audit) = audit {
                activity::record(
                    kv,
                    audit,
                    ActivityAction::Created,
                    EntityKind::Project,
                    Some(id),
                )?;
            }
            Ok(project)
        })?;
        info!(project_id = project.id, key = %project.key, "project created");
        Ok(project)
    }

    /// Shallow merge; the derived key and creator are not patchable.
    pub fn update_project(
        &mut self,
        id: u64,
        patch: ProjectPatch,
        audit: Option<&Audit>,
    ) -> Result<Option<Project>> {
        self.kv.transaction(|kv| {
            let mut projects: Vec<Project> = collection(kv, KEY_PROJECTS)?;
            let Some(project) = projects.iter_mut().find(|p| p.id == id) else {
                return Ok(None);
            };
            if let Some(name) = patch.name {
                project.name = name;
            }
            if let Some(description) = patch.description {
                project.description = description;
            }
            if let Some(priority) = patch.priority {
                project.priority = priority;
            }
            if let Some(status) = patch.status {
                project.status = status;
            }
            if let Some(start_date) = patch.start_date {
                project.start_date = Some(start_date);
            }
            if let Some(end_date) = patch.end_date {
                project.end_date = Some(end_date);
            }
            project.updated_at = Utc::now();
            let updated = project.clone();
            save_collection(kv, KEY_PROJECTS, &projects)?;
            if let Some(audit) = audit {
                activity::record(
                    kv,
                    audit,
                    ActivityAction::Updated,
                    EntityKind::Project,
                    Some(id),
                )?;
            }
            Ok(Some(updated))
        })
    }

    /// Remove the project and every task that references it, atomically.
    pub fn delete_project(&mut self, id: u64, audit: Option<&Audit>) -> Result<bool> {
        let removed = self.kv.transaction(|kv| {
            let projects: Vec<Project> = collection(kv, KEY_PROJECTS)?;
            let before = projects.len();
            let remaining: Vec<Project> = projects.into_iter().filter(|p| p.id != id).collect();
            let removed = remaining.len() < before;
            if removed {
                save_collection(kv, KEY_PROJECTS, &remaining)?;

                let tasks: Vec<Task> = collection(kv, KEY_TASKS)?;
                let remaining_tasks: Vec<Task> = tasks
                    .into_iter()
                    .filter(|t| t.project_id != Some(id))
                    .collect();
                save_collection(kv, KEY_TASKS, &remaining_tasks)?;

                if let Some(audit) = audit {
                    activity::record(
                        kv,
                        audit,
                        ActivityAction::Deleted,
                        EntityKind::Project,
                        Some(id),
                    )?;
                }
            }
            Ok(removed)
        })?;
        if removed {
            info!(project_id = id, "project and its tasks deleted");
        }
        Ok(removed)
    }
}

/// Uppercase the name, strip non-alphanumerics, truncate, then append an
/// incrementing counter until the key is unique among existing projects.
fn generate_project_key(name: &str, existing: &[Project]) -> String {
    let base: String = name
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(PROJECT_KEY_LEN)
        .collect();

    let mut key = base.clone();
    let mut counter = 1;
    while existing.iter().any(|p| p.key == key) {
        key = format!("{base}{counter}");
        counter += 1;
    }
    key
}

pub(crate) fn build_project(id: u64, key: String, input: NewProject) -> Project {
    let now = Utc::now();
    Project {
        id,
        name: input.name,
        key,
        description: input.description,
        priority: input.priority,
        status: input.status,
        start_date: input.start_date,
        end_date: input.end_date,
        created_by: input.created_by,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTask, Priority, ProjectStatus};

    fn new_project(name: &str) -> NewProject {
        NewProject {
            name: name.to_string(),
            description: String::new(),
            priority: Priority::Medium,
            status: ProjectStatus::Active,
            start_date: None,
            end_date: None,
            created_by: 1,
        }
    }

    #[test]
    fn key_is_uppercased_stripped_and_truncated() {
        let mut storage = Storage::in_memory().unwrap();
        let project = storage
            .create_project(new_project("my web-app 2024"), None)
            .unwrap();
        assert_eq!(project.key, "MYWEB");
    }

    #[test]
    fn colliding_keys_get_counters() {
        let mut storage = Storage::in_memory().unwrap();
        let first = storage
            .create_project(new_project("Alpha Team"), None)
            .unwrap();
        let second = storage
            .create_project(new_project("Alpha Tools"), None)
            .unwrap();
        let third = storage
            .create_project(new_project("Alpha Testing"), None)
            .unwrap();
        assert_eq!(first.key, "ALPHA");
        assert_eq!(second.key, "ALPHA1");
        assert_eq!(third.key, "ALPHA2");
    }

    #[test]
    fn key_survives_renames() {
        let mut storage = Storage::in_memory().unwrap();
        let project = storage
            .create_project(new_project("Alpha Team"), None)
            .unwrap();
        let updated = storage
            .update_project(
                project.id,
                ProjectPatch {
                    name: Some("Completely Different".to_string()),
                    ..Default::default()
                },
                None,
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.key, "ALPHA");
        assert_eq!(updated.name, "Completely Different");
    }

    #[test]
    fn delete_cascades_to_project_tasks_only() {
        let mut storage = Storage::in_memory().unwrap();
        let keep = storage.create_project(new_project("Keep"), None).unwrap();
        let drop = storage.create_project(new_project("Drop"), None).unwrap();
        let mut in_drop = NewTask::new("in drop", 1);
        in_drop.project_id = Some(drop.id);
        let mut in_keep = NewTask::new("in keep", 1);
        in_keep.project_id = Some(keep.id);
        let doomed = storage.create_task(in_drop, None).unwrap();
        let survivor = storage.create_task(in_keep, None).unwrap();

        assert!(storage.delete_project(drop.id, None).unwrap());

        assert!(storage.project(drop.id).unwrap().is_none());
        assert!(storage.task(doomed.id).unwrap().is_none());
        assert!(storage.task(survivor.id).unwrap().is_some());
        assert!(storage.project(keep.id).unwrap().is_some());
    }

    #[test]
    fn delete_missing_project_is_a_no_op() {
        let mut storage = Storage::in_memory().unwrap();
        let tasks_before = storage.tasks().unwrap().len();
        assert!(!storage.delete_project(999, None).unwrap());
        assert_eq!(storage.tasks().unwrap().len(), tasks_before);
    }

    #[test]
    fn search_covers_key() {
        let mut storage = Storage::in_memory().unwrap();
        storage
            .create_project(new_project("Alpha Team"), None)
            .unwrap();
        let hits = storage.search_projects("alpha").unwrap();
        assert_eq!(hits.len(), 1);
        let by_key = storage.search_projects("ALPH").unwrap();
        assert_eq!(by_key.len(), 1);
    }
}
