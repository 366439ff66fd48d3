//! Storage engine: single source of truth for every collection
//!
//! One `Storage` is constructed at application start and passed by reference
//! to everything that needs data; there is no ambient global instance. Reads
//! take `&self` and reconstruct the collection from the persistence adapter
//! on every call, so the engine always reflects the latest persisted value.
//! Mutations take `&mut self` and run inside a transaction, together with
//! their optional audit entry.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{
    NewProject, NewTask, NewUser, Priority, ProjectStatus, UserRole, UserStatus,
};

use super::kv::{KvStore, KvView};

/// Schema version written alongside the collections
pub const SCHEMA_VERSION: &str = "1.0.0";

pub(crate) const KEY_USERS: &str = "users";
pub(crate) const KEY_PROJECTS: &str = "projects";
pub(crate) const KEY_TASKS: &str = "tasks";
pub(crate) const KEY_WEBHOOKS: &str = "webhooks";
pub(crate) const KEY_ACTIVITY: &str = "activity_logs";
pub(crate) const KEY_CONFIGS: &str = "configs";
pub(crate) const KEY_VERSION: &str = "version";

/// Owns all entity collections; every feature reads and writes through here.
pub struct Storage {
    pub(crate) kv: KvStore,
}

impl Storage {
    /// Open the store at `path`, seeding default data on first use.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::initialize(KvStore::open(path)?)
    }

    /// In-memory store for tests and demos, seeded the same way.
    pub fn in_memory() -> Result<Self> {
        Self::initialize(KvStore::in_memory()?)
    }

    fn initialize(kv: KvStore) -> Result<Self> {
        let mut storage = Self { kv };
        if storage.kv.get::<String>(KEY_VERSION)?.is_none() {
            storage.kv.transaction(seed_into)?;
            info!("seeded default data");
        }
        Ok(storage)
    }

    pub fn version(&self) -> Result<String> {
        self.kv.get_or(KEY_VERSION, SCHEMA_VERSION.to_string())
    }

    /// Write/read/delete round trip on a probe key through the persistence
    /// adapter; `true` means the store is readable and writable.
    pub fn health_check(&mut self) -> Result<bool> {
        let probe = json!({ "test": true });
        self.kv.set("health_check", &probe)?;
        let read: Option<serde_json::Value> = self.kv.get("health_check")?;
        self.kv.remove("health_check")?;
        let healthy = read.as_ref() == Some(&probe);
        debug!(healthy, "storage health probe");
        Ok(healthy)
    }
}

/// Load a collection, defaulting to empty when absent.
pub(crate) fn collection<T: DeserializeOwned>(kv: &KvView<'_>, key: &str) -> Result<Vec<T>> {
    kv.get_or(key, Vec::new())
}

pub(crate) fn save_collection<T: Serialize>(kv: &KvView<'_>, key: &str, items: &[T]) -> Result<()> {
    kv.set(key, &items)
}

fn seq_key(collection_key: &str) -> String {
    format!("seq_{collection_key}")
}

/// Next id for a collection from its persisted sequence.
///
/// The sequence only ever moves forward, so deleting the highest-id record
/// and creating a new one does not reuse the id. `existing_max` covers
/// stores written before the sequence key existed.
pub(crate) fn next_id(kv: &KvView<'_>, collection_key: &str, existing_max: u64) -> Result<u64> {
    let key = seq_key(collection_key);
    let current: u64 = kv.get_or(&key, 0)?;
    let next = current.max(existing_max) + 1;
    kv.set(&key, &next)?;
    Ok(next)
}

/// Raise a sequence to at least `floor`; used after imports so future ids
/// cannot collide with imported records.
pub(crate) fn raise_sequence(kv: &KvView<'_>, collection_key: &str, floor: u64) -> Result<()> {
    let key = seq_key(collection_key);
    let current: u64 = kv.get_or(&key, 0)?;
    if floor > current {
        kv.set(&key, &floor)?;
    }
    Ok(())
}

pub(crate) fn max_id<T>(items: &[T], id: impl Fn(&T) -> u64) -> u64 {
    items.iter().map(id).max().unwrap_or(0)
}

/// Seed the default dataset: one admin user plus a starter project with a
/// couple of tasks, so a fresh install is navigable.
pub(crate) fn seed_into(kv: &KvView<'_>) -> Result<()> {
    kv.set(KEY_VERSION, &SCHEMA_VERSION)?;

    let admin = super::users::build_user(
        next_id(kv, KEY_USERS, 0)?,
        NewUser {
            email: "admin@coretask.local".to_string(),
            name: "Administrator".to_string(),
            password: Some("admin123".to_string()),
            role: UserRole::Admin,
            status: UserStatus::Active,
        },
    );
    save_collection(kv, KEY_USERS, &[admin.clone()])?;

    let project = super::projects::build_project(
        next_id(kv, KEY_PROJECTS, 0)?,
        "GETTI".to_string(),
        NewProject {
            name: "Getting Started".to_string(),
            description: "Sample project created on first run".to_string(),
            priority: Priority::Medium,
            status: ProjectStatus::Active,
            start_date: None,
            end_date: None,
            created_by: admin.id,
        },
    );
    save_collection(kv, KEY_PROJECTS, &[project.clone()])?;

    let mut onboarding = NewTask::new("Create your first project", admin.id);
    onboarding.description = "Projects group related tasks under a short key".to_string();
    onboarding.project_id = Some(project.id);
    onboarding.assignee_id = Some(admin.id);
    onboarding.tags = vec!["onboarding".to_string()];
    let first = super::tasks::build_task(next_id(kv, KEY_TASKS, 0)?, onboarding);

    let mut invite = NewTask::new("Invite your team", admin.id);
    invite.description = "Add user accounts and assign roles".to_string();
    invite.project_id = Some(project.id);
    invite.priority = Priority::Low;
    invite.tags = vec!["onboarding".to_string()];
    let second = super::tasks::build_task(next_id(kv, KEY_TASKS, 0)?, invite);

    save_collection(kv, KEY_TASKS, &[first, second])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_is_seeded() {
        let storage = Storage::in_memory().unwrap();
        let users = storage.users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "admin@coretask.local");
        assert_eq!(users[0].role, UserRole::Admin);
        assert_eq!(storage.projects().unwrap().len(), 1);
        assert_eq!(storage.tasks().unwrap().len(), 2);
        assert_eq!(storage.version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn health_check_round_trips() {
        let mut storage = Storage::in_memory().unwrap();
        assert!(storage.health_check().unwrap());
        // Probe key is cleaned up afterwards.
        assert_eq!(
            storage.kv.get::<serde_json::Value>("health_check").unwrap(),
            None
        );
    }
}
