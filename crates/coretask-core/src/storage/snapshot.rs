//! Export, import and factory reset
//!
//! A snapshot is the portable JSON document of the whole store. Exports strip
//! user passwords and cap the activity log; imports replace exactly the
//! collections present in the document, atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{
    ActivityAction, ActivityLog, Audit, EntityKind, Project, Task, User, UserRole, UserStatus,
    Webhook,
};

use super::activity;
use super::engine::{
    KEY_ACTIVITY, KEY_CONFIGS, KEY_PROJECTS, KEY_TASKS, KEY_USERS, KEY_WEBHOOKS, SCHEMA_VERSION,
    Storage, max_id, raise_sequence, save_collection, seed_into,
};

/// Activity entries carried in an export, newest first.
pub const EXPORT_LOG_LIMIT: usize = 100;

/// Portable dump of the store. Absent collections are left untouched on
/// import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "Utc::now")]
    pub export_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<ExportedUser>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhooks: Option<Vec<Webhook>>,
    // the persisted layout names this collection in snake_case
    #[serde(
        rename = "activity_logs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub activity_logs: Option<Vec<ActivityLog>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configs: Option<Map<String, Value>>,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// A [`User`] as it appears in an export: no password field at all, so
/// credentials never leave the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedUser {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub status: UserStatus,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for ExportedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            status: user.status,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<ExportedUser> for User {
    fn from(user: ExportedUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            password: None,
            role: user.role,
            status: user.status,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl Snapshot {
    /// Parse a snapshot from a JSON document, rejecting shapes that do not
    /// match the export format.
    pub fn from_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::ImportFormat(e.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::ImportFormat(e.to_string()))
    }
}

impl Storage {
    /// Build an export of the current store contents.
    pub fn export(&mut self, audit: Option<&Audit>) -> Result<Snapshot> {
        let snapshot = Snapshot {
            version: SCHEMA_VERSION.to_string(),
            export_date: Utc::now(),
            users: Some(self.users()?.into_iter().map(ExportedUser::from).collect()),
            projects: Some(self.projects()?),
            tasks: Some(self.tasks()?),
            webhooks: Some(self.webhooks()?),
            activity_logs: Some(
                self.activity_logs()?
                    .into_iter()
                    .take(EXPORT_LOG_LIMIT)
                    .collect(),
            ),
            configs: Some(self.configs()?),
        };
        if let Some(audit) = audit {
            self.kv.transaction(|kv| {
                activity::record(kv, audit, ActivityAction::Exported, EntityKind::System, None)
            })?;
        }
        info!(
            users = snapshot.users.as_ref().map_or(0, Vec::len),
            tasks = snapshot.tasks.as_ref().map_or(0, Vec::len),
            "store exported"
        );
        Ok(snapshot)
    }

    /// Replace every collection present in the snapshot; collections the
    /// snapshot omits keep their stored contents. The whole import applies
    /// atomically, and id sequences are raised past the imported ids so later
    /// creates cannot collide.
    pub fn import(&mut self, snapshot: &Snapshot, audit: Option<&Audit>) -> Result<()> {
        self.kv.transaction(|kv| {
            if let Some(users) = &snapshot.users {
                let users: Vec<User> = users.iter().cloned().map(User::from).collect();
                save_collection(kv, KEY_USERS, &users)?;
                raise_sequence(kv, KEY_USERS, max_id(&users, |u| u.id))?;
            }
            if let Some(projects) = &snapshot.projects {
                save_collection(kv, KEY_PROJECTS, projects)?;
                raise_sequence(kv, KEY_PROJECTS, max_id(projects, |p| p.id))?;
            }
            if let Some(tasks) = &snapshot.tasks {
                save_collection(kv, KEY_TASKS, tasks)?;
                raise_sequence(kv, KEY_TASKS, max_id(tasks, |t| t.id))?;
            }
            if let Some(webhooks) = &snapshot.webhooks {
                save_collection(kv, KEY_WEBHOOKS, webhooks)?;
                raise_sequence(kv, KEY_WEBHOOKS, max_id(webhooks, |w| w.id))?;
            }
            if let Some(logs) = &snapshot.activity_logs {
                save_collection(kv, KEY_ACTIVITY, logs)?;
                raise_sequence(kv, KEY_ACTIVITY, max_id(logs, |l| l.id))?;
            }
            if let Some(configs) = &snapshot.configs {
                kv.set(KEY_CONFIGS, configs)?;
            }
            if let Some(audit) = audit {
                activity::record(kv, audit, ActivityAction::Imported, EntityKind::System, None)?;
            }
            Ok(())
        })?;
        info!(version = %snapshot.version, "snapshot imported");
        Ok(())
    }

    /// Wipe the store back to the seeded defaults.
    pub fn reset(&mut self, audit: Option<&Audit>) -> Result<()> {
        self.kv.transaction(|kv| {
            kv.clear()?;
            seed_into(kv)?;
            if let Some(audit) = audit {
                activity::record(kv, audit, ActivityAction::Reset, EntityKind::System, None)?;
            }
            Ok(())
        })?;
        info!("store reset to defaults");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewActivity, NewTask, NewUser};
    use serde_json::json;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Someone".to_string(),
            password: Some("secret".to_string()),
            role: UserRole::User,
            status: UserStatus::Active,
        }
    }

    #[test]
    fn export_carries_no_passwords() {
        let mut storage = Storage::in_memory().unwrap();
        storage.create_user(new_user("a@example.com"), None).unwrap();
        let snapshot = storage.export(None).unwrap();
        let text = serde_json::to_string(&snapshot).unwrap();
        assert!(!text.contains("password"));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn export_caps_activity_at_one_hundred() {
        let mut storage = Storage::in_memory().unwrap();
        for i in 0..150 {
            storage
                .log_activity(NewActivity::new(
                    1,
                    ActivityAction::Created,
                    EntityKind::Task,
                    format!("entry {i}"),
                ))
                .unwrap();
        }
        let snapshot = storage.export(None).unwrap();
        let logs = snapshot.activity_logs.unwrap();
        assert_eq!(logs.len(), EXPORT_LOG_LIMIT);
        // newest first
        assert_eq!(logs[0].description, "entry 149");
    }

    #[test]
    fn import_replaces_only_present_collections() {
        let mut storage = Storage::in_memory().unwrap();
        let task = storage.create_task(NewTask::new("kept", 1), None).unwrap();
        let snapshot = Snapshot::from_value(json!({
            "version": "1.0.0",
            "exportDate": "2026-01-01T00:00:00Z",
            "users": [],
        }))
        .unwrap();
        storage.import(&snapshot, None).unwrap();

        assert!(storage.users().unwrap().is_empty());
        assert!(storage.task(task.id).unwrap().is_some());
    }

    #[test]
    fn import_raises_id_sequences() {
        let mut storage = Storage::in_memory().unwrap();
        let mut donor = Storage::in_memory().unwrap();
        for _ in 0..5 {
            donor.create_task(NewTask::new("filler", 1), None).unwrap();
        }
        let snapshot = donor.export(None).unwrap();
        let max_imported = snapshot
            .tasks
            .as_ref()
            .unwrap()
            .iter()
            .map(|t| t.id)
            .max()
            .unwrap();

        storage.import(&snapshot, None).unwrap();
        let fresh = storage.create_task(NewTask::new("after", 1), None).unwrap();
        assert!(fresh.id > max_imported);
    }

    #[test]
    fn round_trip_preserves_collections_but_not_passwords() {
        let mut source = Storage::in_memory().unwrap();
        source.create_user(new_user("b@example.com"), None).unwrap();
        let snapshot = source.export(None).unwrap();

        let mut target = Storage::in_memory().unwrap();
        target.import(&snapshot, None).unwrap();
        let users = target.users().unwrap();
        assert_eq!(users.len(), source.users().unwrap().len());
        assert!(users.iter().all(|u| u.password.is_none()));
        assert_eq!(target.tasks().unwrap(), source.tasks().unwrap());
    }

    #[test]
    fn export_names_the_activity_collection_in_snake_case() {
        let mut storage = Storage::in_memory().unwrap();
        let snapshot = storage.export(None).unwrap();
        let value = serde_json::to_value(&snapshot).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert!(keys.iter().any(|k| *k == "activity_logs"));
        assert!(keys.iter().all(|k| *k != "activityLogs"));
        assert!(keys.iter().any(|k| *k == "exportDate"));
    }

    #[test]
    fn import_reads_activity_logs_under_the_persisted_key() {
        let mut storage = Storage::in_memory().unwrap();
        let snapshot = Snapshot::from_value(json!({
            "version": "1.0.0",
            "exportDate": "2026-01-01T00:00:00Z",
            "activity_logs": [{
                "id": 1,
                "userId": 1,
                "action": "created",
                "entity": "task",
                "description": "carried over",
                "createdAt": "2026-01-01T00:00:00Z"
            }],
        }))
        .unwrap();
        storage.import(&snapshot, None).unwrap();

        let logs = storage.activity_logs().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].description, "carried over");
    }

    #[test]
    fn version_and_export_date_are_optional_on_import() {
        let snapshot = Snapshot::from_value(json!({ "tasks": [] })).unwrap();
        assert_eq!(snapshot.version, crate::storage::SCHEMA_VERSION);
        assert!(snapshot.tasks.is_some());
    }

    #[test]
    fn malformed_collection_is_an_import_format_error() {
        let err = Snapshot::from_value(json!({
            "version": "1.0.0",
            "exportDate": "2026-01-01T00:00:00Z",
            "tasks": {"not": "a list"},
        }))
        .unwrap_err();
        assert!(matches!(err, Error::ImportFormat(_)));
    }

    #[test]
    fn reset_restores_the_seeded_dataset() {
        let mut storage = Storage::in_memory().unwrap();
        storage.create_task(NewTask::new("doomed", 1), None).unwrap();
        storage
            .set_config("theme", json!("dark"), None)
            .unwrap();
        storage.reset(None).unwrap();

        assert_eq!(storage.tasks().unwrap().len(), 2);
        assert_eq!(storage.users().unwrap().len(), 1);
        assert!(storage.configs().unwrap().is_empty());
    }
}
