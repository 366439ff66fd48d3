//! Activity log subsystem
//!
//! Bounded, newest-first ledger of state-changing actions. Entries are
//! inserted at the head and the collection is truncated to the most recent
//! [`ACTIVITY_LOG_CAP`] entries, so the oldest fall off on overflow. Only
//! this collection has a size cap.
//!
//! Mutations that carry an [`Audit`] descriptor write their entry through
//! [`record`] inside the same transaction as the data change; `log_activity`
//! is the public path for events that are not storage mutations (logins,
//! integration tests).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::{
    ActivityAction, ActivityLog, Audit, EntityKind, IntegrationSource, NewActivity,
};

use super::engine::{KEY_ACTIVITY, Storage, collection, max_id, next_id};
use super::kv::KvView;

/// Maximum retained entries; oldest are evicted beyond this.
pub const ACTIVITY_LOG_CAP: usize = 1000;

impl Storage {
    /// All entries, newest first.
    pub fn activity_logs(&self) -> Result<Vec<ActivityLog>> {
        collection(&self.kv.view(), KEY_ACTIVITY)
    }

    /// The `n` most recent entries.
    pub fn recent_activity(&self, n: usize) -> Result<Vec<ActivityLog>> {
        let mut logs = self.activity_logs()?;
        logs.truncate(n);
        Ok(logs)
    }

    /// Append one entry at the head of the ledger.
    pub fn log_activity(&mut self, entry: NewActivity) -> Result<ActivityLog> {
        self.kv.transaction(|kv| push(kv, entry))
    }

    /// Drop every entry.
    pub fn clear_activity_logs(&mut self) -> Result<()> {
        self.kv.set(KEY_ACTIVITY, &Vec::<ActivityLog>::new())
    }

    /// Counts of integration-related activity, computed from the structured
    /// `source` and `entity` fields rather than description text.
    pub fn integration_stats(&self) -> Result<IntegrationStats> {
        let logs = self.activity_logs()?;
        let related: Vec<&ActivityLog> = logs
            .iter()
            .filter(|log| {
                log.source.is_some()
                    || matches!(log.entity, EntityKind::Integration | EntityKind::Webhook)
            })
            .collect();

        Ok(IntegrationStats {
            total_events: related.len(),
            discord_events: related
                .iter()
                .filter(|l| l.source == Some(IntegrationSource::Discord))
                .count(),
            email_events: related
                .iter()
                .filter(|l| l.source == Some(IntegrationSource::Email))
                .count(),
            webhook_events: related
                .iter()
                .filter(|l| l.entity == EntityKind::Webhook)
                .count(),
            last_event: related.first().map(|l| l.created_at),
        })
    }
}

/// Integration activity tallies for the admin view
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStats {
    pub total_events: usize,
    pub discord_events: usize,
    pub email_events: usize,
    pub webhook_events: usize,
    pub last_event: Option<DateTime<Utc>>,
}

/// Build, insert and persist one entry inside the caller's transaction.
pub(crate) fn push(kv: &KvView<'_>, entry: NewActivity) -> Result<ActivityLog> {
    let mut logs: Vec<ActivityLog> = collection(kv, KEY_ACTIVITY)?;
    let id = next_id(kv, KEY_ACTIVITY, max_id(&logs, |l| l.id))?;
    let log = ActivityLog {
        id,
        user_id: entry.user_id,
        action: entry.action,
        entity: entry.entity,
        entity_id: entry.entity_id,
        description: entry.description,
        metadata: entry.metadata,
        source: entry.source,
        user_agent: entry.user_agent,
        created_at: Utc::now(),
    };
    logs.insert(0, log.clone());
    logs.truncate(ACTIVITY_LOG_CAP);
    kv.set(KEY_ACTIVITY, &logs)?;
    debug!(
        log_id = log.id,
        action = log.action.as_str(),
        entity = log.entity.as_str(),
        "activity logged"
    );
    Ok(log)
}

/// Write the audit entry for a mutation; the verb and entity kind come from
/// the mutation, the actor and wording from the descriptor.
pub(crate) fn record(
    kv: &KvView<'_>,
    audit: &Audit,
    action: ActivityAction,
    entity: EntityKind,
    entity_id: Option<u64>,
) -> Result<ActivityLog> {
    push(
        kv,
        NewActivity {
            user_id: audit.user_id,
            action,
            entity,
            entity_id,
            description: audit.description.clone(),
            metadata: audit.metadata.clone(),
            source: None,
            user_agent: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(storage: &mut Storage, description: &str) -> ActivityLog {
        storage
            .log_activity(NewActivity::new(
                1,
                ActivityAction::Updated,
                EntityKind::Task,
                description,
            ))
            .unwrap()
    }

    #[test]
    fn newest_entry_is_first() {
        let mut storage = Storage::in_memory().unwrap();
        entry(&mut storage, "first");
        entry(&mut storage, "second");
        let logs = storage.activity_logs().unwrap();
        assert_eq!(logs[0].description, "second");
        assert_eq!(logs[1].description, "first");
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut storage = Storage::in_memory().unwrap();
        for i in 0..=ACTIVITY_LOG_CAP {
            entry(&mut storage, &format!("entry {i}"));
        }
        let logs = storage.activity_logs().unwrap();
        assert_eq!(logs.len(), ACTIVITY_LOG_CAP);
        // The very first entry logged has been evicted.
        assert!(logs.iter().all(|l| l.description != "entry 0"));
        assert_eq!(logs[0].description, format!("entry {ACTIVITY_LOG_CAP}"));
    }

    #[test]
    fn ids_keep_increasing_past_the_cap() {
        let mut storage = Storage::in_memory().unwrap();
        let mut last = 0;
        for i in 0..20 {
            let log = entry(&mut storage, &format!("e{i}"));
            assert!(log.id > last);
            last = log.id;
        }
    }

    #[test]
    fn clear_empties_the_ledger() {
        let mut storage = Storage::in_memory().unwrap();
        entry(&mut storage, "soon gone");
        storage.clear_activity_logs().unwrap();
        assert!(storage.activity_logs().unwrap().is_empty());
    }

    #[test]
    fn integration_stats_use_structured_fields() {
        let mut storage = Storage::in_memory().unwrap();
        storage
            .log_activity(
                NewActivity::new(
                    1,
                    ActivityAction::Tested,
                    EntityKind::Integration,
                    "Discord webhook test",
                )
                .source(IntegrationSource::Discord),
            )
            .unwrap();
        storage
            .log_activity(
                NewActivity::new(
                    1,
                    ActivityAction::Tested,
                    EntityKind::Integration,
                    "email notification test",
                )
                .source(IntegrationSource::Email),
            )
            .unwrap();
        storage
            .log_activity(NewActivity::new(
                1,
                ActivityAction::Created,
                EntityKind::Webhook,
                // Mentioning Discord in prose must not affect the counts.
                "Webhook for the Discord channel created",
            ))
            .unwrap();
        storage
            .log_activity(NewActivity::new(
                1,
                ActivityAction::Updated,
                EntityKind::Task,
                "unrelated task update",
            ))
            .unwrap();

        let stats = storage.integration_stats().unwrap();
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.discord_events, 1);
        assert_eq!(stats.email_events, 1);
        assert_eq!(stats.webhook_events, 1);
        assert!(stats.last_event.is_some());
    }
}
