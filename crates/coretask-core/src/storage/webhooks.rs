//! Webhook registrations and delivery bookkeeping

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::models::{ActivityAction, Audit, EntityKind, NewWebhook, Webhook, WebhookPatch};

use super::activity;
use super::engine::{KEY_WEBHOOKS, Storage, collection, max_id, next_id, save_collection};

impl Storage {
    pub fn webhooks(&self) -> Result<Vec<Webhook>> {
        collection(&self.kv.view(), KEY_WEBHOOKS)
    }

    pub fn webhook(&self, id: u64) -> Result<Option<Webhook>> {
        Ok(self.webhooks()?.into_iter().find(|w| w.id == id))
    }

    /// Webhooks subscribed to a given event name.
    pub fn webhooks_for_event(&self, event: &str) -> Result<Vec<Webhook>> {
        Ok(self
            .webhooks()?
            .into_iter()
            .filter(|w| w.events.iter().any(|e| e == event))
            .collect())
    }

    pub fn create_webhook(&mut self, input: NewWebhook, audit: Option<&Audit>) -> Result<Webhook> {
        let webhook = self.kv.transaction(|kv| {
            let mut webhooks: Vec<Webhook> = collection(kv, KEY_WEBHOOKS)?;
            let id = next_id(kv, KEY_WEBHOOKS, max_id(&webhooks, |w| w.id))?;
            let now = Utc::now();
            let webhook = Webhook {
                id,
                name: input.name,
                url: input.url,
                events: input.events,
                trigger_count: 0,
                last_triggered: None,
                created_by: input.created_by,
                created_at: now,
                updated_at: now,
            };
            webhooks.push(webhook.clone());
            save_collection(kv, KEY_WEBHOOKS, &webhooks)?;
            if let Some(audit) = audit {
                activity::record(
                    kv,
                    audit,
                    ActivityAction::Created,
                    EntityKind::Webhook,
                    Some(id),
                )?;
            }
            Ok(webhook)
        })?;
        info!(webhook_id = webhook.id, name = %webhook.name, "webhook created");
        Ok(webhook)
    }

    pub fn update_webhook(
        &mut self,
        id: u64,
        patch: WebhookPatch,
        audit: Option<&Audit>,
    ) -> Result<Option<Webhook>> {
        self.kv.transaction(|kv| {
            let mut webhooks: Vec<Webhook> = collection(kv, KEY_WEBHOOKS)?;
            let Some(webhook) = webhooks.iter_mut().find(|w| w.id == id) else {
                return Ok(None);
            };
            if let Some(name) = patch.name {
                webhook.name = name;
            }
            if let Some(url) = patch.url {
                webhook.url = url;
            }
            if let Some(events) = patch.events {
                webhook.events = events;
            }
            if let Some(trigger_count) = patch.trigger_count {
                webhook.trigger_count = trigger_count;
            }
            if let Some(last_triggered) = patch.last_triggered {
                webhook.last_triggered = Some(last_triggered);
            }
            webhook.updated_at = Utc::now();
            let updated = webhook.clone();
            save_collection(kv, KEY_WEBHOOKS, &webhooks)?;
            if let Some(audit) = audit {
                activity::record(
                    kv,
                    audit,
                    ActivityAction::Updated,
                    EntityKind::Webhook,
                    Some(id),
                )?;
            }
            Ok(Some(updated))
        })
    }

    pub fn delete_webhook(&mut self, id: u64, audit: Option<&Audit>) -> Result<bool> {
        let removed = self.kv.transaction(|kv| {
            let webhooks: Vec<Webhook> = collection(kv, KEY_WEBHOOKS)?;
            let before = webhooks.len();
            let remaining: Vec<Webhook> = webhooks.into_iter().filter(|w| w.id != id).collect();
            let removed = remaining.len() < before;
            if removed {
                save_collection(kv, KEY_WEBHOOKS, &remaining)?;
                if let Some(audit) = audit {
                    activity::record(
                        kv,
                        audit,
                        ActivityAction::Deleted,
                        EntityKind::Webhook,
                        Some(id),
                    )?;
                }
            }
            Ok(removed)
        })?;
        if removed {
            info!(webhook_id = id, "webhook deleted");
        }
        Ok(removed)
    }

    /// Bump the delivery counters after an outbound call. Returns the updated
    /// registration, or `None` for an unknown id.
    pub fn record_webhook_trigger(
        &mut self,
        id: u64,
        audit: Option<&Audit>,
    ) -> Result<Option<Webhook>> {
        self.kv.transaction(|kv| {
            let mut webhooks: Vec<Webhook> = collection(kv, KEY_WEBHOOKS)?;
            let Some(webhook) = webhooks.iter_mut().find(|w| w.id == id) else {
                return Ok(None);
            };
            webhook.trigger_count += 1;
            webhook.last_triggered = Some(Utc::now());
            let updated = webhook.clone();
            save_collection(kv, KEY_WEBHOOKS, &webhooks)?;
            if let Some(audit) = audit {
                activity::record(
                    kv,
                    audit,
                    ActivityAction::Tested,
                    EntityKind::Webhook,
                    Some(id),
                )?;
            }
            Ok(Some(updated))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, events: &[&str]) -> NewWebhook {
        NewWebhook {
            name: name.to_string(),
            url: "https://example.com/hook".to_string(),
            events: events.iter().map(|e| e.to_string()).collect(),
            created_by: 1,
        }
    }

    #[test]
    fn new_webhook_starts_with_zero_deliveries() {
        let mut storage = Storage::in_memory().unwrap();
        let hook = storage
            .create_webhook(sample("ci", &["task.created"]), None)
            .unwrap();
        assert_eq!(hook.trigger_count, 0);
        assert!(hook.last_triggered.is_none());
    }

    #[test]
    fn trigger_bumps_count_and_timestamp() {
        let mut storage = Storage::in_memory().unwrap();
        let hook = storage
            .create_webhook(sample("ci", &["task.created"]), None)
            .unwrap();
        storage.record_webhook_trigger(hook.id, None).unwrap();
        let after = storage
            .record_webhook_trigger(hook.id, None)
            .unwrap()
            .unwrap();
        assert_eq!(after.trigger_count, 2);
        assert!(after.last_triggered.is_some());
    }

    #[test]
    fn event_lookup_matches_exact_names() {
        let mut storage = Storage::in_memory().unwrap();
        storage
            .create_webhook(sample("a", &["task.created", "task.updated"]), None)
            .unwrap();
        storage
            .create_webhook(sample("b", &["project.created"]), None)
            .unwrap();

        let hits = storage.webhooks_for_event("task.created").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "a");
        assert!(storage.webhooks_for_event("task.deleted").unwrap().is_empty());
    }

    #[test]
    fn update_preserves_delivery_counters() {
        let mut storage = Storage::in_memory().unwrap();
        let hook = storage
            .create_webhook(sample("ci", &["task.created"]), None)
            .unwrap();
        storage.record_webhook_trigger(hook.id, None).unwrap();
        let updated = storage
            .update_webhook(
                hook.id,
                WebhookPatch {
                    name: Some("ci-renamed".to_string()),
                    ..Default::default()
                },
                None,
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "ci-renamed");
        assert_eq!(updated.trigger_count, 1);
    }

    #[test]
    fn missing_webhook_is_none_not_error() {
        let mut storage = Storage::in_memory().unwrap();
        assert!(storage.webhook(99).unwrap().is_none());
        assert!(storage.record_webhook_trigger(99, None).unwrap().is_none());
        assert!(!storage.delete_webhook(99, None).unwrap());
    }
}
