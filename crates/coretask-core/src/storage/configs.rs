//! Free-form configuration map plus typed integration settings
//!
//! Configs are a single JSON object keyed by setting name. Callers that own a
//! setting's shape go through the typed accessors; everything else reads and
//! writes `serde_json::Value`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::Result;
use crate::models::{ActivityAction, Audit, EntityKind};

use super::activity;
use super::engine::{KEY_CONFIGS, Storage};

pub const DISCORD_SETTINGS_KEY: &str = "discord_settings";

/// Discord integration settings stored under [`DISCORD_SETTINGS_KEY`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscordSettings {
    pub webhook_url: String,
    #[serde(default)]
    pub default_channel: String,
    #[serde(default)]
    pub events: DiscordEvents,
    #[serde(default)]
    pub last_tested: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<u64>,
}

/// Which storage events forward to Discord.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscordEvents {
    pub task_created: bool,
    pub task_assigned: bool,
    pub task_completed: bool,
    pub project_created: bool,
}

impl Storage {
    /// The whole configuration object.
    pub fn configs(&self) -> Result<Map<String, Value>> {
        Ok(self.kv.view().get_or(KEY_CONFIGS, Map::new())?)
    }

    /// A single setting deserialized into `T`; `None` when absent or when the
    /// stored value does not fit the requested shape.
    pub fn config<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let configs = self.configs()?;
        Ok(configs
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok()))
    }

    pub fn set_config(&mut self, key: &str, value: Value, audit: Option<&Audit>) -> Result<()> {
        self.kv.transaction(|kv| {
            let mut configs: Map<String, Value> = kv.get_or(KEY_CONFIGS, Map::new())?;
            configs.insert(key.to_string(), value);
            kv.set(KEY_CONFIGS, &configs)?;
            if let Some(audit) = audit {
                activity::record(kv, audit, ActivityAction::Updated, EntityKind::Config, None)?;
            }
            Ok(())
        })?;
        info!(key, "config updated");
        Ok(())
    }

    pub fn remove_config(&mut self, key: &str, audit: Option<&Audit>) -> Result<bool> {
        let removed = self.kv.transaction(|kv| {
            let mut configs: Map<String, Value> = kv.get_or(KEY_CONFIGS, Map::new())?;
            let removed = configs.remove(key).is_some();
            if removed {
                kv.set(KEY_CONFIGS, &configs)?;
                if let Some(audit) = audit {
                    activity::record(
                        kv,
                        audit,
                        ActivityAction::Deleted,
                        EntityKind::Config,
                        None,
                    )?;
                }
            }
            Ok(removed)
        })?;
        if removed {
            info!(key, "config removed");
        }
        Ok(removed)
    }

    pub fn discord_settings(&self) -> Result<Option<DiscordSettings>> {
        self.config(DISCORD_SETTINGS_KEY)
    }

    pub fn set_discord_settings(
        &mut self,
        mut settings: DiscordSettings,
        audit: Option<&Audit>,
    ) -> Result<()> {
        settings.updated_at = Some(Utc::now());
        settings.updated_by = audit.map(|a| a.user_id);
        self.set_config(
            DISCORD_SETTINGS_KEY,
            serde_json::to_value(&settings)?,
            audit,
        )
    }
}
