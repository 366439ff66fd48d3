use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entry in the bounded activity ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: u64,
    pub user_id: u64,
    pub action: ActivityAction,
    pub entity: EntityKind,
    #[serde(default)]
    pub entity_id: Option<u64>,
    pub description: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub source: Option<IntegrationSource>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Closed set of action verbs; free-form strings are not accepted so that
/// queries never have to match on human-readable descriptions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    Login,
    Logout,
    Tested,
    Imported,
    Exported,
    Reset,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Tested => "tested",
            Self::Imported => "imported",
            Self::Exported => "exported",
            Self::Reset => "reset",
        }
    }
}

/// Closed set of entity nouns for activity entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Project,
    Task,
    Webhook,
    Config,
    Integration,
    System,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Task => "task",
            Self::Webhook => "webhook",
            Self::Config => "config",
            Self::Integration => "integration",
            Self::System => "system",
        }
    }
}

/// Structured attribution for integration-related entries, replacing
/// keyword matching over descriptions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationSource {
    Discord,
    Email,
    Webhook,
}

/// Input for one activity entry; id and timestamp are assigned on write.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: u64,
    pub action: ActivityAction,
    pub entity: EntityKind,
    pub entity_id: Option<u64>,
    pub description: String,
    pub metadata: Map<String, Value>,
    pub source: Option<IntegrationSource>,
    pub user_agent: Option<String>,
}

impl NewActivity {
    pub fn new(
        user_id: u64,
        action: ActivityAction,
        entity: EntityKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            action,
            entity,
            entity_id: None,
            description: description.into(),
            metadata: Map::new(),
            source: None,
            user_agent: None,
        }
    }

    pub fn entity_id(mut self, id: u64) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn source(mut self, source: IntegrationSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }
}

/// Audit descriptor attached to a mutation
///
/// When a mutation carries one, the matching activity entry is written in
/// the same transaction as the data change; the action verb and entity kind
/// come from the mutation itself, only the actor and wording come from here.
#[derive(Debug, Clone)]
pub struct Audit {
    pub user_id: u64,
    pub description: String,
    pub metadata: Map<String, Value>,
}

impl Audit {
    pub fn new(user_id: u64, description: impl Into<String>) -> Self {
        Self {
            user_id,
            description: description.into(),
            metadata: Map::new(),
        }
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
