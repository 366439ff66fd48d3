//! The storage engine
//!
//! [`Storage`] owns a namespaced key/value store ([`kv::KvStore`]) and keeps
//! each collection as one JSON array under its own key. Construct it once and
//! pass it by reference; reads borrow `&self`, mutations take `&mut self` and
//! run inside a single transaction together with their optional audit entry.

pub mod kv;

mod activity;
mod configs;
mod engine;
mod projects;
mod snapshot;
mod stats;
mod tasks;
mod users;
mod webhooks;

pub use activity::{ACTIVITY_LOG_CAP, IntegrationStats};
pub use configs::{DISCORD_SETTINGS_KEY, DiscordEvents, DiscordSettings};
pub use engine::{SCHEMA_VERSION, Storage};
pub use snapshot::{EXPORT_LOG_LIMIT, ExportedUser, Snapshot};
pub use stats::{
    Counts, ProjectProgress, Stats, TasksByPriority, TasksByStatus, UserActivitySummary,
    UsersByRole,
};
