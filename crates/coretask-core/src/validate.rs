//! Input validation helpers
//!
//! Storage itself stays permissive; callers gate user input through these
//! before writing.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static DISCORD_WEBHOOK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://discord\.com/api/webhooks/\d+/[\w-]+$").unwrap());

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url).is_ok()
}

/// Discord webhook endpoints have a fixed channel-id/token shape.
pub fn is_valid_discord_webhook(url: &str) -> bool {
    DISCORD_WEBHOOK.is_match(url)
}
