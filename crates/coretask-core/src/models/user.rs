use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account
///
/// The password is held in plaintext by design; it is stripped from exports
/// and never compared outside the session gate. Users re-imported from an
/// export therefore carry no password until one is set again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub password: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::User => "user",
        }
    }

    pub const ALL: [UserRole; 3] = [Self::Admin, Self::Manager, Self::User];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub last_login: Option<DateTime<Utc>>,
}
