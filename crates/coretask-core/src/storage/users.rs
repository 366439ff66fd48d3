//! User collection operations
//!
//! Deleting a user does not cascade: tasks and projects keep the stale id
//! and readers resolve it to "unassigned". This asymmetry with project
//! deletion is intentional product behavior.

use chrono::Utc;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{ActivityAction, Audit, EntityKind, NewUser, User, UserPatch};

use super::activity;
use super::engine::{KEY_USERS, Storage, collection, max_id, next_id, save_collection};

impl Storage {
    /// All users in insertion order.
    pub fn users(&self) -> Result<Vec<User>> {
        collection(&self.kv.view(), KEY_USERS)
    }

    pub fn user(&self, id: u64) -> Result<Option<User>> {
        Ok(self.users()?.into_iter().find(|u| u.id == id))
    }

    /// Lookup by email, case-sensitive as stored.
    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users()?.into_iter().find(|u| u.email == email))
    }

    /// Case-insensitive substring match over name and email.
    pub fn search_users(&self, query: &str) -> Result<Vec<User>> {
        let needle = query.to_lowercase();
        Ok(self
            .users()?
            .into_iter()
            .filter(|u| {
                u.name.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
            })
            .collect())
    }

    pub fn create_user(&mut self, input: NewUser, audit: Option<&Audit>) -> Result<User> {
        if !crate::validate::is_valid_email(&input.email) {
            return Err(Error::InvalidInput(format!(
                "invalid email: {}",
                input.email
            )));
        }
        let user = self.kv.transaction(|kv| {
            let mut users: Vec<User> = collection(kv, KEY_USERS)?;
            if users.iter().any(|u| u.email == input.email) {
                return Err(Error::InvalidInput(format!(
                    "email already in use: {}",
                    input.email
                )));
            }
            let id = next_id(kv, KEY_USERS, max_id(&users, |u| u.id))?;
            let user = build_user(id, input);
            users.push(user.clone());
            save_collection(kv, KEY_USERS, &users)?;
            if let Some(audit) = audit {
                activity::record(kv, audit, ActivityAction::Created, EntityKind::User, Some(id))?;
            }
            Ok(user)
        })?;
        info!(user_id = user.id, email = %user.email, "user created");
        Ok(user)
    }

    /// Shallow merge: only `Some` fields of the patch are applied; everything
    /// else keeps its prior value. `updated_at` is always refreshed.
    pub fn update_user(
        &mut self,
        id: u64,
        patch: UserPatch,
        audit: Option<&Audit>,
    ) -> Result<Option<User>> {
        self.kv.transaction(|kv| {
            let mut users: Vec<User> = collection(kv, KEY_USERS)?;
            let Some(user) = users.iter_mut().find(|u| u.id == id) else {
                return Ok(None);
            };
            if let Some(email) = patch.email {
                user.email = email;
            }
            if let Some(name) = patch.name {
                user.name = name;
            }
            if let Some(password) = patch.password {
                user.password = Some(password);
            }
            if let Some(role) = patch.role {
                user.role = role;
            }
            if let Some(status) = patch.status {
                user.status = status;
            }
            if let Some(last_login) = patch.last_login {
                user.last_login = Some(last_login);
            }
            user.updated_at = Utc::now();
            let updated = user.clone();
            save_collection(kv, KEY_USERS, &users)?;
            if let Some(audit) = audit {
                activity::record(kv, audit, ActivityAction::Updated, EntityKind::User, Some(id))?;
            }
            Ok(Some(updated))
        })
    }

    pub fn delete_user(&mut self, id: u64, audit: Option<&Audit>) -> Result<bool> {
        let removed = self.kv.transaction(|kv| {
            let users: Vec<User> = collection(kv, KEY_USERS)?;
            let before = users.len();
            let remaining: Vec<User> = users.into_iter().filter(|u| u.id != id).collect();
            let removed = remaining.len() < before;
            if removed {
                save_collection(kv, KEY_USERS, &remaining)?;
                if let Some(audit) = audit {
                    activity::record(
                        kv,
                        audit,
                        ActivityAction::Deleted,
                        EntityKind::User,
                        Some(id),
                    )?;
                }
            }
            Ok(removed)
        })?;
        if removed {
            info!(user_id = id, "user deleted");
        }
        Ok(removed)
    }

    /// Stamp a successful login: refresh `last_login` and write the Login
    /// entry in the same transaction.
    pub(crate) fn record_login(&mut self, user_id: u64) -> Result<()> {
        self.kv.transaction(|kv| {
            let mut users: Vec<User> = collection(kv, KEY_USERS)?;
            if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
                user.last_login = Some(Utc::now());
                save_collection(kv, KEY_USERS, &users)?;
            }
            activity::push(
                kv,
                crate::models::NewActivity::new(
                    user_id,
                    ActivityAction::Login,
                    EntityKind::User,
                    "logged in",
                )
                .entity_id(user_id),
            )?;
            Ok(())
        })
    }
}

pub(crate) fn build_user(id: u64, input: NewUser) -> User {
    let now = Utc::now();
    User {
        id,
        email: input.email,
        name: input.name,
        password: input.password,
        role: input.role,
        status: input.status,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}
