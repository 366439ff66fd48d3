//! Session and authorization gate
//!
//! A consumer-side layer over [`Storage`]: the engine never calls back into
//! it, and nothing here is persisted. A session is a value the caller holds
//! for the lifetime of an authenticated interaction.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{
    ActivityAction, EntityKind, NewActivity, Project, Task, UserRole, UserStatus,
};
use crate::storage::Storage;

/// Sessions expire a day after login.
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct Session {
    user_id: u64,
    role: UserRole,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Authenticate against the stored credentials. On success the user's
    /// `last_login` is refreshed and a Login entry is written.
    ///
    /// Wrong email and wrong password are indistinguishable to the caller;
    /// a disabled account reports its own error only after the credentials
    /// matched.
    pub fn login(storage: &mut Storage, email: &str, password: &str) -> Result<Session> {
        let user = storage
            .user_by_email(email)?
            .filter(|u| u.password.as_deref() == Some(password))
            .ok_or(Error::InvalidCredentials)?;
        if user.status != UserStatus::Active {
            return Err(Error::AccountDisabled);
        }
        storage.record_login(user.id)?;
        info!(user_id = user.id, "session started");
        Ok(Session {
            user_id: user.id,
            role: user.role,
            started_at: Utc::now(),
        })
    }

    /// End the session, writing a Logout entry.
    pub fn logout(self, storage: &mut Storage) -> Result<()> {
        storage.log_activity(
            NewActivity::new(
                self.user_id,
                ActivityAction::Logout,
                EntityKind::User,
                "logged out",
            )
            .entity_id(self.user_id),
        )?;
        info!(user_id = self.user_id, "session ended");
        Ok(())
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() - self.started_at >= Duration::hours(SESSION_TTL_HOURS)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins count as managers for authorization purposes.
    pub fn is_manager(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Manager)
    }

    /// Managers, the creator and the assignee may edit a task.
    pub fn can_edit_task(&self, task: &Task) -> bool {
        self.is_manager()
            || task.created_by == self.user_id
            || task.assignee_id == Some(self.user_id)
    }

    /// Managers and the creator may edit a project.
    pub fn can_edit_project(&self, project: &Project) -> bool {
        self.is_manager() || project.created_by == self.user_id
    }

    /// Admins may edit anyone; everyone may edit themselves.
    pub fn can_edit_user(&self, user_id: u64) -> bool {
        self.is_admin() || user_id == self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, UserPatch};

    const ADMIN_EMAIL: &str = "admin@coretask.local";
    const ADMIN_PASSWORD: &str = "admin123";

    fn plain_user(storage: &mut Storage, email: &str, role: UserRole) -> u64 {
        storage
            .create_user(
                NewUser {
                    email: email.to_string(),
                    name: "Member".to_string(),
                    password: Some("pw".to_string()),
                    role,
                    status: UserStatus::Active,
                },
                None,
            )
            .unwrap()
            .id
    }

    #[test]
    fn login_with_seeded_admin_succeeds() {
        let mut storage = Storage::in_memory().unwrap();
        let session = Session::login(&mut storage, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();
        assert!(session.is_admin());
        assert!(!session.is_expired());

        let admin = storage.user_by_email(ADMIN_EMAIL).unwrap().unwrap();
        assert!(admin.last_login.is_some());
        let newest = &storage.recent_activity(1).unwrap()[0];
        assert_eq!(newest.action, ActivityAction::Login);
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let mut storage = Storage::in_memory().unwrap();
        let wrong_pw = Session::login(&mut storage, ADMIN_EMAIL, "nope").unwrap_err();
        let no_user = Session::login(&mut storage, "ghost@example.com", "nope").unwrap_err();
        assert!(matches!(wrong_pw, Error::InvalidCredentials));
        assert!(matches!(no_user, Error::InvalidCredentials));
    }

    #[test]
    fn disabled_account_is_rejected_after_credentials_match() {
        let mut storage = Storage::in_memory().unwrap();
        let id = plain_user(&mut storage, "off@example.com", UserRole::User);
        storage
            .update_user(
                id,
                UserPatch {
                    status: Some(UserStatus::Inactive),
                    ..Default::default()
                },
                None,
            )
            .unwrap();

        let err = Session::login(&mut storage, "off@example.com", "pw").unwrap_err();
        assert!(matches!(err, Error::AccountDisabled));
        // wrong password on a disabled account still reads as bad credentials
        let err = Session::login(&mut storage, "off@example.com", "nope").unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
    }

    #[test]
    fn task_editing_needs_a_stake_in_the_task() {
        let mut storage = Storage::in_memory().unwrap();
        let creator = plain_user(&mut storage, "creator@example.com", UserRole::User);
        let assignee = plain_user(&mut storage, "assignee@example.com", UserRole::User);
        let outsider = plain_user(&mut storage, "outsider@example.com", UserRole::User);
        let manager = plain_user(&mut storage, "manager@example.com", UserRole::Manager);

        let mut input = crate::models::NewTask::new("guarded", creator);
        input.assignee_id = Some(assignee);
        let task = storage.create_task(input, None).unwrap();

        let session = |id, role| Session {
            user_id: id,
            role,
            started_at: Utc::now(),
        };
        assert!(session(creator, UserRole::User).can_edit_task(&task));
        assert!(session(assignee, UserRole::User).can_edit_task(&task));
        assert!(session(manager, UserRole::Manager).can_edit_task(&task));
        assert!(!session(outsider, UserRole::User).can_edit_task(&task));
    }

    #[test]
    fn user_editing_is_self_or_admin() {
        let admin = Session {
            user_id: 1,
            role: UserRole::Admin,
            started_at: Utc::now(),
        };
        let member = Session {
            user_id: 2,
            role: UserRole::User,
            started_at: Utc::now(),
        };
        assert!(admin.can_edit_user(2));
        assert!(member.can_edit_user(2));
        assert!(!member.can_edit_user(1));
    }

    #[test]
    fn sessions_expire_after_a_day() {
        let stale = Session {
            user_id: 1,
            role: UserRole::User,
            started_at: Utc::now() - Duration::hours(SESSION_TTL_HOURS + 1),
        };
        assert!(stale.is_expired());
    }

    #[test]
    fn logout_writes_the_audit_entry() {
        let mut storage = Storage::in_memory().unwrap();
        let session = Session::login(&mut storage, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();
        session.logout(&mut storage).unwrap();
        let newest = &storage.recent_activity(1).unwrap()[0];
        assert_eq!(newest.action, ActivityAction::Logout);
    }
}
