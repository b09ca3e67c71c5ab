//! Login, signup, and session restoration over the key-value store,
//! mirrored best-effort into the database.
//!
//! The stored session is a snapshot, not an authority: every restore
//! re-reads the user table and rebuilds the session from the freshest
//! record, so a permission change lands on the next restore without a
//! re-login.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use infohub_core::error::{HubError, ValidationError};
use infohub_core::types::now_rfc3339;
use infohub_core::{
    Activity, ActivityAction, Permissions, Result, Role, Session, User,
};
use infohub_store::hub::Hub;
use infohub_store::keys;
use infohub_store::kv::JsonKvStore;
use infohub_store::sqlite::DurableStore;
use infohub_store::AuditLog;

use crate::seed;

/// Input for an administrator-created account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub sections: BTreeSet<String>,
    pub editable_sections: BTreeSet<String>,
}

pub struct AuthService {
    kv: Arc<JsonKvStore>,
    durable: Arc<dyn DurableStore>,
    audit: AuditLog,
    db_timeout: Duration,
}

impl AuthService {
    pub fn new(
        kv: Arc<JsonKvStore>,
        durable: Arc<dyn DurableStore>,
        audit: AuditLog,
        db_timeout: Duration,
    ) -> Self {
        Self {
            kv,
            durable,
            audit,
            db_timeout,
        }
    }

    pub fn from_hub(hub: &Hub) -> Self {
        Self::new(hub.kv(), hub.durable(), hub.audit().clone(), hub.db_timeout())
    }

    /// Loads the user table, seeding the default accounts on first run.
    pub async fn load_users(&self) -> Result<Vec<User>> {
        if let Some(users) = self.kv.get::<Vec<User>>(keys::USERS) {
            return Ok(users);
        }
        let users = seed::default_users();
        self.save_users(&users).await?;
        Ok(users)
    }

    async fn save_users(&self, users: &[User]) -> Result<()> {
        self.kv.set(keys::USERS, &users)?;
        for user in users {
            if let Err(e) = tokio::time::timeout(self.db_timeout, self.durable.save_user(user))
                .await
                .map_err(|_| HubError::StorageUnavailable("user save timed out".to_string()))
                .and_then(|r| r)
            {
                warn!(user = %user.username, error = %e, "advisory user save skipped");
            }
        }
        Ok(())
    }

    /// Signs in by username, email, or display name (all matched
    /// case-insensitively) and exact password.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session> {
        let lowered = identifier.trim().to_lowercase();
        let password = password.trim();

        let users = self.load_users().await?;
        let user = users
            .iter()
            .find(|u| {
                (u.username.to_lowercase() == lowered
                    || u.email.to_lowercase() == lowered
                    || u.name.to_lowercase() == lowered)
                    && u.password == password
            })
            .ok_or(HubError::InvalidCredentials)?;

        self.open_session(user).await
    }

    /// Registers a view-only account and signs it in.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<Session> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        if email.is_empty() {
            return Err(ValidationError::MissingField("email").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        let mut users = self.load_users().await?;
        if users.iter().any(|u| u.email.to_lowercase() == email) {
            return Err(ValidationError::EmailTaken(email).into());
        }

        let visible = self.visible_section_ids();
        let user = User {
            id: next_id(&users),
            // Email doubles as the login name for self-registered accounts.
            username: email.clone(),
            password: password.to_string(),
            role: Role::User,
            name: name.to_string(),
            email,
            permissions: Permissions::default_for(Role::User, &visible),
            created_at: now_rfc3339(),
        };
        users.push(user.clone());
        self.save_users(&users).await?;
        self.open_session(&user).await
    }

    /// Creates an account on another user's behalf. Requires the user
    /// management capability; granting any role above `user` further
    /// requires the role management capability.
    pub async fn create_user(&self, session: &Session, input: NewUser) -> Result<User> {
        if !session.permissions.can_manage_users {
            return Err(HubError::PermissionDenied(
                "cannot manage user accounts".to_string(),
            ));
        }
        if input.role != Role::User && !session.permissions.can_manage_roles {
            return Err(HubError::PermissionDenied(format!(
                "cannot create accounts with role {}",
                input.role
            )));
        }
        if input.username.trim().is_empty() {
            return Err(ValidationError::MissingField("username").into());
        }
        if input.password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }
        let email = input.email.trim().to_lowercase();

        let mut users = self.load_users().await?;
        if !email.is_empty() && users.iter().any(|u| u.email.to_lowercase() == email) {
            return Err(ValidationError::EmailTaken(email).into());
        }

        let mut permissions = Permissions::default_for(input.role, &[]);
        permissions.sections = input.sections;
        permissions.editable_sections = input.editable_sections;
        permissions.normalize();

        let user = User {
            id: next_id(&users),
            username: input.username.trim().to_string(),
            password: input.password,
            role: input.role,
            name: input.name,
            email,
            permissions,
            created_at: now_rfc3339(),
        };
        users.push(user.clone());
        self.save_users(&users).await?;

        self.audit
            .append(Activity::new(
                session,
                ActivityAction::CreateUser,
                format!("Created {} account {}", user.role, user.username),
            ))
            .await?;
        Ok(user)
    }

    /// Returns the stored session, rebuilt against the current user
    /// table. A corrupt session is cleared; a session whose user no
    /// longer exists is left in place but not returned.
    pub async fn restore_session(&self) -> Result<Option<Session>> {
        let stored: Session = match self.kv.try_get(keys::SESSION) {
            Ok(Some(s)) => s,
            Ok(None) => return Ok(None),
            Err(e @ HubError::CorruptState(..)) => {
                warn!(error = %e, "stored session unreadable, clearing it");
                self.kv.remove(keys::SESSION)?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let users = self.load_users().await?;
        let Some(user) = users.iter().find(|u| u.id == stored.user_id) else {
            return Ok(None);
        };

        let refreshed = Session::from_user(user, stored.login_time);
        self.kv.set(keys::SESSION, &refreshed)?;
        Ok(Some(refreshed))
    }

    pub async fn logout(&self) -> Result<()> {
        if let Some(session) = self.kv.get::<Session>(keys::SESSION) {
            self.audit
                .append(Activity::new(
                    &session,
                    ActivityAction::Logout,
                    format!("User {} logged out", session.username),
                ))
                .await?;
        }
        self.kv.remove(keys::SESSION)
    }

    /// One-shot flag set at login so the next hub open can force a full
    /// refresh.
    pub fn take_fresh_login(&self) -> Result<bool> {
        Ok(self.kv.take::<bool>(keys::FRESH_LOGIN)?.unwrap_or(false))
    }

    async fn open_session(&self, user: &User) -> Result<Session> {
        let session = Session::from_user(user, now_rfc3339());
        self.kv.set(keys::SESSION, &session)?;
        self.kv.set(keys::FRESH_LOGIN, &true)?;
        self.audit
            .append(Activity::new(
                &session,
                ActivityAction::Login,
                format!("User {} logged in", session.username),
            ))
            .await?;
        Ok(session)
    }

    fn visible_section_ids(&self) -> Vec<String> {
        use infohub_core::sections::{SectionOrderEntry, default_section_ids};
        let configured: Vec<String> = self
            .kv
            .get::<Vec<SectionOrderEntry>>(keys::SECTION_ORDER)
            .unwrap_or_default()
            .into_iter()
            .filter(|e| e.visible)
            .map(|e| e.id)
            .collect();
        if configured.is_empty() {
            default_section_ids()
        } else {
            configured
        }
    }
}

/// Next numeric account id, one past the highest existing.
fn next_id(users: &[User]) -> String {
    let max = users
        .iter()
        .filter_map(|u| u.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}
