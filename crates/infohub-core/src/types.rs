use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// Returns the current time as an RFC 3339 UTC string.
///
/// All persisted timestamps are strings in this format so that records
/// written by different contexts stay lexicographically comparable.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Parses a persisted timestamp, returning `None` for empty or
/// unparsable values (legacy records).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Manager => write!(f, "manager"),
            Role::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "user" => Ok(Role::User),
            _ => Err(HubError::Config(format!("unknown role: {s}"))),
        }
    }
}

/// Capability set embedded in every user record.
///
/// All fields are mandatory; callers never re-derive defaults at the
/// call site (see [`Permissions::default_for`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_manage_users: bool,
    pub can_edit_all_sections: bool,
    pub can_delete_resources: bool,
    pub can_view_audit_log: bool,
    pub can_manage_roles: bool,
    /// Sections the user may view.
    pub sections: BTreeSet<String>,
    /// Sections the user may edit. Kept a subset of `sections` by
    /// [`Permissions::normalize`].
    pub editable_sections: BTreeSet<String>,
}

impl Permissions {
    /// Default permission set for a role over the given visible sections.
    pub fn default_for(role: Role, visible: &[String]) -> Self {
        let all: BTreeSet<String> = visible.iter().cloned().collect();
        match role {
            Role::Admin => Permissions {
                can_manage_users: true,
                can_edit_all_sections: true,
                can_delete_resources: true,
                can_view_audit_log: true,
                can_manage_roles: true,
                sections: all.clone(),
                editable_sections: all,
            },
            Role::Manager => Permissions {
                can_manage_users: true,
                can_edit_all_sections: false,
                can_delete_resources: true,
                can_view_audit_log: false,
                can_manage_roles: false,
                sections: all.clone(),
                editable_sections: all,
            },
            Role::User => Permissions {
                can_manage_users: false,
                can_edit_all_sections: false,
                can_delete_resources: false,
                can_view_audit_log: false,
                can_manage_roles: false,
                sections: all,
                editable_sections: BTreeSet::new(),
            },
        }
    }

    /// Widens `sections` to cover every editable section, restoring the
    /// `editable_sections ⊆ sections` invariant before a user record is
    /// written.
    pub fn normalize(&mut self) {
        let extra: Vec<String> = self
            .editable_sections
            .iter()
            .filter(|s| !self.sections.contains(*s))
            .cloned()
            .collect();
        for s in extra {
            self.sections.insert(s);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    /// Stored in clear text. Known limitation carried over from the
    /// original deployment; see DESIGN.md.
    pub password: String,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub permissions: Permissions,
    pub created_at: String,
}

/// Snapshot of a user taken at login time.
///
/// Not independently authoritative: permissions are re-synced from the
/// user table every time a context restores the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub login_time: String,
    pub permissions: Permissions,
}

impl Session {
    pub fn from_user(user: &User, login_time: String) -> Self {
        Session {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            name: user.name.clone(),
            email: user.email.clone(),
            login_time,
            permissions: user.permissions.clone(),
        }
    }
}

/// Resource sub-category within a section.
///
/// Serialized under the original wire names (`boxLinks` camelCase);
/// unknown names round-trip as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Playbooks,
    BoxLinks,
    Dashboards,
    Custom(String),
}

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Playbooks => "playbooks",
            ResourceKind::BoxLinks => "boxLinks",
            ResourceKind::Dashboards => "dashboards",
            ResourceKind::Custom(s) => s,
        }
    }
}

impl From<String> for ResourceKind {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "playbooks" | "playbook" => ResourceKind::Playbooks,
            "boxlinks" | "boxlink" | "box-links" => ResourceKind::BoxLinks,
            "dashboards" | "dashboard" => ResourceKind::Dashboards,
            _ => ResourceKind::Custom(s),
        }
    }
}

impl From<ResourceKind> for String {
    fn from(k: ResourceKind) -> Self {
        k.as_str().to_string()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for ResourceKind {
    fn default() -> Self {
        ResourceKind::Playbooks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Stable opaque id, `<sectionId>:<type>:<timestamp36>:<random36>`.
    /// Legacy records may carry an empty id until the lazy migration
    /// assigns one.
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Defaulted on deserialize: bundle-held records historically
    /// omitted `type` and `sectionId`; the stores re-stamp them from
    /// context on read.
    #[serde(rename = "type", default)]
    pub kind: ResourceKind,
    #[serde(default)]
    pub section_id: String,
    /// Owner; empty for legacy records, which the permission model
    /// treats permissively.
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Resource {
    /// Generates a fresh id encoding section and type provenance.
    pub fn new_id(section_id: &str, kind: &ResourceKind) -> String {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let salt: u32 = rand::random();
        format!(
            "{}:{}:{}:{}",
            section_id,
            kind.as_str(),
            base36(millis),
            base36(salt as u64)
        )
    }

    /// Latest modification instant, for last-writer-wins merging.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| parse_timestamp(&self.created_at))
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Login,
    Logout,
    OpenHub,
    CloseHub,
    OpenSection,
    CloseSection,
    ClickHubCard,
    SwitchSectionTab,
    ViewResource,
    CreateResource,
    UpdateResource,
    DeleteResource,
    CreateUser,
    Export,
    Import,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Login => "LOGIN",
            ActivityAction::Logout => "LOGOUT",
            ActivityAction::OpenHub => "OPEN_HUB",
            ActivityAction::CloseHub => "CLOSE_HUB",
            ActivityAction::OpenSection => "OPEN_SECTION",
            ActivityAction::CloseSection => "CLOSE_SECTION",
            ActivityAction::ClickHubCard => "CLICK_HUB_CARD",
            ActivityAction::SwitchSectionTab => "SWITCH_SECTION_TAB",
            ActivityAction::ViewResource => "VIEW_RESOURCE",
            ActivityAction::CreateResource => "CREATE_RESOURCE",
            ActivityAction::UpdateResource => "UPDATE_RESOURCE",
            ActivityAction::DeleteResource => "DELETE_RESOURCE",
            ActivityAction::CreateUser => "CREATE_USER",
            ActivityAction::Export => "EXPORT",
            ActivityAction::Import => "IMPORT",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in the append-only activity ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub action: ActivityAction,
    pub description: String,
    pub timestamp: String,
    #[serde(default = "default_ip")]
    pub ip: String,
}

fn default_ip() -> String {
    "127.0.0.1".to_string()
}

impl Activity {
    pub fn new(session: &Session, action: ActivityAction, description: impl Into<String>) -> Self {
        Activity {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: session.user_id.clone(),
            username: session.username.clone(),
            action,
            description: description.into(),
            timestamp: now_rfc3339(),
            ip: default_ip(),
        }
    }
}

/// Per (user, resource) usage aggregate, incremented on every open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    /// `<userId>:<resourceId>` — one row per pair.
    pub id: String,
    pub user_id: String,
    pub resource_id: String,
    pub count: u64,
    pub first_viewed_at: String,
    pub last_viewed_at: String,
}

impl ViewRecord {
    pub fn key(user_id: &str, resource_id: &str) -> String {
        format!("{user_id}:{resource_id}")
    }
}
