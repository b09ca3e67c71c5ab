//! Durable indexed store.
//!
//! Most durable of the three stores but also the most likely to be
//! briefly unavailable; every caller bounds these operations with a
//! timeout and treats failure as advisory.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::Connection;

use infohub_core::sections::Section;
use infohub_core::types::now_rfc3339;
use infohub_core::{Activity, Resource, ResourceKind, Result, User, ViewRecord};

/// The advisory durable store the repository writes through to.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn migrate(&self) -> Result<()>;

    // Users
    async fn save_user(&self, user: &User) -> Result<()>;
    async fn list_users(&self) -> Result<Vec<User>>;

    // Sections (write-only: read paths build sections from the
    // configured order, the table exists for backup replay)
    async fn save_section(&self, section: &Section) -> Result<()>;

    // Resources
    async fn save_resource(&self, resource: &Resource) -> Result<()>;
    async fn get_resource(&self, id: &str) -> Result<Option<Resource>>;
    async fn list_resources(
        &self,
        section_id: &str,
        kind: Option<&ResourceKind>,
    ) -> Result<Vec<Resource>>;
    async fn all_resources(&self) -> Result<Vec<Resource>>;
    async fn delete_resource(&self, id: &str) -> Result<()>;

    // Activities (write-only: the key-value ring is the read path)
    async fn save_activity(&self, activity: &Activity) -> Result<()>;

    // Usage views
    async fn record_view(&self, user_id: &str, resource_id: &str) -> Result<ViewRecord>;
    async fn all_views(&self) -> Result<Vec<ViewRecord>>;
    async fn save_view(&self, view: &ViewRecord) -> Result<()>;

    // Restore support: every table cleared before replay.
    async fn clear_all(&self) -> Result<()>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self::new(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::new(conn))
    }
}

const MIGRATE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    password TEXT NOT NULL,
    role TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    permissions TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);
CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);

CREATE TABLE IF NOT EXISTS sections (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    icon TEXT NOT NULL DEFAULT '',
    color TEXT NOT NULL DEFAULT '',
    intro TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS resources (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '[]',
    kind TEXT NOT NULL,
    section_id TEXT NOT NULL,
    user_id TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT '',
    updated_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_resources_section ON resources(section_id);
CREATE INDEX IF NOT EXISTS idx_resources_kind ON resources(kind);
CREATE INDEX IF NOT EXISTS idx_resources_user ON resources(user_id);
CREATE INDEX IF NOT EXISTS idx_resources_created ON resources(created_at);

CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL DEFAULT '',
    username TEXT NOT NULL DEFAULT '',
    action TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    timestamp TEXT NOT NULL,
    ip TEXT NOT NULL DEFAULT '127.0.0.1'
);
CREATE INDEX IF NOT EXISTS idx_activities_user ON activities(user_id);
CREATE INDEX IF NOT EXISTS idx_activities_action ON activities(action);
CREATE INDEX IF NOT EXISTS idx_activities_timestamp ON activities(timestamp);

CREATE TABLE IF NOT EXISTS views (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL DEFAULT '',
    resource_id TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 0,
    first_viewed_at TEXT NOT NULL,
    last_viewed_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_views_user ON views(user_id);
CREATE INDEX IF NOT EXISTS idx_views_resource ON views(resource_id);
CREATE INDEX IF NOT EXISTS idx_views_last ON views(last_viewed_at);
"#;

fn row_to_resource(row: &rusqlite::Row<'_>) -> rusqlite::Result<Resource> {
    let tags: String = row.get(5)?;
    let kind: String = row.get(6)?;
    Ok(Resource {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        url: row.get(3)?,
        category: row.get(4)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        kind: ResourceKind::from(kind),
        section_id: row.get(7)?,
        user_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const RESOURCE_COLS: &str =
    "id, title, description, url, category, tags, kind, section_id, user_id, created_at, updated_at";

#[async_trait]
impl DurableStore for SqliteStore {
    async fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(MIGRATE_SQL)?;
        Ok(())
    }

    // --- Users ---

    async fn save_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO users (id, username, password, role, name, email, permissions, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                user.id,
                user.username,
                user.password,
                user.role.to_string(),
                user.name,
                user.email,
                serde_json::to_string(&user.permissions)?,
                user.created_at,
            ],
        )?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, username, password, role, name, email, permissions, created_at
             FROM users ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            let role: String = row.get(3)?;
            let permissions: String = row.get(6)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                role,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                permissions,
                row.get::<_, String>(7)?,
            ))
        })?;
        let mut users = Vec::new();
        for row in rows {
            let (id, username, password, role, name, email, permissions, created_at) = row?;
            let role = role.parse().unwrap_or(infohub_core::Role::User);
            let permissions = serde_json::from_str(&permissions)?;
            users.push(User {
                id,
                username,
                password,
                role,
                name,
                email,
                permissions,
                created_at,
            });
        }
        Ok(users)
    }

    // --- Sections ---

    async fn save_section(&self, section: &Section) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO sections (id, name, icon, color, intro) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![section.id, section.name, section.icon, section.color, section.intro],
        )?;
        Ok(())
    }

    // --- Resources ---

    async fn save_resource(&self, resource: &Resource) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO resources
             (id, title, description, url, category, tags, kind, section_id, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                resource.id,
                resource.title,
                resource.description,
                resource.url,
                resource.category,
                serde_json::to_string(&resource.tags)?,
                resource.kind.as_str(),
                resource.section_id,
                resource.user_id,
                resource.created_at,
                resource.updated_at,
            ],
        )?;
        Ok(())
    }

    async fn get_resource(&self, id: &str) -> Result<Option<Resource>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESOURCE_COLS} FROM resources WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map([id], row_to_resource)?;
        match rows.next() {
            Some(r) => Ok(Some(r?)),
            None => Ok(None),
        }
    }

    async fn list_resources(
        &self,
        section_id: &str,
        kind: Option<&ResourceKind>,
    ) -> Result<Vec<Resource>> {
        let conn = self.conn.lock().unwrap();
        let resources = match kind {
            Some(kind) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RESOURCE_COLS} FROM resources
                     WHERE section_id = ?1 AND kind = ?2 ORDER BY created_at"
                ))?;
                let rows = stmt.query_map(
                    rusqlite::params![section_id, kind.as_str()],
                    row_to_resource,
                )?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RESOURCE_COLS} FROM resources
                     WHERE section_id = ?1 ORDER BY created_at"
                ))?;
                let rows = stmt.query_map([section_id], row_to_resource)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(resources)
    }

    async fn all_resources(&self) -> Result<Vec<Resource>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESOURCE_COLS} FROM resources ORDER BY created_at"
        ))?;
        let resources = stmt
            .query_map([], row_to_resource)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(resources)
    }

    async fn delete_resource(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM resources WHERE id = ?1", [id])?;
        Ok(())
    }

    // --- Activities ---

    async fn save_activity(&self, activity: &Activity) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO activities (id, user_id, username, action, description, timestamp, ip)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                activity.id,
                activity.user_id,
                activity.username,
                activity.action.as_str(),
                activity.description,
                activity.timestamp,
                activity.ip,
            ],
        )?;
        Ok(())
    }

    // --- Usage views ---

    async fn record_view(&self, user_id: &str, resource_id: &str) -> Result<ViewRecord> {
        let conn = self.conn.lock().unwrap();
        let id = ViewRecord::key(user_id, resource_id);
        let now = now_rfc3339();
        let existing = conn
            .query_row(
                "SELECT count, first_viewed_at FROM views WHERE id = ?1",
                [&id],
                |row| Ok((row.get::<_, u64>(0)?, row.get::<_, String>(1)?)),
            )
            .ok();
        let view = match existing {
            Some((count, first)) => ViewRecord {
                id: id.clone(),
                user_id: user_id.to_string(),
                resource_id: resource_id.to_string(),
                count: count + 1,
                first_viewed_at: first,
                last_viewed_at: now,
            },
            None => ViewRecord {
                id: id.clone(),
                user_id: user_id.to_string(),
                resource_id: resource_id.to_string(),
                count: 1,
                first_viewed_at: now.clone(),
                last_viewed_at: now,
            },
        };
        conn.execute(
            "INSERT OR REPLACE INTO views (id, user_id, resource_id, count, first_viewed_at, last_viewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                view.id,
                view.user_id,
                view.resource_id,
                view.count,
                view.first_viewed_at,
                view.last_viewed_at,
            ],
        )?;
        Ok(view)
    }

    async fn all_views(&self) -> Result<Vec<ViewRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, resource_id, count, first_viewed_at, last_viewed_at FROM views
             ORDER BY last_viewed_at DESC",
        )?;
        let views = stmt
            .query_map([], |row| {
                Ok(ViewRecord {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    resource_id: row.get(2)?,
                    count: row.get(3)?,
                    first_viewed_at: row.get(4)?,
                    last_viewed_at: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(views)
    }

    async fn save_view(&self, view: &ViewRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO views (id, user_id, resource_id, count, first_viewed_at, last_viewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                view.id,
                view.user_id,
                view.resource_id,
                view.count,
                view.first_viewed_at,
                view.last_viewed_at,
            ],
        )?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "DELETE FROM users; DELETE FROM sections; DELETE FROM resources;
             DELETE FROM activities; DELETE FROM views;",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str) -> Resource {
        Resource {
            id: id.to_string(),
            title: "Cost model".into(),
            description: "Quarterly template".into(),
            url: "https://example.com/model".into(),
            category: "template".into(),
            tags: vec!["finance".into()],
            kind: ResourceKind::Playbooks,
            section_id: "costing".into(),
            user_id: "1".into(),
            created_at: now_rfc3339(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn resource_roundtrip_with_indexes() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.migrate().await.unwrap();

        let r = resource("costing:playbooks:a:1");
        store.save_resource(&r).await.unwrap();

        let by_id = store.get_resource(&r.id).await.unwrap().unwrap();
        assert_eq!(by_id, r);

        let by_kind = store
            .list_resources("costing", Some(&ResourceKind::Playbooks))
            .await
            .unwrap();
        assert_eq!(by_kind.len(), 1);
        assert!(store
            .list_resources("costing", Some(&ResourceKind::Dashboards))
            .await
            .unwrap()
            .is_empty());

        store.delete_resource(&r.id).await.unwrap();
        assert!(store.get_resource(&r.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn view_increment_is_idempotent_per_pair() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.migrate().await.unwrap();

        store.record_view("1", "r1").await.unwrap();
        let second = store.record_view("1", "r1").await.unwrap();
        assert_eq!(second.count, 2);

        let views = store.all_views().await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, "1:r1");
        assert!(views[0].first_viewed_at <= views[0].last_viewed_at);
    }

    #[tokio::test]
    async fn clear_all_empties_every_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.migrate().await.unwrap();
        store.save_resource(&resource("x:playbooks:1:1")).await.unwrap();
        store.record_view("1", "x").await.unwrap();
        store.clear_all().await.unwrap();
        assert!(store.all_resources().await.unwrap().is_empty());
        assert!(store.all_views().await.unwrap().is_empty());
    }
}
