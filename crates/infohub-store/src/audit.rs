//! Append-only activity ledger.
//!
//! Newest-first ring in the key-value store, hard-capped; the durable
//! database gets a best-effort copy. Read access control is the
//! caller's job, not enforced here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::warn;

use infohub_core::{Activity, ActivityAction, Result, Session};

use crate::keys;
use crate::kv::JsonKvStore;
use crate::sqlite::DurableStore;

#[derive(Clone)]
pub struct AuditLog {
    kv: Arc<JsonKvStore>,
    durable: Arc<dyn DurableStore>,
    cap: usize,
    db_timeout: Duration,
}

impl AuditLog {
    pub fn new(
        kv: Arc<JsonKvStore>,
        durable: Arc<dyn DurableStore>,
        cap: usize,
        db_timeout: Duration,
    ) -> Self {
        Self {
            kv,
            durable,
            cap,
            db_timeout,
        }
    }

    pub async fn append(&self, activity: Activity) -> Result<()> {
        let mut activities: Vec<Activity> = self.kv.get(keys::ACTIVITIES).unwrap_or_default();
        activities.insert(0, activity.clone());
        activities.truncate(self.cap);
        self.kv.set(keys::ACTIVITIES, &activities)?;

        let save = self.durable.save_activity(&activity);
        match tokio::time::timeout(self.db_timeout, save).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(action = %activity.action, error = %e, "advisory audit copy skipped"),
            Err(_) => warn!(action = %activity.action, "advisory audit copy timed out"),
        }
        Ok(())
    }

    /// Full ledger, newest first.
    pub fn list(&self) -> Vec<Activity> {
        self.kv.get(keys::ACTIVITIES).unwrap_or_default()
    }
}

/// Tracks one page instance so its close/duration entry is logged at
/// most once, whether triggered by visibility loss or unload.
pub struct PageTimer {
    close_action: ActivityAction,
    label: String,
    opened: std::time::Instant,
    logged: AtomicBool,
}

impl PageTimer {
    pub fn new(close_action: ActivityAction, label: impl Into<String>) -> Self {
        Self {
            close_action,
            label: label.into(),
            opened: std::time::Instant::now(),
            logged: AtomicBool::new(false),
        }
    }

    /// Logs the close entry with the elapsed duration. Subsequent calls
    /// are no-ops.
    pub async fn close(&self, audit: &AuditLog, session: &Session) -> Result<()> {
        if self.logged.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let secs = self.opened.elapsed().as_secs();
        let description = format!("Closed {} after {}s", self.label, secs);
        audit
            .append(Activity::new(session, self.close_action, description))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteStore;
    use infohub_core::{Permissions, Role};
    use tempfile::TempDir;

    fn session() -> Session {
        Session {
            user_id: "1".into(),
            username: "admin".into(),
            role: Role::Admin,
            name: "Admin".into(),
            email: "admin@company.com".into(),
            login_time: infohub_core::types::now_rfc3339(),
            permissions: Permissions::default_for(Role::Admin, &[]),
        }
    }

    fn audit(tmp: &TempDir, cap: usize) -> AuditLog {
        let kv = Arc::new(JsonKvStore::open(&tmp.path().join("s.json")).unwrap());
        let durable = Arc::new(SqliteStore::open_in_memory().unwrap());
        AuditLog::new(kv, durable, cap, Duration::from_millis(500))
    }

    #[tokio::test]
    async fn ring_drops_oldest_beyond_cap() {
        let tmp = TempDir::new().unwrap();
        let log = audit(&tmp, 1000);
        let s = session();
        for i in 0..1005 {
            log.append(Activity::new(&s, ActivityAction::ViewResource, format!("v{i}")))
                .await
                .unwrap();
        }
        let entries = log.list();
        assert_eq!(entries.len(), 1000);
        // Newest first; the five oldest are gone.
        assert_eq!(entries[0].description, "v1004");
        assert_eq!(entries[999].description, "v5");
    }

    #[tokio::test]
    async fn page_timer_logs_close_once() {
        let tmp = TempDir::new().unwrap();
        let log = audit(&tmp, 1000);
        let s = session();
        let timer = PageTimer::new(ActivityAction::CloseSection, "section costing");
        timer.close(&log, &s).await.unwrap();
        timer.close(&log, &s).await.unwrap();
        let entries = log.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ActivityAction::CloseSection);
        assert!(entries[0].description.starts_with("Closed section costing after"));
    }
}
