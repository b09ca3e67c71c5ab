//! The hub context: one explicit object wiring the stores, repository,
//! audit log, and change bus together. Constructed per process with
//! `open`, passed into whatever surface consumes it; no module-level
//! singletons.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use infohub_core::error::{Entity, HubError, ValidationError};
use infohub_core::permissions;
use infohub_core::sections::{SectionConfig, SectionOrderEntry, default_sections};
use infohub_core::types::now_rfc3339;
use infohub_core::{
    Activity, ActivityAction, HubConfig, Resource, ResourceKind, Result, Session, ViewRecord,
};

use crate::audit::{AuditLog, PageTimer};
use crate::keys;
use crate::kv::JsonKvStore;
use crate::local::{AggregateStore, SectionStore};
use crate::notify::{ChangeBus, ChangeKind};
use crate::repository::{ResourcePatch, ResourceRepository};
use crate::snapshot::{Backup, Snapshot, SnapshotBuilder};
use crate::sqlite::{DurableStore, SqliteStore};

/// Input for a new resource; id, owner, and timestamps are assigned by
/// the hub.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub title: String,
    pub description: String,
    pub url: String,
    pub category: String,
    pub tags: Vec<String>,
    pub kind: ResourceKind,
    pub section_id: String,
}

pub struct Hub {
    kv: Arc<JsonKvStore>,
    durable: Arc<dyn DurableStore>,
    repo: ResourceRepository,
    audit: AuditLog,
    bus: ChangeBus,
    db_timeout: Duration,
}

impl Hub {
    /// Opens the hub from its configured base directory. The durable
    /// store is migrated best-effort: a database that cannot come up
    /// never blocks the interactive path.
    pub async fn open(base_dir: &Path, config: &HubConfig) -> Result<Self> {
        let kv = Arc::new(JsonKvStore::open(&config.kv_path(base_dir))?);
        let durable: Arc<dyn DurableStore> =
            Arc::new(SqliteStore::open(&config.db_path(base_dir))?);
        let hub = Self::with_parts(kv, durable, config.db_timeout(), config.hub.audit_cap);
        match tokio::time::timeout(hub.db_timeout, hub.durable.migrate()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "durable store migration failed, continuing without it");
            }
            Err(_) => warn!("durable store migration timed out, continuing without it"),
        }
        Ok(hub)
    }

    pub fn with_parts(
        kv: Arc<JsonKvStore>,
        durable: Arc<dyn DurableStore>,
        db_timeout: Duration,
        audit_cap: usize,
    ) -> Self {
        let bus = ChangeBus::new(kv.clone());
        let section = SectionStore::new(kv.clone());
        let aggregate = AggregateStore::new(kv.clone());
        let repo = ResourceRepository::new(
            section,
            aggregate,
            durable.clone(),
            db_timeout,
            bus.clone(),
        );
        let audit = AuditLog::new(kv.clone(), durable.clone(), audit_cap, db_timeout);
        Self {
            kv,
            durable,
            repo,
            audit,
            bus,
            db_timeout,
        }
    }

    pub fn kv(&self) -> Arc<JsonKvStore> {
        self.kv.clone()
    }

    pub fn durable(&self) -> Arc<dyn DurableStore> {
        self.durable.clone()
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn db_timeout(&self) -> Duration {
        self.db_timeout
    }

    pub fn page_timer(&self, close_action: ActivityAction, label: impl Into<String>) -> PageTimer {
        PageTimer::new(close_action, label)
    }

    pub async fn log(
        &self,
        session: &Session,
        action: ActivityAction,
        description: impl Into<String>,
    ) -> Result<()> {
        self.audit
            .append(Activity::new(session, action, description))
            .await
    }

    // --- Resources ---

    pub async fn list_resources(
        &self,
        session: &Session,
        section_id: &str,
        kind: &ResourceKind,
    ) -> Result<Vec<Resource>> {
        if !permissions::can_view(session, section_id) {
            return Err(denied("view section", section_id));
        }
        self.repo.list(section_id, kind).await
    }

    pub async fn add_resource(&self, session: &Session, input: NewResource) -> Result<Resource> {
        if !permissions::can_edit(session, &input.section_id) {
            return Err(denied("add resources to section", &input.section_id));
        }
        validate_new(&input)?;

        let resource = Resource {
            id: String::new(),
            title: input.title,
            description: input.description,
            url: input.url,
            category: input.category,
            tags: input.tags,
            kind: input.kind,
            section_id: input.section_id,
            user_id: session.user_id.clone(),
            created_at: now_rfc3339(),
            updated_at: None,
        };
        let created = self.repo.create(resource).await?;
        self.log(
            session,
            ActivityAction::CreateResource,
            format!(
                "Added {} '{}' to section {}",
                created.kind, created.title, created.section_id
            ),
        )
        .await?;
        Ok(created)
    }

    pub async fn update_resource(
        &self,
        session: &Session,
        section_id: &str,
        kind: &ResourceKind,
        id: &str,
        edit_key: Option<(&str, &str)>,
        patch: ResourcePatch,
    ) -> Result<Resource> {
        if !permissions::can_edit(session, section_id) {
            return Err(denied("edit resources in section", section_id));
        }
        if let Some(url) = patch.url.as_deref() {
            validate_url(url)?;
        }
        let existing = self
            .repo
            .find(section_id, kind, id, edit_key)
            .await?
            .ok_or_else(|| HubError::NotFound(Entity::Resource, id.to_string()))?;
        if !permissions::can_modify_resource(session, &existing) {
            return Err(denied("edit resources owned by others in section", section_id));
        }

        let updated = self
            .repo
            .update(section_id, kind, id, edit_key, patch)
            .await?;
        self.log(
            session,
            ActivityAction::UpdateResource,
            format!(
                "Updated {} '{}' in section {}",
                updated.kind, updated.title, updated.section_id
            ),
        )
        .await?;
        Ok(updated)
    }

    pub async fn delete_resource(
        &self,
        session: &Session,
        section_id: &str,
        kind: &ResourceKind,
        id: &str,
        edit_key: Option<(&str, &str)>,
    ) -> Result<Resource> {
        if !permissions::can_delete(session, section_id) {
            return Err(denied("delete resources in section", section_id));
        }
        let existing = self
            .repo
            .find(section_id, kind, id, edit_key)
            .await?
            .ok_or_else(|| HubError::NotFound(Entity::Resource, id.to_string()))?;
        if !permissions::can_modify_resource(session, &existing) {
            return Err(denied(
                "delete resources owned by others in section",
                section_id,
            ));
        }

        let removed = self.repo.delete(section_id, kind, id, edit_key).await?;
        self.log(
            session,
            ActivityAction::DeleteResource,
            format!(
                "Deleted {} '{}' from section {}",
                removed.kind, removed.title, section_id
            ),
        )
        .await?;
        Ok(removed)
    }

    /// Records one open of a resource link and the matching activity.
    pub async fn record_view(&self, session: &Session, resource_id: &str) -> Result<ViewRecord> {
        let record = match tokio::time::timeout(
            self.db_timeout,
            self.durable.record_view(&session.user_id, resource_id),
        )
        .await
        {
            Ok(res) => res?,
            Err(_) => {
                return Err(HubError::StorageUnavailable(
                    "view recording timed out".to_string(),
                ));
            }
        };
        self.log(
            session,
            ActivityAction::ViewResource,
            format!("Viewed resource {resource_id}"),
        )
        .await?;
        Ok(record)
    }

    // --- Section configuration ---

    /// Configured section order, falling back to the eight defaults.
    pub fn section_order(&self) -> Vec<SectionOrderEntry> {
        self.kv
            .get::<Vec<SectionOrderEntry>>(keys::SECTION_ORDER)
            .unwrap_or_else(|| default_sections().iter().map(SectionOrderEntry::from).collect())
    }

    pub fn visible_section_ids(&self) -> Vec<String> {
        self.section_order()
            .into_iter()
            .filter(|e| e.visible)
            .map(|e| e.id)
            .collect()
    }

    pub fn section_config(&self, section_id: &str) -> SectionConfig {
        self.kv
            .get(&keys::section_config(section_id))
            .unwrap_or_default()
    }

    pub fn update_section_config(
        &self,
        session: &Session,
        section_id: &str,
        config: &SectionConfig,
    ) -> Result<()> {
        if !permissions::is_admin(session) {
            return Err(denied("configure section", section_id));
        }
        self.kv.set(&keys::section_config(section_id), config)?;
        self.bus.publish(ChangeKind::ConfigChanged, Some(section_id))
    }

    pub fn set_section_order(
        &self,
        session: &Session,
        order: &[SectionOrderEntry],
    ) -> Result<()> {
        if !permissions::is_admin(session) {
            return Err(HubError::PermissionDenied(
                "only admins may reorder sections".to_string(),
            ));
        }
        self.kv.set(keys::SECTION_ORDER, &order)?;
        self.bus.publish(ChangeKind::ConfigChanged, None)
    }

    // --- Export / import ---

    fn snapshot_builder(&self) -> SnapshotBuilder {
        SnapshotBuilder::new(
            self.kv.clone(),
            SectionStore::new(self.kv.clone()),
            AggregateStore::new(self.kv.clone()),
            self.durable.clone(),
            self.db_timeout,
        )
    }

    pub async fn export_snapshot(&self, session: &Session) -> Result<Snapshot> {
        let snapshot = self.snapshot_builder().build().await?;
        self.log(
            session,
            ActivityAction::Export,
            format!("Exported snapshot of {} resources", snapshot.resources.len()),
        )
        .await?;
        Ok(snapshot)
    }

    pub async fn export_backup(&self, session: &Session) -> Result<Backup> {
        let backup = self.snapshot_builder().build_backup().await?;
        self.log(session, ActivityAction::Export, "Exported full backup")
            .await?;
        Ok(backup)
    }

    pub async fn import_backup(&self, session: &Session, backup: &Backup) -> Result<()> {
        if !permissions::is_admin(session) {
            return Err(HubError::PermissionDenied(
                "only admins may restore a backup".to_string(),
            ));
        }
        self.snapshot_builder().restore(backup).await?;
        self.bus.publish(ChangeKind::Imported, None)?;
        self.log(
            session,
            ActivityAction::Import,
            format!("Restored backup of {}", backup.snapshot.export_date),
        )
        .await
    }
}

fn denied(what: &str, section_id: &str) -> HubError {
    HubError::PermissionDenied(format!("cannot {what} {section_id}"))
}

fn validate_new(input: &NewResource) -> Result<()> {
    if input.title.trim().is_empty() {
        return Err(ValidationError::MissingField("title").into());
    }
    validate_url(&input.url)
}

/// Minimal URL shape check: a scheme followed by a non-empty remainder.
fn validate_url(url: &str) -> Result<()> {
    let invalid = || HubError::Validation(ValidationError::InvalidUrl(url.to_string()));
    let (scheme, rest) = url.trim().split_once("://").ok_or_else(invalid)?;
    let scheme_ok = !scheme.is_empty()
        && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'));
    if !scheme_ok || rest.is_empty() {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("ftp://host/file").is_ok());
        assert!(validate_url("example.com").is_err());
        assert!(validate_url("://nope").is_err());
        assert!(validate_url("https://").is_err());
    }
}
