//! One logical resource collection over three physical stores.
//!
//! Writes land in the per-section and aggregate stores synchronously,
//! then go to the durable database best-effort under a timeout; the
//! interactive path never waits on a slow or uninitialized database.
//! Reads merge all three sources by record id, last writer wins.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use infohub_core::error::{Entity, HubError};
use infohub_core::types::now_rfc3339;
use infohub_core::{Resource, ResourceKind, Result};

use crate::local::{AggregateStore, SectionStore};
use crate::merge::{self, Source};
use crate::notify::{ChangeBus, ChangeKind};
use crate::sqlite::DurableStore;

/// Fields callers may change on an existing resource.
#[derive(Debug, Clone, Default)]
pub struct ResourcePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct ResourceRepository {
    section: SectionStore,
    aggregate: AggregateStore,
    durable: Arc<dyn DurableStore>,
    db_timeout: Duration,
    bus: ChangeBus,
}

impl ResourceRepository {
    pub fn new(
        section: SectionStore,
        aggregate: AggregateStore,
        durable: Arc<dyn DurableStore>,
        db_timeout: Duration,
        bus: ChangeBus,
    ) -> Self {
        Self {
            section,
            aggregate,
            durable,
            db_timeout,
            bus,
        }
    }

    /// Merged view of one (section, kind) collection.
    ///
    /// Legacy records without an id are assigned one here and the
    /// assignment is written back to all three stores, so the migration
    /// is self-healing rather than a one-time batch job.
    pub async fn list(&self, section_id: &str, kind: &ResourceKind) -> Result<Vec<Resource>> {
        let db = self.bounded_read(section_id, kind).await;
        let local_section = self.section.list(section_id, kind);
        let local_aggregate = self.aggregate.list(section_id, kind);

        let merged = merge::merge_lists(vec![
            (Source::Aggregate, local_aggregate),
            (Source::Section, local_section),
            (Source::Database, db),
        ]);

        let repaired: Vec<(String, String)> = merged
            .iter()
            .filter(|r| !r.id.is_empty())
            .map(|r| (r.title.clone(), r.url.clone()))
            .collect();

        let mut out = Vec::with_capacity(merged.len());
        for mut r in merged {
            if r.id.is_empty() {
                // Drop the id-less copies everywhere before writing the
                // repaired record, or they would linger next to it. The
                // durable store can hold one from an imported backup.
                let (title, url) = (r.title.clone(), r.url.clone());
                self.section.remove(section_id, kind, "", Some((&title, &url)))?;
                self.aggregate.remove(section_id, kind, "", Some((&title, &url)))?;
                if let Err(e) = self.bounded(self.durable.delete_resource("")).await {
                    warn!(section_id, error = %e, "advisory cleanup of id-less row skipped");
                }
                if repaired.iter().any(|(t, u)| *t == title && *u == url) {
                    // Same record already carries an id from an earlier
                    // repair; keep that id stable instead of minting
                    // another one.
                    continue;
                }
                r.id = Resource::new_id(section_id, kind);
                self.write_back(&r).await?;
            }
            out.push(r);
        }
        Ok(out)
    }

    pub async fn create(&self, mut resource: Resource) -> Result<Resource> {
        resource.id = Resource::new_id(&resource.section_id, &resource.kind);
        if resource.created_at.is_empty() {
            resource.created_at = now_rfc3339();
        }
        self.write_back(&resource).await?;
        self.bus
            .publish(ChangeKind::ResourceCreated, Some(&resource.section_id))?;
        Ok(resource)
    }

    /// Applies a patch to an existing record. The record is looked up
    /// by id; when the id is gone (legacy inconsistency) the
    /// `(title, url)` pair captured at edit time is tried instead.
    pub async fn update(
        &self,
        section_id: &str,
        kind: &ResourceKind,
        id: &str,
        edit_key: Option<(&str, &str)>,
        patch: ResourcePatch,
    ) -> Result<Resource> {
        let existing = self
            .find(section_id, kind, id, edit_key)
            .await?
            .ok_or_else(|| HubError::NotFound(Entity::Resource, id.to_string()))?;

        let mut updated = existing;
        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(url) = patch.url {
            updated.url = url;
        }
        if let Some(category) = patch.category {
            updated.category = category;
        }
        if let Some(tags) = patch.tags {
            updated.tags = tags;
        }
        updated.updated_at = Some(now_rfc3339());

        self.write_back(&updated).await?;
        self.bus
            .publish(ChangeKind::ResourceUpdated, Some(section_id))?;
        Ok(updated)
    }

    pub async fn delete(
        &self,
        section_id: &str,
        kind: &ResourceKind,
        id: &str,
        edit_key: Option<(&str, &str)>,
    ) -> Result<Resource> {
        let removed_section = self.section.remove(section_id, kind, id, edit_key)?;
        let removed_aggregate = self.aggregate.remove(section_id, kind, id, edit_key)?;
        let removed = match removed_section.or(removed_aggregate) {
            Some(r) => r,
            // Neither local store had it: the record may live only in
            // the durable database, or locally under a repaired id the
            // caller does not know. The merged view finds both.
            None => {
                let found = self
                    .find(section_id, kind, id, edit_key)
                    .await?
                    .ok_or_else(|| HubError::NotFound(Entity::Resource, id.to_string()))?;
                self.section.remove(section_id, kind, &found.id, None)?;
                self.aggregate.remove(section_id, kind, &found.id, None)?;
                found
            }
        };

        let durable = self.durable.clone();
        let target = if removed.id.is_empty() { id } else { &removed.id };
        if let Err(e) = self.bounded(durable.delete_resource(target)).await {
            warn!(id = target, error = %e, "advisory delete skipped");
        }

        self.bus
            .publish(ChangeKind::ResourceDeleted, Some(section_id))?;
        Ok(removed)
    }

    pub async fn find(
        &self,
        section_id: &str,
        kind: &ResourceKind,
        id: &str,
        edit_key: Option<(&str, &str)>,
    ) -> Result<Option<Resource>> {
        let all = self.list(section_id, kind).await?;
        let by_id = all.iter().find(|r| r.id == id).cloned();
        if by_id.is_some() {
            return Ok(by_id);
        }
        Ok(edit_key.and_then(|(title, url)| {
            all.into_iter().find(|r| r.title == title && r.url == url)
        }))
    }

    /// Writes one record to all three stores: the two synchronous
    /// stores first, then the advisory database under its timeout.
    async fn write_back(&self, resource: &Resource) -> Result<()> {
        self.section.upsert(resource)?;
        self.aggregate.upsert(resource)?;
        if let Err(e) = self.bounded(self.durable.save_resource(resource)).await {
            warn!(id = %resource.id, error = %e, "advisory save skipped");
        }
        Ok(())
    }

    async fn bounded_read(&self, section_id: &str, kind: &ResourceKind) -> Vec<Resource> {
        match self
            .bounded(self.durable.list_resources(section_id, Some(kind)))
            .await
        {
            Ok(resources) => resources,
            Err(e) => {
                warn!(section_id, error = %e, "advisory read failed, merging local stores only");
                Vec::new()
            }
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.db_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(HubError::StorageUnavailable(format!(
                "database operation exceeded {:?}",
                self.db_timeout
            ))),
        }
    }
}
