//! Point-in-time export of the whole hub.
//!
//! The snapshot is an immutable view assembled from every store:
//! users deduped by id (key-value table wins), sections seeded from the
//! configured order and enriched with anything a resource references,
//! resources deduped by canonical key across all three stores. The
//! builder may opportunistically repair the durable store when it finds
//! a record only in a fallback store, but never mutates the logical
//! state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use infohub_core::sections::{Section, SectionOrderEntry, default_sections};
use infohub_core::types::now_rfc3339;
use infohub_core::{Activity, Resource, Result, User, ViewRecord};

use crate::keys;
use crate::kv::JsonKvStore;
use crate::local::{AggregateStore, SectionStore};
use crate::sqlite::DurableStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub users: Vec<User>,
    pub sections: Vec<Section>,
    pub resources: Vec<Resource>,
    pub activities: Vec<Activity>,
    pub views: Vec<ViewRecord>,
    pub export_date: String,
    pub total_records: TotalRecords,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalRecords {
    pub users: usize,
    pub sections: usize,
    pub resources: usize,
    pub activities: usize,
    pub views: usize,
}

/// Full-state backup: the snapshot plus the raw key-value entries, so
/// restore can rehydrate both persistence layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub local_state: BTreeMap<String, Value>,
}

/// Canonical identity for deduplication: the id when present, else a
/// normalized `(title, url)` pair.
pub fn canonical_key(r: &Resource) -> String {
    if !r.id.is_empty() {
        return format!("id:{}", r.id);
    }
    format!(
        "t:{}|u:{}",
        r.title.trim().to_lowercase(),
        canonical_url(&r.url)
    )
}

/// Normalizes a URL for identity comparison: default scheme, lowercase
/// host, trailing slashes stripped.
pub fn canonical_url(url: &str) -> String {
    let raw = url.trim();
    if raw.is_empty() {
        return String::new();
    }
    let with_scheme;
    let full = if raw.contains("://") {
        raw
    } else {
        with_scheme = format!("https://{raw}");
        &with_scheme
    };
    let (scheme, rest) = match full.split_once("://") {
        Some(parts) => parts,
        None => ("https", full),
    };
    let (host, path) = match rest.split_once('/') {
        Some((h, p)) => (h, format!("/{p}")),
        None => (rest, String::new()),
    };
    let path = path.trim_end_matches('/');
    format!("{}://{}{}", scheme.to_lowercase(), host.to_lowercase(), path).to_lowercase()
}

pub struct SnapshotBuilder {
    kv: Arc<JsonKvStore>,
    section: SectionStore,
    aggregate: AggregateStore,
    durable: Arc<dyn DurableStore>,
    db_timeout: Duration,
}

impl SnapshotBuilder {
    pub fn new(
        kv: Arc<JsonKvStore>,
        section: SectionStore,
        aggregate: AggregateStore,
        durable: Arc<dyn DurableStore>,
        db_timeout: Duration,
    ) -> Self {
        Self {
            kv,
            section,
            aggregate,
            durable,
            db_timeout,
        }
    }

    pub async fn build(&self) -> Result<Snapshot> {
        let users = self.merged_users().await?;
        let resources = self.merged_resources().await;
        let sections = self.canonical_sections(&resources);
        let activities: Vec<Activity> = self.kv.get(keys::ACTIVITIES).unwrap_or_default();
        let views = self
            .bounded(self.durable.all_views())
            .await
            .unwrap_or_default();

        let total_records = TotalRecords {
            users: users.len(),
            sections: sections.len(),
            resources: resources.len(),
            activities: activities.len(),
            views: views.len(),
        };
        Ok(Snapshot {
            users,
            sections,
            resources,
            activities,
            views,
            export_date: now_rfc3339(),
            total_records,
        })
    }

    /// Users from the durable store merged with any stray copies in the
    /// key-value table; the table wins on conflict, and a user found
    /// only there is pushed back into the durable store as a repair.
    async fn merged_users(&self) -> Result<Vec<User>> {
        let db_users = self
            .bounded(self.durable.list_users())
            .await
            .unwrap_or_default();
        let kv_users: Vec<User> = self.kv.get(keys::USERS).unwrap_or_default();

        let mut by_id: BTreeMap<String, User> = BTreeMap::new();
        for u in db_users {
            by_id.insert(u.id.clone(), u);
        }
        for u in kv_users {
            if !by_id.contains_key(&u.id) {
                if let Err(e) = self.bounded(self.durable.save_user(&u)).await {
                    warn!(user = %u.username, error = %e, "user repair write skipped");
                }
            }
            by_id.insert(u.id.clone(), u);
        }
        Ok(by_id.into_values().collect())
    }

    /// Deduped union of every store's resources by canonical key; the
    /// first source seen wins, in the order durable, aggregate,
    /// per-section.
    async fn merged_resources(&self) -> Vec<Resource> {
        let mut by_key: BTreeMap<String, Resource> = BTreeMap::new();
        let mut consider = |r: Resource| {
            by_key.entry(canonical_key(&r)).or_insert(r);
        };

        for r in self
            .bounded(self.durable.all_resources())
            .await
            .unwrap_or_default()
        {
            consider(r);
        }
        for bundle in self.aggregate.load_all().into_values() {
            for r in bundle.all_resources() {
                consider(r);
            }
        }
        for section_id in self.section.section_ids() {
            for r in self.section.load(&section_id).all_resources() {
                consider(r);
            }
        }
        by_key.into_values().collect()
    }

    /// Canonical section list: the configured order first (falling back
    /// to the eight defaults), then a stub for any section id that only
    /// a resource references.
    fn canonical_sections(&self, resources: &[Resource]) -> Vec<Section> {
        let mut sections: Vec<Section> = match self
            .kv
            .get::<Vec<SectionOrderEntry>>(keys::SECTION_ORDER)
        {
            Some(order) => order
                .iter()
                .map(|e| Section {
                    id: e.id.clone(),
                    name: e.name.clone(),
                    icon: e.icon.clone(),
                    color: e.color.clone(),
                    intro: String::new(),
                })
                .collect(),
            None => default_sections(),
        };
        for r in resources {
            if !r.section_id.is_empty() && !sections.iter().any(|s| s.id == r.section_id) {
                sections.push(Section {
                    id: r.section_id.clone(),
                    name: r.section_id.clone(),
                    icon: String::new(),
                    color: String::new(),
                    intro: String::new(),
                });
            }
        }
        sections
    }

    /// Snapshot plus the raw key-value entries, for full backup.
    pub async fn build_backup(&self) -> Result<Backup> {
        let snapshot = self.build().await?;
        let mut local_state = BTreeMap::new();
        let mut keep = vec![
            keys::USERS.to_string(),
            keys::ACTIVITIES.to_string(),
            keys::AGGREGATE.to_string(),
            keys::SECTION_ORDER.to_string(),
        ];
        keep.extend(self.kv.keys_with_prefix(keys::SECTION_PREFIX));
        keep.extend(self.kv.keys_with_prefix(keys::SECTION_CONFIG_PREFIX));
        for key in keep {
            if let Some(value) = self.kv.get_raw(&key) {
                local_state.insert(key, value);
            }
        }
        Ok(Backup {
            snapshot,
            local_state,
        })
    }

    /// Restores a backup. Each durable table is cleared before its
    /// replay (all-or-nothing per table, not atomic across tables),
    /// then the key-value entries are rehydrated.
    pub async fn restore(&self, backup: &Backup) -> Result<()> {
        self.bounded(self.durable.clear_all()).await?;
        for u in &backup.snapshot.users {
            self.bounded(self.durable.save_user(u)).await?;
        }
        for s in &backup.snapshot.sections {
            self.bounded(self.durable.save_section(s)).await?;
        }
        for r in &backup.snapshot.resources {
            self.bounded(self.durable.save_resource(r)).await?;
        }
        for a in &backup.snapshot.activities {
            self.bounded(self.durable.save_activity(a)).await?;
        }
        for v in &backup.snapshot.views {
            self.bounded(self.durable.save_view(v)).await?;
        }
        for (key, value) in &backup.local_state {
            self.kv.set_raw(key, value.clone())?;
        }
        Ok(())
    }

    async fn bounded<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.db_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(infohub_core::HubError::StorageUnavailable(format!(
                "database operation exceeded {:?}",
                self.db_timeout
            ))),
        }
    }
}
