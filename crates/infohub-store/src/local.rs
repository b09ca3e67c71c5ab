//! The two synchronous bundle stores.
//!
//! `SectionStore` keeps one bundle per section under `section:<id>`;
//! `AggregateStore` keeps the whole hub under a single legacy key for
//! older clients. Both are backed by [`JsonKvStore`] and treated as
//! fast and always available.

use std::collections::BTreeMap;
use std::sync::Arc;

use infohub_core::{Resource, ResourceKind, Result};

use crate::bundle::SectionBundle;
use crate::keys;
use crate::kv::JsonKvStore;

#[derive(Clone)]
pub struct SectionStore {
    kv: Arc<JsonKvStore>,
}

impl SectionStore {
    pub fn new(kv: Arc<JsonKvStore>) -> Self {
        Self { kv }
    }

    pub fn load(&self, section_id: &str) -> SectionBundle {
        let mut bundle: SectionBundle = self.kv.get(&keys::section(section_id)).unwrap_or_default();
        bundle.stamp(section_id);
        bundle
    }

    pub fn save(&self, section_id: &str, bundle: &SectionBundle) -> Result<()> {
        self.kv.set(&keys::section(section_id), bundle)
    }

    pub fn list(&self, section_id: &str, kind: &ResourceKind) -> Vec<Resource> {
        self.load(section_id).list(kind).to_vec()
    }

    pub fn upsert(&self, resource: &Resource) -> Result<()> {
        let mut bundle = self.load(&resource.section_id);
        bundle.upsert(resource);
        self.save(&resource.section_id, &bundle)
    }

    pub fn remove(
        &self,
        section_id: &str,
        kind: &ResourceKind,
        id: &str,
        fallback: Option<(&str, &str)>,
    ) -> Result<Option<Resource>> {
        let mut bundle = self.load(section_id);
        let removed = bundle.remove(kind, id, fallback);
        if removed.is_some() {
            self.save(section_id, &bundle)?;
        }
        Ok(removed)
    }

    /// Section ids that have a bundle persisted, whether or not they
    /// are in the configured order.
    pub fn section_ids(&self) -> Vec<String> {
        self.kv
            .keys_with_prefix(keys::SECTION_PREFIX)
            .into_iter()
            .map(|k| k[keys::SECTION_PREFIX.len()..].to_string())
            .collect()
    }
}

#[derive(Clone)]
pub struct AggregateStore {
    kv: Arc<JsonKvStore>,
}

impl AggregateStore {
    pub fn new(kv: Arc<JsonKvStore>) -> Self {
        Self { kv }
    }

    pub fn load_all(&self) -> BTreeMap<String, SectionBundle> {
        let mut all: BTreeMap<String, SectionBundle> =
            self.kv.get(keys::AGGREGATE).unwrap_or_default();
        for (section_id, bundle) in all.iter_mut() {
            bundle.stamp(section_id);
        }
        all
    }

    pub fn save_all(&self, all: &BTreeMap<String, SectionBundle>) -> Result<()> {
        self.kv.set(keys::AGGREGATE, all)
    }

    pub fn list(&self, section_id: &str, kind: &ResourceKind) -> Vec<Resource> {
        self.load_all()
            .get(section_id)
            .map(|b| b.list(kind).to_vec())
            .unwrap_or_default()
    }

    pub fn upsert(&self, resource: &Resource) -> Result<()> {
        let mut all = self.load_all();
        all.entry(resource.section_id.clone())
            .or_default()
            .upsert(resource);
        self.save_all(&all)
    }

    pub fn remove(
        &self,
        section_id: &str,
        kind: &ResourceKind,
        id: &str,
        fallback: Option<(&str, &str)>,
    ) -> Result<Option<Resource>> {
        let mut all = self.load_all();
        let removed = all
            .get_mut(section_id)
            .and_then(|b| b.remove(kind, id, fallback));
        if removed.is_some() {
            self.save_all(&all)?;
        }
        Ok(removed)
    }
}
