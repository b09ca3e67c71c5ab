//! Wire shape of the per-section and aggregate bundles.
//!
//! The three built-in kinds are top-level arrays for compatibility with
//! older clients; admin-added kinds live under `custom`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use infohub_core::{Resource, ResourceKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionBundle {
    #[serde(default)]
    pub playbooks: Vec<Resource>,
    #[serde(default, rename = "boxLinks")]
    pub box_links: Vec<Resource>,
    #[serde(default)]
    pub dashboards: Vec<Resource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, Vec<Resource>>,
}

impl SectionBundle {
    pub fn list(&self, kind: &ResourceKind) -> &[Resource] {
        match kind {
            ResourceKind::Playbooks => &self.playbooks,
            ResourceKind::BoxLinks => &self.box_links,
            ResourceKind::Dashboards => &self.dashboards,
            ResourceKind::Custom(name) => self.custom.get(name).map_or(&[], |v| v.as_slice()),
        }
    }

    pub fn list_mut(&mut self, kind: &ResourceKind) -> &mut Vec<Resource> {
        match kind {
            ResourceKind::Playbooks => &mut self.playbooks,
            ResourceKind::BoxLinks => &mut self.box_links,
            ResourceKind::Dashboards => &mut self.dashboards,
            ResourceKind::Custom(name) => self.custom.entry(name.clone()).or_default(),
        }
    }

    /// Every record in the bundle, flattened across all kinds.
    pub fn all_resources(&self) -> Vec<Resource> {
        let mut out = Vec::new();
        out.extend(self.playbooks.iter().cloned());
        out.extend(self.box_links.iter().cloned());
        out.extend(self.dashboards.iter().cloned());
        for rs in self.custom.values() {
            out.extend(rs.iter().cloned());
        }
        out
    }

    /// Re-stamps section id and kind onto every record, the way old
    /// records were enriched on read from the bundle stores.
    pub fn stamp(&mut self, section_id: &str) {
        for kind in [
            ResourceKind::Playbooks,
            ResourceKind::BoxLinks,
            ResourceKind::Dashboards,
        ] {
            for r in self.list_mut(&kind) {
                r.section_id = section_id.to_string();
                r.kind = kind.clone();
            }
        }
        for (name, rs) in self.custom.iter_mut() {
            for r in rs {
                r.section_id = section_id.to_string();
                r.kind = ResourceKind::Custom(name.clone());
            }
        }
    }

    /// Replaces a record in place by id, or appends when absent.
    pub fn upsert(&mut self, resource: &Resource) {
        let list = self.list_mut(&resource.kind);
        match list.iter_mut().find(|r| !r.id.is_empty() && r.id == resource.id) {
            Some(slot) => *slot = resource.clone(),
            None => list.push(resource.clone()),
        }
    }

    /// Removes by id, falling back to a `(title, url)` match for
    /// records that never got an id. The fallback deliberately skips
    /// records carrying an id, so a repaired record with the same title
    /// and url is never taken for its id-less twin. Returns the removed
    /// record.
    pub fn remove(
        &mut self,
        kind: &ResourceKind,
        id: &str,
        fallback: Option<(&str, &str)>,
    ) -> Option<Resource> {
        let list = self.list_mut(kind);
        let pos = list
            .iter()
            .position(|r| !id.is_empty() && r.id == id)
            .or_else(|| {
                let (title, url) = fallback?;
                list.iter()
                    .position(|r| r.id.is_empty() && r.title == title && r.url == url)
            })?;
        Some(list.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(id: &str, kind: ResourceKind) -> Resource {
        Resource {
            id: id.to_string(),
            title: format!("title-{id}"),
            description: String::new(),
            url: format!("https://example.com/{id}"),
            category: String::new(),
            tags: vec![],
            kind,
            section_id: String::new(),
            user_id: String::new(),
            created_at: infohub_core::types::now_rfc3339(),
            updated_at: None,
        }
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut b = SectionBundle::default();
        b.upsert(&res("a", ResourceKind::Playbooks));
        let mut edited = res("a", ResourceKind::Playbooks);
        edited.title = "edited".into();
        b.upsert(&edited);
        assert_eq!(b.playbooks.len(), 1);
        assert_eq!(b.playbooks[0].title, "edited");
    }

    #[test]
    fn custom_kind_gets_its_own_bucket() {
        let mut b = SectionBundle::default();
        b.upsert(&res("c", ResourceKind::Custom("runbooks".into())));
        assert_eq!(b.custom["runbooks"].len(), 1);
        assert_eq!(b.list(&ResourceKind::Custom("runbooks".into())).len(), 1);
    }

    #[test]
    fn remove_falls_back_to_title_url() {
        let mut b = SectionBundle::default();
        let mut legacy = res("", ResourceKind::Dashboards);
        legacy.title = "Legacy".into();
        legacy.url = "https://old.example.com".into();
        b.dashboards.push(legacy);
        let removed = b
            .remove(
                &ResourceKind::Dashboards,
                "dashboards:nope",
                Some(("Legacy", "https://old.example.com")),
            )
            .unwrap();
        assert_eq!(removed.title, "Legacy");
        assert!(b.dashboards.is_empty());
    }

    #[test]
    fn remove_fallback_skips_records_with_ids() {
        let mut b = SectionBundle::default();
        let mut repaired = res("hr:dashboards:a:1", ResourceKind::Dashboards);
        repaired.title = "Legacy".into();
        repaired.url = "https://old.example.com".into();
        b.dashboards.push(repaired);
        // Same title and url, but the record has an id by now: the
        // fallback must not touch it.
        assert!(b
            .remove(
                &ResourceKind::Dashboards,
                "",
                Some(("Legacy", "https://old.example.com")),
            )
            .is_none());
        assert_eq!(b.dashboards.len(), 1);
    }

    #[test]
    fn stamp_fills_section_and_kind() {
        let json = r#"{"boxLinks":[{"title":"Old","url":"https://a.b"}]}"#;
        let mut b: SectionBundle = serde_json::from_str(json).unwrap();
        b.stamp("hr");
        assert_eq!(b.box_links[0].section_id, "hr");
        assert_eq!(b.box_links[0].kind, ResourceKind::BoxLinks);
    }
}
