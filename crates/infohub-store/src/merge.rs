//! Last-writer-wins reconciliation across the three physical stores.
//!
//! For each record id seen in more than one store, the variant with the
//! later of (`updated_at`, `created_at`) wins. Ties and missing
//! timestamps fall back to a fixed source precedence: aggregate store,
//! then per-section store, then the durable database. This is a
//! heuristic, not a vector clock; if wall clocks disagree across tabs a
//! stale record can win. Accepted limitation.

use std::collections::BTreeMap;

use infohub_core::Resource;

/// Physical origin of a variant, ordered strongest-tiebreak first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    Aggregate,
    Section,
    Database,
}

/// Picks the winning variant for one logical record.
pub fn pick(variants: Vec<(Source, Resource)>) -> Option<Resource> {
    variants
        .into_iter()
        .reduce(|best, cand| if wins(&cand, &best) { cand } else { best })
        .map(|(_, r)| r)
}

/// True if `cand` should replace `best`.
fn wins(cand: &(Source, Resource), best: &(Source, Resource)) -> bool {
    match (cand.1.modified_at(), best.1.modified_at()) {
        (Some(c), Some(b)) if c != b => c > b,
        // Tie or at least one missing timestamp: precedence decides.
        _ => cand.0 < best.0,
    }
}

/// Key under which variants of one logical record are grouped.
/// Records that never got an id are matched by title and url so that
/// the same legacy row in two stores does not come back twice.
pub fn merge_key(r: &Resource) -> String {
    if !r.id.is_empty() {
        format!("id:{}", r.id)
    } else {
        format!(
            "t:{}|u:{}",
            r.title.trim().to_lowercase(),
            r.url.trim().to_lowercase()
        )
    }
}

/// Merges per-store record lists into one deduplicated collection.
pub fn merge_lists(lists: Vec<(Source, Vec<Resource>)>) -> Vec<Resource> {
    let mut groups: BTreeMap<String, Vec<(Source, Resource)>> = BTreeMap::new();
    for (source, list) in lists {
        for r in list {
            groups.entry(merge_key(&r)).or_default().push((source, r));
        }
    }
    let mut merged: Vec<Resource> = groups.into_values().filter_map(pick).collect();
    merged.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use infohub_core::ResourceKind;

    fn res(id: &str, created: &str, updated: Option<&str>, title: &str) -> Resource {
        Resource {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            url: "https://example.com".into(),
            category: String::new(),
            tags: vec![],
            kind: ResourceKind::Playbooks,
            section_id: "costing".into(),
            user_id: "1".into(),
            created_at: created.to_string(),
            updated_at: updated.map(|s| s.to_string()),
        }
    }

    #[test]
    fn later_updated_at_wins() {
        let stale = res("a", "2024-01-01T00:00:00Z", Some("2024-01-02T00:00:00Z"), "old");
        let fresh = res("a", "2024-01-01T00:00:00Z", Some("2024-03-01T00:00:00Z"), "new");
        let winner = pick(vec![(Source::Aggregate, stale), (Source::Database, fresh)]).unwrap();
        assert_eq!(winner.title, "new");
    }

    #[test]
    fn created_at_counts_when_updated_missing() {
        let older = res("a", "2024-01-01T00:00:00Z", None, "old");
        let newer = res("a", "2024-05-01T00:00:00Z", None, "new");
        let winner = pick(vec![(Source::Section, older), (Source::Database, newer)]).unwrap();
        assert_eq!(winner.title, "new");
    }

    #[test]
    fn tie_falls_back_to_source_precedence() {
        let db = res("a", "2024-01-01T00:00:00Z", None, "db");
        let agg = res("a", "2024-01-01T00:00:00Z", None, "agg");
        let sec = res("a", "2024-01-01T00:00:00Z", None, "sec");
        let winner = pick(vec![
            (Source::Database, db),
            (Source::Section, sec),
            (Source::Aggregate, agg),
        ])
        .unwrap();
        assert_eq!(winner.title, "agg");
    }

    #[test]
    fn missing_timestamp_falls_back_to_precedence() {
        let timestamped = res("a", "2099-01-01T00:00:00Z", None, "db");
        let undated = res("a", "", None, "agg");
        let winner = pick(vec![
            (Source::Database, timestamped),
            (Source::Aggregate, undated),
        ])
        .unwrap();
        assert_eq!(winner.title, "agg");
    }

    #[test]
    fn idless_variants_group_by_title_and_url() {
        let a = res("", "2024-01-01T00:00:00Z", None, "Legacy");
        let b = res("", "2024-02-01T00:00:00Z", None, "Legacy");
        let merged = merge_lists(vec![
            (Source::Section, vec![a]),
            (Source::Aggregate, vec![b]),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].created_at, "2024-02-01T00:00:00Z");
    }

    #[test]
    fn distinct_ids_pass_through() {
        let merged = merge_lists(vec![
            (Source::Section, vec![res("a", "2024-01-01T00:00:00Z", None, "A")]),
            (Source::Database, vec![res("b", "2024-01-02T00:00:00Z", None, "B")]),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "a");
        assert_eq!(merged[1].id, "b");
    }
}
