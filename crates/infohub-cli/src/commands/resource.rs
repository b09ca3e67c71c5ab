use std::path::Path;

use anyhow::{Result, bail};

use infohub_core::{Resource, ResourceKind};
use infohub_store::hub::{Hub, NewResource};
use infohub_store::repository::ResourcePatch;

pub struct EditArgs {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub async fn list(base_dir: &Path, section: &str, kind: &str) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let session = super::require_session(&hub).await?;

    let kind = ResourceKind::from(kind.to_string());
    let resources = hub.list_resources(&session, section, &kind).await?;

    if resources.is_empty() {
        println!("No {kind} in {section}.");
        return Ok(());
    }

    println!(
        "{:<28} {:<30} {:<12} {}",
        "ID", "TITLE", "CATEGORY", "URL"
    );
    println!("{}", "-".repeat(100));
    for r in &resources {
        println!(
            "{:<28} {:<30} {:<12} {}",
            r.id,
            truncate(&r.title, 28),
            r.category,
            r.url
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn add(
    base_dir: &Path,
    section: &str,
    kind: &str,
    title: &str,
    url: &str,
    description: &str,
    category: &str,
    tags: &[String],
) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let session = super::require_session(&hub).await?;

    let created = hub
        .add_resource(
            &session,
            NewResource {
                title: title.to_string(),
                description: description.to_string(),
                url: url.to_string(),
                category: category.to_string(),
                tags: tags.to_vec(),
                kind: ResourceKind::from(kind.to_string()),
                section_id: section.to_string(),
            },
        )
        .await?;

    println!("Added '{}' to {} ({})", created.title, section, created.id);
    Ok(())
}

pub async fn edit(
    base_dir: &Path,
    section: &str,
    kind: &str,
    id: &str,
    args: EditArgs,
) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let session = super::require_session(&hub).await?;

    let patch = ResourcePatch {
        title: args.title,
        description: args.description,
        url: args.url,
        category: args.category,
        tags: args.tags,
    };
    let kind = ResourceKind::from(kind.to_string());
    let updated = hub
        .update_resource(&session, section, &kind, id, None, patch)
        .await?;

    println!("Updated '{}' ({})", updated.title, updated.id);
    Ok(())
}

pub async fn delete(base_dir: &Path, section: &str, kind: &str, id: &str) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let session = super::require_session(&hub).await?;

    let kind = ResourceKind::from(kind.to_string());
    let removed = hub.delete_resource(&session, section, &kind, id, None).await?;

    println!("Deleted '{}' from {}", removed.title, section);
    Ok(())
}

/// Records a view and prints the link. The id is searched across every
/// kind configured for the section.
pub async fn open(base_dir: &Path, section: &str, id: &str) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let session = super::require_session(&hub).await?;

    let Some(resource) = find_in_section(&hub, &session, section, id).await? else {
        bail!("No resource {id} in {section}");
    };

    let record = hub.record_view(&session, &resource.id).await?;
    println!("{}", resource.url);
    println!("({} views by you, first {})", record.count, record.first_viewed_at);
    Ok(())
}

async fn find_in_section(
    hub: &Hub,
    session: &infohub_core::Session,
    section: &str,
    id: &str,
) -> Result<Option<Resource>> {
    let config = hub.section_config(section);
    for tab in &config.types {
        let kind = tab.id.clone();
        let found = hub
            .list_resources(session, section, &kind)
            .await?
            .into_iter()
            .find(|r| r.id == id);
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
