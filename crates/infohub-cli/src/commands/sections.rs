use std::path::Path;

use anyhow::Result;

use infohub_core::permissions;
use infohub_core::sections::default_sections;

pub async fn run(base_dir: &Path) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let session = super::require_session(&hub).await?;

    let catalog = default_sections();
    let order = hub.section_order();

    let mut shown = 0;
    for entry in order.iter().filter(|e| e.visible) {
        if !permissions::can_view(&session, &entry.id) {
            continue;
        }
        let intro = catalog
            .iter()
            .find(|s| s.id == entry.id)
            .map(|s| s.intro.as_str())
            .unwrap_or("");
        let access = if permissions::can_edit(&session, &entry.id) {
            "edit"
        } else {
            "view"
        };
        println!("{:<18} {:<6} {}", entry.id, access, intro);
        shown += 1;
    }

    if shown == 0 {
        println!("No sections assigned. Ask an administrator for access.");
    }
    Ok(())
}
