use std::path::Path;

use anyhow::{Context, Result};

use infohub_store::snapshot::Backup;

pub async fn export(base_dir: &Path, output: Option<&Path>, full: bool) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let session = super::require_session(&hub).await?;

    let json = if full {
        serde_json::to_string_pretty(&hub.export_backup(&session).await?)?
    } else {
        serde_json::to_string_pretty(&hub.export_snapshot(&session).await?)?
    };

    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub async fn import(base_dir: &Path, input: &Path) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let session = super::require_session(&hub).await?;

    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let backup: Backup =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", input.display()))?;

    hub.import_backup(&session, &backup).await?;
    println!(
        "Restored backup of {} ({} resources, {} users)",
        backup.snapshot.export_date,
        backup.snapshot.resources.len(),
        backup.snapshot.users.len()
    );
    Ok(())
}
