use std::path::Path;

use anyhow::{Result, bail};

pub async fn run(base_dir: &Path, limit: usize) -> Result<()> {
    let (_, hub) = super::open_hub(base_dir).await?;
    let session = super::require_session(&hub).await?;

    if !session.permissions.can_view_audit_log {
        bail!("Your account cannot view the audit log.");
    }

    let entries = hub.audit().list();
    if entries.is_empty() {
        println!("No activity recorded.");
        return Ok(());
    }

    println!("{:<25} {:<12} {:<20} {}", "TIMESTAMP", "USER", "ACTION", "DESCRIPTION");
    println!("{}", "-".repeat(100));
    for a in entries.iter().take(limit) {
        println!(
            "{:<25} {:<12} {:<20} {}",
            a.timestamp, a.username, a.action, a.description
        );
    }
    Ok(())
}
