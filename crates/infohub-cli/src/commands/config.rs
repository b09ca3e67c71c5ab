use std::path::Path;

use anyhow::Result;

use infohub_core::config::HubConfig;

pub fn run(base_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(base_dir)?;
    let config = HubConfig::load_or_init(base_dir)?;
    let config_path = HubConfig::config_path(base_dir);

    println!("Config: {}", config_path.display());
    println!();
    println!("  Database:      {}", config.db_path(base_dir).display());
    println!("  Local state:   {}", config.kv_path(base_dir).display());
    println!("  DB timeout:    {} ms", config.hub.db_timeout_ms);
    println!("  Audit cap:     {} entries", config.hub.audit_cap);
    Ok(())
}
