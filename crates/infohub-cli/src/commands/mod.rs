pub mod audit;
pub mod auth;
pub mod backup;
pub mod config;
pub mod resource;
pub mod sections;

use std::path::Path;

use anyhow::{Result, bail};

use infohub_auth::AuthService;
use infohub_core::Session;
use infohub_core::config::HubConfig;
use infohub_store::Hub;

pub async fn open_hub(base_dir: &Path) -> Result<(HubConfig, Hub)> {
    std::fs::create_dir_all(base_dir)?;
    let config = HubConfig::load_or_init(base_dir)?;
    let hub = Hub::open(base_dir, &config).await?;
    Ok((config, hub))
}

pub async fn require_session(hub: &Hub) -> Result<Session> {
    match AuthService::from_hub(hub).restore_session().await? {
        Some(session) => Ok(session),
        None => bail!("Not signed in. Run `infohub login <identifier>` first."),
    }
}

/// Password from the flag or env var, falling back to a prompt.
pub fn get_password(cli_password: &Option<String>) -> Result<String> {
    match cli_password {
        Some(p) => Ok(p.clone()),
        None => Ok(rpassword::prompt_password_stdout("Password: ")?),
    }
}
