use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

/// Top-level hub configuration stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    pub hub: HubSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSettings {
    /// Path to the SQLite database (the durable, advisory store).
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Path to the key-value state file (the always-available store).
    #[serde(default = "default_kv_path")]
    pub kv_path: String,
    /// Budget for any single advisory-database operation, in
    /// milliseconds. Expired operations are abandoned, never retried.
    #[serde(default = "default_db_timeout_ms")]
    pub db_timeout_ms: u64,
    /// Hard cap on the activity ring; oldest entries drop first.
    #[serde(default = "default_audit_cap")]
    pub audit_cap: usize,
}

fn default_db_path() -> String {
    "hub.db".to_string()
}

fn default_kv_path() -> String {
    "state.json".to_string()
}

fn default_db_timeout_ms() -> u64 {
    2000
}

fn default_audit_cap() -> usize {
    1000
}

impl Default for HubSettings {
    fn default() -> Self {
        HubSettings {
            db_path: default_db_path(),
            kv_path: default_kv_path(),
            db_timeout_ms: default_db_timeout_ms(),
            audit_cap: default_audit_cap(),
        }
    }
}

impl HubConfig {
    /// Default base directory: `~/.infohub`.
    pub fn default_base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| HubError::Config("cannot determine home directory".to_string()))?;
        Ok(home.join(".infohub"))
    }

    pub fn config_path(base_dir: &Path) -> PathBuf {
        base_dir.join("config.toml")
    }

    /// Loads the config from `base_dir`, writing the defaults on first
    /// use. Relative data paths resolve against `base_dir`.
    pub fn load_or_init(base_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_dir)?;
        let path = Self::config_path(base_dir);
        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            toml::from_str(&raw).map_err(|e| HubError::Config(e.to_string()))
        } else {
            let cfg = HubConfig {
                hub: HubSettings::default(),
            };
            cfg.save(base_dir)?;
            Ok(cfg)
        }
    }

    pub fn save(&self, base_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(base_dir)?;
        let raw = toml::to_string_pretty(self).map_err(|e| HubError::Config(e.to_string()))?;
        std::fs::write(Self::config_path(base_dir), raw)?;
        Ok(())
    }

    pub fn db_path(&self, base_dir: &Path) -> PathBuf {
        resolve(base_dir, &self.hub.db_path)
    }

    pub fn kv_path(&self, base_dir: &Path) -> PathBuf {
        resolve(base_dir, &self.hub.kv_path)
    }

    pub fn db_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.hub.db_timeout_ms)
    }
}

fn resolve(base_dir: &Path, p: &str) -> PathBuf {
    let path = Path::new(p);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: HubConfig = toml::from_str("[hub]\ndb_path = \"other.db\"\n").unwrap();
        assert_eq!(cfg.hub.db_path, "other.db");
        assert_eq!(cfg.hub.db_timeout_ms, 2000);
        assert_eq!(cfg.hub.audit_cap, 1000);
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let cfg = HubConfig {
            hub: HubSettings::default(),
        };
        let base = Path::new("/tmp/hub-test");
        assert_eq!(cfg.db_path(base), base.join("hub.db"));
        assert_eq!(cfg.kv_path(base), base.join("state.json"));
    }
}
