//! Fast, always-available key-value state file.
//!
//! One JSON document on disk, string key to JSON value, mirrored in
//! memory and flushed on every write. This is the synchronous store the
//! interactive path relies on; the SQLite store is advisory on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use infohub_core::{HubError, Result};

pub struct JsonKvStore {
    path: PathBuf,
    map: Mutex<BTreeMap<String, Value>>,
}

impl JsonKvStore {
    /// Opens the state file. A missing file starts empty; a corrupt one
    /// is treated as empty rather than fatal, matching the recovery
    /// policy for corrupt persisted state.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let map = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, Value>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt state file, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            map: Mutex::new(map),
        })
    }

    /// Reads and decodes one key. An unparsable value is reported as
    /// absent, not an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let map = self.map.lock().unwrap();
        let value = map.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "corrupt value, treating as absent");
                None
            }
        }
    }

    /// Strict variant of [`get`](Self::get): an unparsable value is an
    /// error, for callers that must react to corruption (the session
    /// restore path clears the key on it).
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let map = self.map.lock().unwrap();
        let Some(value) = map.get(key) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| HubError::CorruptState(key.to_string(), e.to_string()))
    }

    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.map.lock().unwrap().get(key).cloned()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_value(value)?;
        let mut map = self.map.lock().unwrap();
        map.insert(key.to_string(), encoded);
        self.flush(&map)
    }

    pub fn set_raw(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.map.lock().unwrap();
        map.insert(key.to_string(), value);
        self.flush(&map)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.map.lock().unwrap();
        map.remove(key);
        self.flush(&map)
    }

    /// Reads a key and deletes it in the same step. Used for one-shot
    /// flags like `fresh-login`.
    pub fn take<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut map = self.map.lock().unwrap();
        let value = match map.remove(key) {
            Some(v) => v,
            None => return Ok(None),
        };
        self.flush(&map)?;
        Ok(serde_json::from_value(value).ok())
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.map
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn flush(&self, map: &BTreeMap<String, Value>) -> Result<()> {
        let raw = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}
