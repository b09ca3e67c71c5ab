//! Best-effort change notification across contexts.
//!
//! Two transports: a broadcast channel for contexts that are already
//! listening, and two polling flags in the key-value store for contexts
//! that are not (a freshly opened page). Delivery is unordered and
//! lossy; consumers must treat every signal as "refresh", idempotently,
//! and self-correct by polling the last-change timestamp.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use infohub_core::Result;
use infohub_core::types::now_rfc3339;

use crate::keys;
use crate::kv::JsonKvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    ResourceCreated,
    ResourceUpdated,
    ResourceDeleted,
    ConfigChanged,
    Imported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub section: Option<String>,
    pub timestamp: String,
}

#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ChangeEvent>,
    kv: Arc<JsonKvStore>,
}

impl ChangeBus {
    pub fn new(kv: Arc<JsonKvStore>) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx, kv }
    }

    /// Announces a mutation. The broadcast itself is fire-and-forget
    /// (no receivers is fine); the polling flags are always written.
    pub fn publish(&self, kind: ChangeKind, section: Option<&str>) -> Result<()> {
        let event = ChangeEvent {
            kind,
            section: section.map(|s| s.to_string()),
            timestamp: now_rfc3339(),
        };
        if self.tx.send(event.clone()).is_err() {
            debug!(?kind, "no live listeners for change broadcast");
        }
        self.kv.set(keys::REFRESH_NOW, &true)?;
        self.kv.set(keys::LAST_CHANGE, &event.timestamp)?;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Pull transport: returns the last-change timestamp when it is
    /// newer than what the caller has seen.
    pub fn poll_stale(&self, last_seen: Option<&str>) -> Option<String> {
        let last_change: String = self.kv.get(keys::LAST_CHANGE)?;
        match last_seen {
            Some(seen) if last_change.as_str() <= seen => None,
            _ => Some(last_change),
        }
    }

    /// Reads and clears the boolean refresh flag.
    pub fn take_refresh_flag(&self) -> Result<bool> {
        Ok(self.kv.take::<bool>(keys::REFRESH_NOW)?.unwrap_or(false))
    }
}
