pub mod audit;
pub mod bundle;
pub mod hub;
pub mod keys;
pub mod kv;
pub mod local;
pub mod merge;
pub mod notify;
pub mod repository;
pub mod snapshot;
pub mod sqlite;

pub use audit::{AuditLog, PageTimer};
pub use bundle::SectionBundle;
pub use hub::{Hub, NewResource};
pub use kv::JsonKvStore;
pub use local::{AggregateStore, SectionStore};
pub use notify::{ChangeBus, ChangeEvent, ChangeKind};
pub use repository::{ResourcePatch, ResourceRepository};
pub use snapshot::{Backup, Snapshot, SnapshotBuilder};
pub use sqlite::{DurableStore, SqliteStore};
