pub mod config;
pub mod error;
pub mod permissions;
pub mod sections;
pub mod types;

pub use config::HubConfig;
pub use error::{Entity, HubError, Result, ValidationError};
pub use types::{
    Activity, ActivityAction, Permissions, Resource, ResourceKind, Role, Session, User, ViewRecord,
};
