use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    // Auth
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    // Validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // Lookup
    #[error("{0} not found: {1}")]
    NotFound(Entity, String),

    // Storage
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("corrupt state in {0}: {1}")]
    CorruptState(String, String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    // IO / serialization
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("email already registered: {0}")]
    EmailTaken(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Section,
    Resource,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::User => write!(f, "user"),
            Entity::Section => write!(f, "section"),
            Entity::Resource => write!(f, "resource"),
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
