use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Project not found")]
    NotFound,

    /// No document store is configured.
    #[error("Persistence is unavailable")]
    Unavailable,

    /// The store was reached but rejected the operation.
    #[error("Remote error: {0}")]
    Remote(String),

    /// A namespace, owner or project id that is not a single path segment.
    #[error("Invalid document key: {0:?}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Remote(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
