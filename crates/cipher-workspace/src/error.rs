use cipher_core::TreeError;
use cipher_storage::PersistenceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Project ID {0} not found.")]
    ProjectNotFound(String),
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
