use thiserror::Error;

/// Structural errors raised by file-tree mutations.
///
/// These are reported synchronously to the caller and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Path already exists: {0}")]
    PathExists(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Cannot rename folder {from} to file path {to}; add a trailing slash for folders")]
    InvalidRenameFolderToFile { from: String, to: String },

    #[error("Cannot rename file {from} to folder path {to}")]
    InvalidRenameFileToFolder { from: String, to: String },

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("File operations are disabled for language {0}")]
    ReadOnlyLanguage(String),
}

pub type Result<T> = std::result::Result<T, TreeError>;
