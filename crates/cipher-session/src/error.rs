use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Sign-in failed: {0}")]
    SignInFailed(String),

    #[error("Sign-in method not supported: {0}")]
    Unsupported(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
