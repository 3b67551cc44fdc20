//! Identity collaborators

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{Result, SessionError};

/// External authentication service. Both calls yield an opaque owner id.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_in_with_token(&self, token: &str) -> Result<String>;

    async fn sign_in_anonymously(&self) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredIdentity {
    owner_id: String,
    created_at: DateTime<Utc>,
}

/// Anonymous identity persisted as `identity.json` in a data directory,
/// so the same owner id survives restarts.
#[derive(Debug, Clone)]
pub struct LocalFileIdentity {
    base_path: PathBuf,
}

impl LocalFileIdentity {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn identity_path(&self) -> PathBuf {
        self.base_path.join("identity.json")
    }
}

#[async_trait]
impl IdentityService for LocalFileIdentity {
    async fn sign_in_with_token(&self, _token: &str) -> Result<String> {
        Err(SessionError::Unsupported("token sign-in"))
    }

    async fn sign_in_anonymously(&self) -> Result<String> {
        let path = self.identity_path();

        if path.exists() {
            let contents = fs::read_to_string(&path).await?;
            let stored: StoredIdentity = serde_json::from_str(&contents)?;
            return Ok(stored.owner_id);
        }

        fs::create_dir_all(&self.base_path).await?;
        let stored = StoredIdentity {
            owner_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        };
        fs::write(&path, serde_json::to_string_pretty(&stored)?).await?;
        log::info!("Created local identity at {:?}", path);

        Ok(stored.owner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn anonymous_identity_is_stable_across_instances() {
        let dir = tempdir().unwrap();
        let first = LocalFileIdentity::new(dir.path()).sign_in_anonymously().await.unwrap();
        let second = LocalFileIdentity::new(dir.path()).sign_in_anonymously().await.unwrap();
        assert_eq!(first, second);
        assert!(dir.path().join("identity.json").exists());
    }

    #[tokio::test]
    async fn token_sign_in_is_unsupported() {
        let dir = tempdir().unwrap();
        let result = LocalFileIdentity::new(dir.path()).sign_in_with_token("t").await;
        assert!(matches!(result, Err(SessionError::Unsupported(_))));
    }

    #[tokio::test]
    async fn corrupt_identity_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("identity.json"), "not json").unwrap();
        let result = LocalFileIdentity::new(dir.path()).sign_in_anonymously().await;
        assert!(matches!(result, Err(SessionError::Serialization(_))));
    }
}
