use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level fields of a stored document.
pub type Document = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentPath {
    pub namespace: String,
    pub owner_id: String,
    pub project_id: String,
}

impl DocumentPath {
    pub fn new(namespace: &str, owner_id: &str, project_id: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            owner_id: owner_id.to_string(),
            project_id: project_id.to_string(),
        }
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/users/{}/projects/{}",
            self.namespace, self.owner_id, self.project_id
        )
    }
}

/// External document store.
///
/// With `merge`, the written top-level fields replace the stored ones and
/// fields absent from the write are kept. Without it the document is
/// replaced whole.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn write(&self, path: &DocumentPath, fields: Document, merge: bool) -> Result<()>;

    async fn read(&self, path: &DocumentPath) -> Result<Option<Document>>;

    /// Deleting a missing document succeeds.
    async fn delete(&self, path: &DocumentPath) -> Result<()>;

    /// Every document of one owner, as `(project_id, document)` pairs.
    async fn list(&self, namespace: &str, owner_id: &str) -> Result<Vec<(String, Document)>>;
}

/// Apply a write to an existing document.
pub(crate) fn merge_fields(existing: Option<Document>, fields: Document, merge: bool) -> Document {
    match existing {
        Some(mut doc) if merge => {
            doc.extend(fields);
            doc
        }
        _ => fields,
    }
}
