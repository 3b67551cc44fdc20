use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::document::{merge_fields, Document, DocumentPath, DocumentStore};
use crate::error::{PersistenceError, Result};

/// One pretty-printed JSON file per document:
/// `<root>/<namespace>/users/<owner>/projects/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileDocumentStore {
    base_path: PathBuf,
}

impl JsonFileDocumentStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn projects_dir(&self, namespace: &str, owner_id: &str) -> Result<PathBuf> {
        Ok(self
            .base_path
            .join(segment(namespace)?)
            .join("users")
            .join(segment(owner_id)?)
            .join("projects"))
    }

    fn document_path(&self, path: &DocumentPath) -> Result<PathBuf> {
        Ok(self
            .projects_dir(&path.namespace, &path.owner_id)?
            .join(format!("{}.json", segment(&path.project_id)?)))
    }

    async fn read_file(file: &Path) -> Result<Option<Document>> {
        if !file.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(file).await?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

/// Keys become directory and file names, so each must stay one segment
/// below the store root.
fn segment(key: &str) -> Result<&str> {
    let invalid = key.is_empty()
        || key == "."
        || key.contains("..")
        || key.contains(['/', '\\', '\0']);
    if invalid {
        return Err(PersistenceError::InvalidKey(key.to_string()));
    }
    Ok(key)
}

#[async_trait]
impl DocumentStore for JsonFileDocumentStore {
    async fn write(&self, path: &DocumentPath, fields: Document, merge: bool) -> Result<()> {
        let file = self.document_path(path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await?;
        }

        let existing = if merge { Self::read_file(&file).await? } else { None };
        let document = merge_fields(existing, fields, merge);
        fs::write(&file, serde_json::to_string_pretty(&document)?).await?;

        log::debug!("Wrote document {}", path);
        Ok(())
    }

    async fn read(&self, path: &DocumentPath) -> Result<Option<Document>> {
        Self::read_file(&self.document_path(path)?).await
    }

    async fn delete(&self, path: &DocumentPath) -> Result<()> {
        match fs::remove_file(self.document_path(path)?).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    async fn list(&self, namespace: &str, owner_id: &str) -> Result<Vec<(String, Document)>> {
        let dir = self.projects_dir(namespace, owner_id)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&dir).await?;
        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = file.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            match Self::read_file(&file).await {
                Ok(Some(doc)) => documents.push((id, doc)),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping unreadable document {:?}: {}", file, e),
            }
        }
        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn fields(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn write_lays_out_namespace_and_owner() {
        let dir = tempdir().unwrap();
        let store = JsonFileDocumentStore::new(dir.path());
        let path = DocumentPath::new("app", "u1", "p1");
        store.write(&path, fields(json!({"name": "A"})), true).await.unwrap();

        assert!(dir.path().join("app/users/u1/projects/p1.json").exists());
        let doc = store.read(&path).await.unwrap().unwrap();
        assert_eq!(doc["name"], "A");
    }

    #[tokio::test]
    async fn merge_write_preserves_existing_fields() {
        let dir = tempdir().unwrap();
        let store = JsonFileDocumentStore::new(dir.path());
        let path = DocumentPath::new("app", "u1", "p1");
        store
            .write(&path, fields(json!({"name": "A", "languageId": "Go"})), true)
            .await
            .unwrap();
        store
            .write(&path, fields(json!({"languageId": "Rust"})), true)
            .await
            .unwrap();

        let doc = store.read(&path).await.unwrap().unwrap();
        assert_eq!(doc["name"], "A");
        assert_eq!(doc["languageId"], "Rust");
    }

    #[tokio::test]
    async fn missing_documents_read_as_none_and_delete_cleanly() {
        let dir = tempdir().unwrap();
        let store = JsonFileDocumentStore::new(dir.path());
        let path = DocumentPath::new("app", "u1", "nope");
        assert!(store.read(&path).await.unwrap().is_none());
        store.delete(&path).await.unwrap();
        assert!(store.list("app", "u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_store_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        let outside = dir.path().join("victim.json");
        std::fs::write(&outside, "{}").unwrap();
        let store = JsonFileDocumentStore::new(&root);

        let escaping = DocumentPath::new("ns", "u", "../../../../victim");
        let err = store.delete(&escaping).await.unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidKey(_)));
        assert!(outside.exists());

        for path in [
            DocumentPath::new("ns", "..", "p"),
            DocumentPath::new("ns", "u", ""),
            DocumentPath::new("a/b", "u", "p"),
            DocumentPath::new("ns", "u", "p\\q"),
        ] {
            assert!(matches!(
                store.read(&path).await,
                Err(PersistenceError::InvalidKey(_))
            ));
            assert!(matches!(
                store.write(&path, fields(json!({})), true).await,
                Err(PersistenceError::InvalidKey(_))
            ));
        }
        assert!(matches!(
            store.list("ns", "../..").await,
            Err(PersistenceError::InvalidKey(_))
        ));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn list_returns_every_owner_document() {
        let dir = tempdir().unwrap();
        let store = JsonFileDocumentStore::new(dir.path());
        for id in ["b", "a"] {
            store
                .write(&DocumentPath::new("app", "u1", id), fields(json!({"id": id})), true)
                .await
                .unwrap();
        }
        let ids: Vec<String> = store
            .list("app", "u1")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
