use chrono::Utc;
use cipher_core::{Collaborator, ProjectSnapshot};
use serde_json::Value;

use crate::document::{Document, DocumentPath, DocumentStore};
use crate::error::{PersistenceError, Result};
use crate::project::{default_project_name, PersistedProject, ProjectSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Written,
    Deleted,
    /// Local-only mode: owner or project id missing, nothing was contacted.
    Skipped,
}

/// Save/load/delete/autosave of workspace snapshots.
///
/// Every write is a merge-write: fields the write does not carry (such as
/// `name` during autosave) survive on the stored document.
pub struct PersistenceGateway {
    store: Collaborator<dyn DocumentStore>,
    namespace: String,
}

impl PersistenceGateway {
    pub fn new(store: Collaborator<dyn DocumentStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_available(&self) -> bool {
        self.store.is_available()
    }

    pub async fn save(
        &self,
        owner_id: Option<&str>,
        project_id: Option<&str>,
        snapshot: &ProjectSnapshot,
        name: Option<&str>,
    ) -> Result<Ack> {
        let (Some(owner_id), Some(project_id)) = (owner_id, project_id) else {
            return Ok(Ack::Skipped);
        };
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_project_name(project_id));
        self.write_snapshot(owner_id, project_id, snapshot, Some(name)).await
    }

    /// `Ok(None)` in local-only mode; `NotFound` when no document exists.
    pub async fn load(&self, owner_id: Option<&str>, project_id: &str) -> Result<Option<PersistedProject>> {
        let Some(owner_id) = owner_id else {
            return Ok(None);
        };
        let store = self.store()?;
        let document = store
            .read(&self.path(owner_id, project_id))
            .await?
            .ok_or(PersistenceError::NotFound)?;
        PersistedProject::from_document(project_id, owner_id, document).map(Some)
    }

    pub async fn delete(&self, owner_id: Option<&str>, project_id: Option<&str>) -> Result<Ack> {
        let (Some(owner_id), Some(project_id)) = (owner_id, project_id) else {
            return Ok(Ack::Skipped);
        };
        self.store()?.delete(&self.path(owner_id, project_id)).await?;
        log::info!("Deleted project {}", project_id);
        Ok(Ack::Deleted)
    }

    /// Same write as [`save`](Self::save) without a name.
    ///
    /// Failures are logged here; callers must not surface them to the user.
    pub async fn autosave(
        &self,
        owner_id: Option<&str>,
        project_id: Option<&str>,
        snapshot: &ProjectSnapshot,
    ) -> Result<Ack> {
        let (Some(owner_id), Some(project_id)) = (owner_id, project_id) else {
            return Ok(Ack::Skipped);
        };
        let result = self.write_snapshot(owner_id, project_id, snapshot, None).await;
        match &result {
            Ok(_) => log::debug!("Autosaved project {}", project_id),
            Err(e) => log::error!("Autosave of project {} failed: {}", project_id, e),
        }
        result
    }

    /// Projects of `owner_id`, most recently updated first.
    pub async fn list(&self, owner_id: Option<&str>) -> Result<Vec<ProjectSummary>> {
        let Some(owner_id) = owner_id else {
            return Ok(Vec::new());
        };
        let documents = self.store()?.list(&self.namespace, owner_id).await?;

        let mut summaries = Vec::with_capacity(documents.len());
        for (id, document) in documents {
            match PersistedProject::from_document(&id, owner_id, document) {
                Ok(project) => summaries.push(project.summary()),
                Err(e) => log::warn!("Skipping malformed project {}: {}", id, e),
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn write_snapshot(
        &self,
        owner_id: &str,
        project_id: &str,
        snapshot: &ProjectSnapshot,
        name: Option<String>,
    ) -> Result<Ack> {
        let store = self.store()?;
        let path = self.path(owner_id, project_id);

        let has_created_at = store
            .read(&path)
            .await?
            .is_some_and(|doc| doc.get("createdAt").is_some_and(|v| !v.is_null()));

        let now = serde_json::to_value(Utc::now())?;
        let mut fields = Document::new();
        fields.insert("id".to_string(), Value::String(project_id.to_string()));
        fields.insert("ownerId".to_string(), Value::String(owner_id.to_string()));
        fields.insert("languageId".to_string(), Value::String(snapshot.language_id.clone()));
        fields.insert("files".to_string(), serde_json::to_value(&snapshot.files)?);
        if let Some(name) = name {
            fields.insert("name".to_string(), Value::String(name));
        }
        if !has_created_at {
            fields.insert("createdAt".to_string(), now.clone());
        }
        fields.insert("updatedAt".to_string(), now);

        store.write(&path, fields, true).await?;
        Ok(Ack::Written)
    }

    fn store(&self) -> Result<&std::sync::Arc<dyn DocumentStore>> {
        self.store.get().ok_or(PersistenceError::Unavailable)
    }

    fn path(&self, owner_id: &str, project_id: &str) -> DocumentPath {
        DocumentPath::new(&self.namespace, owner_id, project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::JsonFileDocumentStore;
    use crate::memory::MemoryDocumentStore;
    use async_trait::async_trait;
    use cipher_core::Workspace;
    use serde_json::json;
    use std::sync::Arc;

    struct RejectingStore;

    #[async_trait]
    impl DocumentStore for RejectingStore {
        async fn write(&self, _: &DocumentPath, _: Document, _: bool) -> Result<()> {
            Err(PersistenceError::Remote("permission denied".to_string()))
        }
        async fn read(&self, _: &DocumentPath) -> Result<Option<Document>> {
            Err(PersistenceError::Remote("permission denied".to_string()))
        }
        async fn delete(&self, _: &DocumentPath) -> Result<()> {
            Err(PersistenceError::Remote("permission denied".to_string()))
        }
        async fn list(&self, _: &str, _: &str) -> Result<Vec<(String, Document)>> {
            Err(PersistenceError::Remote("permission denied".to_string()))
        }
    }

    fn memory_gateway() -> (PersistenceGateway, Arc<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let gateway = PersistenceGateway::new(
            Collaborator::available(store.clone() as Arc<dyn DocumentStore>),
            "default-app-id",
        );
        (gateway, store)
    }

    fn go_snapshot() -> ProjectSnapshot {
        Workspace::new("Go").snapshot()
    }

    #[tokio::test]
    async fn save_then_load_round_trips_files_and_language() {
        let (gateway, _) = memory_gateway();
        let snapshot = go_snapshot();
        let ack = gateway
            .save(Some("u1"), Some("p1"), &snapshot, Some("Mine"))
            .await
            .unwrap();
        assert_eq!(ack, Ack::Written);

        let loaded = gateway.load(Some("u1"), "p1").await.unwrap().unwrap();
        assert_eq!(loaded.snapshot(), snapshot);
        assert_eq!(loaded.name, "Mine");
        assert!(loaded.created_at.is_some());
    }

    #[tokio::test]
    async fn save_round_trips_through_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = PersistenceGateway::new(
            Collaborator::available(Arc::new(JsonFileDocumentStore::new(dir.path())) as Arc<dyn DocumentStore>),
            "app",
        );
        let snapshot = Workspace::new("React.js").snapshot();
        gateway.save(Some("u1"), Some("p1"), &snapshot, None).await.unwrap();

        let loaded = gateway.load(Some("u1"), "p1").await.unwrap().unwrap();
        assert_eq!(loaded.snapshot(), snapshot);
        assert_eq!(loaded.name, "Project p1");
        assert!(loaded.files.get("/package.json").unwrap().hidden);
    }

    #[tokio::test]
    async fn created_at_is_kept_and_updated_at_refreshed() {
        let (gateway, _) = memory_gateway();
        let snapshot = go_snapshot();
        gateway.save(Some("u1"), Some("p1"), &snapshot, None).await.unwrap();
        let first = gateway.load(Some("u1"), "p1").await.unwrap().unwrap();

        gateway.autosave(Some("u1"), Some("p1"), &snapshot).await.unwrap();
        let second = gateway.load(Some("u1"), "p1").await.unwrap().unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn autosave_preserves_name_and_replaces_files() {
        let (gateway, _) = memory_gateway();
        let mut ws = Workspace::new("Python");
        ws.create_path("/extra.py", false).unwrap();
        gateway
            .save(Some("u1"), Some("p1"), &ws.snapshot(), Some("Named"))
            .await
            .unwrap();

        ws.delete_path("/extra.py").unwrap();
        gateway.autosave(Some("u1"), Some("p1"), &ws.snapshot()).await.unwrap();

        let loaded = gateway.load(Some("u1"), "p1").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Named");
        assert!(!loaded.files.contains("/extra.py"));
    }

    #[tokio::test]
    async fn missing_ids_are_local_only_noops() {
        let (gateway, store) = memory_gateway();
        let snapshot = go_snapshot();
        assert_eq!(
            gateway.save(None, Some("p1"), &snapshot, None).await.unwrap(),
            Ack::Skipped
        );
        assert_eq!(
            gateway.autosave(Some("u1"), None, &snapshot).await.unwrap(),
            Ack::Skipped
        );
        assert_eq!(gateway.delete(None, None).await.unwrap(), Ack::Skipped);
        assert!(gateway.load(None, "p1").await.unwrap().is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn missing_store_is_unavailable() {
        let gateway = PersistenceGateway::new(Collaborator::Unavailable, "app");
        let result = gateway.save(Some("u1"), Some("p1"), &go_snapshot(), None).await;
        assert!(matches!(result, Err(PersistenceError::Unavailable)));
        assert!(!gateway.is_available());
    }

    #[tokio::test]
    async fn rejected_operations_are_remote_errors() {
        let gateway = PersistenceGateway::new(
            Collaborator::available(Arc::new(RejectingStore) as Arc<dyn DocumentStore>),
            "app",
        );
        let result = gateway.autosave(Some("u1"), Some("p1"), &go_snapshot()).await;
        assert!(matches!(result, Err(PersistenceError::Remote(_))));
        let result = gateway.delete(Some("u1"), Some("p1")).await;
        assert!(matches!(result, Err(PersistenceError::Remote(_))));
    }

    #[tokio::test]
    async fn load_of_unknown_project_is_not_found() {
        let (gateway, _) = memory_gateway();
        let result = gateway.load(Some("u1"), "ghost").await;
        assert!(matches!(result, Err(PersistenceError::NotFound)));
    }

    #[tokio::test]
    async fn delete_removes_the_document() {
        let (gateway, store) = memory_gateway();
        gateway.save(Some("u1"), Some("p1"), &go_snapshot(), None).await.unwrap();
        assert_eq!(gateway.delete(Some("u1"), Some("p1")).await.unwrap(), Ack::Deleted);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn list_is_sorted_by_most_recent_update() {
        let (gateway, store) = memory_gateway();
        for (id, updated) in [
            ("old", "2024-01-01T00:00:00Z"),
            ("new", "2024-03-01T00:00:00Z"),
            ("mid", "2024-02-01T00:00:00Z"),
        ] {
            let fields = json!({"languageId": "Go", "updatedAt": updated})
                .as_object()
                .cloned()
                .unwrap();
            store
                .write(&DocumentPath::new("default-app-id", "u1", id), fields, true)
                .await
                .unwrap();
        }

        let ids: Vec<String> = gateway
            .list(Some("u1"))
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }
}
