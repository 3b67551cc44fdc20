use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{merge_fields, Document, DocumentPath, DocumentStore};
use crate::error::Result;

/// Process-local document store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<DocumentPath, Document>>,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes accepted so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn write(&self, path: &DocumentPath, fields: Document, merge: bool) -> Result<()> {
        let mut documents = self.documents.write().await;
        let existing = documents.remove(path);
        documents.insert(path.clone(), merge_fields(existing, fields, merge));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read(&self, path: &DocumentPath) -> Result<Option<Document>> {
        Ok(self.documents.read().await.get(path).cloned())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<()> {
        self.documents.write().await.remove(path);
        Ok(())
    }

    async fn list(&self, namespace: &str, owner_id: &str) -> Result<Vec<(String, Document)>> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .filter(|(path, _)| path.namespace == namespace && path.owner_id == owner_id)
            .map(|(path, doc)| (path.project_id.clone(), doc.clone()))
            .collect())
    }
}
