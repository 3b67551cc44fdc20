use chrono::{DateTime, Utc};
use cipher_core::{FileTree, LanguageCatalog, ProjectSnapshot};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::Result;

/// A project as stored by the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedProject {
    pub id: String,
    pub name: String,
    pub language_id: String,
    pub files: FileTree,
    pub owner_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Listing entry for a stored project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub language_id: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Stored shape with every field optional, so partial documents (for
/// instance ones only ever autosaved) still load.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredFields {
    name: Option<String>,
    language_id: Option<String>,
    files: Option<FileTree>,
    owner_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

pub fn default_project_name(id: &str) -> String {
    format!("Project {}", id)
}

impl PersistedProject {
    /// Decode a stored document.
    ///
    /// A missing or unknown language becomes the default language and
    /// missing files become that language's template.
    pub fn from_document(id: &str, owner_id: &str, document: Document) -> Result<Self> {
        let stored: StoredFields = serde_json::from_value(serde_json::Value::Object(document))?;
        let template = LanguageCatalog::global().get_or_default(stored.language_id.as_deref().unwrap_or_default());

        Ok(Self {
            id: id.to_string(),
            name: stored.name.unwrap_or_else(|| default_project_name(id)),
            language_id: template.id.to_string(),
            files: stored.files.unwrap_or_else(|| template.instantiate()),
            owner_id: stored.owner_id.unwrap_or_else(|| owner_id.to_string()),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            language_id: self.language_id.clone(),
            files: self.files.clone(),
        }
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            language_id: self.language_id.clone(),
            updated_at: self.updated_at,
        }
    }
}
