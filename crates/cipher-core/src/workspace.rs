use serde::{Deserialize, Serialize};

use crate::catalog::{LanguageCatalog, LanguageTemplate};
use crate::error::{Result, TreeError};
use crate::tree::{normalize, FileNode, FileTree};

pub type ProjectId = String;
pub type OwnerId = String;

/// Shown in place of the active file's content when it cannot be displayed.
pub const MISSING_CONTENT: &str = "// File not found or is a folder.";

/// The persistable part of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub language_id: String,
    pub files: FileTree,
}

/// The single live project: files, selection and identity.
///
/// Every mutator keeps `selected_path` pointing at something sensible, so
/// callers never have to repair the selection themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    language_id: String,
    files: FileTree,
    selected_path: String,
    project_id: Option<ProjectId>,
    owner_id: Option<OwnerId>,
    autosave_enabled: bool,
}

impl Workspace {
    pub fn from_template(template: &LanguageTemplate) -> Self {
        let files = template.instantiate();
        let selected_path = select_entry(&files, template);
        Self {
            language_id: template.id.to_string(),
            files,
            selected_path,
            project_id: None,
            owner_id: None,
            autosave_enabled: true,
        }
    }

    /// Workspace for `language_id`, falling back to the default language.
    pub fn new(language_id: &str) -> Self {
        Self::from_template(LanguageCatalog::global().get_or_default(language_id))
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn files(&self) -> &FileTree {
        &self.files
    }

    pub fn selected_path(&self) -> &str {
        &self.selected_path
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn autosave_enabled(&self) -> bool {
        self.autosave_enabled
    }

    pub fn template(&self) -> &'static LanguageTemplate {
        LanguageCatalog::global().get_or_default(&self.language_id)
    }

    pub fn set_owner_id(&mut self, owner_id: Option<OwnerId>) {
        self.owner_id = owner_id;
    }

    pub fn set_project_id(&mut self, project_id: Option<ProjectId>) {
        self.project_id = project_id;
    }

    pub fn set_autosave_enabled(&mut self, enabled: bool) {
        self.autosave_enabled = enabled;
    }

    /// Swap in new files, language and project id in one step.
    ///
    /// The selection moves to the entry of the new files, else the
    /// template's entry, else
    /// [`FALLBACK_ENTRY_PATH`](crate::catalog::FALLBACK_ENTRY_PATH).
    pub fn replace(&mut self, template: &LanguageTemplate, files: FileTree, project_id: Option<ProjectId>) {
        self.selected_path = select_entry(&files, template);
        self.language_id = template.id.to_string();
        self.files = files;
        self.project_id = project_id;
    }

    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            language_id: self.language_id.clone(),
            files: self.files.clone(),
        }
    }

    /// Create a file or folder; a new file becomes the selection.
    pub fn create_path(&mut self, path: &str, is_folder: bool) -> Result<FileNode> {
        self.ensure_editable()?;
        let node = self.files.create(path, is_folder)?;
        if !node.is_folder {
            self.selected_path = node.path.clone();
        }
        Ok(node)
    }

    /// Rename a file or folder; the selection follows the moved node.
    pub fn rename_path(&mut self, old_path: &str, new_path: &str) -> Result<Vec<(String, String)>> {
        self.ensure_editable()?;
        let moved = self.files.rename(old_path, new_path)?;
        if let Some((_, new)) = moved.iter().find(|(old, _)| *old == self.selected_path) {
            self.selected_path = new.clone();
        }
        Ok(moved)
    }

    /// Delete a path (folders cascade). Returns the removed nodes.
    pub fn delete_path(&mut self, path: &str) -> Result<Vec<FileNode>> {
        self.ensure_editable()?;
        let removed = self.files.delete(path);
        if removed.iter().any(|node| node.path == self.selected_path) {
            self.selected_path = self
                .files
                .first_renderable()
                .unwrap_or_else(|| self.template().entry_path());
        }
        Ok(removed)
    }

    pub fn select_path(&mut self, path: &str) -> Result<()> {
        let path = normalize(path)?;
        if !self.files.contains(&path) {
            return Err(TreeError::PathNotFound(path));
        }
        self.selected_path = path;
        Ok(())
    }

    pub fn update_content(&mut self, path: &str, content: impl Into<String>) -> Result<()> {
        self.ensure_editable()?;
        self.files.update_content(path, content)
    }

    /// Content of the selected file, or [`MISSING_CONTENT`].
    pub fn active_content(&self) -> String {
        self.files
            .get(&self.selected_path)
            .filter(|node| !node.is_folder)
            .and_then(|node| node.content.clone())
            .unwrap_or_else(|| MISSING_CONTENT.to_string())
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.template().editable {
            Ok(())
        } else {
            Err(TreeError::ReadOnlyLanguage(self.language_id.clone()))
        }
    }
}

fn select_entry(files: &FileTree, template: &LanguageTemplate) -> String {
    files.entry_path().unwrap_or_else(|| template.entry_path())
}
