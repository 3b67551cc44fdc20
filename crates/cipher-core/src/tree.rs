//! Hierarchical file store keyed by absolute `/`-separated paths.
//!
//! Folders are keys ending in [`SEPARATOR`]. A folder may also exist only
//! implicitly, through the paths of its descendants (template trees never
//! declare `/src/` explicitly); cascade operations treat both forms alike.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};

pub const SEPARATOR: char = '/';

/// A single entry of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    /// Mirrors the map key; restored from it on deserialization.
    #[serde(skip)]
    pub path: String,
    /// `None` on a file means "not loaded / denied", not an empty file.
    pub content: Option<String>,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub is_entry_point: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl FileNode {
    pub fn file(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
            is_folder: false,
            is_entry_point: false,
            hidden: false,
        }
    }

    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
            is_folder: true,
            is_entry_point: false,
            hidden: false,
        }
    }

    pub fn with_entry_point(mut self, entry: bool) -> Self {
        self.is_entry_point = entry;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// A file whose content can be shown in an editor.
    pub fn is_renderable(&self) -> bool {
        !self.is_folder && self.content.is_some()
    }
}

/// Nested projection of the visible paths, used to draw a tree view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    pub is_folder: bool,
    pub children: Vec<TreeEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, FileNode>", into = "BTreeMap<String, FileNode>")]
pub struct FileTree {
    nodes: BTreeMap<String, FileNode>,
}

impl From<BTreeMap<String, FileNode>> for FileTree {
    fn from(mut nodes: BTreeMap<String, FileNode>) -> Self {
        for (path, node) in nodes.iter_mut() {
            node.path = path.clone();
        }
        Self { nodes }
    }
}

impl From<FileTree> for BTreeMap<String, FileNode> {
    fn from(tree: FileTree) -> Self {
        tree.nodes
    }
}

impl FromIterator<FileNode> for FileTree {
    fn from_iter<I: IntoIterator<Item = FileNode>>(iter: I) -> Self {
        let nodes = iter
            .into_iter()
            .map(|node| (node.path.clone(), node))
            .collect();
        Self { nodes }
    }
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FileNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Create a file or folder.
    ///
    /// Files receive the extension-based starter content from
    /// [`default_content`]; folders get a trailing separator appended when
    /// missing. Creating an existing path is an error, never an overwrite.
    pub fn create(&mut self, path: &str, is_folder: bool) -> Result<FileNode> {
        let mut path = normalize(path)?;
        if is_folder && !path.ends_with(SEPARATOR) {
            path.push(SEPARATOR);
        }
        if !is_folder && path.ends_with(SEPARATOR) {
            return Err(TreeError::InvalidPath(path));
        }
        if self.occupied(&path) {
            return Err(TreeError::PathExists(path));
        }

        let node = if is_folder {
            FileNode::folder(&path)
        } else {
            let content = default_content(&path);
            FileNode::file(&path, content)
        };
        self.nodes.insert(path, node.clone());
        Ok(node)
    }

    /// Rename a file or move a folder with its whole subtree.
    ///
    /// Returns the `(old, new)` pairs of every key that moved, in key order.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<Vec<(String, String)>> {
        let old_path = normalize(old_path)?;
        let new_path = normalize(new_path)?;
        if old_path == new_path {
            return Ok(Vec::new());
        }

        if self.is_folder_path(&old_path) {
            if !new_path.ends_with(SEPARATOR) {
                return Err(TreeError::InvalidRenameFolderToFile {
                    from: old_path,
                    to: new_path,
                });
            }
            if new_path.starts_with(&old_path) {
                return Err(TreeError::InvalidPath(new_path));
            }
            if self.occupied(&new_path) || self.nodes.keys().any(|k| k.starts_with(&new_path)) {
                return Err(TreeError::PathExists(new_path));
            }

            let moved: Vec<String> = self
                .nodes
                .keys()
                .filter(|k| k.starts_with(&old_path))
                .cloned()
                .collect();
            let mut pairs = Vec::with_capacity(moved.len());
            for key in moved {
                if let Some(mut node) = self.nodes.remove(&key) {
                    let target = format!("{}{}", new_path, &key[old_path.len()..]);
                    node.path = target.clone();
                    self.nodes.insert(target.clone(), node);
                    pairs.push((key, target));
                }
            }
            Ok(pairs)
        } else {
            if !self.nodes.contains_key(&old_path) {
                return Err(TreeError::PathNotFound(old_path));
            }
            if new_path.ends_with(SEPARATOR) {
                return Err(TreeError::InvalidRenameFileToFolder {
                    from: old_path,
                    to: new_path,
                });
            }
            if self.occupied(&new_path) {
                return Err(TreeError::PathExists(new_path));
            }

            let mut node = self
                .nodes
                .remove(&old_path)
                .ok_or_else(|| TreeError::PathNotFound(old_path.clone()))?;
            node.path = new_path.clone();
            self.nodes.insert(new_path.clone(), node);
            Ok(vec![(old_path, new_path)])
        }
    }

    /// Delete a path; folders cascade to every descendant.
    ///
    /// Deleting a missing (or malformed) path is a no-op returning nothing.
    pub fn delete(&mut self, path: &str) -> Vec<FileNode> {
        let Ok(path) = normalize(path) else {
            return Vec::new();
        };

        if self.is_folder_path(&path) {
            let doomed: Vec<String> = self
                .nodes
                .keys()
                .filter(|k| k.starts_with(&path))
                .cloned()
                .collect();
            doomed
                .into_iter()
                .filter_map(|k| self.nodes.remove(&k))
                .collect()
        } else {
            self.nodes.remove(&path).into_iter().collect()
        }
    }

    pub fn update_content(&mut self, path: &str, content: impl Into<String>) -> Result<()> {
        let path = normalize(path)?;
        let node = self
            .nodes
            .get_mut(&path)
            .ok_or_else(|| TreeError::PathNotFound(path.clone()))?;
        if node.is_folder {
            return Err(TreeError::NotAFile(path));
        }
        node.content = Some(content.into());
        Ok(())
    }

    /// All non-hidden paths in lexicographic order.
    pub fn visible_paths(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|node| !node.hidden)
            .map(|node| node.path.clone())
            .collect()
    }

    /// The flagged entry point, else the first visible file.
    pub fn entry_path(&self) -> Option<String> {
        self.nodes
            .values()
            .find(|node| node.is_entry_point && !node.hidden)
            .or_else(|| self.nodes.values().find(|n| !n.hidden && !n.is_folder))
            .map(|node| node.path.clone())
    }

    pub fn first_renderable(&self) -> Option<String> {
        self.nodes
            .values()
            .find(|node| !node.hidden && node.is_renderable())
            .map(|node| node.path.clone())
    }

    pub fn tree_view(&self) -> Vec<TreeEntry> {
        #[derive(Default)]
        struct Branch {
            path: String,
            is_folder: bool,
            children: BTreeMap<String, Branch>,
        }

        fn collect(children: BTreeMap<String, Branch>) -> Vec<TreeEntry> {
            children
                .into_iter()
                .map(|(name, branch)| TreeEntry {
                    name,
                    path: branch.path,
                    is_folder: branch.is_folder || !branch.children.is_empty(),
                    children: collect(branch.children),
                })
                .collect()
        }

        let mut root: BTreeMap<String, Branch> = BTreeMap::new();
        for path in self.visible_paths() {
            let is_folder = self.nodes.get(&path).map_or(false, |n| n.is_folder);
            let segments: Vec<&str> = path.split(SEPARATOR).filter(|s| !s.is_empty()).collect();
            let mut level = &mut root;
            let mut prefix = String::new();
            for (i, segment) in segments.iter().enumerate() {
                prefix.push(SEPARATOR);
                prefix.push_str(segment);
                let last = i + 1 == segments.len();
                let branch = level.entry(segment.to_string()).or_insert_with(|| Branch {
                    path: if last && !is_folder {
                        prefix.clone()
                    } else {
                        format!("{}{}", prefix, SEPARATOR)
                    },
                    ..Default::default()
                });
                if !last || is_folder {
                    branch.is_folder = true;
                }
                level = &mut branch.children;
            }
        }
        collect(root)
    }

    /// Explicit folder node, or a `/`-terminated prefix with descendants.
    fn is_folder_path(&self, path: &str) -> bool {
        match self.nodes.get(path) {
            Some(node) => node.is_folder,
            None => path.ends_with(SEPARATOR) && self.nodes.keys().any(|k| k.starts_with(path)),
        }
    }

    /// A path is taken when it, or its file/folder twin, already exists.
    /// A file path is also taken by an implicit folder of the same name.
    fn occupied(&self, path: &str) -> bool {
        if self.nodes.contains_key(path) {
            return true;
        }
        match path.strip_suffix(SEPARATOR) {
            Some(file) => self.nodes.contains_key(file),
            None => {
                let folder = format!("{}{}", path, SEPARATOR);
                self.nodes.keys().any(|k| k.starts_with(&folder))
            }
        }
    }
}

/// Make `path` absolute and reject empty or doubled separators.
pub fn normalize(path: &str) -> Result<String> {
    let trimmed = path.trim();
    let absolute = if trimmed.starts_with(SEPARATOR) {
        trimmed.to_string()
    } else {
        format!("{}{}", SEPARATOR, trimmed)
    };
    if absolute.len() <= 1 || absolute.contains("//") {
        return Err(TreeError::InvalidPath(path.to_string()));
    }
    Ok(absolute)
}

/// Starter content for a newly created file, chosen by extension.
pub fn default_content(path: &str) -> String {
    let name = path.rsplit(SEPARATOR).next().unwrap_or(path);
    let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext {
        "css" => format!("/* {} */\n", path),
        "js" | "jsx" | "ts" | "tsx" => format!(
            "// {} \n\nexport default function Component() {{ return <div>Hello, {}</div>; }}",
            path, path
        ),
        "html" => format!(
            "<!-- {} -->\n<!DOCTYPE html>\n<html>\n<body>\n<h1>Hello HTML</h1>\n</body>\n</html>",
            path
        ),
        "py" => format!("# {}\n\nprint(\"Hello from new Python file\")\n", path),
        "cpp" => format!(
            "// {}\n#include <iostream>\n\nint main() {{\n  std::cout << \"New C++ File\" << std::endl;\n  return 0;\n}}",
            path
        ),
        _ => format!("// {}\n\n", path),
    }
}
