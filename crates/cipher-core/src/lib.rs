//! Shared model for the CipherStudio engine: the file tree, the language
//! catalog, the live workspace, tool-channel types and the small runtime
//! pieces (events, timers, configuration) the other crates build on.

pub mod catalog;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod events;
pub mod timer;
pub mod tool;
pub mod tree;
pub mod workspace;

pub use catalog::{LanguageCatalog, LanguageTemplate, PreviewMode, DEFAULT_LANGUAGE};
pub use collaborator::Collaborator;
pub use config::StudioConfig;
pub use error::{Result, TreeError};
pub use events::{EventBus, StudioEvent};
pub use timer::TimerHandle;
pub use tool::{ChannelState, ToolKind, ToolPayload, ToolRequest};
pub use tree::{FileNode, FileTree, TreeEntry};
pub use workspace::{OwnerId, ProjectId, ProjectSnapshot, Workspace, MISSING_CONTENT};
