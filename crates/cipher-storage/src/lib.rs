//! Persistence of workspace snapshots, keyed by
//! `(namespace, owner_id, project_id)`.

pub mod document;
pub mod error;
pub mod file;
pub mod gateway;
pub mod memory;
pub mod project;

pub use document::{Document, DocumentPath, DocumentStore};
pub use error::{PersistenceError, Result};
pub use file::JsonFileDocumentStore;
pub use gateway::{Ack, PersistenceGateway};
pub use memory::MemoryDocumentStore;
pub use project::{PersistedProject, ProjectSummary};
