//! The workspace controller: owns the live workspace and drives the
//! project lifecycle, file operations, autosave and tool channels.

mod autosave;
pub mod controller;
pub mod error;
pub mod status;

pub use controller::{ControllerSettings, WorkspaceController};
pub use error::{Result, WorkspaceError};
pub use status::{BusyGuard, StatusLine};
