//! Periodic background save of the live workspace.

use std::sync::{Arc, Weak};
use std::time::Duration;

use cipher_core::timer::{self, TimerHandle};
use cipher_core::{EventBus, ProjectId, StudioEvent, Workspace};
use cipher_storage::PersistenceGateway;
use tokio::sync::RwLock;

/// Arm an autosave loop bound to `project_id`.
///
/// Each tick reads the workspace as it is at that moment. A tick does
/// nothing once autosave was switched off or the workspace moved on to
/// another project, even if the handle was not torn down yet.
pub(crate) fn spawn(
    interval: Duration,
    project_id: ProjectId,
    workspace: Weak<RwLock<Workspace>>,
    persistence: Arc<PersistenceGateway>,
    events: EventBus,
) -> TimerHandle {
    log::debug!("Autosave armed for project {} every {:?}", project_id, interval);
    timer::spawn_every(interval, move |token| {
        let workspace = workspace.clone();
        let persistence = persistence.clone();
        let events = events.clone();
        let project_id = project_id.clone();
        async move {
            let Some(workspace) = workspace.upgrade() else {
                token.cancel();
                return;
            };
            let (owner_id, snapshot) = {
                let ws = workspace.read().await;
                if !ws.autosave_enabled() || ws.project_id() != Some(project_id.as_str()) {
                    return;
                }
                (ws.owner_id().map(str::to_string), ws.snapshot())
            };
            if token.is_cancelled() {
                return;
            }

            let result = persistence
                .autosave(owner_id.as_deref(), Some(project_id.as_str()), &snapshot)
                .await;
            events.emit(StudioEvent::AutosaveCompleted {
                project_id,
                success: result.is_ok(),
            });
        }
    })
}
