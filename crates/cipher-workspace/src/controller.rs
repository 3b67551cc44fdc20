use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cipher_core::config::StudioConfig;
use cipher_core::timer::TimerHandle;
use cipher_core::{
    ChannelState, Collaborator, EventBus, FileNode, LanguageCatalog, LanguageTemplate, StudioEvent,
    ToolRequest, Workspace, DEFAULT_LANGUAGE,
};
use cipher_llm::InferenceService;
use cipher_session::{IdentityService, Session, SessionBootstrapper};
use cipher_storage::{Ack, DocumentStore, PersistenceError, PersistenceGateway, ProjectSummary};
use cipher_tools::{OrchestratorSettings, SimulationInput, ToolOrchestrator};
use tokio::sync::RwLock;

use crate::autosave;
use crate::error::{Result, WorkspaceError};
use crate::status::StatusLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub autosave_enabled: bool,
    pub autosave_interval: Duration,
    pub status_clear_after: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&StudioConfig::default())
    }
}

impl From<&StudioConfig> for ControllerSettings {
    fn from(config: &StudioConfig) -> Self {
        Self {
            autosave_enabled: config.autosave_enabled,
            autosave_interval: config.autosave_interval(),
            status_clear_after: config.status_clear_after(),
        }
    }
}

struct Inner {
    workspace: Arc<RwLock<Workspace>>,
    session: Arc<SessionBootstrapper>,
    persistence: Arc<PersistenceGateway>,
    tools: ToolOrchestrator,
    events: EventBus,
    status: StatusLine,
    autosave: Mutex<Option<TimerHandle>>,
    settings: ControllerSettings,
}

/// Owner of the single live [`Workspace`].
///
/// Every mutation of files, selection, language or project id goes
/// through here. Locks are released before any await on a collaborator.
#[derive(Clone)]
pub struct WorkspaceController {
    inner: Arc<Inner>,
}

fn new_project_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl WorkspaceController {
    pub fn new(
        session: Arc<SessionBootstrapper>,
        persistence: Arc<PersistenceGateway>,
        tools: ToolOrchestrator,
        events: EventBus,
        settings: ControllerSettings,
    ) -> Self {
        let mut workspace = Workspace::new(DEFAULT_LANGUAGE);
        workspace.set_autosave_enabled(settings.autosave_enabled);
        Self {
            inner: Arc::new(Inner {
                workspace: Arc::new(RwLock::new(workspace)),
                session,
                persistence,
                tools,
                status: StatusLine::new(events.clone(), settings.status_clear_after),
                events,
                autosave: Mutex::new(None),
                settings,
            }),
        }
    }

    /// Wire a controller from configuration and whichever collaborators
    /// the host could provide.
    pub fn from_config(
        config: &StudioConfig,
        identity: Collaborator<dyn IdentityService>,
        store: Collaborator<dyn DocumentStore>,
        inference: Collaborator<dyn InferenceService>,
    ) -> Self {
        let events = EventBus::default();
        let session = Arc::new(SessionBootstrapper::new(
            identity,
            config.bootstrap_token.clone(),
            events.clone(),
        ));
        let persistence = Arc::new(PersistenceGateway::new(store, config.app_namespace.clone()));
        let tools = ToolOrchestrator::new(inference, events.clone(), OrchestratorSettings::from(config));
        Self::new(session, persistence, tools, events, ControllerSettings::from(config))
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn tools(&self) -> &ToolOrchestrator {
        &self.inner.tools
    }

    pub fn status(&self) -> Option<String> {
        self.inner.status.current()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.status.is_busy()
    }

    /// Copy of the live workspace.
    pub async fn workspace(&self) -> Workspace {
        self.inner.workspace.read().await.clone()
    }

    pub fn autosave_armed(&self) -> bool {
        self.autosave_slot().as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Establish the session, then make sure a project id exists.
    pub async fn bootstrap(&self) -> Session {
        let session = self.inner.session.bootstrap().await;
        let (language_id, project_id) = {
            let mut ws = self.inner.workspace.write().await;
            ws.set_owner_id(Some(session.owner_id.clone()));
            if ws.project_id().is_none() {
                ws.set_project_id(Some(new_project_id()));
            }
            (ws.language_id().to_string(), ws.project_id().map(str::to_string))
        };
        self.inner.events.emit(StudioEvent::WorkspaceReplaced {
            language_id,
            project_id,
        });
        self.restart_autosave().await;
        self.feed_simulation().await;
        session
    }

    /// Start an unsaved project with `language_id`'s default files.
    pub async fn switch_language(&self, language_id: &str) -> Result<()> {
        let template = LanguageCatalog::global()
            .get(language_id)
            .ok_or_else(|| WorkspaceError::UnknownLanguage(language_id.to_string()))?;
        self.replace_with_template(template).await;
        self.inner.status.set(format!(
            "Switched to {}. Start a new project or save your work.",
            template.id
        ));
        Ok(())
    }

    /// Fresh project in the current language.
    pub async fn new_project(&self) {
        let template = self.inner.workspace.read().await.template();
        self.replace_with_template(template).await;
        self.inner.status.set(format!(
            "New {} project created. Use \"Save\" to persist.",
            template.id
        ));
    }

    /// Replace the workspace with a stored project and return its summary;
    /// `None` before the session is ready.
    ///
    /// On any failure the live workspace is left exactly as it was.
    pub async fn load_project(&self, project_id: &str) -> Result<Option<ProjectSummary>> {
        let owner_id = self.owner_id().await;
        if owner_id.is_none() {
            return Ok(None);
        }
        if !self.inner.persistence.is_available() {
            return Err(PersistenceError::Unavailable.into());
        }

        let _busy = self.inner.status.busy();
        self.inner.status.set(format!("Loading project {}...", project_id));

        match self.inner.persistence.load(owner_id.as_deref(), project_id).await {
            Ok(Some(project)) => {
                let template = LanguageCatalog::global().get_or_default(&project.language_id);
                let summary = project.summary();
                {
                    let mut ws = self.inner.workspace.write().await;
                    ws.replace(template, project.files, Some(project_id.to_string()));
                }
                self.after_replace(template.id, Some(project_id.to_string())).await;
                self.inner.status.set(format!(
                    "Project '{}' loaded. Language: {}",
                    summary.name, template.id
                ));
                Ok(Some(summary))
            }
            Ok(None) => Ok(None),
            Err(PersistenceError::NotFound) => {
                self.inner
                    .status
                    .set(format!("Project ID {} not found.", project_id));
                Err(WorkspaceError::ProjectNotFound(project_id.to_string()))
            }
            Err(e) => {
                log::error!("Error loading project {}: {}", project_id, e);
                self.inner
                    .status
                    .set("Error loading project. Check console for details.");
                Err(e.into())
            }
        }
    }

    /// Write the full snapshot under the active project id.
    ///
    /// A no-op (`Ack::Skipped`) before the session is ready.
    pub async fn save_project(&self, name: Option<&str>) -> Result<Ack> {
        let (owner_id, project_id, snapshot) = {
            let ws = self.inner.workspace.read().await;
            (
                ws.owner_id().map(str::to_string),
                ws.project_id().map(str::to_string),
                ws.snapshot(),
            )
        };
        let (Some(owner_id), Some(project_id)) = (owner_id, project_id) else {
            return Ok(Ack::Skipped);
        };
        if !self.inner.persistence.is_available() {
            return Err(PersistenceError::Unavailable.into());
        }

        let _busy = self.inner.status.busy();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Project {}", project_id));

        match self
            .inner
            .persistence
            .save(Some(owner_id.as_str()), Some(project_id.as_str()), &snapshot, Some(name.as_str()))
            .await
        {
            Ok(ack) => {
                self.inner
                    .status
                    .set(format!("Project '{}' saved successfully!", name));
                Ok(ack)
            }
            Err(e) => {
                log::error!("Error saving project {}: {}", project_id, e);
                self.inner
                    .status
                    .set("Error saving project. Check console for details.");
                Err(e.into())
            }
        }
    }

    /// Delete a stored project; deleting the active one starts a new
    /// project so the workspace never points at a deleted document.
    pub async fn delete_project(&self, project_id: &str) -> Result<()> {
        let owner_id = self.owner_id().await;
        if owner_id.is_none() {
            return Ok(());
        }
        if !self.inner.persistence.is_available() {
            return Err(PersistenceError::Unavailable.into());
        }

        let result = {
            let _busy = self.inner.status.busy();
            self.inner
                .persistence
                .delete(owner_id.as_deref(), Some(project_id))
                .await
        };
        match result {
            Ok(_) => {
                self.inner
                    .status
                    .set(format!("Project {} deleted.", project_id));
                let active = self.inner.workspace.read().await.project_id() == Some(project_id);
                if active {
                    self.new_project().await;
                }
                Ok(())
            }
            Err(e) => {
                log::error!("Error deleting project {}: {}", project_id, e);
                self.inner.status.set("Error deleting project.");
                Err(e.into())
            }
        }
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let owner_id = self.owner_id().await;
        Ok(self.inner.persistence.list(owner_id.as_deref()).await?)
    }

    pub async fn set_autosave(&self, enabled: bool) {
        {
            let mut ws = self.inner.workspace.write().await;
            if ws.autosave_enabled() == enabled {
                return;
            }
            ws.set_autosave_enabled(enabled);
        }
        log::info!("Autosave {}", if enabled { "enabled" } else { "disabled" });
        self.inner
            .events
            .emit(StudioEvent::AutosaveToggled { enabled });
        self.restart_autosave().await;
    }

    /// Flip autosave and return the new setting.
    pub async fn toggle_autosave(&self) -> bool {
        let enabled = !self.inner.workspace.read().await.autosave_enabled();
        self.set_autosave(enabled).await;
        enabled
    }

    pub async fn create_path(&self, path: &str, is_folder: bool) -> Result<FileNode> {
        let (node, selected) = {
            let mut ws = self.inner.workspace.write().await;
            let node = ws.create_path(path, is_folder)?;
            (node, ws.selected_path().to_string())
        };
        self.inner.events.emit(StudioEvent::FilesChanged);
        if !node.is_folder {
            self.selection_changed(selected).await;
        }
        Ok(node)
    }

    pub async fn rename_path(&self, old_path: &str, new_path: &str) -> Result<Vec<(String, String)>> {
        let (moved, selection_moved, selected) = {
            let mut ws = self.inner.workspace.write().await;
            let before = ws.selected_path().to_string();
            let moved = ws.rename_path(old_path, new_path)?;
            let after = ws.selected_path().to_string();
            (moved, before != after, after)
        };
        if !moved.is_empty() {
            self.inner.events.emit(StudioEvent::FilesChanged);
        }
        if selection_moved {
            self.selection_changed(selected).await;
        }
        Ok(moved)
    }

    pub async fn delete_path(&self, path: &str) -> Result<Vec<FileNode>> {
        let (removed, selection_moved, selected) = {
            let mut ws = self.inner.workspace.write().await;
            let before = ws.selected_path().to_string();
            let removed = ws.delete_path(path)?;
            let after = ws.selected_path().to_string();
            (removed, before != after, after)
        };
        if !removed.is_empty() {
            self.inner.events.emit(StudioEvent::FilesChanged);
        }
        if selection_moved {
            self.selection_changed(selected).await;
        }
        Ok(removed)
    }

    pub async fn select_path(&self, path: &str) -> Result<()> {
        let selected = {
            let mut ws = self.inner.workspace.write().await;
            ws.select_path(path)?;
            ws.selected_path().to_string()
        };
        self.selection_changed(selected).await;
        Ok(())
    }

    pub async fn update_file_content(&self, path: &str, content: &str) -> Result<()> {
        let is_selected = {
            let mut ws = self.inner.workspace.write().await;
            ws.update_content(path, content)?;
            cipher_core::tree::normalize(path)? == ws.selected_path()
        };
        self.inner.events.emit(StudioEvent::FilesChanged);
        if is_selected {
            self.feed_simulation().await;
        }
        Ok(())
    }

    pub async fn explain(&self) -> ChannelState {
        let (path, language, code) = self.active_file().await;
        self.inner
            .tools
            .run(ToolRequest::explain(&path, &language, code))
            .await
    }

    pub async fn review(&self) -> ChannelState {
        let (path, language, code) = self.active_file().await;
        self.inner
            .tools
            .run(ToolRequest::review(&path, &language, code))
            .await
    }

    pub async fn generate(&self, description: &str) -> ChannelState {
        let (path, language, _) = self.active_file().await;
        self.inner
            .tools
            .run(ToolRequest::generate(&path, &language, description))
            .await
    }

    pub async fn convert(&self, target_language: &str) -> Result<ChannelState> {
        let target = LanguageCatalog::global()
            .get(target_language)
            .ok_or_else(|| WorkspaceError::UnknownLanguage(target_language.to_string()))?;
        let (path, language, code) = self.active_file().await;
        Ok(self
            .inner
            .tools
            .run(ToolRequest::convert(&path, &language, code, target.id))
            .await)
    }

    /// Simulate the selected file now; `None` for languages that are not
    /// simulated.
    pub async fn simulate_active(&self) -> Option<String> {
        let input = self.simulation_input().await;
        let simulated = LanguageCatalog::global()
            .get_or_default(&input.language_id)
            .is_simulated();
        if !simulated {
            return None;
        }
        Some(self.inner.tools.simulate_now(input).await)
    }

    /// Tear down every timer owned by the controller.
    pub fn shutdown(&self) {
        if let Some(timer) = self.autosave_slot().take() {
            timer.cancel();
        }
        self.inner.status.shutdown();
        self.inner.tools.cancel_pending();
        log::debug!("Workspace controller shut down");
    }

    async fn replace_with_template(&self, template: &'static LanguageTemplate) {
        let project_id = Some(new_project_id());
        {
            let mut ws = self.inner.workspace.write().await;
            ws.replace(template, template.instantiate(), project_id.clone());
        }
        self.after_replace(template.id, project_id).await;
    }

    async fn after_replace(&self, language_id: &str, project_id: Option<String>) {
        self.inner.events.emit(StudioEvent::WorkspaceReplaced {
            language_id: language_id.to_string(),
            project_id,
        });
        self.restart_autosave().await;
        self.feed_simulation().await;
    }

    /// Cancel the running loop and arm a new one if autosave is on and a
    /// project id exists.
    ///
    /// The workspace read guard is held until the slot is filled, so a
    /// concurrent project change cannot leave an older id armed.
    async fn restart_autosave(&self) {
        let ws = self.inner.workspace.read().await;
        let target = match (ws.autosave_enabled(), ws.project_id()) {
            (true, Some(project_id)) => Some(project_id.to_string()),
            _ => None,
        };

        let mut slot = self.autosave_slot();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        if let Some(project_id) = target {
            *slot = Some(autosave::spawn(
                self.inner.settings.autosave_interval,
                project_id,
                Arc::downgrade(&self.inner.workspace),
                self.inner.persistence.clone(),
                self.inner.events.clone(),
            ));
        }
    }

    async fn selection_changed(&self, path: String) {
        self.inner
            .events
            .emit(StudioEvent::SelectionChanged { path });
        self.feed_simulation().await;
    }

    async fn feed_simulation(&self) {
        let input = self.simulation_input().await;
        self.inner.tools.content_changed(input);
    }

    async fn simulation_input(&self) -> SimulationInput {
        let (path, language_id, content) = self.active_file().await;
        SimulationInput {
            path,
            language_id,
            content,
        }
    }

    async fn active_file(&self) -> (String, String, String) {
        let ws = self.inner.workspace.read().await;
        (
            ws.selected_path().to_string(),
            ws.language_id().to_string(),
            ws.active_content(),
        )
    }

    async fn owner_id(&self) -> Option<String> {
        self.inner.workspace.read().await.owner_id().map(str::to_string)
    }

    fn autosave_slot(&self) -> std::sync::MutexGuard<'_, Option<TimerHandle>> {
        self.inner
            .autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
