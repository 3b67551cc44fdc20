use std::sync::{PoisonError, RwLock};

use cipher_core::{Collaborator, EventBus, OwnerId, StudioEvent};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::identity::IdentityService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInMethod {
    Token,
    Anonymous,
    /// Random identity generated in-process; nothing is persisted remotely.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub owner_id: OwnerId,
    pub method: SignInMethod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Ready(Session),
}

/// Establishes the owner identity exactly once per process (until reset).
///
/// Concurrent callers of [`bootstrap`](Self::bootstrap) wait on the same
/// run and all observe its result.
pub struct SessionBootstrapper {
    identity: Collaborator<dyn IdentityService>,
    token: Option<String>,
    state: RwLock<SessionState>,
    run: Mutex<()>,
    events: EventBus,
}

impl SessionBootstrapper {
    pub fn new(identity: Collaborator<dyn IdentityService>, token: Option<String>, events: EventBus) -> Self {
        Self {
            identity,
            token: token.filter(|t| !t.trim().is_empty()),
            state: RwLock::new(SessionState::Unauthenticated),
            run: Mutex::new(()),
            events,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn session(&self) -> Option<Session> {
        match self.state() {
            SessionState::Ready(session) => Some(session),
            _ => None,
        }
    }

    pub fn owner_id(&self) -> Option<OwnerId> {
        self.session().map(|s| s.owner_id)
    }

    pub async fn bootstrap(&self) -> Session {
        if let Some(session) = self.session() {
            return session;
        }

        let _run = self.run.lock().await;
        if let Some(session) = self.session() {
            return session;
        }

        self.set_state(SessionState::Authenticating);
        let session = self.authenticate().await;
        log::info!(
            "Session ready: owner {} via {:?}",
            session.owner_id,
            session.method
        );
        self.set_state(SessionState::Ready(session.clone()));
        self.events.emit(StudioEvent::SessionReady {
            owner_id: session.owner_id.clone(),
        });
        session
    }

    /// Forget the current identity; the next bootstrap runs again.
    pub fn reset(&self) {
        self.set_state(SessionState::Unauthenticated);
    }

    async fn authenticate(&self) -> Session {
        let Some(identity) = self.identity.get() else {
            log::debug!("No identity service configured, using a local identity");
            return local_session();
        };

        if let Some(token) = &self.token {
            match identity.sign_in_with_token(token).await {
                Ok(owner_id) => {
                    return Session {
                        owner_id,
                        method: SignInMethod::Token,
                    }
                }
                Err(e) => log::warn!("Token sign-in failed, trying anonymous sign-in: {}", e),
            }
        }

        match identity.sign_in_anonymously().await {
            Ok(owner_id) => Session {
                owner_id,
                method: SignInMethod::Anonymous,
            },
            Err(e) => {
                log::warn!("Anonymous sign-in failed, using a local identity: {}", e);
                local_session()
            }
        }
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

fn local_session() -> Session {
    Session {
        owner_id: uuid::Uuid::new_v4().to_string(),
        method: SignInMethod::Local,
    }
}
