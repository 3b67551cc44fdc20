use serde::Serialize;
use tokio::sync::broadcast;

use crate::tool::{ChannelState, ToolKind};

/// State-change notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudioEvent {
    SessionReady {
        owner_id: String,
    },

    /// Files, language and project id were replaced wholesale.
    WorkspaceReplaced {
        language_id: String,
        project_id: Option<String>,
    },

    FilesChanged,

    SelectionChanged {
        path: String,
    },

    /// `None` clears the status line.
    StatusChanged {
        message: Option<String>,
    },

    BusyChanged {
        busy: bool,
    },

    AutosaveToggled {
        enabled: bool,
    },

    AutosaveCompleted {
        project_id: String,
        success: bool,
    },

    ChannelChanged {
        kind: ToolKind,
        state: ChannelState,
    },
}

/// Broadcast fan-out of [`StudioEvent`]s.
///
/// Emission never blocks; with no subscribers the event is dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StudioEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn emit(&self, event: StudioEvent) {
        log::trace!("event: {:?}", event);
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(StudioEvent::FilesChanged);
        bus.emit(StudioEvent::SelectionChanged {
            path: "/main.py".to_string(),
        });

        assert_eq!(rx.recv().await.unwrap(), StudioEvent::FilesChanged);
        match rx.recv().await.unwrap() {
            StudioEvent::SelectionChanged { path } => assert_eq!(path, "/main.py"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = EventBus::new(1);
        bus.emit(StudioEvent::FilesChanged);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(StudioEvent::ChannelChanged {
            kind: ToolKind::Review,
            state: ChannelState::Succeeded("ok".to_string()),
        })
        .unwrap();
        assert_eq!(json["type"], "channel_changed");
        assert_eq!(json["kind"], "review");
        assert_eq!(json["state"]["status"], "succeeded");
    }
}
