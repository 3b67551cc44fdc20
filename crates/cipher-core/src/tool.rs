use serde::{Deserialize, Serialize};

/// The request channels served by the tool orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Explain,
    Review,
    Generate,
    Convert,
    SimulateExecution,
}

impl ToolKind {
    pub const CLICK_DRIVEN: [ToolKind; 4] = [
        ToolKind::Explain,
        ToolKind::Review,
        ToolKind::Generate,
        ToolKind::Convert,
    ];

    /// Human-readable tool name used in status text.
    pub fn display_name(&self) -> &'static str {
        match self {
            ToolKind::Explain => "Code Explanation",
            ToolKind::Review => "Code Review",
            ToolKind::Generate => "Code Generation",
            ToolKind::Convert => "Code Conversion",
            ToolKind::SimulateExecution => "Terminal Simulation",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPayload {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// One invocation of a tool channel.
///
/// `generation` is stamped by the orchestrator at dispatch time; callers
/// leave it at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub kind: ToolKind,
    pub source_path: String,
    pub source_language: String,
    pub payload: ToolPayload,
    #[serde(default)]
    pub generation: u64,
}

impl ToolRequest {
    fn new(kind: ToolKind, path: &str, language: &str, payload: ToolPayload) -> Self {
        Self {
            kind,
            source_path: path.to_string(),
            source_language: language.to_string(),
            payload,
            generation: 0,
        }
    }

    pub fn explain(path: &str, language: &str, code: impl Into<String>) -> Self {
        let payload = ToolPayload {
            code: code.into(),
            ..Default::default()
        };
        Self::new(ToolKind::Explain, path, language, payload)
    }

    pub fn review(path: &str, language: &str, code: impl Into<String>) -> Self {
        let payload = ToolPayload {
            code: code.into(),
            ..Default::default()
        };
        Self::new(ToolKind::Review, path, language, payload)
    }

    pub fn generate(path: &str, language: &str, prompt: impl Into<String>) -> Self {
        let payload = ToolPayload {
            prompt: Some(prompt.into()),
            ..Default::default()
        };
        Self::new(ToolKind::Generate, path, language, payload)
    }

    pub fn convert(path: &str, language: &str, code: impl Into<String>, target: &str) -> Self {
        let payload = ToolPayload {
            code: code.into(),
            target_language: Some(target.to_string()),
            prompt: None,
        };
        Self::new(ToolKind::Convert, path, language, payload)
    }

    pub fn simulate(path: &str, language: &str, code: impl Into<String>) -> Self {
        let payload = ToolPayload {
            code: code.into(),
            ..Default::default()
        };
        Self::new(ToolKind::SimulateExecution, path, language, payload)
    }
}

/// Observable state of a single channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum ChannelState {
    #[default]
    Idle,
    Pending,
    Succeeded(String),
    Failed(String),
}

impl ChannelState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ChannelState::Pending)
    }

    /// Text to display for the channel, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            ChannelState::Succeeded(text) | ChannelState::Failed(text) => Some(text),
            _ => None,
        }
    }
}
