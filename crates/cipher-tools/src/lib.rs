//! AI tool channels for the workspace: prompt templates, the local print
//! heuristic and the orchestrator that debounces, retries and discards
//! stale results.

pub mod heuristic;
pub mod orchestrator;
pub mod prompts;

pub use orchestrator::{OrchestratorSettings, SimulationInput, ToolOrchestrator};
