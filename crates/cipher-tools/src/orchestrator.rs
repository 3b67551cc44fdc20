//! Tool channels: four click-driven ones (explain, review, generate,
//! convert) and the debounced execution-simulation channel.
//!
//! Each channel owns a generation counter. A request is stamped with the
//! counter at dispatch and its result is applied only while that stamp is
//! still current, so late responses of superseded requests are dropped.
//! In-flight calls are never aborted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cipher_core::config::StudioConfig;
use cipher_core::timer::{self, TimerHandle};
use cipher_core::{ChannelState, Collaborator, EventBus, LanguageCatalog, StudioEvent, ToolKind, ToolRequest};
use cipher_llm::{InferenceError, InferenceService, RetryPolicy, RetryingInference};

use crate::heuristic;
use crate::prompts;

/// Content at or below this trimmed length simulates to empty output.
const MIN_SIMULATION_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub retry: RetryPolicy,
    pub debounce: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&StudioConfig::default())
    }
}

impl From<&StudioConfig> for OrchestratorSettings {
    fn from(config: &StudioConfig) -> Self {
        Self {
            retry: RetryPolicy::from(&config.retry),
            debounce: config.simulation_debounce(),
        }
    }
}

/// The active file as seen by the simulation channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationInput {
    pub path: String,
    pub language_id: String,
    pub content: String,
}

#[derive(Debug, Default)]
struct Channel {
    generation: u64,
    state: ChannelState,
}

#[derive(Default)]
struct Shared {
    channels: HashMap<ToolKind, Channel>,
    debounce: Option<TimerHandle>,
    last_simulated: Option<String>,
}

struct Inner {
    inference: Collaborator<dyn InferenceService>,
    events: EventBus,
    settings: OrchestratorSettings,
    shared: Mutex<Shared>,
}

/// Cheap to clone; clones share channels and timers.
#[derive(Clone)]
pub struct ToolOrchestrator {
    inner: Arc<Inner>,
}

impl ToolOrchestrator {
    /// `inference` is wrapped with the retry policy from `settings`.
    pub fn new(
        inference: Collaborator<dyn InferenceService>,
        events: EventBus,
        settings: OrchestratorSettings,
    ) -> Self {
        let inference = match inference {
            Collaborator::Available(service) => Collaborator::available(
                Arc::new(RetryingInference::new(service, settings.retry)) as Arc<dyn InferenceService>,
            ),
            Collaborator::Unavailable => Collaborator::Unavailable,
        };
        Self {
            inner: Arc::new(Inner {
                inference,
                events,
                settings,
                shared: Mutex::new(Shared::default()),
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.inference.is_available()
    }

    pub fn state(&self, kind: ToolKind) -> ChannelState {
        self.shared()
            .channels
            .get(&kind)
            .map(|c| c.state.clone())
            .unwrap_or_default()
    }

    pub fn generation(&self, kind: ToolKind) -> u64 {
        self.shared().channels.get(&kind).map_or(0, |c| c.generation)
    }

    /// Run one request to completion and return its outcome.
    ///
    /// The outcome is published on the channel only if no newer request
    /// was issued on it meanwhile.
    pub async fn run(&self, mut request: ToolRequest) -> ChannelState {
        if request.kind == ToolKind::SimulateExecution {
            let input = SimulationInput {
                path: request.source_path,
                language_id: request.source_language,
                content: request.payload.code,
            };
            return ChannelState::Succeeded(self.simulate_now(input).await);
        }

        let kind = request.kind;
        request.generation = self.begin(kind);

        let outcome = match self.inner.inference.get() {
            Some(service) => {
                let instruction = prompts::build(&request);
                match service.complete(&instruction.prompt, &instruction.system).await {
                    Ok(text) => ChannelState::Succeeded(text),
                    Err(e) => {
                        log::warn!("{} failed: {}", kind, e);
                        ChannelState::Failed(e.to_string())
                    }
                }
            }
            None => ChannelState::Failed(InferenceError::Unavailable.to_string()),
        };

        self.finish(kind, request.generation, outcome.clone());
        outcome
    }

    /// Spawn [`run`](Self::run) onto the runtime.
    pub fn dispatch(&self, request: ToolRequest) -> tokio::task::JoinHandle<ChannelState> {
        let this = self.clone();
        tokio::spawn(async move { this.run(request).await })
    }

    /// Feed an edit of the active file into the simulation channel.
    ///
    /// Languages that are not simulated reset the channel to `Idle`.
    /// Otherwise the simulation is (re)scheduled after the debounce window;
    /// every call inside the window restarts it and supersedes whatever is
    /// in flight.
    pub fn content_changed(&self, input: SimulationInput) {
        let simulated = LanguageCatalog::global()
            .get_or_default(&input.language_id)
            .is_simulated();
        if !simulated {
            self.reset_simulation();
            return;
        }

        let mut guard = self.shared();
        let shared = &mut *guard;
        let channel = shared.channels.entry(ToolKind::SimulateExecution).or_default();
        let unchanged = matches!(channel.state, ChannelState::Succeeded(_))
            && shared.debounce.as_ref().map_or(true, |t| t.is_finished())
            && shared.last_simulated.as_deref() == Some(input.content.as_str());
        if unchanged {
            return;
        }

        if let Some(previous) = shared.debounce.take() {
            previous.cancel();
        }
        let channel = shared.channels.entry(ToolKind::SimulateExecution).or_default();
        channel.generation += 1;
        let generation = channel.generation;

        let this = self.clone();
        shared.debounce = Some(timer::spawn_after(self.inner.settings.debounce, move |_| async move {
            this.simulate_generation(generation, input).await;
        }));
    }

    /// Simulate immediately, bypassing the debounce window.
    pub async fn simulate_now(&self, input: SimulationInput) -> String {
        let generation = {
            let mut shared = self.shared();
            if let Some(previous) = shared.debounce.take() {
                previous.cancel();
            }
            let channel = shared.channels.entry(ToolKind::SimulateExecution).or_default();
            channel.generation += 1;
            channel.generation
        };
        self.simulate_generation(generation, input)
            .await
            .unwrap_or_default()
    }

    /// Cancel the pending debounce and invalidate the in-flight simulation.
    pub fn cancel_pending(&self) {
        let mut shared = self.shared();
        if let Some(timer) = shared.debounce.take() {
            timer.cancel();
        }
        shared
            .channels
            .entry(ToolKind::SimulateExecution)
            .or_default()
            .generation += 1;
    }

    pub fn reset_simulation(&self) {
        self.cancel_pending();
        {
            let mut shared = self.shared();
            shared.last_simulated = None;
            let channel = shared.channels.entry(ToolKind::SimulateExecution).or_default();
            if channel.state == ChannelState::Idle {
                return;
            }
            channel.state = ChannelState::Idle;
        }
        self.emit(ToolKind::SimulateExecution, ChannelState::Idle);
    }

    /// Runs the simulation stamped `generation`; `None` when superseded
    /// before it started.
    async fn simulate_generation(&self, generation: u64, input: SimulationInput) -> Option<String> {
        {
            let mut shared = self.shared();
            let channel = shared.channels.entry(ToolKind::SimulateExecution).or_default();
            if channel.generation != generation {
                return None;
            }
            channel.state = ChannelState::Pending;
        }
        self.emit(ToolKind::SimulateExecution, ChannelState::Pending);

        let output = self.resolve_simulation(&input).await;

        let applied = {
            let mut shared = self.shared();
            let channel = shared.channels.entry(ToolKind::SimulateExecution).or_default();
            if channel.generation == generation {
                channel.state = ChannelState::Succeeded(output.clone());
                shared.last_simulated = Some(input.content.clone());
                true
            } else {
                false
            }
        };
        if applied {
            self.emit(ToolKind::SimulateExecution, ChannelState::Succeeded(output.clone()));
        } else {
            log::debug!("Discarding stale simulation of {} (generation {})", input.path, generation);
        }
        Some(output)
    }

    /// Always produces displayable text; remote failures fall back to the
    /// local extraction.
    async fn resolve_simulation(&self, input: &SimulationInput) -> String {
        if input.content.trim().len() <= MIN_SIMULATION_LEN {
            return String::new();
        }

        let extraction = heuristic::extract(&input.language_id, &input.content);
        if let Some(output) = extraction.exact() {
            log::debug!("Simulated {} locally", input.path);
            return output;
        }

        if let Some(service) = self.inner.inference.get() {
            let request = ToolRequest::simulate(&input.path, &input.language_id, input.content.as_str());
            let instruction = prompts::build(&request);
            match service.complete(&instruction.prompt, &instruction.system).await {
                Ok(text) => return text,
                Err(e) => log::warn!("Remote simulation failed, using local preview: {}", e),
            }
        }

        extraction
            .best_effort()
            .unwrap_or_else(|| heuristic::FALLBACK_OUTPUT.to_string())
    }

    fn begin(&self, kind: ToolKind) -> u64 {
        let generation = {
            let mut shared = self.shared();
            let channel = shared.channels.entry(kind).or_default();
            channel.generation += 1;
            channel.state = ChannelState::Pending;
            channel.generation
        };
        self.emit(kind, ChannelState::Pending);
        generation
    }

    fn finish(&self, kind: ToolKind, generation: u64, outcome: ChannelState) {
        let applied = {
            let mut shared = self.shared();
            let channel = shared.channels.entry(kind).or_default();
            if channel.generation == generation {
                channel.state = outcome.clone();
                true
            } else {
                false
            }
        };
        if applied {
            self.emit(kind, outcome);
        } else {
            log::debug!("Discarding stale {} result (generation {})", kind, generation);
        }
    }

    fn emit(&self, kind: ToolKind, state: ChannelState) {
        self.inner.events.emit(StudioEvent::ChannelChanged { kind, state });
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.inner.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cipher_llm::Result as InferenceResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies after a delay chosen by the prompt: prompts containing
    /// `slow` take 10 s, everything else 1 s.
    struct ScriptedInference {
        fail: bool,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedInference {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InferenceService for ScriptedInference {
        async fn complete(&self, prompt: &str, _system: &str) -> InferenceResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let delay = if prompt.contains("slow") { 10 } else { 1 };
            tokio::time::sleep(Duration::from_secs(delay)).await;
            if self.fail {
                Err(InferenceError::Api("HTTP 500".to_string()))
            } else if prompt.contains("slow") {
                Ok("slow answer".to_string())
            } else {
                Ok("fast answer".to_string())
            }
        }
    }

    fn orchestrator(service: Arc<ScriptedInference>) -> ToolOrchestrator {
        ToolOrchestrator::new(
            Collaborator::available(service as Arc<dyn InferenceService>),
            EventBus::default(),
            OrchestratorSettings::default(),
        )
    }

    fn python(content: &str) -> SimulationInput {
        SimulationInput {
            path: "/main.py".to_string(),
            language_id: "Python".to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn newer_request_wins_even_if_older_finishes_last() {
        let service = ScriptedInference::new(false);
        let tools = orchestrator(service.clone());

        let first = tools.dispatch(ToolRequest::explain("/a.py", "Python", "slow code"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = tools.dispatch(ToolRequest::explain("/a.py", "Python", "fast code"));

        assert_eq!(second.await.unwrap(), ChannelState::Succeeded("fast answer".to_string()));
        assert_eq!(first.await.unwrap(), ChannelState::Succeeded("slow answer".to_string()));
        assert_eq!(
            tools.state(ToolKind::Explain),
            ChannelState::Succeeded("fast answer".to_string())
        );
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_channel_fails_without_touching_others() {
        let service = ScriptedInference::new(true);
        let tools = orchestrator(service.clone());

        let state = tools.run(ToolRequest::review("/a.py", "Python", "x = 1")).await;

        assert_eq!(service.calls(), 3);
        assert_eq!(
            state,
            ChannelState::Failed(
                "Failed to get a response after 3 attempts. Error: API error: HTTP 500".to_string()
            )
        );
        assert_eq!(tools.state(ToolKind::Review), state);
        for kind in [ToolKind::Explain, ToolKind::Generate, ToolKind::Convert, ToolKind::SimulateExecution] {
            assert_eq!(tools.state(kind), ChannelState::Idle);
        }
    }

    #[tokio::test]
    async fn unconfigured_inference_fails_immediately() {
        let tools = ToolOrchestrator::new(
            Collaborator::Unavailable,
            EventBus::default(),
            OrchestratorSettings::default(),
        );
        let state = tools.run(ToolRequest::explain("/a.go", "Go", "x")).await;
        assert_eq!(
            state,
            ChannelState::Failed("Inference service is not configured".to_string())
        );
        assert!(!tools.is_configured());
    }

    #[tokio::test(start_paused = true)]
    async fn literal_print_resolves_without_remote_call() {
        let service = ScriptedInference::new(false);
        let tools = orchestrator(service.clone());

        tools.content_changed(python("print(\"hi\")"));
        tokio::time::sleep(Duration::from_millis(1600)).await;

        assert_eq!(
            tools.state(ToolKind::SimulateExecution),
            ChannelState::Succeeded("hi".to_string())
        );
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn edits_inside_debounce_window_collapse_into_one_call() {
        let service = ScriptedInference::new(false);
        let tools = orchestrator(service.clone());

        tools.content_changed(python("x = compute()\nprint(x) # one"));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        tools.content_changed(python("x = compute()\nprint(x) # two"));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(service.calls(), 0);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(service.calls(), 1);
        assert!(service.prompts.lock().unwrap()[0].contains("# two"));
        assert_eq!(
            tools.state(ToolKind::SimulateExecution),
            ChannelState::Succeeded("fast answer".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_simulation_result_is_never_applied() {
        let service = ScriptedInference::new(false);
        let tools = orchestrator(service.clone());
        let mut events = tools.inner.events.subscribe();

        // First edit is dispatched and stays in flight for 10 s.
        tools.content_changed(python("x = 1\nprint(x) # slow"));
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(service.calls(), 1);

        // Second edit resolves at ~4.5 s, before the first one does.
        tools.content_changed(python("y = 2\nprint(y) # fast"));
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(service.calls(), 2);
        assert_eq!(
            tools.state(ToolKind::SimulateExecution),
            ChannelState::Succeeded("fast answer".to_string())
        );
        while let Ok(event) = events.try_recv() {
            assert_ne!(
                event,
                StudioEvent::ChannelChanged {
                    kind: ToolKind::SimulateExecution,
                    state: ChannelState::Succeeded("slow answer".to_string()),
                }
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_falls_back_to_local_preview() {
        let service = ScriptedInference::new(true);
        let tools = orchestrator(service.clone());

        let output = tools.simulate_now(python("print(\"ok\")\nprint(value)")).await;
        assert_eq!(output, "ok");

        let output = tools.simulate_now(python("value = 42\nprint(value)")).await;
        assert_eq!(output, heuristic::FALLBACK_OUTPUT);
        assert_eq!(
            tools.state(ToolKind::SimulateExecution),
            ChannelState::Succeeded(heuristic::FALLBACK_OUTPUT.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tiny_content_simulates_to_empty_output() {
        let service = ScriptedInference::new(false);
        let tools = orchestrator(service.clone());
        assert_eq!(tools.simulate_now(python("  x  ")).await, "");
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn markup_languages_reset_the_channel() {
        let service = ScriptedInference::new(false);
        let tools = orchestrator(service.clone());
        tools.simulate_now(python("print(\"hi\")")).await;

        tools.content_changed(SimulationInput {
            path: "/index.html".to_string(),
            language_id: "HTML".to_string(),
            content: "<h1>hi</h1>".to_string(),
        });
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(tools.state(ToolKind::SimulateExecution), ChannelState::Idle);
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_content_is_not_resimulated() {
        let service = ScriptedInference::new(false);
        let tools = orchestrator(service.clone());
        let input = python("z = 3\nprint(z)");

        tools.content_changed(input.clone());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.calls(), 1);
        let generation = tools.generation(ToolKind::SimulateExecution);

        tools.content_changed(input);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.calls(), 1);
        assert_eq!(tools.generation(ToolKind::SimulateExecution), generation);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_stops_a_scheduled_simulation() {
        let service = ScriptedInference::new(false);
        let tools = orchestrator(service.clone());
        tools.content_changed(python("a = 1\nprint(a)"));
        tools.cancel_pending();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.calls(), 0);
        assert_eq!(tools.state(ToolKind::SimulateExecution), ChannelState::Idle);
    }
}
