//! Agent loop — the think→act→observe control core.
//!
//! Drives a single agent through repeated cycles of calling the completion
//! service, parsing its decision, dispatching the requested capability
//! (through the confirmation gate when dangerous), and feeding the
//! observation back into the conversation. Strictly sequential: one
//! outstanding completion call, at most one capability execution at a time.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use pairbot_core::types::{
    ActionRequest, Decision, DecisionKind, Message, Observation, RunOutcome, RunReport, TurnRecord,
};
use pairbot_providers::traits::{CompletionProvider, ProviderError};

use crate::capabilities::base::Capability;
use crate::capabilities::registry::CapabilityRegistry;
use crate::gate::ConfirmationGate;
use crate::parser::parse_decision;
use crate::prompt::PromptBuilder;
use crate::sink::{EventSink, NullSink};

/// Default maximum think→act→observe iterations per goal.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Fatal run failures. Everything recoverable (malformed decisions, unknown
/// tools, denials, capability errors) is absorbed into observations and
/// never surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The completion service failed at the transport level. No retry at
    /// this layer — retry is reserved for malformed content.
    #[error("completion service failure: {0}")]
    Provider(#[from] ProviderError),
}

// ─────────────────────────────────────────────
// Loop state
// ─────────────────────────────────────────────

/// The controller's finite states. Each iteration walks
/// Thinking → Parsing → Dispatching → (Confirming) → Executing → Observing
/// and back, until a final answer or the iteration ceiling.
enum State {
    /// Awaiting model output for the current conversation.
    Thinking,
    /// Raw model text received, not yet a decision.
    Parsing { raw: String },
    /// A tool action was decided; resolve it against the registry.
    Dispatching {
        thought: Option<String>,
        action: ActionRequest,
    },
    /// Dangerous tool: block on the operator's verdict.
    Confirming {
        thought: Option<String>,
        action: ActionRequest,
        capability: Arc<dyn Capability>,
    },
    /// Invoke the capability with the decision's arguments.
    Executing {
        thought: Option<String>,
        action: ActionRequest,
        capability: Arc<dyn Capability>,
    },
    /// Record the turn, feed the observation back, consume one iteration.
    Observing {
        decision: Option<Decision>,
        observation: Observation,
    },
}

// ─────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────

/// The loop controller. Owns the iteration budget and, for the duration of
/// each `run` call, the conversation state; registry and gate are shared.
pub struct AgentLoop {
    /// Completion service.
    provider: Arc<dyn CompletionProvider>,
    /// Fixed capability set, read-only after startup.
    registry: Arc<CapabilityRegistry>,
    /// Operator approval channel for dangerous capabilities.
    gate: Arc<dyn ConfirmationGate>,
    /// Injected progress output (console, test transcript, or nothing).
    sink: Arc<dyn EventSink>,
    /// System prompt construction.
    prompt: PromptBuilder,
    /// Iteration ceiling per run.
    max_iterations: usize,
}

impl AgentLoop {
    /// Create a new loop controller.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        registry: Arc<CapabilityRegistry>,
        gate: Arc<dyn ConfirmationGate>,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        let prompt = PromptBuilder::new(workspace);
        Self {
            provider,
            registry,
            gate,
            sink: Arc::new(NullSink),
            prompt,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Replace the event sink (builder pattern).
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Override the iteration ceiling (builder pattern).
    pub fn with_max_iterations(mut self, ceiling: usize) -> Self {
        self.max_iterations = ceiling;
        self
    }

    /// Reference to the capability registry (for inspection/tests).
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run the loop on one goal until a final answer or exhaustion.
    ///
    /// Conversation state and the turn trail are scoped to this call;
    /// nothing persists into the next `run`.
    pub async fn run(&self, goal: &str) -> Result<RunReport, AgentError> {
        let mut conversation = self.prompt.initial_messages(&self.registry, goal);
        let mut turns: Vec<TurnRecord> = Vec::new();
        let mut iteration: usize = 0;

        info!(goal = %goal, max_iterations = self.max_iterations, "run started");
        self.sink.goal(goal);

        let mut state = State::Thinking;
        loop {
            state = match state {
                State::Thinking => {
                    if iteration >= self.max_iterations {
                        info!(iterations = iteration, "iteration ceiling reached");
                        return Ok(RunReport {
                            outcome: RunOutcome::Exhausted {
                                iterations: iteration,
                            },
                            turns,
                        });
                    }
                    debug!(iteration = iteration, "completion call");
                    let raw = self.provider.complete(&conversation).await?;
                    conversation.push(Message::assistant(raw.clone()));
                    State::Parsing { raw }
                }

                State::Parsing { raw } => match parse_decision(&raw) {
                    Ok(decision) => {
                        if let Some(thought) = &decision.thought {
                            self.sink.thought(iteration, thought);
                        }
                        match decision.kind {
                            DecisionKind::Finish(answer) => {
                                info!(iteration = iteration, "final answer produced");
                                turns.push(TurnRecord {
                                    index: iteration,
                                    decision: Some(Decision::finish(
                                        decision.thought,
                                        answer.clone(),
                                    )),
                                    observation: None,
                                });
                                return Ok(RunReport {
                                    outcome: RunOutcome::Completed(answer),
                                    turns,
                                });
                            }
                            DecisionKind::Act(action) => State::Dispatching {
                                thought: decision.thought,
                                action,
                            },
                        }
                    }
                    Err(e) => {
                        warn!(iteration = iteration, error = %e, "malformed response, retrying");
                        State::Observing {
                            decision: None,
                            observation: Observation::ParseFailure {
                                detail: e.to_string(),
                            },
                        }
                    }
                },

                State::Dispatching { thought, action } => {
                    self.sink.action(iteration, &action.tool, &action.args);
                    match self.registry.lookup(&action.tool) {
                        Ok(capability) => {
                            if capability.dangerous() {
                                State::Confirming {
                                    thought,
                                    action,
                                    capability,
                                }
                            } else {
                                State::Executing {
                                    thought,
                                    action,
                                    capability,
                                }
                            }
                        }
                        Err(_) => {
                            warn!(tool = %action.tool, "unknown tool requested");
                            let observation = Observation::UnknownTool {
                                tool: action.tool.clone(),
                            };
                            State::Observing {
                                decision: Some(Decision::act(thought, action)),
                                observation,
                            }
                        }
                    }
                }

                State::Confirming {
                    thought,
                    action,
                    capability,
                } => {
                    info!(tool = %action.tool, "awaiting operator confirmation");
                    if self.gate.approve(&action.tool, &action.args).await {
                        State::Executing {
                            thought,
                            action,
                            capability,
                        }
                    } else {
                        info!(tool = %action.tool, "operator denied action");
                        let observation = Observation::Denied {
                            tool: action.tool.clone(),
                        };
                        State::Observing {
                            decision: Some(Decision::act(thought, action)),
                            observation,
                        }
                    }
                }

                State::Executing {
                    thought,
                    action,
                    capability,
                } => {
                    debug!(tool = %action.tool, iteration = iteration, "invoking capability");
                    let output = match capability.invoke(&action.args).await {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(tool = %action.tool, error = %e, "capability failed");
                            format!("Error executing {}: {e}", action.tool)
                        }
                    };
                    let observation = Observation::ToolOutput {
                        tool: action.tool.clone(),
                        output,
                    };
                    State::Observing {
                        decision: Some(Decision::act(thought, action)),
                        observation,
                    }
                }

                State::Observing {
                    decision,
                    observation,
                } => {
                    let feedback = observation.to_prompt();
                    self.sink.observation(iteration, &feedback);
                    conversation.push(Message::user(feedback));
                    turns.push(TurnRecord {
                        index: iteration,
                        decision,
                        observation: Some(observation),
                    });
                    iteration += 1;
                    State::Thinking
                }
            };
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ── Scripted completion provider ──

    enum Scripted {
        Text(String),
        TransportFail,
    }

    struct MockProvider {
        script: Mutex<Vec<Scripted>>,
    }

    impl MockProvider {
        fn new<S: Into<String>>(responses: Vec<S>) -> Self {
            Self {
                script: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| Scripted::Text(r.into()))
                        .collect(),
                ),
            }
        }

        fn failing() -> Self {
            Self {
                script: Mutex::new(vec![Scripted::TransportFail]),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for MockProvider {
        async fn complete(&self, _messages: &[Message]) -> Result<String, ProviderError> {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Ok(r#"{"final_answer": "(out of script)"}"#.to_string());
            }
            match script.remove(0) {
                Scripted::Text(text) => Ok(text),
                Scripted::TransportFail => Err(ProviderError::Api {
                    status: 503,
                    body: "service unavailable".to_string(),
                }),
            }
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        fn display_name(&self) -> &str {
            "MockProvider"
        }
    }

    // ── Scripted confirmation gate ──

    struct ScriptedGate {
        /// Answers consumed in order; empty means deny (fail-closed).
        answers: Mutex<Vec<bool>>,
        /// Every (tool, args) the gate was asked about.
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGate {
        fn new(answers: Vec<bool>) -> Self {
            Self {
                answers: Mutex::new(answers),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ConfirmationGate for ScriptedGate {
        async fn approve(&self, tool: &str, _args: &HashMap<String, Value>) -> bool {
            self.prompts.lock().unwrap().push(tool.to_string());
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                false
            } else {
                answers.remove(0)
            }
        }
    }

    // ── Recording sink ──

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    impl EventSink for RecordingSink {
        fn goal(&self, goal: &str) {
            self.events.lock().unwrap().push(format!("goal: {goal}"));
        }
        fn thought(&self, _iteration: usize, thought: &str) {
            self.events.lock().unwrap().push(format!("thought: {thought}"));
        }
        fn observation(&self, _iteration: usize, text: &str) {
            self.events.lock().unwrap().push(format!("obs: {text}"));
        }
    }

    // ── Test capabilities ──

    struct ReadFileStub;

    #[async_trait]
    impl Capability for ReadFileStub {
        fn name(&self) -> &str {
            "read_file"
        }
        fn description(&self) -> &str {
            "Reads a file"
        }
        async fn invoke(&self, args: &HashMap<String, Value>) -> anyhow::Result<String> {
            let path = args.get("path").and_then(|v| v.as_str()).unwrap_or("?");
            Ok(format!("contents of {path}"))
        }
    }

    struct WriteFileStub;

    #[async_trait]
    impl Capability for WriteFileStub {
        fn name(&self) -> &str {
            "write_file"
        }
        fn description(&self) -> &str {
            "Writes a file"
        }
        fn dangerous(&self) -> bool {
            true
        }
        async fn invoke(&self, _args: &HashMap<String, Value>) -> anyhow::Result<String> {
            Ok("File written successfully.".to_string())
        }
    }

    struct BrokenStub;

    #[async_trait]
    impl Capability for BrokenStub {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        async fn invoke(&self, _args: &HashMap<String, Value>) -> anyhow::Result<String> {
            anyhow::bail!("disk on fire")
        }
    }

    // ── Harness ──

    fn registry() -> Arc<CapabilityRegistry> {
        let mut reg = CapabilityRegistry::new();
        reg.register(Arc::new(ReadFileStub)).unwrap();
        reg.register(Arc::new(WriteFileStub)).unwrap();
        reg.register(Arc::new(BrokenStub)).unwrap();
        Arc::new(reg)
    }

    fn make_loop(provider: MockProvider, gate: Arc<ScriptedGate>) -> AgentLoop {
        AgentLoop::new(Arc::new(provider), registry(), gate, "/tmp/pairbot-test")
    }

    fn action_json(tool: &str, args: Value) -> String {
        json!({ "thought": "t", "action": { "tool": tool, "args": args } }).to_string()
    }

    // ── Terminal outcomes ──

    #[tokio::test]
    async fn final_answer_terminates_on_first_iteration() {
        let provider = MockProvider::new(vec![r#"{"thought": "easy", "final_answer": "42"}"#]);
        let gate = Arc::new(ScriptedGate::new(vec![]));
        let agent = make_loop(provider, gate.clone());

        let report = agent.run("what is the answer").await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed("42".into()));
        assert_eq!(report.turns.len(), 1);
        assert_eq!(report.turns[0].index, 0);
        assert!(report.turns[0].observation.is_none());
        assert!(report.turns[0].decision.as_ref().unwrap().is_final());
        assert_eq!(gate.prompt_count(), 0);
    }

    #[tokio::test]
    async fn exhaustion_after_exactly_n_iterations() {
        // The model never emits final_answer
        let responses: Vec<String> = (0..10)
            .map(|_| action_json("read_file", json!({"path": "a.txt"})))
            .collect();
        let provider = MockProvider::new(responses);
        let gate = Arc::new(ScriptedGate::new(vec![]));
        let agent = make_loop(provider, gate).with_max_iterations(3);

        let report = agent.run("loop forever").await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Exhausted { iterations: 3 });
        assert_eq!(report.turns.len(), 3);
        for (i, turn) in report.turns.iter().enumerate() {
            assert_eq!(turn.index, i);
            assert!(matches!(
                turn.observation,
                Some(Observation::ToolOutput { .. })
            ));
        }
    }

    #[tokio::test]
    async fn transport_failure_is_fatal() {
        let gate = Arc::new(ScriptedGate::new(vec![]));
        let agent = make_loop(MockProvider::failing(), gate);

        let err = agent.run("anything").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(ProviderError::Api { status: 503, .. })));
    }

    // ── Dispatch paths ──

    #[tokio::test]
    async fn safe_tool_executes_without_gate() {
        let provider = MockProvider::new(vec![
            action_json("read_file", json!({"path": "src/main.rs"})),
            r#"{"final_answer": "read it"}"#.to_string(),
        ]);
        let gate = Arc::new(ScriptedGate::new(vec![]));
        let agent = make_loop(provider, gate.clone());

        let report = agent.run("read main").await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed("read it".into()));
        assert_eq!(gate.prompt_count(), 0);
        match report.turns[0].observation.as_ref().unwrap() {
            Observation::ToolOutput { tool, output } => {
                assert_eq!(tool, "read_file");
                assert_eq!(output, "contents of src/main.rs");
            }
            other => panic!("expected tool output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dangerous_tool_approved_then_final() {
        let provider = MockProvider::new(vec![
            action_json("write_file", json!({"path": "out.txt", "content": "hi"})),
            r#"{"final_answer": "done"}"#.to_string(),
        ]);
        let gate = Arc::new(ScriptedGate::new(vec![true]));
        let agent = make_loop(provider, gate.clone());

        let report = agent.run("write the file").await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed("done".into()));
        assert_eq!(gate.prompt_count(), 1);
        assert_eq!(report.turns.len(), 2);
        assert!(matches!(
            report.turns[0].observation,
            Some(Observation::ToolOutput { .. })
        ));
        assert!(report.turns[1].observation.is_none());
        assert!(report.turns[1].decision.as_ref().unwrap().is_final());
    }

    #[tokio::test]
    async fn denial_becomes_observation_not_error() {
        let provider = MockProvider::new(vec![
            action_json("write_file", json!({"path": "out.txt", "content": "hi"})),
            r#"{"final_answer": "gave up"}"#.to_string(),
        ]);
        let gate = Arc::new(ScriptedGate::new(vec![false]));
        let agent = make_loop(provider, gate.clone());

        let report = agent.run("write the file").await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed("gave up".into()));
        match report.turns[0].observation.as_ref().unwrap() {
            Observation::Denied { tool } => assert_eq!(tool, "write_file"),
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn identical_dangerous_actions_each_reconfirmed() {
        // Denial of the first must not suppress the prompt for the second.
        let action = action_json("write_file", json!({"path": "x", "content": "y"}));
        let provider =
            MockProvider::new(vec![action.clone(), action, r#"{"final_answer": "ok"}"#.to_string()]);
        let gate = Arc::new(ScriptedGate::new(vec![false, true]));
        let agent = make_loop(provider, gate.clone());

        let report = agent.run("write twice").await.unwrap();

        assert_eq!(gate.prompt_count(), 2);
        assert!(matches!(
            report.turns[0].observation,
            Some(Observation::Denied { .. })
        ));
        assert!(matches!(
            report.turns[1].observation,
            Some(Observation::ToolOutput { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_tool_recovers_with_observation() {
        let provider = MockProvider::new(vec![
            action_json("teleport", json!({})),
            r#"{"final_answer": "sorry"}"#.to_string(),
        ]);
        let gate = Arc::new(ScriptedGate::new(vec![]));
        let agent = make_loop(provider, gate);

        let report = agent.run("teleport me").await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed("sorry".into()));
        match report.turns[0].observation.as_ref().unwrap() {
            Observation::UnknownTool { tool } => assert_eq!(tool, "teleport"),
            other => panic!("expected unknown tool, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn capability_failure_captured_as_observation() {
        let provider = MockProvider::new(vec![
            action_json("broken", json!({})),
            r#"{"final_answer": "noted"}"#.to_string(),
        ]);
        let gate = Arc::new(ScriptedGate::new(vec![]));
        let agent = make_loop(provider, gate);

        let report = agent.run("break it").await.unwrap();

        match report.turns[0].observation.as_ref().unwrap() {
            Observation::ToolOutput { output, .. } => {
                assert!(output.contains("Error executing broken"));
                assert!(output.contains("disk on fire"));
            }
            other => panic!("expected tool output, got {other:?}"),
        }
    }

    // ── Parse retry ──

    #[tokio::test]
    async fn unparsable_reply_retried_with_corrective_observation() {
        let provider = MockProvider::new(vec![
            "I will now write the file",
            r#"{"thought": "properly this time", "final_answer": "done"}"#,
        ]);
        let gate = Arc::new(ScriptedGate::new(vec![]));
        let agent = make_loop(provider, gate);

        let report = agent.run("do the thing").await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed("done".into()));
        assert_eq!(report.turns.len(), 2);

        // First turn: no decision, corrective parse-failure observation
        assert!(report.turns[0].decision.is_none());
        match report.turns[0].observation.as_ref().unwrap() {
            Observation::ParseFailure { detail } => {
                assert!(detail.contains("no JSON payload"));
            }
            other => panic!("expected parse failure, got {other:?}"),
        }

        // Second turn consumed from the same budget
        assert_eq!(report.turns[1].index, 1);
    }

    #[tokio::test]
    async fn parse_failures_alone_can_exhaust_the_budget() {
        let provider = MockProvider::new(vec!["garbage", "more garbage", "still garbage"]);
        let gate = Arc::new(ScriptedGate::new(vec![]));
        let agent = make_loop(provider, gate).with_max_iterations(3);

        let report = agent.run("hmm").await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Exhausted { iterations: 3 });
        assert!(report
            .turns
            .iter()
            .all(|t| matches!(t.observation, Some(Observation::ParseFailure { .. }))));
    }

    // ── Sink ──

    #[tokio::test]
    async fn sink_receives_transcript() {
        let provider = MockProvider::new(vec![
            action_json("read_file", json!({"path": "a"})),
            r#"{"thought": "wrap up", "final_answer": "fin"}"#.to_string(),
        ]);
        let gate = Arc::new(ScriptedGate::new(vec![]));
        let sink = Arc::new(RecordingSink::default());
        let agent = make_loop(provider, gate).with_sink(sink.clone());

        agent.run("read a").await.unwrap();

        let events = sink.events.lock().unwrap();
        assert_eq!(events[0], "goal: read a");
        assert!(events.iter().any(|e| e.starts_with("obs: Observation:")));
        assert!(events.iter().any(|e| e == "thought: wrap up"));
    }

    // ── Run isolation ──

    #[tokio::test]
    async fn runs_do_not_share_state() {
        let provider = MockProvider::new(vec![
            r#"{"final_answer": "first"}"#,
            r#"{"final_answer": "second"}"#,
        ]);
        let gate = Arc::new(ScriptedGate::new(vec![]));
        let agent = make_loop(provider, gate);

        let first = agent.run("one").await.unwrap();
        let second = agent.run("two").await.unwrap();

        assert_eq!(first.answer(), Some("first"));
        assert_eq!(second.answer(), Some("second"));
        // Each report carries only its own trail
        assert_eq!(first.turns.len(), 1);
        assert_eq!(second.turns.len(), 1);
    }
}
