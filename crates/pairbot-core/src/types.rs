//! Core types for Pairbot — the conversation wire format and the audit
//! trail of one agent run.
//!
//! Messages follow the OpenAI chat completions shape. Decisions model one
//! parsed model turn: either a tool action or a final answer, never both.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Messages (OpenAI chat completions format)
// ─────────────────────────────────────────────

/// A chat message in the OpenAI format.
///
/// Each variant maps to a `role` field value. The ReAct protocol only needs
/// plain text: the model's structured decisions travel as assistant text,
/// observations go back as user text.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: String },

    #[serde(rename = "assistant")]
    Assistant { content: String },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
        }
    }

    /// The text content, regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content } => content,
        }
    }
}

// ─────────────────────────────────────────────
// Decisions (one parsed model turn)
// ─────────────────────────────────────────────

/// A tool invocation requested by the model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActionRequest {
    /// Registered capability name (e.g. `"read_file"`).
    pub tool: String,
    /// Arguments keyed by parameter name.
    #[serde(default)]
    pub args: HashMap<String, serde_json::Value>,
}

impl ActionRequest {
    pub fn new(tool: impl Into<String>, args: HashMap<String, serde_json::Value>) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }
}

/// What the model decided to do this turn — exactly one of the two.
#[derive(Clone, Debug, PartialEq)]
pub enum DecisionKind {
    /// Invoke a tool and observe the result.
    Act(ActionRequest),
    /// Stop the loop and return this answer to the user.
    Finish(String),
}

/// The parsed output of one model turn.
///
/// The exactly-one invariant (action XOR final answer) is enforced by the
/// response parser; a `Decision` value is well-formed by construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    /// Free-form reasoning, surfaced for diagnostics only.
    pub thought: Option<String>,
    pub kind: DecisionKind,
}

impl Decision {
    /// Build an action decision.
    pub fn act(thought: Option<String>, action: ActionRequest) -> Self {
        Self {
            thought,
            kind: DecisionKind::Act(action),
        }
    }

    /// Build a final-answer decision.
    pub fn finish(thought: Option<String>, answer: impl Into<String>) -> Self {
        Self {
            thought,
            kind: DecisionKind::Finish(answer.into()),
        }
    }

    /// True when this decision carries a final answer.
    pub fn is_final(&self) -> bool {
        matches!(self.kind, DecisionKind::Finish(_))
    }

    /// Serialize to the wire shape the model is instructed to emit:
    /// `{"thought": ..., "action": {...}}` or `{"thought": ..., "final_answer": ...}`.
    pub fn to_wire(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(thought) = &self.thought {
            obj.insert("thought".into(), serde_json::Value::String(thought.clone()));
        }
        match &self.kind {
            DecisionKind::Act(action) => {
                obj.insert(
                    "action".into(),
                    serde_json::json!({ "tool": action.tool, "args": action.args }),
                );
            }
            DecisionKind::Finish(answer) => {
                obj.insert(
                    "final_answer".into(),
                    serde_json::Value::String(answer.clone()),
                );
            }
        }
        serde_json::Value::Object(obj)
    }
}

// ─────────────────────────────────────────────
// Observations (feedback into the conversation)
// ─────────────────────────────────────────────

/// The textual result fed back to the model after a turn.
///
/// Tool failures, permission denials, and parse errors are all data the
/// model must reason about next turn — none of them ends the run.
#[derive(Clone, Debug, PartialEq)]
pub enum Observation {
    /// Capability output (success text or the capability's own error text).
    ToolOutput { tool: String, output: String },
    /// The operator declined a dangerous action.
    Denied { tool: String },
    /// The model asked for a tool that is not registered.
    UnknownTool { tool: String },
    /// The model's reply could not be parsed into a decision.
    ParseFailure { detail: String },
}

impl Observation {
    /// Render the prompt text appended to the conversation.
    pub fn to_prompt(&self) -> String {
        match self {
            Observation::ToolOutput { output, .. } => format!("Observation: {output}"),
            Observation::Denied { tool } => {
                format!("Observation: User denied permission for tool '{tool}'.")
            }
            Observation::UnknownTool { tool } => {
                format!("Observation: Error: Tool '{tool}' not found.")
            }
            Observation::ParseFailure { detail } => format!(
                "Your response could not be parsed: {detail}\n\
                 Reply with a single JSON object containing \"thought\" and \
                 either \"action\" or \"final_answer\", exactly as instructed."
            ),
        }
    }
}

// ─────────────────────────────────────────────
// Turn records & run outcomes (the audit trail)
// ─────────────────────────────────────────────

/// The audit entry for one loop iteration. Appended by the loop controller,
/// never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnRecord {
    /// Zero-based iteration index within the run.
    pub index: usize,
    /// The decision attempted; `None` when the reply failed to parse.
    pub decision: Option<Decision>,
    /// The resulting observation; `None` for the final-answer turn.
    pub observation: Option<Observation>,
}

/// Terminal value of one `run` invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// The model produced a final answer.
    Completed(String),
    /// The iteration ceiling was reached before a final answer.
    Exhausted { iterations: usize },
}

/// Everything one `run` produced: the outcome plus the ordered turn trail.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub turns: Vec<TurnRecord>,
}

impl RunReport {
    /// The final answer, if the run completed.
    pub fn answer(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Completed(answer) => Some(answer),
            RunOutcome::Exhausted { .. } => None,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_roles_serialize() {
        let msg = Message::user("hello");
        let val = serde_json::to_value(&msg).unwrap();
        assert_eq!(val["role"], "user");
        assert_eq!(val["content"], "hello");

        let back: Message = serde_json::from_value(val).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_message_content_accessor() {
        assert_eq!(Message::system("s").content(), "s");
        assert_eq!(Message::assistant("a").content(), "a");
    }

    #[test]
    fn test_decision_to_wire_action() {
        let mut args = HashMap::new();
        args.insert("path".to_string(), json!("src/main.rs"));
        let decision = Decision::act(
            Some("read it".into()),
            ActionRequest::new("read_file", args),
        );

        let wire = decision.to_wire();
        assert_eq!(wire["thought"], "read it");
        assert_eq!(wire["action"]["tool"], "read_file");
        assert_eq!(wire["action"]["args"]["path"], "src/main.rs");
        assert!(wire.get("final_answer").is_none());
    }

    #[test]
    fn test_decision_to_wire_final() {
        let decision = Decision::finish(None, "done");
        let wire = decision.to_wire();
        assert_eq!(wire["final_answer"], "done");
        assert!(wire.get("thought").is_none());
        assert!(wire.get("action").is_none());
    }

    #[test]
    fn test_observation_prompts() {
        let obs = Observation::ToolOutput {
            tool: "list_files".into(),
            output: "main.rs".into(),
        };
        assert_eq!(obs.to_prompt(), "Observation: main.rs");

        let denied = Observation::Denied {
            tool: "shell".into(),
        };
        assert!(denied.to_prompt().contains("denied permission"));
        assert!(denied.to_prompt().contains("'shell'"));

        let unknown = Observation::UnknownTool {
            tool: "teleport".into(),
        };
        assert!(unknown.to_prompt().contains("'teleport' not found"));

        let parse = Observation::ParseFailure {
            detail: "no JSON payload".into(),
        };
        assert!(parse.to_prompt().contains("no JSON payload"));
        assert!(parse.to_prompt().contains("final_answer"));
    }

    #[test]
    fn test_run_report_answer() {
        let completed = RunReport {
            outcome: RunOutcome::Completed("42".into()),
            turns: vec![],
        };
        assert_eq!(completed.answer(), Some("42"));

        let exhausted = RunReport {
            outcome: RunOutcome::Exhausted { iterations: 10 },
            turns: vec![],
        };
        assert_eq!(exhausted.answer(), None);
    }
}
