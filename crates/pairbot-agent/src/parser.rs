//! Response parser — extracts a structured [`Decision`] from raw model
//! output.
//!
//! Two independent steps: (1) locate and strip at most one enclosing
//! wrapper (a fenced code block, or prose around the outermost JSON
//! object); (2) deserialize and validate against the decision schema.
//! No fuzzy repair beyond that single strip. Parsing is pure.

use std::collections::HashMap;

use serde::Deserialize;

use pairbot_core::types::{ActionRequest, Decision};

/// Parse failures, each carrying the offending text.
#[derive(Debug, thiserror::Error)]
pub enum ParseDecisionError {
    /// No extractable JSON payload in the reply.
    #[error("no JSON payload found in response: {text:?}")]
    NoPayload { text: String },

    /// The payload is not valid JSON.
    #[error("payload is not valid JSON ({source}): {text:?}")]
    Json {
        text: String,
        source: serde_json::Error,
    },

    /// Both `action` and `final_answer` present.
    #[error("decision contains both an action and a final answer: {text:?}")]
    AmbiguousDecision { text: String },

    /// Neither `action` nor `final_answer` present.
    #[error("decision contains neither an action nor a final answer: {text:?}")]
    EmptyDecision { text: String },
}

/// The wire shape the model is instructed to emit.
///
/// Unrecognized top-level fields are ignored, not rejected.
#[derive(Deserialize)]
struct WireDecision {
    #[serde(default)]
    thought: Option<String>,
    #[serde(default)]
    action: Option<WireAction>,
    #[serde(default)]
    final_answer: Option<String>,
}

#[derive(Deserialize)]
struct WireAction {
    tool: String,
    #[serde(default)]
    args: HashMap<String, serde_json::Value>,
}

/// Parse raw model output into a well-formed [`Decision`].
pub fn parse_decision(raw: &str) -> Result<Decision, ParseDecisionError> {
    let payload = extract_payload(raw).ok_or_else(|| ParseDecisionError::NoPayload {
        text: raw.to_string(),
    })?;

    let wire: WireDecision =
        serde_json::from_str(payload).map_err(|source| ParseDecisionError::Json {
            text: payload.to_string(),
            source,
        })?;

    match (wire.action, wire.final_answer) {
        (Some(action), None) => Ok(Decision::act(
            wire.thought,
            ActionRequest::new(action.tool, action.args),
        )),
        (None, Some(answer)) => Ok(Decision::finish(wire.thought, answer)),
        (Some(_), Some(_)) => Err(ParseDecisionError::AmbiguousDecision {
            text: payload.to_string(),
        }),
        (None, None) => Err(ParseDecisionError::EmptyDecision {
            text: payload.to_string(),
        }),
    }
}

/// Locate the JSON payload, stripping exactly one enclosing wrapper.
///
/// Tried in order: a ```json fence, a bare ``` fence, then the outermost
/// `{...}` span within surrounding prose. Returns `None` when no candidate
/// payload exists at all.
pub fn extract_payload(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    // One fenced block, with or without a language tag
    for opener in ["```json", "```"] {
        if let Some(start) = trimmed.find(opener) {
            let rest = &trimmed[start + opener.len()..];
            if let Some(end) = rest.find("```") {
                let inner = rest[..end].trim();
                if !inner.is_empty() {
                    return Some(inner);
                }
            }
        }
    }

    // Outermost object in surrounding commentary
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end > start {
        return Some(trimmed[start..=end].trim());
    }
    None
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
