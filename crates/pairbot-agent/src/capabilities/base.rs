//! Capability trait — the closed interface every agent tool implements.
//!
//! The loop controller looks capabilities up by `name()`, checks
//! `dangerous()` before dispatch, and invokes them with the decision's
//! arguments. Capabilities are registered once at startup and immutable for
//! the process lifetime.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Capability trait
// ─────────────────────────────────────────────

/// A named, invocable unit of external effect (file I/O, shell, search).
#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique name the model uses to request this capability
    /// (e.g. `"read_file"`).
    fn name(&self) -> &str;

    /// Human-readable description injected into the system prompt.
    fn description(&self) -> &str;

    /// Whether execution has irreversible or high-impact side effects.
    ///
    /// Dangerous capabilities require explicit operator approval through
    /// the confirmation gate, once per invocation. Must be answerable
    /// without invoking the capability.
    fn dangerous(&self) -> bool {
        false
    }

    /// Invoke the capability with the model's arguments.
    ///
    /// Returns the observation text the model reads next turn. On failure,
    /// return an `Err` — the loop controller converts it to a failure
    /// observation; it never crosses the controller boundary as an error.
    async fn invoke(&self, args: &HashMap<String, Value>) -> anyhow::Result<String>;
}

// ─────────────────────────────────────────────
// Arg helpers
// ─────────────────────────────────────────────

/// Extract a required `String` argument, returning a user-friendly error.
pub fn require_string(args: &HashMap<String, Value>, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing required argument: {key}"))
}

/// Extract an optional `String` argument.
pub fn optional_string(args: &HashMap<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Extract an optional integer argument.
pub fn optional_i64(args: &HashMap<String, Value>, key: &str) -> Option<i64> {
    args.get(key).and_then(|v| v.as_i64())
}
