//! Confirmation gate — operator approval for dangerous capabilities.
//!
//! The gate has no memory between calls: every dangerous invocation is
//! re-confirmed, even if an identical action was approved moments earlier
//! in the same run. Denial is the default for empty or unrecognized input
//! (fail-closed), since the gated actions are destructive.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

/// Obtains explicit operator approval before a dangerous capability runs.
///
/// `approve` presents the pending action (tool identity and fully-resolved
/// arguments) and blocks until the operator answers. Implementations that
/// share a gate across concurrent agents must serialize access; the gate is
/// inherently a single-operator channel.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// `true` only on an explicit affirmative answer.
    async fn approve(&self, tool: &str, args: &HashMap<String, Value>) -> bool;
}

/// Interpret a raw operator reply. Anything but an explicit yes is a no.
pub fn is_affirmative(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Render the pending action for display, truncating bulky arguments.
pub fn describe_action(tool: &str, args: &HashMap<String, Value>) -> String {
    let rendered = serde_json::to_string_pretty(args).unwrap_or_else(|_| "{}".to_string());
    let rendered = pairbot_core::utils::truncate_string(&rendered, 500);
    format!("Tool: {tool}\nArguments: {rendered}")
}
