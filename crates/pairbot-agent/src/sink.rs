//! Event sink — the loop controller's injected output channel.
//!
//! Instead of writing to a process-wide console, the controller reports
//! progress through this trait. The CLI renders events to the terminal;
//! tests capture a transcript.

use std::collections::HashMap;

use serde_json::Value;

/// Receives progress events from the loop controller.
///
/// All methods have empty defaults so implementations only override what
/// they render.
pub trait EventSink: Send + Sync {
    /// A new run started with this goal.
    fn goal(&self, _goal: &str) {}

    /// The model's reasoning for the current turn.
    fn thought(&self, _iteration: usize, _thought: &str) {}

    /// A tool is about to be dispatched.
    fn action(&self, _iteration: usize, _tool: &str, _args: &HashMap<String, Value>) {}

    /// The observation produced by the current turn.
    fn observation(&self, _iteration: usize, _text: &str) {}
}

/// Discards every event. The default when no sink is injected.
pub struct NullSink;

impl EventSink for NullSink {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullSink;
        sink.goal("g");
        sink.thought(0, "t");
        sink.action(0, "tool", &HashMap::new());
        sink.observation(0, "obs");
    }
}
