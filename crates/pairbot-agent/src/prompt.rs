//! Prompt builder — constructs the ReAct system prompt and the initial
//! conversation for a run.
//!
//! The system prompt fixes the response-format contract the parser relies
//! on: one JSON object per turn, carrying a thought plus either an action
//! or a final answer. The tool catalogue is generated from the registry so
//! prompt and dispatch can never drift apart.

use std::path::PathBuf;

use chrono::Utc;

use pairbot_core::types::Message;

use crate::capabilities::registry::CapabilityRegistry;

/// Builds the system prompt and initial message list for the agent loop.
pub struct PromptBuilder {
    /// Root workspace directory (shown to the model).
    workspace: PathBuf,
}

impl PromptBuilder {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    /// Build the full system prompt for the given capability set.
    pub fn build_system_prompt(&self, registry: &CapabilityRegistry) -> String {
        let now = Utc::now().format("%Y-%m-%d %H:%M UTC");
        let workspace = self.workspace.display();
        let catalogue = registry.describe();

        format!(
            "You are Pairbot, an autonomous AI pair programmer. You help the user \
             with coding tasks by thinking step-by-step and using the tools at your \
             disposal.\n\n\
             You operate in a loop of Thought, Action, Observation.\n\
             1. **Thought:** Think about the request and your plan, breaking the \
             problem into small steps.\n\
             2. **Action:** Choose a single action from the available tools.\n\
             3. **Observation:** You receive the result of the action and continue.\n\n\
             Repeat until you can give a Final Answer.\n\n\
             - **Date/time**: {now}\n\
             - **Workspace**: `{workspace}`\n\n\
             **TOOLS:**\n\n\
             {catalogue}\n\n\
             **RESPONSE FORMAT:**\n\n\
             Every response must be a single JSON object and nothing else. To use a \
             tool:\n\
             ```json\n\
             {{\n\
               \"thought\": \"I need to see the project structure first.\",\n\
               \"action\": {{\n\
                 \"tool\": \"list_files\",\n\
                 \"args\": {{ \"directory\": \".\" }}\n\
               }}\n\
             }}\n\
             ```\n\n\
             When you have the answer for the user:\n\
             ```json\n\
             {{\n\
               \"thought\": \"I have everything I need.\",\n\
               \"final_answer\": \"The entry point is src/main.rs.\"\n\
             }}\n\
             ```\n\n\
             Include exactly one of \"action\" or \"final_answer\", never both. \
             Take exactly one action per turn."
        )
    }

    /// Build the initial conversation for a run: system prompt + user goal.
    ///
    /// The conversation is owned by the loop controller for the duration of
    /// one run and discarded afterwards.
    pub fn initial_messages(&self, registry: &CapabilityRegistry, goal: &str) -> Vec<Message> {
        vec![
            Message::system(self.build_system_prompt(registry)),
            Message::user(goal),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::base::Capability;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct FakeTool {
        name: &'static str,
        dangerous: bool,
    }

    #[async_trait]
    impl Capability for FakeTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "Does something"
        }
        fn dangerous(&self) -> bool {
            self.dangerous
        }
        async fn invoke(&self, _args: &HashMap<String, Value>) -> anyhow::Result<String> {
            Ok("ok".into())
        }
    }

    fn registry() -> CapabilityRegistry {
        let mut reg = CapabilityRegistry::new();
        reg.register(Arc::new(FakeTool {
            name: "read_file",
            dangerous: false,
        }))
        .unwrap();
        reg.register(Arc::new(FakeTool {
            name: "shell",
            dangerous: true,
        }))
        .unwrap();
        reg
    }

    #[test]
    fn test_system_prompt_lists_tools() {
        let builder = PromptBuilder::new("/tmp/work");
        let prompt = builder.build_system_prompt(&registry());
        assert!(prompt.contains("`read_file`"));
        assert!(prompt.contains("`shell`"));
        assert!(prompt.contains("/tmp/work"));
    }

    #[test]
    fn test_system_prompt_fixes_format_contract() {
        let builder = PromptBuilder::new("/tmp/work");
        let prompt = builder.build_system_prompt(&registry());
        assert!(prompt.contains("\"final_answer\""));
        assert!(prompt.contains("\"action\""));
        assert!(prompt.contains("exactly one of"));
    }

    #[test]
    fn test_initial_messages_shape() {
        let builder = PromptBuilder::new("/tmp/work");
        let msgs = builder.initial_messages(&registry(), "fix the failing test");
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[0], Message::System { .. }));
        assert_eq!(msgs[1], Message::user("fix the failing test"));
    }
}
