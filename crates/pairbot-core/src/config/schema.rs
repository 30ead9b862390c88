//! Configuration schema — typed sections for the agent, the completion
//! provider, and the tools.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! `#[serde(rename_all = "camelCase")]` handles the conversion.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.pairbot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub provider: ProviderConfig,
    pub tools: ToolsConfig,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Agent loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Workspace directory the agent operates in.
    pub workspace: String,
    /// Model identifier sent to the provider.
    pub model: String,
    /// Maximum think→act→observe iterations per goal.
    pub max_iterations: usize,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Shell command timeout in seconds.
    pub command_timeout: u64,
    /// Restrict file and shell tools to the workspace directory.
    pub restrict_to_workspace: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workspace: "~/.pairbot/workspace".to_string(),
            model: "gpt-4o".to_string(),
            max_iterations: 10,
            max_tokens: 4096,
            temperature: 0.7,
            command_timeout: 60,
            restrict_to_workspace: false,
        }
    }
}

// ─────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────

/// Completion-service connection settings (any OpenAI-compatible API).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for Bearer authentication.
    pub api_key: String,
    /// API base URL (e.g. `https://api.openai.com/v1`).
    pub api_base: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

/// Tool-specific settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    /// Brave Search API key for the `web_search` tool.
    pub search_api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.agent.command_timeout, 60);
        assert_eq!(config.provider.api_base, "https://api.openai.com/v1");
        assert!(!config.provider.is_configured());
    }

    #[test]
    fn test_camel_case_keys() {
        let json = r#"{
            "agent": { "maxIterations": 5, "commandTimeout": 30 },
            "provider": { "apiKey": "sk-test" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.command_timeout, 30);
        assert_eq!(config.provider.api_key, "sk-test");
        // Unspecified sections fall back to defaults
        assert_eq!(config.agent.model, "gpt-4o");
    }

    #[test]
    fn test_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("maxIterations"));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.agent.max_iterations, config.agent.max_iterations);
    }
}
