//! Pairbot Agent — loop controller, parser, capabilities, and gate.
//!
//! This crate contains:
//! - **capabilities**: Capability trait, registry, and built-ins (filesystem, shell, web search)
//! - **parser**: model reply → structured decision
//! - **gate**: operator confirmation for dangerous capabilities
//! - **agent_loop**: the Thought → Action → Observation state machine

pub mod capabilities;
pub mod parser;
pub mod gate;
pub mod sink;
pub mod prompt;
pub mod agent_loop;

pub use agent_loop::{AgentError, AgentLoop, DEFAULT_MAX_ITERATIONS};
pub use capabilities::{Capability, CapabilityRegistry, RegistryError};
pub use gate::ConfirmationGate;
pub use parser::{parse_decision, ParseDecisionError};
pub use prompt::PromptBuilder;
pub use sink::{EventSink, NullSink};
