//! Capability registry — a fixed name→capability mapping.
//!
//! Populated once at startup, read-only afterwards; safe to share across
//! concurrent runs. Unknown-tool lookups are a recoverable condition inside
//! the loop (reported back to the model), never a crash.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::base::Capability;

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A capability with this name is already registered.
    #[error("capability '{0}' is already registered")]
    Duplicate(String),

    /// No capability with this name.
    #[error("capability '{0}' is not registered")]
    Unknown(String),
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores capabilities keyed by name.
///
/// Owns `Arc<dyn Capability>` so capabilities can be shared across threads.
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Register a capability. Fails if the name is already taken.
    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<(), RegistryError> {
        let name = capability.name().to_string();
        if self.capabilities.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        info!(capability = %name, dangerous = capability.dangerous(), "registered capability");
        self.capabilities.insert(name, capability);
        Ok(())
    }

    /// Look up a capability by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Capability>, RegistryError> {
        self.capabilities
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))
    }

    /// Whether the named capability requires operator confirmation.
    ///
    /// Unknown names are not dangerous — they never reach execution.
    pub fn is_dangerous(&self, name: &str) -> bool {
        self.capabilities
            .get(name)
            .map(|c| c.dangerous())
            .unwrap_or(false)
    }

    /// Check if a capability is registered.
    pub fn has(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Names of all registered capabilities, sorted for determinism.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the tool catalogue injected into the system prompt.
    ///
    /// Dangerous capabilities carry an explicit confirmation notice so the
    /// model knows the operator will be asked.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        for name in self.names() {
            // names() only returns registered keys
            if let Ok(cap) = self.lookup(&name) {
                let mut line = format!("- `{}`: {}", cap.name(), cap.description());
                if cap.dangerous() {
                    line.push_str(
                        " **This is a dangerous tool. The user will be asked \
                         for confirmation before execution.**",
                    );
                }
                lines.push(line);
            }
        }
        lines.join("\n")
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
