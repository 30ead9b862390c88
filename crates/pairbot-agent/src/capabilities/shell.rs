//! Shell capability — execute commands in a subprocess.
//!
//! Dangerous: every invocation goes through the confirmation gate. The
//! deny-pattern guard is a second line of defense behind it, blocking
//! catastrophic commands even after the operator approves.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tokio::process::Command;
use tracing::{info, warn};

use super::base::{require_string, Capability};

/// Maximum output length before truncation (characters).
const MAX_OUTPUT_LEN: usize = 10_000;

/// Default command timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Command patterns that are always blocked, even when approved.
const DENY_PATTERNS: &[&str] = &[
    r"\brm\s+-[rf]{1,2}\b",
    r"\bdel\s+/[fq]\b",
    r"\brmdir\s+/s\b",
    r"\b(format|mkfs|diskpart)\b",
    r"\bdd\s+if=",
    r">\s*/dev/sd",
    r"\b(shutdown|reboot|poweroff)\b",
    r":\(\)\s*\{.*\};\s*:", // fork bomb
];

/// Matches absolute Unix or Windows paths inside a command line.
const ABS_PATH_PATTERN: &str = r#"(?:/[^\s"']+|[A-Za-z]:\\[^\s"']+)"#;

// ─────────────────────────────────────────────
// ShellCapability
// ─────────────────────────────────────────────

/// Runs a shell command in the agent workspace and reports stdout,
/// stderr, and the exit code as one observation string.
pub struct ShellCapability {
    /// Working directory for commands.
    working_dir: PathBuf,
    /// Bounded wait; expiry becomes a timeout observation, never a hang.
    timeout: Duration,
    /// If true, block commands that reference paths outside `working_dir`.
    restrict_to_workspace: bool,
    /// Compiled deny regexes (built once at construction).
    deny_regexes: Vec<Regex>,
    /// Compiled absolute-path matcher (built once at construction).
    abs_path_regex: Regex,
}

impl ShellCapability {
    pub fn new(
        working_dir: PathBuf,
        timeout_secs: Option<u64>,
        restrict_to_workspace: bool,
    ) -> Self {
        // Patterns are compile-time constants; a failure here is a bug in
        // the pattern table itself, so surface it instead of dropping the
        // guard silently.
        let deny_regexes: Vec<Regex> = DENY_PATTERNS
            .iter()
            .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid deny pattern '{p}': {e}")))
            .collect();
        let abs_path_regex =
            Regex::new(ABS_PATH_PATTERN).unwrap_or_else(|e| panic!("invalid path pattern: {e}"));

        Self {
            working_dir,
            timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            restrict_to_workspace,
            deny_regexes,
            abs_path_regex,
        }
    }

    /// Check if a command is safe to execute. Returns the blocking
    /// observation text if not.
    fn guard_command(&self, command: &str) -> Option<String> {
        let lower = command.to_lowercase();

        for re in &self.deny_regexes {
            if re.is_match(&lower) {
                warn!(command = command, "command blocked by safety guard");
                return Some(
                    "Error: Command blocked by safety guard (dangerous pattern detected)".into(),
                );
            }
        }

        if self.restrict_to_workspace {
            if command.contains("../") || command.contains("..\\") {
                return Some(
                    "Error: Command blocked — path traversal (../) not allowed in restricted mode"
                        .into(),
                );
            }

            // Absolute paths outside the workspace
            for cap in self.abs_path_regex.find_iter(command) {
                let p = PathBuf::from(cap.as_str());
                let resolved = if p.exists() {
                    p.canonicalize().unwrap_or(p)
                } else {
                    p
                };
                if !resolved.starts_with(&self.working_dir) {
                    return Some(format!(
                        "Error: Command references path '{}' outside workspace",
                        cap.as_str()
                    ));
                }
            }
        }

        None
    }
}

#[async_trait]
impl Capability for ShellCapability {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its stdout, stderr, and exit \
         code. Args: {\"command\": \"...\"}. Use this for builds, tests, \
         git, or any CLI tool."
    }

    fn dangerous(&self) -> bool {
        true
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> anyhow::Result<String> {
        let command = require_string(args, "command")?;

        // Guard verdicts are observations, not errors; the model should
        // read them and choose another approach.
        if let Some(blocked) = self.guard_command(&command) {
            return Ok(blocked);
        }

        info!(command = %command, cwd = %self.working_dir.display(), "executing shell command");

        let child = Command::new(if cfg!(target_os = "windows") { "cmd" } else { "sh" })
            .args(if cfg!(target_os = "windows") {
                vec!["/C", &command]
            } else {
                vec!["-c", &command]
            })
            .current_dir(&self.working_dir)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn command: {e}"))?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let code = output.status.code().unwrap_or(-1);

                if stdout.is_empty() && stderr.is_empty() {
                    return Ok(format!(
                        "Command executed with no output.\nExit code: {code}"
                    ));
                }

                let mut parts = Vec::new();
                if !stdout.is_empty() {
                    parts.push(format!("STDOUT:\n{stdout}"));
                }
                if !stderr.is_empty() {
                    parts.push(format!("STDERR:\n{stderr}"));
                }
                parts.push(format!("Exit code: {code}"));

                let mut combined = parts.join("\n");
                if combined.len() > MAX_OUTPUT_LEN {
                    // Back off to a char boundary; truncate panics mid-codepoint.
                    let mut cut = MAX_OUTPUT_LEN;
                    while !combined.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    let remaining = combined.len() - cut;
                    combined.truncate(cut);
                    combined.push_str(&format!("\n... (truncated, {remaining} more chars)"));
                }

                Ok(combined)
            }
            Ok(Err(e)) => anyhow::bail!("Command failed: {e}"),
            Err(_) => Ok(format!(
                "Error: Command timed out after {} seconds",
                self.timeout.as_secs()
            )),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
