//! Filesystem capabilities — read, write, list.
//!
//! Each capability optionally restricts paths to an `allowed_dir`
//! (the agent workspace) through the shared [`resolve_path`] helper.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use pairbot_core::utils::expand_home;

use super::base::{optional_string, require_string, Capability};

// ─────────────────────────────────────────────
// Shared path helper
// ─────────────────────────────────────────────

/// Resolve a user-supplied path, optionally restricting it to `allowed_dir`.
///
/// Expands `~`, canonicalizes what exists, and returns `Err` if the
/// resolved path falls outside the allowed directory.
fn resolve_path(path: &str, allowed_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let expanded = expand_home(path);

    // Canonicalize if the path exists; a write target may not exist yet,
    // so fall back to canonicalizing the parent.
    let resolved = if expanded.exists() {
        expanded.canonicalize().unwrap_or(expanded)
    } else if let Some(parent) = expanded.parent() {
        if parent.exists() {
            let canon_parent = parent.canonicalize().unwrap_or_else(|_| parent.to_path_buf());
            match expanded.file_name() {
                Some(name) => canon_parent.join(name),
                None => expanded,
            }
        } else {
            expanded
        }
    } else {
        expanded
    };

    if let Some(allowed) = allowed_dir {
        // A nonexistent target skips canonicalization above, so any `..`
        // still present would slip through the component-wise prefix
        // check. Reject it outright.
        if resolved
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            anyhow::bail!(
                "Access denied: path '{}' contains parent directory references",
                resolved.display()
            );
        }

        let allowed_canon = if allowed.exists() {
            allowed.canonicalize().unwrap_or_else(|_| allowed.to_path_buf())
        } else {
            allowed.to_path_buf()
        };
        if !resolved.starts_with(&allowed_canon) {
            anyhow::bail!(
                "Access denied: path '{}' is outside allowed directory '{}'",
                resolved.display(),
                allowed_canon.display()
            );
        }
    }

    Ok(resolved)
}

// ─────────────────────────────────────────────
// ReadFileCapability
// ─────────────────────────────────────────────

/// Reads and returns the entire content of a file. Safe.
pub struct ReadFileCapability {
    allowed_dir: Option<PathBuf>,
}

impl ReadFileCapability {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Capability for ReadFileCapability {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Args: {\"path\": \"path/to/file\"}. \
         Returns the full text content."
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(args, "path")?;
        let path = resolve_path(&path_str, self.allowed_dir.as_deref())?;

        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
        if !path.is_file() {
            anyhow::bail!("Not a file: {}", path.display());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        Ok(content)
    }
}

// ─────────────────────────────────────────────
// WriteFileCapability
// ─────────────────────────────────────────────

/// Creates or overwrites a file with the given content. Dangerous: it can
/// clobber existing files, so every invocation goes through the gate.
pub struct WriteFileCapability {
    allowed_dir: Option<PathBuf>,
}

impl WriteFileCapability {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Capability for WriteFileCapability {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it if missing and overwriting if \
         present. Parent directories are created automatically. \
         Args: {\"path\": \"path/to/file\", \"content\": \"...\"}."
    }

    fn dangerous(&self) -> bool {
        true
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(args, "path")?;
        let content = require_string(args, "content")?;
        let path = resolve_path(&path_str, self.allowed_dir.as_deref())?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow::anyhow!("Failed to create directory {}: {e}", parent.display())
                })?;
            }
        }

        let bytes = content.len();
        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
        Ok(format!("Successfully wrote {bytes} bytes to {}", path.display()))
    }
}

// ─────────────────────────────────────────────
// ListFilesCapability
// ─────────────────────────────────────────────

/// Lists the entries of a directory, sorted, with a trailing `/` on
/// directories. Safe.
pub struct ListFilesCapability {
    allowed_dir: Option<PathBuf>,
}

impl ListFilesCapability {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Capability for ListFilesCapability {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List the entries of a directory, sorted by name; directories carry \
         a trailing '/'. Args: {\"directory\": \"path\"} (defaults to \".\")."
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> anyhow::Result<String> {
        let dir_str = optional_string(args, "directory").unwrap_or_else(|| ".".to_string());
        let path = resolve_path(&dir_str, self.allowed_dir.as_deref())?;

        if !path.is_dir() {
            anyhow::bail!("Not a directory: {}", path.display());
        }

        let mut reader = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read directory {}: {e}", path.display()))?;

        let mut entries: Vec<String> = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read directory {}: {e}", path.display()))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry
                .file_type()
                .await
                .map(|ft| ft.is_dir())
                .unwrap_or(false);
            if is_dir {
                entries.push(format!("{name}/"));
            } else {
                entries.push(name);
            }
        }

        entries.sort();

        if entries.is_empty() {
            Ok("(empty directory)".into())
        } else {
            Ok(entries.join("\n"))
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
