//! Utility helpers — path resolution and string manipulation.

use std::path::PathBuf;

/// Get the Pairbot data directory (e.g. `~/.pairbot/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".pairbot")
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().unwrap_or_else(|| PathBuf::from(".")).join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// Helper to get home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate_string("short", 10), "short");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate_string("a very long string indeed", 10);
        assert_eq!(result.chars().count(), 10);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_unicode() {
        let result = truncate_string("héllo wörld, this is long", 8);
        assert_eq!(result.chars().count(), 8);
    }

    #[test]
    fn test_expand_home_tilde() {
        let p = expand_home("~/projects");
        assert!(!p.to_string_lossy().contains('~'));
        assert!(p.to_string_lossy().ends_with("projects"));
    }

    #[test]
    fn test_expand_home_absolute() {
        assert_eq!(expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_data_path() {
        assert!(get_data_path().to_string_lossy().contains(".pairbot"));
    }
}
