//! Secret and path redaction for text that may reach the user.
//!
//! Tool errors from Calendar/Gmail wrappers can carry OAuth tokens, API keys
//! or local file paths. Everything surfaced from a tool error passes through
//! [`redact`] first.

use regex::Regex;
use std::sync::LazyLock;

/// Patterns that should be redacted
static REDACTION_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // Private keys
        (
            Regex::new(r"-----BEGIN [A-Z ]+ PRIVATE KEY-----[\s\S]*?-----END [A-Z ]+ PRIVATE KEY-----")
                .expect("static regex"),
            "[gizli]",
        ),
        // Bearer tokens
        (
            Regex::new(r"(?i)bearer\s+[a-zA-Z0-9._~+/=-]{16,}").expect("static regex"),
            "[gizli]",
        ),
        // Google OAuth access tokens
        (
            Regex::new(r"ya29\.[0-9A-Za-z_-]{20,}").expect("static regex"),
            "[gizli]",
        ),
        // Google API keys
        (
            Regex::new(r"AIza[0-9A-Za-z_-]{35}").expect("static regex"),
            "[gizli]",
        ),
        // key=value secrets
        (
            Regex::new(
                r#"(?i)(api[_-]?key|access[_-]?token|refresh[_-]?token|client[_-]?secret|secret[_-]?key)\s*[=:]\s*["']?[^\s"',}]{8,}["']?"#,
            )
            .expect("static regex"),
            "[gizli]",
        ),
        // Passwords in config or URLs
        (
            Regex::new(r#"(?i)(password|passwd|pwd|parola|şifre)\s*[=:]\s*["']?[^\s"']{4,}["']?"#)
                .expect("static regex"),
            "[gizli]",
        ),
        (
            Regex::new(r"(?i)[a-z][a-z0-9+.-]*://[^:/\s]+:[^@/\s]+@").expect("static regex"),
            "[gizli]@",
        ),
    ]
});

/// Unix and Windows file paths with at least two components
static PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:[A-Za-z]:\\[^\s"',]+|(?:~|\.{1,2})?/[\w.@-]+(?:/[\w.@-]+)+)"#).expect("static regex")
});

/// Redact sensitive patterns from text
pub fn redact(text: &str) -> String {
    let mut result = text.to_string();

    for (pattern, replacement) in REDACTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }

    result
}

/// Remove file paths
pub fn strip_paths(text: &str) -> String {
    PATH_PATTERN.replace_all(text, "[dosya]").to_string()
}
