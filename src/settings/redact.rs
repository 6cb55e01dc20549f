//! Redaction of sensitive settings values in human-readable reports.
//!
//! Only the rendered text is redacted; persisted values are never touched.

use serde_json::Value;

/// Placeholder printed instead of a sensitive value.
pub const REDACTED: &str = "[REDACTED]";

/// Name fragments that mark a key as sensitive (matched case-insensitively).
const SENSITIVE_PATTERNS: &[&str] = &["key", "secret", "token", "password"];

/// Returns `true` if any segment of a dot-separated key path looks sensitive.
///
/// ```rust
/// use avatar_shell::settings::redact::is_sensitive_path;
///
/// assert!(is_sensitive_path("apiKeys.openai"));
/// assert!(is_sensitive_path("auth.refreshToken"));
/// assert!(!is_sensitive_path("server.port"));
/// ```
#[must_use]
pub fn is_sensitive_path(path: &str) -> bool {
    path.split('.').any(|segment| {
        let lower = segment.to_ascii_lowercase();
        SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
    })
}

/// Render a value for a change report.
#[must_use]
pub fn display_value(value: &Value, sensitive: bool) -> String {
    if sensitive {
        REDACTED.to_owned()
    } else {
        value.to_string()
    }
}

/// Copy of `value` rooted at `path` with every sensitive leaf replaced by
/// [`REDACTED`]. An empty `path` means the document root.
#[must_use]
pub fn redact_value(path: &str, value: &Value) -> Value {
    if !path.is_empty() && is_sensitive_path(path) {
        return match value {
            Value::Object(map) => Value::Object(
                map.keys()
                    .map(|k| (k.clone(), Value::String(REDACTED.to_owned())))
                    .collect(),
            ),
            _ => Value::String(REDACTED.to_owned()),
        };
    }
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let child = if path.is_empty() {
                        k.clone()
                    } else {
                        format!("{path}.{k}")
                    };
                    (k.clone(), redact_value(&child, v))
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_patterns_in_any_segment() {
        assert!(is_sensitive_path("apiKeys"));
        assert!(is_sensitive_path("apiKeys.bithuman"));
        assert!(is_sensitive_path("clientSecret"));
        assert!(is_sensitive_path("db.PASSWORD"));
        assert!(!is_sensitive_path("model"));
        assert!(!is_sensitive_path("server.mode"));
    }

    #[test]
    fn sensitive_values_never_render() {
        let rendered = display_value(&json!("sk-live-123"), true);
        assert_eq!(rendered, REDACTED);
        assert!(!rendered.contains("sk-live"));
    }

    #[test]
    fn plain_values_render_as_json() {
        assert_eq!(display_value(&json!(5001), false), "5001");
        assert_eq!(display_value(&json!("a"), false), "\"a\"");
    }

    #[test]
    fn redact_value_masks_nested_secrets_only() {
        let doc = json!({
            "model": "alice",
            "apiKeys": {"openai": "sk-1", "bithuman": "bh-2"},
            "server": {"port": 5001}
        });
        let redacted = redact_value("", &doc);
        assert_eq!(redacted["model"], "alice");
        assert_eq!(redacted["apiKeys"]["openai"], REDACTED);
        assert_eq!(redacted["apiKeys"]["bithuman"], REDACTED);
        assert_eq!(redacted["server"]["port"], 5001);
        assert_eq!(redact_value("apiKeys.openai", &json!("sk-1")), REDACTED);
    }
}
