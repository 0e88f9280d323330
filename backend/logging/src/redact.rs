//! Payload Redaction
//!
//! Scrubs credentials from event payloads before they are written to logs.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

const REDACTED: &str = "[REDACTED]";

static SECRET_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:password|secret|token|api[_-]?key)$").unwrap());
/// A secret field and its value: a string, a flat array or object, or a scalar.
static SECRET_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)("(?:password|secret|token|api[_-]?key)"\s*:\s*)(?:"(?:[^"\\]|\\.)*"|\[[^\]]*\]|\{[^}]*\}|[^,}\]\s]+)"#,
    )
    .unwrap()
});
static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"sk-[a-zA-Z0-9]{32,}").unwrap());

/// Redacts secret-looking JSON fields, bearer tokens and API keys in free text.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = SECRET_FIELD_RE.replace_all(input, format!(r#"${{1}}"{REDACTED}""#));
    let redacted = BEARER_RE.replace_all(&redacted, "[REDACTED_TOKEN]");
    API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]").into_owned()
}

/// Redacts a JSON tree: values under secret keys are replaced whatever their
/// shape, and tokens inside other strings are scrubbed.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| {
                    let v = if SECRET_KEY_RE.is_match(key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_value(v)
                    };
                    (key.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::String(s) => Value::String(redact_sensitive_data(s)),
        other => other.clone(),
    }
}
