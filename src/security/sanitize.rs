//! Input sanitization.
//!
//! # Responsibilities
//! - Strip control characters and cap input length
//! - Remove script blocks and script-capable URI schemes from free text
//! - Allow-list HTML for content that will be rendered
//!
//! # Design Decisions
//! - `sanitize_text` is a denylist and not a parser; rendering paths must use
//!   `sanitize_html`
//! - Removal passes repeat until the text stops changing, so split payloads
//!   like `javajavascript:script:` do not reassemble

use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::security::types::SecurityError;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("invalid script block pattern")
});

static DANGEROUS_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:javascript|data|vbscript):").expect("invalid scheme pattern")
});

/// Tags kept by [`sanitize_html`].
pub const ALLOWED_HTML_TAGS: [&str; 10] =
    ["b", "i", "em", "strong", "a", "p", "br", "ul", "ol", "li"];

/// Attributes kept on `<a>` by [`sanitize_html`].
pub const ALLOWED_LINK_ATTRIBUTES: [&str; 2] = ["href", "target"];

/// Clean free text before it leaves the client.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !c.is_ascii_control())
        .take(max_len)
        .collect();

    let without_scripts = remove_until_stable(&SCRIPT_BLOCK, stripped);
    remove_until_stable(&DANGEROUS_SCHEME, without_scripts)
}

fn remove_until_stable(pattern: &Regex, mut text: String) -> String {
    loop {
        let next = pattern.replace_all(&text, "");
        if next.len() == text.len() {
            return text;
        }
        text = next.into_owned();
    }
}

/// Like [`sanitize_text`] for a JSON value that must be a string.
pub fn sanitize_text_value(value: &Value, max_len: usize) -> Result<String, SecurityError> {
    match value {
        Value::String(s) => Ok(sanitize_text(s, max_len)),
        other => Err(SecurityError::NotText(json_type_name(other))),
    }
}

/// Sanitize every string leaf of a JSON document. Keys are left untouched.
pub fn sanitize_json(value: Value, max_len: usize) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s, max_len)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| sanitize_json(item, max_len))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_json(v, max_len)))
                .collect(),
        ),
        other => other,
    }
}

/// Reduce HTML to a small formatting allow-list.
pub fn sanitize_html(input: &str) -> String {
    let link_attributes: HashSet<&str> = ALLOWED_LINK_ATTRIBUTES.into_iter().collect();
    ammonia::Builder::default()
        .tags(ALLOWED_HTML_TAGS.into_iter().collect())
        .generic_attributes(HashSet::new())
        .tag_attributes(HashMap::from([("a", link_attributes)]))
        .link_rel(None)
        .clean(input)
        .to_string()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
