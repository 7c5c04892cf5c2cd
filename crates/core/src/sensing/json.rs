use serde_json::{Map, Value};
use std::fmt;

/// Failure to locate or decode a JSON object in raw model output. The raw
/// text is retained for diagnostics and must not be shown to end users.
#[derive(Debug, Clone)]
pub enum ParseError {
    NoJsonFound { raw: String },
    MalformedJson { raw: String, detail: String },
}

impl ParseError {
    pub fn raw(&self) -> &str {
        match self {
            Self::NoJsonFound { raw } | Self::MalformedJson { raw, .. } => raw,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoJsonFound { .. } => write!(f, "no JSON object found in analysis output"),
            Self::MalformedJson { detail, .. } => {
                write!(f, "analysis output is not a valid JSON object: {detail}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Best-effort extraction of a JSON candidate from model text that may be
/// fenced in markdown or surrounded by citation prose. Returns a superset
/// of the real object; structural validation happens at decode time.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        let inner = inner.trim();
        if !inner.is_empty() {
            return Some(inner.to_string());
        }
        return None;
    }

    // First '{' to last '}'. Trailing grounding citations and leading prose
    // sit outside the outermost braces.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Decodes the analysis payload into a loosely-typed JSON object. A decoded
/// value that is not an object (bare array, scalar) counts as malformed.
pub fn parse_payload(raw: &str) -> Result<Map<String, Value>, ParseError> {
    let candidate = extract_json(raw).ok_or_else(|| ParseError::NoJsonFound {
        raw: raw.to_string(),
    })?;

    let value = serde_json::from_str::<Value>(&candidate).map_err(|e| {
        ParseError::MalformedJson {
            raw: raw.to_string(),
            detail: e.to_string(),
        }
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ParseError::MalformedJson {
            raw: raw.to_string(),
            detail: format!("expected object, got {}", value_kind(&other)),
        }),
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_with_citation_prose() {
        let raw = "Here are the results:\n```json\n{\"a\":1}\n```\nSources: [1]";
        let map = parse_payload(raw).unwrap();
        assert_eq!(map.get("a"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn parses_bare_json() {
        let map = parse_payload("{\"trendScore\": 91}").unwrap();
        assert_eq!(map.get("trendScore"), Some(&serde_json::json!(91)));
    }

    #[test]
    fn parses_json_with_surrounding_prose() {
        let raw = "Based on search results, {\"name\":\"X\"} — see citations below.";
        let map = parse_payload(raw).unwrap();
        assert_eq!(map.get("name"), Some(&serde_json::json!("X")));
    }

    #[test]
    fn tolerates_braces_inside_string_values() {
        let raw = "prefix {\"reasoning\": \"matrix {velocity} vs {risk}\"} suffix";
        let map = parse_payload(raw).unwrap();
        assert_eq!(
            map.get("reasoning"),
            Some(&serde_json::json!("matrix {velocity} vs {risk}"))
        );
    }

    #[test]
    fn rejects_text_without_json() {
        let err = parse_payload("no json here").unwrap_err();
        assert!(matches!(err, ParseError::NoJsonFound { .. }));
        assert_eq!(err.raw(), "no json here");
    }

    #[test]
    fn rejects_undecodable_span() {
        let err = parse_payload("{not json at all}").unwrap_err();
        assert!(matches!(err, ParseError::MalformedJson { .. }));
    }

    #[test]
    fn rejects_non_object_json() {
        // A fenced bare array decodes fine but is not a usable payload.
        let err = parse_payload("```json\n[1, 2, 3]\n```").unwrap_err();
        match err {
            ParseError::MalformedJson { detail, .. } => {
                assert!(detail.contains("expected object"), "{detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn extract_json_handles_unlabeled_fences() {
        let fenced = "```\n{\"a\":1}\n```";
        assert_eq!(extract_json(fenced), Some("{\"a\":1}".to_string()));
    }
}
