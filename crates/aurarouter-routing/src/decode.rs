//! Fail-open decoding of advisory model output.
//!
//! Classifier, planner and reviewer replies are decoded once into a
//! [`Decoded`] value: either what the model said, or the documented
//! default plus the reason the reply was rejected.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*```[A-Za-z0-9_-]*\s*$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Parsed(T),
    Fallback { value: T, reason: String },
}

impl<T> Decoded<T> {
    /// Decode `raw` with `parse`, falling back to `default()` on a missing
    /// reply or a parse failure.
    pub fn from_reply(
        raw: Option<&str>,
        parse: impl FnOnce(&str) -> Result<T, String>,
        default: impl FnOnce() -> T,
    ) -> Self {
        let Some(raw) = raw else {
            return Decoded::Fallback {
                value: default(),
                reason: "no reply".into(),
            };
        };
        match parse(raw) {
            Ok(value) => Decoded::Parsed(value),
            Err(reason) => Decoded::Fallback {
                value: default(),
                reason,
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Decoded::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Decoded::Parsed(_) => None,
            Decoded::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Decoded::Parsed(value) | Decoded::Fallback { value, .. } => value,
        }
    }
}

/// Remove markdown code-fence lines.
pub fn strip_code_fences(text: &str) -> String {
    FENCE_RE.replace_all(text, "").trim().to_string()
}

/// First JSON object in `text`, tolerating fences and surrounding prose.
pub fn extract_json_object(text: &str) -> Result<serde_json::Map<String, Value>, String> {
    match extract_json(text, '{', '}')? {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected a JSON object, got {}", kind(&other))),
    }
}

/// First JSON array in `text`, tolerating fences and surrounding prose.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, String> {
    match extract_json(text, '[', ']')? {
        Value::Array(items) => Ok(items),
        other => Err(format!("expected a JSON array, got {}", kind(&other))),
    }
}

fn extract_json(text: &str, open: char, close: char) -> Result<Value, String> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err("empty reply".into());
    }
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }
    // Prose around the payload: take the outermost bracketed span
    let start = cleaned.find(open);
    let end = cleaned.rfind(close);
    match (start, end) {
        (Some(start), Some(end)) if end > start => {
            serde_json::from_str(&cleaned[start..=end]).map_err(|e| format!("invalid JSON: {}", e))
        }
        _ => Err("no JSON found in reply".into()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Step descriptions from a plan array. Strings are taken as-is; objects
/// contribute their `step`, `description` or `task` field.
pub fn plan_steps(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(map) => ["step", "description", "task"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
        assert_eq!(strip_code_fences("plain"), "plain");
    }

    #[test]
    fn test_extract_object_with_prose() {
        let map = extract_json_object("Sure! {\"intent\": \"SIMPLE_CODE\"} hope that helps").unwrap();
        assert_eq!(map["intent"], "SIMPLE_CODE");
    }

    #[test]
    fn test_extract_object_rejects_non_json() {
        assert!(extract_json_object("I think this is simple code.").is_err());
        assert!(extract_json_object("").is_err());
        assert!(extract_json_object("[1, 2]").is_err());
    }

    #[test]
    fn test_extract_array() {
        let items = extract_json_array("```\n[\"one\", \"two\"]\n```").unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_plan_steps() {
        let items = vec![
            json!("Write tests"),
            json!({"step": "Implement"}),
            json!({"description": "Document"}),
            json!(42),
            json!("  "),
        ];
        assert_eq!(plan_steps(&items), vec!["Write tests", "Implement", "Document"]);
    }

    #[test]
    fn test_decoded_fallbacks() {
        let none: Decoded<u8> = Decoded::from_reply(None, |_| Ok(1), || 5);
        assert!(none.is_fallback());
        assert_eq!(none.into_inner(), 5);

        let bad: Decoded<u8> = Decoded::from_reply(Some("x"), |_| Err("nope".into()), || 5);
        assert_eq!(bad.fallback_reason(), Some("nope"));

        let good: Decoded<u8> = Decoded::from_reply(Some("x"), |_| Ok(9), || 5);
        assert_eq!(good, Decoded::Parsed(9));
    }
}
