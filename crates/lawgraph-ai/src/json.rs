//! Tolerant parsing of JSON objects out of model output.

use serde_json::{Map, Value};

/// Remove a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// First JSON object found in `text`.
///
/// Tries the fence-stripped text as a whole, then the span from the first
/// `{` to the last `}`. Anything that is not an object yields `None`.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    let stripped = strip_code_fence(text);
    if let Ok(Value::Object(map)) = serde_json::from_str(stripped) {
        return Some(map);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn object_found_in_prose() {
        let map = parse_json_object("판단 결과: {\"follow\": true, \"priority\": 2} 입니다").unwrap();
        assert_eq!(map["follow"], Value::Bool(true));
        assert_eq!(map["priority"], 2);
    }

    #[test]
    fn non_objects_rejected() {
        assert!(parse_json_object("[1, 2]").is_none());
        assert!(parse_json_object("not json").is_none());
        assert!(parse_json_object("} {").is_none());
        assert!(parse_json_object("{broken").is_none());
    }
}
