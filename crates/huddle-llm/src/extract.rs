//! Reply extraction from heterogeneous completion bodies.
//!
//! Completion services disagree on where the generated text lives. Rather
//! than probing properties ad hoc, each known shape is a pure [`Strategy`]
//! and [`STRATEGIES`] lists them in priority order. The first strategy that
//! yields a non-empty string wins.

use serde_json::Value;

/// A pure function from a parsed body to an optional reply.
pub type Strategy = fn(&Value) -> Option<String>;

/// Flat top-level fields checked by [`flat_field`], in order.
pub const FLAT_FIELDS: &[&str] = &[
    "reply",
    "response",
    "message",
    "text",
    "content",
    "output",
    "answer",
    "generated_text",
];

/// Wrapper fields checked by [`wrapped`], in order.
pub const WRAPPER_FIELDS: &[&str] = &["data", "result"];

/// Every strategy, highest priority first.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("flat_field", flat_field),
    ("completion_choice", completion_choice),
    ("chat_message", chat_message),
    ("content_blocks", content_blocks),
    ("wrapped", wrapped),
    ("first_element", first_element),
    ("bare_string", bare_string),
];

/// Outcome of interpreting a raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A strategy matched.
    Matched { text: String, strategy: &'static str },
    /// The body was not JSON; its trimmed text is the reply.
    RawText(String),
    /// Valid JSON with nothing usable in it, or an empty body.
    Empty,
}

/// Interpret a raw completion body.
pub fn extract_body(body: &str) -> Extraction {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => match extract_reply(&value) {
            Some((text, strategy)) => Extraction::Matched { text, strategy },
            None => Extraction::Empty,
        },
        Err(_) => match non_empty(body) {
            Some(text) => Extraction::RawText(text),
            None => Extraction::Empty,
        },
    }
}

/// Run [`STRATEGIES`] against a parsed body.
pub fn extract_reply(value: &Value) -> Option<(String, &'static str)> {
    STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(value).map(|text| (text, *name)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────────────────────────────────────

/// `{"reply": "..."}` and the other [`FLAT_FIELDS`].
pub fn flat_field(value: &Value) -> Option<String> {
    FLAT_FIELDS
        .iter()
        .find_map(|field| value.get(field).and_then(string_value))
}

/// `{"choices": [{"message": {"content": "..."}}]}` or `{"choices": [{"text": "..."}]}`.
pub fn completion_choice(value: &Value) -> Option<String> {
    let choice = value.get("choices")?.get(0)?;
    choice
        .pointer("/message/content")
        .and_then(string_value)
        .or_else(|| choice.get("text").and_then(string_value))
}

/// `{"message": {"content": "..."}}`, the Ollama chat shape.
pub fn chat_message(value: &Value) -> Option<String> {
    value.pointer("/message/content").and_then(string_value)
}

/// `{"content": [{"type": "text", "text": "..."}, ...]}`, text blocks joined.
pub fn content_blocks(value: &Value) -> Option<String> {
    let blocks = value.get("content")?.as_array()?;
    let text: String = blocks
        .iter()
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();
    non_empty(&text)
}

/// `{"data": ...}` or `{"result": ...}`.
///
/// The wrapped value may be a string, an object searched with the direct
/// strategies, or an array whose first element is searched the same way.
pub fn wrapped(value: &Value) -> Option<String> {
    WRAPPER_FIELDS.iter().find_map(|field| {
        let inner = value.get(field)?;
        match inner {
            Value::String(s) => non_empty(s),
            Value::Array(items) => items.first().and_then(direct),
            _ => direct(inner),
        }
    })
}

/// `[{"generated_text": "..."}]`, a top-level array searched by its first element.
pub fn first_element(value: &Value) -> Option<String> {
    let first = value.as_array()?.first()?;
    string_value(first).or_else(|| direct(first))
}

/// A body that is itself a JSON string.
pub fn bare_string(value: &Value) -> Option<String> {
    string_value(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// The strategies that look at one object without descending into wrappers.
fn direct(value: &Value) -> Option<String> {
    flat_field(value)
        .or_else(|| completion_choice(value))
        .or_else(|| chat_message(value))
        .or_else(|| content_blocks(value))
}

fn string_value(value: &Value) -> Option<String> {
    value.as_str().and_then(non_empty)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(value: Value) -> Option<(String, &'static str)> {
        extract_reply(&value)
    }

    #[test]
    fn test_openai_choice_message() {
        let result = extract(json!({"choices": [{"message": {"content": "hello"}}]}));
        assert_eq!(result, Some(("hello".to_string(), "completion_choice")));
    }

    #[test]
    fn test_legacy_choice_text() {
        let result = extract(json!({"choices": [{"text": " legacy "}]}));
        assert_eq!(result.unwrap().0, "legacy");
    }

    #[test]
    fn test_flat_field_priority() {
        let result = extract(json!({"text": "second", "reply": "first"}));
        assert_eq!(result, Some(("first".to_string(), "flat_field")));
    }

    #[test]
    fn test_flat_field_beats_choices() {
        let result = extract(json!({
            "response": "flat",
            "choices": [{"message": {"content": "nested"}}]
        }));
        assert_eq!(result.unwrap().0, "flat");
    }

    #[test]
    fn test_empty_flat_field_falls_through() {
        let result = extract(json!({"reply": "   ", "answer": "42"}));
        assert_eq!(result.unwrap().0, "42");
    }

    #[test]
    fn test_non_string_flat_field_is_skipped() {
        let result = extract(json!({"message": {"role": "assistant", "content": "ollama"}}));
        assert_eq!(result, Some(("ollama".to_string(), "chat_message")));
    }

    #[test]
    fn test_content_blocks_joined() {
        let result = extract(json!({
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "text", "text": "world"}
            ]
        }));
        assert_eq!(result.unwrap().0, "Hello, world");
    }

    #[test]
    fn test_wrapped_string() {
        let result = extract(json!({"data": "wrapped"}));
        assert_eq!(result, Some(("wrapped".to_string(), "wrapped")));
    }

    #[test]
    fn test_wrapped_object_and_array() {
        let object = extract(json!({"result": {"output": "from object"}}));
        assert_eq!(object.unwrap().0, "from object");

        let array = extract(json!({"data": [{"choices": [{"text": "from array"}]}]}));
        assert_eq!(array.unwrap().0, "from array");
    }

    #[test]
    fn test_top_level_array() {
        let result = extract(json!([{"generated_text": "hf style"}]));
        assert_eq!(result, Some(("hf style".to_string(), "first_element")));
    }

    #[test]
    fn test_bare_string_body() {
        let result = extract(json!("just a string"));
        assert_eq!(result, Some(("just a string".to_string(), "bare_string")));
    }

    #[test]
    fn test_nothing_extractable() {
        assert_eq!(extract(json!({"usage": {"tokens": 3}})), None);
        assert_eq!(extract(json!({"choices": []})), None);
        assert_eq!(extract(json!(42)), None);
        assert_eq!(extract(json!(null)), None);
    }

    #[test]
    fn test_extract_body_raw_text() {
        assert_eq!(
            extract_body("plain text"),
            Extraction::RawText("plain text".to_string())
        );
        assert_eq!(extract_body("   "), Extraction::Empty);
        assert_eq!(extract_body("{\"other\": true}"), Extraction::Empty);
    }

    #[test]
    fn test_extract_body_json() {
        assert_eq!(
            extract_body(r#"{"reply": "hi"}"#),
            Extraction::Matched {
                text: "hi".to_string(),
                strategy: "flat_field"
            }
        );
    }
}
