//! Pull the generated text out of a completion response body.
//!
//! Providers wrap the model's text in different envelopes. Shapes are tried
//! in order; when none matches, the raw body is returned untouched so the
//! caller's own decode fails with the real content in hand.

use serde_json::Value;

/// Extract generated text from a completion response body.
///
/// Recognized shapes, in order:
/// 1. top-level `text` / `output_text` (string, or array of strings joined)
/// 2. `output[].content[].text`
/// 3. `content[].text`
/// 4. `choices[].message.content`
pub fn extract_generated_text(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    top_level_text(&value)
        .or_else(|| output_content_text(&value))
        .or_else(|| content_text(&value))
        .or_else(|| choices_text(&value))
        .unwrap_or_else(|| body.to_string())
}

fn top_level_text(value: &Value) -> Option<String> {
    ["text", "output_text"]
        .iter()
        .find_map(|key| match value.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Array(parts) => {
                let joined: String = parts.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then_some(joined)
            }
            _ => None,
        })
}

fn output_content_text(value: &Value) -> Option<String> {
    let output = value.get("output")?.as_array()?;
    let texts: Vec<&str> = output
        .iter()
        .filter_map(|item| item.get("content")?.as_array())
        .flatten()
        .filter_map(|part| part.get("text")?.as_str())
        .collect();
    (!texts.is_empty()).then(|| texts.concat())
}

fn content_text(value: &Value) -> Option<String> {
    let texts: Vec<&str> = value
        .get("content")?
        .as_array()?
        .iter()
        .filter_map(|part| part.get("text")?.as_str())
        .collect();
    (!texts.is_empty()).then(|| texts.concat())
}

fn choices_text(value: &Value) -> Option<String> {
    let texts: Vec<&str> = value
        .get("choices")?
        .as_array()?
        .iter()
        .filter_map(|choice| choice.get("message")?.get("content")?.as_str())
        .collect();
    (!texts.is_empty()).then(|| texts.concat())
}
