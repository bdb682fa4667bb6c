//! Conversation history normalisation

use serde_json::Value;

use crate::providers::{Content, Part};
use crate::types::HistoryMessage;

/// Convert client history into model turns
///
/// Roles are lower-cased and `assistant` becomes `model`; anything other than `user` or
/// `model` is dropped. `parts` is used when present and non-empty, otherwise `content`.
/// Strings and `{ "text": .. }` objects become text parts, other items and empty texts are
/// skipped, and messages left without parts are dropped.
pub fn normalize_history(history: &[HistoryMessage]) -> Vec<Content> {
    history
        .iter()
        .filter_map(|message| {
            let role = match message.role.to_lowercase().as_str() {
                "assistant" | "model" => "model",
                "user" => "user",
                _ => return None,
            };

            let raw = message
                .parts
                .as_ref()
                .filter(|p| is_truthy(p))
                .or(message.content.as_ref())?;

            let parts = text_parts(raw);
            if parts.is_empty() {
                return None;
            }

            Some(Content {
                role: role.to_string(),
                parts,
            })
        })
        .collect()
}

fn text_parts(raw: &Value) -> Vec<Part> {
    let parts = match raw {
        Value::String(text) => vec![Part::text(text.as_str())],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(Part::text(text.as_str())),
                Value::Object(map) => map.get("text").map(|text| match text {
                    Value::String(s) => Part::text(s.as_str()),
                    other => Part::text(other.to_string()),
                }),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    // Gemini rejects empty text parts
    parts.into_iter().filter(|p| !p.text.is_empty()).collect()
}

/// Empty strings, lists and objects, `null`, `false` and zero count as absent
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
