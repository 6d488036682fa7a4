//! Strict decoding of language-model output.
//!
//! Model replies may wrap their JSON in prose or markdown fences. The first
//! well-formed literal of the expected kind is located with a real JSON
//! parser, then decoded against a fixed shape. Any mismatch is an error so
//! that callers fall back to their local heuristic instead of guessing.

use serde_json::Value;

use crate::backend::{AiError, RawScores};

/// Find the first complete JSON array (`'['`) or object (`'{'`) literal in
/// `content`.
pub fn first_literal(content: &str, open: char) -> Option<Value> {
    for (start, _) in content.match_indices(open) {
        let mut stream = serde_json::Deserializer::from_str(&content[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(v @ Value::Array(_))) if open == '[' => return Some(v),
            Some(Ok(v @ Value::Object(_))) if open == '{' => return Some(v),
            _ => continue,
        }
    }
    None
}

/// Decode a reply that should contain an array of label strings.
pub fn labels(content: &str) -> Result<Vec<String>, AiError> {
    let value = first_literal(content, '[')
        .ok_or_else(|| AiError::Decode("no JSON array in reply".into()))?;
    labels_from_value(value)
}

/// Decode an already-parsed array of label strings.
pub fn labels_from_value(value: Value) -> Result<Vec<String>, AiError> {
    let Value::Array(items) = value else {
        return Err(AiError::Decode("expected an array of labels".into()));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(AiError::Decode(format!("non-string label {other}"))),
        })
        .collect()
}

/// Decode a reply that should contain a `{label: score}` object.
pub fn scores(content: &str) -> Result<RawScores, AiError> {
    let value = first_literal(content, '{')
        .ok_or_else(|| AiError::Decode("no JSON object in reply".into()))?;
    scores_from_value(value)
}

/// Decode an already-parsed `{label: score}` object.
///
/// Values must be finite numbers, or strings holding one.
pub fn scores_from_value(value: Value) -> Result<RawScores, AiError> {
    let Value::Object(map) = value else {
        return Err(AiError::Decode("expected an object of scores".into()));
    };
    let mut out = RawScores::new();
    for (label, raw) in map {
        let score = match &raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
        .ok_or_else(|| AiError::Decode(format!("score for {label:?} is not a number: {raw}")))?;
        out.insert(label, score);
    }
    Ok(out)
}
