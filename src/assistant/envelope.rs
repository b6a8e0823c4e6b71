//! Decoding of the remote assistant's reply.
//!
//! The endpoint does not commit to a schema. Depending on how it is deployed the
//! text arrives at the top level, inside an API-gateway style `body` (often a
//! JSON document serialized into a string), or under one of a few alternative
//! keys. Candidates are probed in a fixed priority order and anything else is
//! kept verbatim as `Unrecognized`.

use serde_json::Value;

/// Bound on how many times a string-encoded `body` is unwrapped.
const MAX_BODY_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyField {
    Response,
    Message,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Response(String),
    Body {
        field: BodyField,
        text: String,
    },
    Message(String),
    Answer(String),
    Unrecognized(Value),
}

impl Envelope {
    /// Parses raw response text. Only invalid JSON is an error; every JSON
    /// value maps to some variant.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        if let Some(text) = text_field(&value, "response") {
            return Envelope::Response(text);
        }
        if let Some((field, text)) = value.get("body").and_then(|body| body_reply(body, 0)) {
            return Envelope::Body { field, text };
        }
        if let Some(text) = text_field(&value, "message") {
            return Envelope::Message(text);
        }
        if let Some(text) = text_field(&value, "answer") {
            return Envelope::Answer(text);
        }
        Envelope::Unrecognized(value)
    }

    /// Display text for the conversation.
    pub fn into_text(self) -> String {
        match self {
            Envelope::Response(text) |
            Envelope::Body { text, .. } |
            Envelope::Message(text) |
            Envelope::Answer(text) => text,
            Envelope::Unrecognized(value) => value.to_string(),
        }
    }
}

// Only non-empty strings count; other types fall through to the next candidate.
fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn body_reply(body: &Value, depth: usize) -> Option<(BodyField, String)> {
    match body {
        Value::String(raw) if depth < MAX_BODY_DEPTH => {
            let inner: Value = serde_json::from_str(raw).ok()?;
            body_reply(&inner, depth + 1)
        }
        Value::Object(_) =>
            text_field(body, "response")
                .map(|text| (BodyField::Response, text))
                .or_else(|| text_field(body, "message").map(|text| (BodyField::Message, text))),
        _ => None,
    }
}
