use serde_json::Value;

/// Decoded body of a successful response.
///
/// HTTP 204 is a legitimate success with no body; it gets a distinguished
/// marker rather than being conflated with JSON `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The service answered 204 No Content.
    NoContent,

    /// The JSON-decoded response document: object, array, string, number,
    /// boolean or null.
    Json(Value),
}

impl Payload {
    /// The decoded JSON document, unless this is the no-content marker.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::NoContent => None,
            Payload::Json(value) => Some(value),
        }
    }

    pub fn is_no_content(&self) -> bool {
        matches!(self, Payload::NoContent)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}
