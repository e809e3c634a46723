//! Notification payload model and its JSON string codec.
//!
//! A payload is an unordered JSON object attached to a notification. Only a handful of keys
//! carry meaning for routing; everything else is opaque host data that travels untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Key holding an explicit navigation route.
pub const ROUTE_KEY: &str = "route";
/// Key holding a notification type looked up in a type→route table.
pub const TYPE_KEY: &str = "type";
/// Key synthesized on tap events with the normalized action identifier.
pub const ACTION_KEY: &str = "_action";
/// Key synthesized on tap events with free-text reply input.
pub const INPUT_KEY: &str = "_input";

/// Errors raised while turning host data into a transportable payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The value could not be serialized to JSON.
    #[error("payload serialization failed: {0}")]
    Serialize(String),
    /// The value serialized to JSON that is not an object.
    #[error("payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
/// Key/value data attached to a notification.
pub struct NotificationPayload(Map<String, Value>);

impl NotificationPayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts any serializable value into a payload.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Serialize`] when serialization fails and
    /// [`PayloadError::NotAnObject`] when the value is not a JSON object.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self, PayloadError> {
        let value =
            serde_json::to_value(value).map_err(|err| PayloadError::Serialize(err.to_string()))?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(PayloadError::NotAnObject(json_kind(&other))),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a value, returning the previous one for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the value under `key` only when it is a JSON string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Explicit navigation route, when present as a string.
    pub fn route(&self) -> Option<&str> {
        self.get_str(ROUTE_KEY)
    }

    /// Notification type, when present as a string.
    pub fn notification_type(&self) -> Option<&str> {
        self.get_str(TYPE_KEY)
    }

    /// Action identifier synthesized from a tap on an action button.
    pub fn action(&self) -> Option<&str> {
        self.get_str(ACTION_KEY)
    }

    /// Reply text synthesized from a tap on a text-input action.
    pub fn input(&self) -> Option<&str> {
        self.get_str(INPUT_KEY)
    }

    /// Returns a copy carrying the tap response keys.
    ///
    /// Blank action identifiers are skipped; the action is normalized with
    /// [`normalize_action_id`].
    #[must_use]
    pub fn with_tap_response(mut self, action_id: Option<&str>, input: Option<&str>) -> Self {
        if let Some(action) = action_id.map(normalize_action_id) {
            if !action.is_empty() {
                self.insert(ACTION_KEY, action);
            }
        }
        if let Some(input) = input {
            self.insert(INPUT_KEY, input);
        }
        self
    }

    /// Returns whether the payload has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Borrows the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the payload, returning the underlying JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for NotificationPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for NotificationPayload {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Normalizes a human-readable action label into a stable identifier.
///
/// `"Mark as Read"` becomes `"mark_as_read"`.
pub fn normalize_action_id(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// Serializes a payload to its canonical JSON text (keys sorted).
///
/// # Errors
///
/// Returns [`PayloadError::Serialize`] when JSON serialization fails.
pub fn encode_payload(payload: &NotificationPayload) -> Result<String, PayloadError> {
    serde_json::to_string(payload).map_err(|err| PayloadError::Serialize(err.to_string()))
}

/// Parses payload text; empty, malformed, or non-object input yields an empty payload.
pub fn decode_payload(text: &str) -> NotificationPayload {
    if text.trim().is_empty() {
        return NotificationPayload::default();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => NotificationPayload(map),
        _ => NotificationPayload::default(),
    }
}

/// Decodes optional payload text, treating `None` like empty text.
pub fn decode_optional_payload(text: Option<&str>) -> NotificationPayload {
    text.map(decode_payload).unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
