//! Identity-provider webhook event payloads.
//!
//! Events arrive as JSON envelopes with a `type` tag and a `data` object
//! describing the subject. Only the subject id is lifted into a typed field;
//! every other `data` key stays available as a raw attribute.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type tag for a newly created user.
pub const USER_CREATED: &str = "user.created";

/// Event kinds the service distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A user was created at the identity provider.
    UserCreated,
    /// Any other event type; accepted but not acted upon.
    Other(String),
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            USER_CREATED => Self::UserCreated,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A decoded webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event type tag (e.g., "user.created").
    #[serde(rename = "type")]
    pub event_type: String,
    /// Subject of the event.
    pub data: EventData,
    /// Envelope object name ("event" for Clerk deliveries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Provider-side creation time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Event subject: the provider's id plus the remaining attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl WebhookEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from(self.event_type.as_str())
    }

    /// The identity provider's id for the event subject.
    pub fn subject_id(&self) -> Option<&str> {
        self.data.id.as_deref()
    }

    /// String attribute lookup. `null` and non-string values read as absent.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.data.attributes.get(key).and_then(Value::as_str)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.attribute_str("first_name")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.attribute_str("last_name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_user_created() {
        let json = r#"{
            "object": "event",
            "type": "user.created",
            "timestamp": 1654012591835,
            "data": {
                "id": "user_29w83sxmDNGwOuEthce5gg56FcC",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email_addresses": []
            }
        }"#;

        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), EventKind::UserCreated);
        assert_eq!(event.subject_id(), Some("user_29w83sxmDNGwOuEthce5gg56FcC"));
        assert_eq!(event.first_name(), Some("Ada"));
        assert_eq!(event.last_name(), Some("Lovelace"));
        assert_eq!(event.object.as_deref(), Some("event"));
        assert!(event.data.attributes.contains_key("email_addresses"));
        assert!(!event.data.attributes.contains_key("id"));
    }

    #[test]
    fn test_null_names_read_as_absent() {
        let json = r#"{"type": "user.created", "data": {"id": "u_1", "first_name": null}}"#;

        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.first_name(), None);
        assert_eq!(event.last_name(), None);
    }

    #[test]
    fn test_other_event_kind() {
        let json = r#"{"type": "user.updated", "data": {"id": "u_1"}}"#;

        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), EventKind::Other("user.updated".to_string()));
    }

    #[test]
    fn test_missing_data_is_rejected() {
        let json = r#"{"type": "user.created"}"#;
        assert!(serde_json::from_str::<WebhookEvent>(json).is_err());
    }

    #[test]
    fn test_missing_subject_id() {
        let json = r#"{"type": "user.created", "data": {"first_name": "Ada"}}"#;

        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.subject_id(), None);
        assert_eq!(event.first_name(), Some("Ada"));
    }
}
