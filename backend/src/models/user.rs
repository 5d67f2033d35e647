use chrono::{DateTime, Utc};
use serde::Serialize;

/// Stored in place of a name the identity provider did not supply.
pub const UNKNOWN_NAME: &str = "Unknown";

/// User record created on the first `user.created` event for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Record ID assigned by the store
    pub id: String,
    /// Subject id from the identity provider (unique)
    pub clerk_user_id: String,
    pub first_name: String,
    pub last_name: String,
    /// When the record was stored
    pub created_at: DateTime<Utc>,
}

/// Insert request for a user not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub clerk_user_id: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    /// Build from event fields, substituting [`UNKNOWN_NAME`] for absent or empty names.
    pub fn from_event_fields(
        clerk_user_id: impl Into<String>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Self {
        Self {
            clerk_user_id: clerk_user_id.into(),
            first_name: name_or_unknown(first_name),
            last_name: name_or_unknown(last_name),
        }
    }
}

fn name_or_unknown(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => UNKNOWN_NAME.to_string(),
    }
}
