use serde::{Deserialize, Serialize};

/// JSON envelope returned for every webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self {
            success: true,
            message: "Webhook received".to_string(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
