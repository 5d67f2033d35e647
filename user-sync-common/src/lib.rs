//! User Sync Common Types
//!
//! Webhook event types and signature verification shared by the backend
//! and any tooling that needs to produce or check signed deliveries.

pub mod event;
pub mod signature;

pub use event::{EventData, EventKind, WebhookEvent};
pub use signature::{VerificationError, WebhookVerifier, DEFAULT_TOLERANCE_SECS};
