pub mod health;
pub mod stats;

use serde::Serialize;

// ─── Shared response envelope ────────────────────────────────────

/// `{ "message": ... }` body, used for health verdicts and for
/// "not enough data" answers on every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
