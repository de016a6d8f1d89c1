//! Wire format of the chat socket.
//!
//! ```text
//! client → server   { "message": "...", "config": { "llmProvider", "model", "temperature", "maxTokens" } }
//! server → client   { "content": "..." }
//! ```
//!
//! There is no request id: replies are matched to requests purely by order.

use serde::{Deserialize, Serialize};

use crate::core::error::ChatError;
use crate::core::llm_config::LlmConfig;

/// One user turn, ready for transmission. Immutable once composed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundPayload {
    message: String,
    config: LlmConfig,
}

impl OutboundPayload {
    /// Only `core::compose` builds payloads; it validates first.
    pub(crate) fn new(message: String, config: LlmConfig) -> Self {
        Self { message, config }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// JSON text frame.
    pub fn to_json(&self) -> Result<String, ChatError> {
        serde_json::to_string(self).map_err(|e| ChatError::InvalidConfig(e.to_string()))
    }
}

/// A decoded assistant reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundReply {
    pub content: String,
}

/// Decode one inbound text frame.
pub fn decode_reply(raw: &str) -> Result<InboundReply, ChatError> {
    serde_json::from_str(raw).map_err(|e| ChatError::MalformedReply(e.to_string()))
}
