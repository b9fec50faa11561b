//! LLM upstream client and completion routing.
//!
//! The relay never implements a model itself: it forwards role-tagged
//! conversations to OpenAI-compatible upstream APIs. This module holds the
//! message types shared with the HTTP surface, the upstream client seam, and
//! the waterfall router that walks the provider chain.

mod client;
mod router;

pub use client::{CompletionOutcome, HttpUpstreamClient, UpstreamClient, UpstreamError};
pub use router::{CompletionRouter, RouterError};

use serde::{Deserialize, Serialize};

/// Message roles accepted by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::system("be brief");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be brief");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result: Result<ChatMessage, _> =
            serde_json::from_str(r#"{"role": "tool", "content": "x"}"#);
        assert!(result.is_err());
    }
}
