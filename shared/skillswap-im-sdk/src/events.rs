//! Live-channel wire events
//!
//! Event names form a closed set. Frames are decoded into these enums at the
//! channel boundary; an unknown or malformed event name is a decode error and
//! is dropped there, never dispatched inward as a string.

use serde::{Deserialize, Serialize};
use skillswap_core::{ConversationId, UserId};

use crate::message::Message;

/// Server-to-client events pushed over the live channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    MessageReceived {
        conversation_id: ConversationId,
        message: Message,
    },
    UserTyping {
        conversation_id: ConversationId,
        user_id: UserId,
    },
    UserStoppedTyping {
        conversation_id: ConversationId,
        user_id: UserId,
    },
    PresenceUpdate {
        user_id: UserId,
        is_online: bool,
    },
}

/// Client-to-server commands published over the live channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Sent once per connection, immediately after connect, so the server
    /// can route subsequent events to this channel.
    Authenticate {
        user_id: UserId,
    },
    TypingStart {
        conversation_id: ConversationId,
        participants: Vec<UserId>,
    },
    TypingStop {
        conversation_id: ConversationId,
        participants: Vec<UserId>,
    },
}

impl ServerEvent {
    /// Decode a raw text frame. Fails on unknown event names.
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// The conversation an event is scoped to, if any.
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        match self {
            Self::MessageReceived { conversation_id, .. }
            | Self::UserTyping { conversation_id, .. }
            | Self::UserStoppedTyping { conversation_id, .. } => Some(conversation_id),
            Self::PresenceUpdate { .. } => None,
        }
    }
}

impl ClientCommand {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
