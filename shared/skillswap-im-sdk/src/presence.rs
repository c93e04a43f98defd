//! Typing indicator types
//!
//! Typing signals are ephemeral and never persisted. An entry lives for
//! two seconds unless refreshed by another keystroke event or cleared by an
//! explicit stop event.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use skillswap_core::{ConversationId, UserId};

/// Time-to-live of a typing entry, refreshed by repeated keystroke events.
pub const TYPING_TTL_SECONDS: i64 = 2;

/// Typing indicator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingIndicator {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
}

impl TypingIndicator {
    pub fn new(conversation_id: ConversationId, user_id: UserId) -> Self {
        Self {
            conversation_id,
            user_id,
            started_at: Utc::now(),
        }
    }

    /// Reset the TTL on a repeated keystroke event.
    pub fn refresh(&mut self) {
        self.started_at = Utc::now();
    }

    /// Check if the typing indicator has outlived its TTL
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.started_at > Duration::seconds(TYPING_TTL_SECONDS)
    }
}
