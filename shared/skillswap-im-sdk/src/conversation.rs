//! Conversation types for the chat subsystem

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillswap_core::{ConversationId, SwapId, UserId};

/// Conversation aggregate
///
/// Conversations are never hard-deleted; a participant who leaves is marked
/// inactive and history is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub kind: ConversationKind,
    pub title: Option<String>,
    pub participants: Vec<Participant>,
    pub linked_swap_id: Option<SwapId>,
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub unread_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Conversation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Direct,
    Group,
}

/// Participant in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub profile: Option<ParticipantProfile>,
}

/// Profile summary the backend denormalizes onto each participant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantProfile {
    pub display_name: String,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_online: bool,
}

/// Denormalized summary of the newest message, for list rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: UserId,
    pub timestamp: DateTime<Utc>,
}

impl Conversation {
    /// Create a new direct conversation between two users
    pub fn new_direct(user1: UserId, user2: UserId) -> Self {
        Self {
            id: ConversationId::generate(),
            kind: ConversationKind::Direct,
            title: None,
            participants: vec![Participant::new(user1), Participant::new(user2)],
            linked_swap_id: None,
            last_message: None,
            unread_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Create a new group conversation
    pub fn new_group(title: String, members: Vec<UserId>) -> Self {
        Self {
            id: ConversationId::generate(),
            kind: ConversationKind::Group,
            title: Some(title),
            participants: members.into_iter().map(Participant::new).collect(),
            linked_swap_id: None,
            last_message: None,
            unread_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_participant(&self, user_id: &UserId) -> bool {
        self.participants.iter().any(|p| &p.user_id == user_id)
    }

    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_active)
    }

    /// Active participants other than `user_id`, in participant order
    pub fn other_active_participants<'a>(
        &'a self,
        user_id: &UserId,
    ) -> impl Iterator<Item = &'a Participant> {
        let user_id = user_id.clone();
        self.active_participants().filter(move |p| p.user_id != user_id)
    }

    /// Update the denormalized summary after a message is appended
    pub fn record_last_message(&mut self, content: String, sender_id: UserId, timestamp: DateTime<Utc>) {
        self.last_message = Some(LastMessage {
            content,
            sender_id,
            timestamp,
        });
    }
}

impl Participant {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            is_active: true,
            joined_at: Utc::now(),
            profile: None,
        }
    }

    pub fn with_profile(user_id: UserId, profile: ParticipantProfile) -> Self {
        Self {
            user_id,
            is_active: true,
            joined_at: Utc::now(),
            profile: Some(profile),
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.display_name.as_str())
    }
}
