//! Message types for the chat subsystem

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillswap_core::{ConversationId, MessageId, UserId};

/// Message entity
///
/// `id`, `conversation_id`, `sender_id` and `created_at` are immutable once
/// the server has confirmed creation. Deletion removes the message from the
/// timeline; there is no visible tombstone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub kind: MessageKind,
    pub content: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub meeting: Option<MeetingInfo>,
    #[serde(default)]
    pub reply_to: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

/// Message kind classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    File,
    Video,
    Audio,
    Meeting,
    System,
}

/// Stored attachment reference returned by file storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub mime_category: MimeCategory,
}

/// Coarse attachment classification derived from the mime type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeCategory {
    Image,
    File,
    Video,
    Audio,
}

impl MimeCategory {
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if mime.starts_with("audio/") {
            Self::Audio
        } else {
            Self::File
        }
    }

    pub fn message_kind(self) -> MessageKind {
        match self {
            Self::Image => MessageKind::Image,
            Self::File => MessageKind::File,
            Self::Video => MessageKind::Video,
            Self::Audio => MessageKind::Audio,
        }
    }
}

/// Meeting invite payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingInfo {
    pub meeting_url: String,
}

impl Message {
    /// Create a new text message
    pub fn new_text(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: String,
        reply_to: Option<MessageId>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            sender_id,
            kind: MessageKind::Text,
            content,
            attachment: None,
            meeting: None,
            reply_to,
            created_at: Utc::now(),
            edited_at: None,
        }
    }

    /// Create a new attachment message from a stored file reference
    pub fn new_attachment(
        conversation_id: ConversationId,
        sender_id: UserId,
        attachment: Attachment,
        caption: String,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            sender_id,
            kind: attachment.mime_category.message_kind(),
            content: caption,
            attachment: Some(attachment),
            meeting: None,
            reply_to: None,
            created_at: Utc::now(),
            edited_at: None,
        }
    }

    /// Create a new meeting-invite message
    pub fn new_meeting(
        conversation_id: ConversationId,
        sender_id: UserId,
        label: String,
        meeting_url: String,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            sender_id,
            kind: MessageKind::Meeting,
            content: label,
            attachment: None,
            meeting: Some(MeetingInfo { meeting_url }),
            reply_to: None,
            created_at: Utc::now(),
            edited_at: None,
        }
    }

    /// Create a system message (e.g. conversation lifecycle notices)
    pub fn new_system(conversation_id: ConversationId, sender_id: UserId, content: String) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            sender_id,
            kind: MessageKind::System,
            content,
            attachment: None,
            meeting: None,
            reply_to: None,
            created_at: Utc::now(),
            edited_at: None,
        }
    }

    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }

    /// Exactly one payload shape is allowed per kind.
    pub fn payload_consistent(&self) -> bool {
        match self.kind {
            MessageKind::Text | MessageKind::System => {
                self.attachment.is_none() && self.meeting.is_none()
            }
            MessageKind::Meeting => self.meeting.is_some() && self.attachment.is_none(),
            MessageKind::Image | MessageKind::File | MessageKind::Video | MessageKind::Audio => {
                self.meeting.is_none()
                    && self
                        .attachment
                        .as_ref()
                        .is_some_and(|a| a.mime_category.message_kind() == self.kind)
            }
        }
    }
}
