//! SkillSwap Instant Messaging SDK
//!
//! Protocol types for the chat subsystem: conversations, messages, typing
//! signals, live-channel events, and meeting-link generation.

pub mod conversation;
pub mod events;
pub mod meeting;
pub mod message;
pub mod presence;

#[cfg(test)]
mod tests;

pub use conversation::{Conversation, ConversationKind, LastMessage, Participant, ParticipantProfile};
pub use events::{ClientCommand, ServerEvent};
pub use meeting::{generate_meeting_code, generate_meeting_url, meeting_url};
pub use message::{Attachment, MeetingInfo, Message, MessageKind, MimeCategory};
pub use presence::TypingIndicator;
