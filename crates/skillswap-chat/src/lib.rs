//! SkillSwap Chat Client Core
//!
//! Real-time messaging for the SkillSwap marketplace:
//! - Conversation list with search, presence, and unread projections
//! - Per-conversation chat sessions with paginated history backfill
//! - Live delivery over a shared, reconnecting WebSocket channel
//! - Typing-indicator choreography with debounced stop signals
//! - File attachments and meeting-link sharing

pub mod config;
pub mod conversation_list;
pub mod live_channel;
pub mod session;
pub mod store;
pub mod timeline;
pub mod upload;

pub use config::ChatConfig;
pub use conversation_list::ConversationList;
pub use live_channel::{ChannelState, LiveChannel, LiveChannelHandle};
pub use session::{ChatSession, Composer, HistoryCursor};
pub use store::{
    CreateConversationRequest, HttpMessageStore, InMemoryMessageStore, MessageStore,
};
pub use upload::AttachmentUploader;
