//! Message store access - HTTP client and in-memory backend

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skillswap_core::{ConversationId, Credential, MessageId, Result, SwapId, UserId};
use skillswap_im_sdk::{Conversation, ConversationKind, Message};

pub use http::HttpMessageStore;
pub use memory::InMemoryMessageStore;

/// Typed access to conversation and message persistence.
///
/// Responses are ground truth: callers merge them into local state, they do
/// not second-guess them. Every operation carries the opaque credential and
/// is authorized server-side; client-side checks are defensive only.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// All conversations the credential's identity participates in, enriched
    /// with participant profile summaries and last-message summaries.
    async fn list_conversations(&self, credential: &Credential) -> Result<Vec<Conversation>>;

    /// Fails with `NotFound` when the id does not exist or the identity is
    /// not a participant.
    async fn get_conversation(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
    ) -> Result<Conversation>;

    /// The page-th most-recent window of history, oldest-to-newest within the
    /// page (page 1 = most recent). A short page means no further history.
    async fn list_messages(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<Message>>;

    async fn send_message(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        content: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<Message>;

    /// Sender-only; `Forbidden` otherwise, `NotFound` if the message is gone.
    async fn edit_message(
        &self,
        credential: &Credential,
        message_id: &MessageId,
        new_content: &str,
    ) -> Result<Message>;

    /// Sender-only, same authorization rule as edit.
    async fn delete_message(
        &self,
        credential: &Credential,
        message_id: &MessageId,
    ) -> Result<MessageId>;

    async fn send_meeting_link(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        meeting_url: &str,
        title: &str,
    ) -> Result<Message>;

    async fn create_conversation(
        &self,
        credential: &Credential,
        request: CreateConversationRequest,
    ) -> Result<Conversation>;
}

/// Request body for starting a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    pub kind: ConversationKind,
    pub participants: Vec<UserId>,
    pub title: Option<String>,
    pub swap_id: Option<SwapId>,
}
