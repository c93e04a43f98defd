//! In-memory message store
//!
//! Dashmap-backed store with the same validation, authorization, and
//! pagination semantics as the remote service. Backs local development and
//! the test suite; per-conversation logs are kept most-recent-first.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use skillswap_core::{
    ConversationId, Credential, MessageId, Result, SkillSwapError, UserId,
};
use skillswap_im_sdk::{Attachment, Conversation, ConversationKind, Message, MimeCategory};
use std::collections::VecDeque;

use crate::store::{CreateConversationRequest, MessageStore};
use crate::upload::AttachmentUploader;

const DEFAULT_MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

pub struct InMemoryMessageStore {
    conversations: DashMap<ConversationId, Conversation>,
    // conversation_id -> messages (most recent first)
    messages: DashMap<ConversationId, VecDeque<Message>>,
    // bearer token -> identity
    identities: DashMap<String, UserId>,
    max_file_size: usize,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            conversations: DashMap::new(),
            messages: DashMap::new(),
            identities: DashMap::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, bytes: usize) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Associate a bearer token with an identity.
    pub fn register_identity(&self, token: impl Into<String>, user_id: UserId) {
        self.identities.insert(token.into(), user_id);
    }

    pub fn insert_conversation(&self, conversation: Conversation) {
        self.conversations.insert(conversation.id.clone(), conversation);
    }

    /// Seed a message, keeping the per-conversation log most-recent-first.
    pub fn insert_message(&self, message: Message) {
        let mut log = self
            .messages
            .entry(message.conversation_id.clone())
            .or_default();
        let at = log
            .iter()
            .position(|m| m.created_at <= message.created_at)
            .unwrap_or(log.len());
        log.insert(at, message);
    }

    fn identity(&self, credential: &Credential) -> Result<UserId> {
        self.identities
            .get(credential.token())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SkillSwapError::Unauthorized("unknown credential".to_string()))
    }

    fn member_conversation(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<Conversation> {
        self.conversations
            .get(conversation_id)
            .filter(|entry| entry.value().is_participant(user_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                SkillSwapError::NotFound(format!("conversation {conversation_id} not found"))
            })
    }

    fn find_message(&self, message_id: &MessageId) -> Option<Message> {
        self.messages.iter().find_map(|entry| {
            entry
                .value()
                .iter()
                .find(|m| &m.id == message_id)
                .cloned()
        })
    }

    fn append(&self, message: Message) -> Message {
        if let Some(mut conversation) = self.conversations.get_mut(&message.conversation_id) {
            conversation.record_last_message(
                message.content.clone(),
                message.sender_id.clone(),
                message.created_at,
            );
        }
        self.messages
            .entry(message.conversation_id.clone())
            .or_default()
            .push_front(message.clone());
        message
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn list_conversations(&self, credential: &Credential) -> Result<Vec<Conversation>> {
        let user_id = self.identity(credential)?;
        Ok(self
            .conversations
            .iter()
            .filter(|entry| entry.value().is_participant(&user_id))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get_conversation(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
    ) -> Result<Conversation> {
        let user_id = self.identity(credential)?;
        self.member_conversation(conversation_id, &user_id)
    }

    async fn list_messages(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<Message>> {
        let user_id = self.identity(credential)?;
        self.member_conversation(conversation_id, &user_id)?;

        let page = page.max(1) as usize;
        let mut window: Vec<Message> = self
            .messages
            .get(conversation_id)
            .map(|log| {
                log.iter()
                    .skip((page - 1) * page_size)
                    .take(page_size)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // log is most-recent-first; pages are delivered oldest-to-newest
        window.reverse();
        Ok(window)
    }

    async fn send_message(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        content: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<Message> {
        let user_id = self.identity(credential)?;
        self.member_conversation(conversation_id, &user_id)?;

        let content = content.trim();
        if content.is_empty() {
            return Err(SkillSwapError::Validation(
                "message content is empty".to_string(),
            ));
        }

        let message = Message::new_text(
            conversation_id.clone(),
            user_id,
            content.to_string(),
            reply_to.cloned(),
        );
        Ok(self.append(message))
    }

    async fn edit_message(
        &self,
        credential: &Credential,
        message_id: &MessageId,
        new_content: &str,
    ) -> Result<Message> {
        let user_id = self.identity(credential)?;
        let new_content = new_content.trim();
        if new_content.is_empty() {
            return Err(SkillSwapError::Validation(
                "message content is empty".to_string(),
            ));
        }

        let existing = self
            .find_message(message_id)
            .ok_or_else(|| SkillSwapError::NotFound(format!("message {message_id} not found")))?;
        if existing.sender_id != user_id {
            return Err(SkillSwapError::Forbidden(
                "only the sender can edit a message".to_string(),
            ));
        }

        let mut log = self
            .messages
            .get_mut(&existing.conversation_id)
            .ok_or_else(|| SkillSwapError::NotFound(format!("message {message_id} not found")))?;
        let slot = log
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| SkillSwapError::NotFound(format!("message {message_id} not found")))?;
        slot.content = new_content.to_string();
        slot.edited_at = Some(Utc::now());
        Ok(slot.clone())
    }

    async fn delete_message(
        &self,
        credential: &Credential,
        message_id: &MessageId,
    ) -> Result<MessageId> {
        let user_id = self.identity(credential)?;
        let existing = self
            .find_message(message_id)
            .ok_or_else(|| SkillSwapError::NotFound(format!("message {message_id} not found")))?;
        if existing.sender_id != user_id {
            return Err(SkillSwapError::Forbidden(
                "only the sender can delete a message".to_string(),
            ));
        }

        if let Some(mut log) = self.messages.get_mut(&existing.conversation_id) {
            log.retain(|m| &m.id != message_id);
        }
        Ok(message_id.clone())
    }

    async fn send_meeting_link(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        meeting_url: &str,
        title: &str,
    ) -> Result<Message> {
        let user_id = self.identity(credential)?;
        self.member_conversation(conversation_id, &user_id)?;

        let message = Message::new_meeting(
            conversation_id.clone(),
            user_id,
            title.to_string(),
            meeting_url.to_string(),
        );
        Ok(self.append(message))
    }

    async fn create_conversation(
        &self,
        credential: &Credential,
        request: CreateConversationRequest,
    ) -> Result<Conversation> {
        let creator = self.identity(credential)?;

        let mut members = request.participants;
        if !members.contains(&creator) {
            members.insert(0, creator);
        }
        if request.kind == ConversationKind::Direct && members.len() != 2 {
            return Err(SkillSwapError::Validation(
                "a direct conversation has exactly two participants".to_string(),
            ));
        }

        let mut conversation = match request.kind {
            ConversationKind::Direct => {
                Conversation::new_direct(members[0].clone(), members[1].clone())
            }
            ConversationKind::Group => Conversation::new_group(String::new(), members),
        };
        conversation.title = request.title;
        conversation.linked_swap_id = request.swap_id;

        self.conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }
}

#[async_trait]
impl AttachmentUploader for InMemoryMessageStore {
    async fn upload(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<Message> {
        let user_id = self.identity(credential)?;
        self.member_conversation(conversation_id, &user_id)?;

        if !mime_type.contains('/') {
            return Err(SkillSwapError::UnsupportedType(format!(
                "unrecognized mime type: {mime_type}"
            )));
        }
        if bytes.len() > self.max_file_size {
            return Err(SkillSwapError::PayloadTooLarge(format!(
                "{} bytes exceeds the {} byte limit",
                bytes.len(),
                self.max_file_size
            )));
        }

        let attachment = Attachment {
            url: format!(
                "https://files.skillswap.com/{conversation_id}/{file_name}"
            ),
            name: file_name.to_string(),
            mime_category: MimeCategory::from_mime(mime_type),
        };
        let message = Message::new_attachment(
            conversation_id.clone(),
            user_id,
            attachment,
            file_name.to_string(),
        );
        Ok(self.append(message))
    }
}
