//! Chat session controller
//!
//! The live state of exactly one open conversation: the message timeline,
//! the history cursor, the typing set, and the composer. All three message
//! insertion paths (initial fetch, send confirmation, push delivery) merge
//! through the timeline's idempotent id-keyed insert, so a push echo of the
//! sender's own message, a redelivered event, or a late history page can
//! never duplicate or drop anything.

use skillswap_core::{
    ConversationId, Credential, MessageId, Result, SkillSwapError, UserId,
};
use skillswap_im_sdk::{
    generate_meeting_url, ClientCommand, Conversation, Message, ServerEvent, TypingIndicator,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::ChatConfig;
use crate::live_channel::LiveChannelHandle;
use crate::store::MessageStore;
use crate::timeline::Timeline;
use crate::upload::AttachmentUploader;

/// Pagination cursor over message history. Page 1 is the most recent window;
/// the counter only advances toward older messages.
#[derive(Debug, Clone, Copy)]
pub struct HistoryCursor {
    pub page: u32,
    pub has_more: bool,
}

/// Outgoing-message box state. Preserved verbatim on any send failure so the
/// user can retry.
#[derive(Debug, Default)]
pub struct Composer {
    draft: String,
    pending_reply: Option<MessageId>,
    pending_edit: Option<MessageId>,
}

impl Composer {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn pending_reply(&self) -> Option<&MessageId> {
        self.pending_reply.as_ref()
    }

    pub fn pending_edit(&self) -> Option<&MessageId> {
        self.pending_edit.as_ref()
    }
}

pub struct ChatSession {
    conversation: Conversation,
    current_user: UserId,
    credential: Credential,
    store: Arc<dyn MessageStore>,
    uploader: Arc<dyn AttachmentUploader>,
    timeline: Timeline,
    cursor: HistoryCursor,
    loading_older: bool,
    page_size: usize,
    typing: HashMap<UserId, TypingIndicator>,
    composer: Composer,
    upload_in_flight: bool,
    debounce: TypingDebounce,
}

impl ChatSession {
    /// Open a conversation: fetch its metadata, then the most recent page of
    /// history. The timeline starts from scratch on every open.
    pub async fn open(
        store: Arc<dyn MessageStore>,
        uploader: Arc<dyn AttachmentUploader>,
        channel: LiveChannelHandle,
        credential: Credential,
        current_user: UserId,
        conversation_id: ConversationId,
        config: &ChatConfig,
    ) -> Result<Self> {
        let conversation = store.get_conversation(&credential, &conversation_id).await?;
        let first_page = store
            .list_messages(&credential, &conversation_id, 1, config.page_size)
            .await?;

        let fetched = first_page.len();
        let mut timeline = Timeline::new();
        for message in first_page {
            timeline.insert(message);
        }
        debug!(conversation_id = %conversation_id, fetched, "chat session opened");

        let recipients: Vec<UserId> = conversation
            .other_active_participants(&current_user)
            .map(|p| p.user_id.clone())
            .collect();
        let debounce = TypingDebounce::new(
            channel,
            conversation_id,
            recipients,
            Duration::from_millis(config.typing_debounce_ms),
        );

        Ok(Self {
            conversation,
            current_user,
            credential,
            store,
            uploader,
            timeline,
            cursor: HistoryCursor {
                page: 1,
                has_more: fetched == config.page_size,
            },
            loading_older: false,
            page_size: config.page_size,
            typing: HashMap::new(),
            composer: Composer::default(),
            upload_in_flight: false,
            debounce,
        })
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn current_user(&self) -> &UserId {
        &self.current_user
    }

    /// Messages in ascending `created_at` order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.timeline.iter()
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.timeline.get(id)
    }

    pub fn message_count(&self) -> usize {
        self.timeline.len()
    }

    pub fn cursor(&self) -> HistoryCursor {
        self.cursor
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    pub fn is_upload_in_flight(&self) -> bool {
        self.upload_in_flight
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Fetch the next-older page and prepend it. No-op when history is
    /// exhausted or a load is already running. Returns how many messages were
    /// actually inserted; the caller must offset its scroll position by the
    /// prepended height so the viewport does not jump.
    pub async fn load_older(&mut self) -> Result<usize> {
        if !self.cursor.has_more || self.loading_older {
            return Ok(0);
        }
        self.loading_older = true;
        let next_page = self.cursor.page + 1;
        let result = self
            .store
            .list_messages(
                &self.credential,
                &self.conversation.id,
                next_page,
                self.page_size,
            )
            .await;
        self.loading_older = false;

        // The page counter only advances on success, so a failed fetch is
        // retried at the same position.
        let batch = result?;
        self.cursor.page = next_page;
        self.cursor.has_more = batch.len() == self.page_size;

        let mut inserted = 0;
        for message in batch {
            if self.timeline.insert(message) {
                inserted += 1;
            }
        }
        debug!(page = next_page, inserted, "older history merged");
        Ok(inserted)
    }

    /// Send the composed text. Empty and whitespace-only content is rejected
    /// locally, before any network call. On success the confirmed message is
    /// appended and the composer is cleared; on failure the composer (draft
    /// and pending reply) is untouched for retry.
    pub async fn send_text(&mut self, content: &str) -> Result<Message> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SkillSwapError::Validation(
                "message content is empty".to_string(),
            ));
        }

        // The outgoing keystroke stream ends with the send.
        self.debounce.finish();

        let reply_to = self.composer.pending_reply.clone();
        let message = self
            .store
            .send_message(
                &self.credential,
                &self.conversation.id,
                trimmed,
                reply_to.as_ref(),
            )
            .await?;

        self.composer.draft.clear();
        self.composer.pending_reply = None;
        self.absorb(message.clone());
        Ok(message)
    }

    /// Apply a live event. Events scoped to other conversations are ignored;
    /// a message push is an idempotent append keyed by id.
    pub fn handle_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::MessageReceived {
                conversation_id,
                message,
            } if conversation_id == &self.conversation.id => {
                if !self.timeline.contains(&message.id) {
                    self.absorb(message.clone());
                } else {
                    trace!(message_id = %message.id, "duplicate push delivery ignored");
                }
            }
            ServerEvent::UserTyping {
                conversation_id,
                user_id,
            } if conversation_id == &self.conversation.id => {
                if user_id != &self.current_user {
                    self.typing
                        .entry(user_id.clone())
                        .and_modify(|indicator| indicator.refresh())
                        .or_insert_with(|| {
                            TypingIndicator::new(self.conversation.id.clone(), user_id.clone())
                        });
                }
            }
            ServerEvent::UserStoppedTyping {
                conversation_id,
                user_id,
            } if conversation_id == &self.conversation.id => {
                self.typing.remove(user_id);
            }
            _ => {}
        }
    }

    /// Users currently typing in this conversation, excluding self. Entries
    /// whose stop event was lost expire after the TTL.
    pub fn typing_users(&mut self) -> Vec<UserId> {
        self.typing.retain(|_, indicator| !indicator.is_expired());
        let mut users: Vec<UserId> = self.typing.keys().cloned().collect();
        users.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        users
    }

    /// Edit one of the current user's messages. The timeline changes only
    /// after the server confirms. A server-side `NotFound` means the message
    /// was deleted concurrently; the local copy is dropped.
    pub async fn edit_message(&mut self, id: &MessageId, new_content: &str) -> Result<()> {
        let existing = self
            .timeline
            .get(id)
            .ok_or_else(|| SkillSwapError::NotFound(format!("message {id} not found")))?;
        if existing.sender_id != self.current_user {
            return Err(SkillSwapError::Forbidden(
                "only the sender can edit a message".to_string(),
            ));
        }
        let trimmed = new_content.trim();
        if trimmed.is_empty() {
            return Err(SkillSwapError::Validation(
                "message content is empty".to_string(),
            ));
        }

        match self.store.edit_message(&self.credential, id, trimmed).await {
            Ok(updated) => {
                self.timeline.replace(updated);
                self.composer.pending_edit = None;
                Ok(())
            }
            Err(SkillSwapError::NotFound(detail)) => {
                self.timeline.remove(id);
                self.composer.pending_edit = None;
                Err(SkillSwapError::NotFound(detail))
            }
            Err(err) => Err(err),
        }
    }

    /// Delete one of the current user's messages, removing it from the
    /// timeline after confirmation. A concurrent server-side delete counts
    /// as success.
    pub async fn delete_message(&mut self, id: &MessageId) -> Result<()> {
        let existing = self
            .timeline
            .get(id)
            .ok_or_else(|| SkillSwapError::NotFound(format!("message {id} not found")))?;
        if existing.sender_id != self.current_user {
            return Err(SkillSwapError::Forbidden(
                "only the sender can delete a message".to_string(),
            ));
        }

        match self.store.delete_message(&self.credential, id).await {
            Ok(_) | Err(SkillSwapError::NotFound(_)) => {
                self.timeline.remove(id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Register a keystroke. The first one publishes `typing_start`; the
    /// stop signal fires once, two seconds after the last keystroke.
    pub fn start_typing(&mut self) {
        self.debounce.keystroke();
    }

    /// Explicitly end the typing signal (input blurred, composer cleared).
    pub fn stop_typing(&mut self) {
        self.debounce.finish();
    }

    /// Upload a file and append the resulting attachment message. A second
    /// call while one upload is outstanding is rejected locally, before any
    /// network traffic. The guard clears on success and on failure alike.
    pub async fn upload_attachment(
        &mut self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<Message> {
        if self.upload_in_flight {
            return Err(SkillSwapError::Validation(
                "an attachment upload is already in flight".to_string(),
            ));
        }
        self.upload_in_flight = true;
        let result = self
            .uploader
            .upload(
                &self.credential,
                &self.conversation.id,
                bytes,
                file_name,
                mime_type,
            )
            .await;
        self.upload_in_flight = false;

        let message = result?;
        self.absorb(message.clone());
        Ok(message)
    }

    /// Mint a meeting room client-side and share its link.
    pub async fn start_meeting(&mut self, title: &str) -> Result<Message> {
        let meeting_url = generate_meeting_url();
        let label = if title.trim().is_empty() {
            "Video meeting"
        } else {
            title.trim()
        };
        let message = self
            .store
            .send_meeting_link(&self.credential, &self.conversation.id, &meeting_url, label)
            .await?;
        self.absorb(message.clone());
        Ok(message)
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.composer.draft = text.into();
    }

    /// Target a timeline message for a one-hop reply.
    pub fn begin_reply(&mut self, id: &MessageId) -> Result<()> {
        if !self.timeline.contains(id) {
            return Err(SkillSwapError::NotFound(format!("message {id} not found")));
        }
        self.composer.pending_reply = Some(id.clone());
        Ok(())
    }

    pub fn cancel_reply(&mut self) {
        self.composer.pending_reply = None;
    }

    /// Load one of the current user's messages into the composer for editing.
    pub fn begin_edit(&mut self, id: &MessageId) -> Result<()> {
        let existing = self
            .timeline
            .get(id)
            .ok_or_else(|| SkillSwapError::NotFound(format!("message {id} not found")))?;
        if existing.sender_id != self.current_user {
            return Err(SkillSwapError::Forbidden(
                "only the sender can edit a message".to_string(),
            ));
        }
        self.composer.draft = existing.content.clone();
        self.composer.pending_edit = Some(id.clone());
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.composer.pending_edit = None;
    }

    fn absorb(&mut self, message: Message) {
        self.conversation.record_last_message(
            message.content.clone(),
            message.sender_id.clone(),
            message.created_at,
        );
        self.timeline.insert(message);
    }
}

/// Per-session typing debounce: debounce, not throttle. The stop signal
/// fires once, `delay` after the last keystroke, and is also flushed when
/// the session sends or closes.
struct TypingDebounce {
    channel: LiveChannelHandle,
    conversation_id: ConversationId,
    recipients: Vec<UserId>,
    delay: Duration,
    active: Arc<AtomicBool>,
    timer: Option<JoinHandle<()>>,
}

impl TypingDebounce {
    fn new(
        channel: LiveChannelHandle,
        conversation_id: ConversationId,
        recipients: Vec<UserId>,
        delay: Duration,
    ) -> Self {
        Self {
            channel,
            conversation_id,
            recipients,
            delay,
            active: Arc::new(AtomicBool::new(false)),
            timer: None,
        }
    }

    fn keystroke(&mut self) {
        if self.recipients.is_empty() {
            return;
        }
        if !self.active.swap(true, Ordering::SeqCst) {
            self.channel.publish(ClientCommand::TypingStart {
                conversation_id: self.conversation_id.clone(),
                participants: self.recipients.clone(),
            });
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let active = Arc::clone(&self.active);
        let channel = self.channel.clone();
        let stop = ClientCommand::TypingStop {
            conversation_id: self.conversation_id.clone(),
            participants: self.recipients.clone(),
        };
        let delay = self.delay;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if active.swap(false, Ordering::SeqCst) {
                channel.publish(stop);
            }
        }));
    }

    fn finish(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if self.active.swap(false, Ordering::SeqCst) {
            self.channel.publish(ClientCommand::TypingStop {
                conversation_id: self.conversation_id.clone(),
                participants: self.recipients.clone(),
            });
        }
    }
}

impl Drop for TypingDebounce {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_channel::LiveChannel;
    use crate::store::InMemoryMessageStore;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingUploader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AttachmentUploader for CountingUploader {
        async fn upload(
            &self,
            _credential: &Credential,
            _conversation_id: &ConversationId,
            _bytes: Vec<u8>,
            _file_name: &str,
            _mime_type: &str,
        ) -> Result<Message> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SkillSwapError::Transport("unreachable storage".to_string()))
        }
    }

    async fn session_with_uploader(
        uploader: Arc<dyn AttachmentUploader>,
    ) -> (ChatSession, Arc<InMemoryMessageStore>) {
        let store = Arc::new(InMemoryMessageStore::new());
        let me = UserId::new("me");
        store.register_identity("token-me", me.clone());
        let conversation =
            skillswap_im_sdk::Conversation::new_direct(me.clone(), UserId::new("peer"));
        let conversation_id = conversation.id.clone();
        store.insert_conversation(conversation);

        let (channel, _commands) = LiveChannel::loopback();
        let session = ChatSession::open(
            store.clone(),
            uploader,
            channel.handle(),
            Credential::new("token-me"),
            me,
            conversation_id,
            &ChatConfig::default(),
        )
        .await
        .unwrap();
        (session, store)
    }

    #[tokio::test]
    async fn concurrent_upload_is_rejected_before_any_network_call() {
        let uploader = Arc::new(CountingUploader {
            calls: AtomicUsize::new(0),
        });
        let (mut session, _store) = session_with_uploader(uploader.clone()).await;

        // Simulate an outstanding upload from a double-triggered UI.
        session.upload_in_flight = true;
        let err = session
            .upload_attachment(vec![0u8; 2 * 1024 * 1024], "photo.jpg", "image/jpeg")
            .await
            .unwrap_err();

        assert!(matches!(err, SkillSwapError::Validation(_)));
        assert_eq!(uploader.calls.load(Ordering::SeqCst), 0);
        assert!(session.upload_in_flight);
    }

    #[tokio::test]
    async fn failed_upload_clears_the_guard() {
        let uploader = Arc::new(CountingUploader {
            calls: AtomicUsize::new(0),
        });
        let (mut session, _store) = session_with_uploader(uploader.clone()).await;

        let err = session
            .upload_attachment(vec![1, 2, 3], "notes.pdf", "application/pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, SkillSwapError::Transport(_)));
        assert_eq!(uploader.calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_upload_in_flight());
    }
}
