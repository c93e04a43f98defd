//! Conversation list controller
//!
//! A filterable projection over the conversations visible to the current
//! user. The fetch is lazy: nothing is loaded until the list surface is
//! first shown, and nothing polls while it is hidden.

use skillswap_core::{Credential, Result, UserId};
use skillswap_im_sdk::{Conversation, ServerEvent};
use std::sync::Arc;
use tracing::debug;

use crate::store::MessageStore;

const UNKNOWN_USER: &str = "Unknown User";

pub struct ConversationList {
    store: Arc<dyn MessageStore>,
    credential: Credential,
    current_user: UserId,
    conversations: Vec<Conversation>,
    loaded: bool,
}

impl ConversationList {
    pub fn new(store: Arc<dyn MessageStore>, credential: Credential, current_user: UserId) -> Self {
        Self {
            store,
            credential,
            current_user,
            conversations: Vec::new(),
            loaded: false,
        }
    }

    /// Fetch on first use; later calls return the cached projection.
    pub async fn ensure_loaded(&mut self) -> Result<&[Conversation]> {
        if !self.loaded {
            self.refresh().await?;
        }
        Ok(&self.conversations)
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.conversations = self.store.list_conversations(&self.credential).await?;
        self.loaded = true;
        debug!(count = self.conversations.len(), "conversation list loaded");
        Ok(())
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Case-insensitive substring match on the title or on any participant
    /// display name. An empty term returns everything.
    pub fn filter_by_search(&self, term: &str) -> Vec<&Conversation> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.conversations.iter().collect();
        }
        self.conversations
            .iter()
            .filter(|conversation| {
                let title_hit = conversation
                    .title
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(&needle));
                let name_hit = conversation.participants.iter().any(|p| {
                    p.display_name()
                        .is_some_and(|name| name.to_lowercase().contains(&needle))
                });
                title_hit || name_hit
            })
            .collect()
    }

    /// Explicit title, else the display name of the first active participant
    /// other than the current user.
    pub fn display_title(&self, conversation: &Conversation) -> String {
        if let Some(title) = &conversation.title {
            return title.clone();
        }
        conversation
            .other_active_participants(&self.current_user)
            .next()
            .and_then(|p| p.display_name())
            .unwrap_or(UNKNOWN_USER)
            .to_string()
    }

    /// The other active participant's picture, if they have one.
    pub fn display_avatar<'a>(&self, conversation: &'a Conversation) -> Option<&'a str> {
        conversation
            .other_active_participants(&self.current_user)
            .next()
            .and_then(|p| p.profile.as_ref())
            .and_then(|profile| profile.avatar_url.as_deref())
    }

    /// Server-supplied; the client never computes unread math itself.
    pub fn unread_count(&self, conversation: &Conversation) -> u32 {
        conversation.unread_count
    }

    pub fn is_other_party_online(&self, conversation: &Conversation) -> bool {
        conversation
            .other_active_participants(&self.current_user)
            .any(|p| p.profile.as_ref().is_some_and(|profile| profile.is_online))
    }

    /// Apply live events to the cached projection: presence flips and
    /// last-message summaries. Everything else belongs to open sessions.
    pub fn handle_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::PresenceUpdate { user_id, is_online } => {
                for conversation in &mut self.conversations {
                    for participant in &mut conversation.participants {
                        if &participant.user_id == user_id {
                            participant
                                .profile
                                .get_or_insert_with(Default::default)
                                .is_online = *is_online;
                        }
                    }
                }
            }
            ServerEvent::MessageReceived {
                conversation_id,
                message,
            } => {
                if let Some(conversation) = self
                    .conversations
                    .iter_mut()
                    .find(|c| &c.id == conversation_id)
                {
                    conversation.record_last_message(
                        message.content.clone(),
                        message.sender_id.clone(),
                        message.created_at,
                    );
                }
            }
            ServerEvent::UserTyping { .. } | ServerEvent::UserStoppedTyping { .. } => {}
        }
    }
}
