//! Ordered, deduplicating message timeline
//!
//! A map keyed by message id with a derived sorted view. History fetches,
//! send confirmations, and push deliveries all merge through `insert`, which
//! is idempotent by id — the property that makes the triple insertion path
//! safe under any completion interleaving.

use chrono::{DateTime, Utc};
use skillswap_core::MessageId;
use skillswap_im_sdk::Message;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Timeline {
    messages: HashMap<MessageId, Message>,
    // ascending by created_at; equal timestamps keep insertion order
    order: Vec<SortKey>,
}

#[derive(Debug)]
struct SortKey {
    created_at: DateTime<Utc>,
    id: MessageId,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.contains_key(id)
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.get(id)
    }

    /// Idempotent insert: returns false (and changes nothing) when a message
    /// with this id is already present.
    pub fn insert(&mut self, message: Message) -> bool {
        if self.messages.contains_key(&message.id) {
            return false;
        }
        let at = self
            .order
            .partition_point(|key| key.created_at <= message.created_at);
        self.order.insert(
            at,
            SortKey {
                created_at: message.created_at,
                id: message.id.clone(),
            },
        );
        self.messages.insert(message.id.clone(), message);
        true
    }

    /// Swap a confirmed edit into place. `created_at` is immutable, so the
    /// sorted position does not move.
    pub fn replace(&mut self, message: Message) -> bool {
        match self.messages.get_mut(&message.id) {
            Some(slot) => {
                *slot = message;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let removed = self.messages.remove(id)?;
        self.order.retain(|key| &key.id != id);
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.order.clear();
    }

    /// Messages in ascending `created_at` order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.order.iter().map(|key| &self.messages[&key.id])
    }

    pub fn oldest(&self) -> Option<&Message> {
        self.order.first().map(|key| &self.messages[&key.id])
    }

    pub fn newest(&self) -> Option<&Message> {
        self.order.last().map(|key| &self.messages[&key.id])
    }
}
