//! Chat session integration tests
//!
//! Exercise the session controller against the in-memory store and a
//! loopback live channel: pagination, the idempotent merge of the three
//! insertion paths, authorization, typing choreography, and attachments.

use chrono::{Duration as ChronoDuration, Utc};
use skillswap_chat::{ChatConfig, ChatSession, InMemoryMessageStore, LiveChannel, MessageStore};
use skillswap_core::{ConversationId, Credential, MessageId, SkillSwapError, UserId};
use skillswap_im_sdk::{ClientCommand, Conversation, Message, MessageKind, ServerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

const PAGE_SIZE: usize = 30;

struct Fixture {
    store: Arc<InMemoryMessageStore>,
    channel: LiveChannel,
    commands: UnboundedReceiver<ClientCommand>,
    conversation_id: ConversationId,
    me: UserId,
    peer: UserId,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryMessageStore::new());
    let me = UserId::new("me");
    let peer = UserId::new("peer");
    store.register_identity("token-me", me.clone());
    store.register_identity("token-peer", peer.clone());

    let conversation = Conversation::new_direct(me.clone(), peer.clone());
    let conversation_id = conversation.id.clone();
    store.insert_conversation(conversation);

    let (channel, commands) = LiveChannel::loopback();
    Fixture {
        store,
        channel,
        commands,
        conversation_id,
        me,
        peer,
    }
}

impl Fixture {
    fn config(&self) -> ChatConfig {
        ChatConfig {
            page_size: PAGE_SIZE,
            ..ChatConfig::default()
        }
    }

    /// Seed `count` peer messages with strictly ascending timestamps.
    fn seed_history(&self, count: usize) {
        let base = Utc::now() - ChronoDuration::hours(1);
        for i in 0..count {
            let mut message = Message::new_text(
                self.conversation_id.clone(),
                self.peer.clone(),
                format!("m-{}", i + 1),
                None,
            );
            message.created_at = base + ChronoDuration::seconds(i as i64);
            self.store.insert_message(message);
        }
    }

    async fn open(&self) -> ChatSession {
        ChatSession::open(
            self.store.clone(),
            self.store.clone(),
            self.channel.handle(),
            Credential::new("token-me"),
            self.me.clone(),
            self.conversation_id.clone(),
            &self.config(),
        )
        .await
        .expect("session opens")
    }

    fn push_of(&self, message: &Message) -> ServerEvent {
        ServerEvent::MessageReceived {
            conversation_id: self.conversation_id.clone(),
            message: message.clone(),
        }
    }
}

#[tokio::test]
async fn empty_conversation_opens_with_nothing_to_backfill() {
    let fx = fixture();
    let session = fx.open().await;

    assert_eq!(session.message_count(), 0);
    assert_eq!(session.cursor().page, 1);
    assert!(!session.cursor().has_more);
}

#[tokio::test]
async fn first_page_is_the_newest_window_and_backfill_completes_history() {
    let fx = fixture();
    fx.seed_history(45);
    let mut session = fx.open().await;

    // Newest 30, ascending.
    assert_eq!(session.message_count(), 30);
    assert!(session.cursor().has_more);
    let contents: Vec<&str> = session.messages().map(|m| m.content.as_str()).collect();
    assert_eq!(contents.first(), Some(&"m-16"));
    assert_eq!(contents.last(), Some(&"m-45"));

    let inserted = session.load_older().await.unwrap();
    assert_eq!(inserted, 15);
    assert_eq!(session.message_count(), 45);
    assert!(!session.cursor().has_more);
    assert_eq!(
        session.messages().next().map(|m| m.content.as_str()),
        Some("m-1")
    );

    // Exhausted history makes further calls no-ops.
    assert_eq!(session.load_older().await.unwrap(), 0);
    assert_eq!(session.cursor().page, 2);
}

#[tokio::test]
async fn timeline_stays_ascending_across_backfill_and_pushes() {
    let fx = fixture();
    fx.seed_history(35);
    let mut session = fx.open().await;

    // A push lands before the older page resolves.
    let mut live = Message::new_text(
        fx.conversation_id.clone(),
        fx.peer.clone(),
        "fresh".to_string(),
        None,
    );
    live.created_at = Utc::now();
    session.handle_event(&fx.push_of(&live));
    session.load_older().await.unwrap();

    assert_eq!(session.message_count(), 36);
    let stamps: Vec<_> = session.messages().map(|m| m.created_at).collect();
    assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn push_echo_of_own_send_is_absorbed_once() {
    let fx = fixture();
    let mut session = fx.open().await;

    let sent = session.send_text("hello").await.unwrap();
    assert_eq!(session.message_count(), 1);

    // The broadcast echoes the sender's own message back.
    session.handle_event(&fx.push_of(&sent));
    session.handle_event(&fx.push_of(&sent));

    assert_eq!(session.message_count(), 1);
    let only: Vec<&Message> = session.messages().collect();
    assert_eq!(only[0].content, "hello");
    assert_eq!(only[0].id, sent.id);
}

#[tokio::test]
async fn pushes_for_other_conversations_are_ignored() {
    let fx = fixture();
    let mut session = fx.open().await;

    let elsewhere = Message::new_text(
        ConversationId::new("other-conversation"),
        fx.peer.clone(),
        "wrong room".to_string(),
        None,
    );
    session.handle_event(&ServerEvent::MessageReceived {
        conversation_id: ConversationId::new("other-conversation"),
        message: elsewhere,
    });

    assert_eq!(session.message_count(), 0);
}

#[tokio::test]
async fn empty_content_is_rejected_before_any_network_call() {
    let fx = fixture();
    let mut session = fx.open().await;

    let err = session.send_text("   \n\t ").await.unwrap_err();
    assert!(matches!(err, SkillSwapError::Validation(_)));
    assert_eq!(session.message_count(), 0);

    // Nothing reached the store either.
    let stored = fx
        .store
        .list_messages(
            &Credential::new("token-me"),
            &fx.conversation_id,
            1,
            PAGE_SIZE,
        )
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn reply_threading_is_one_hop_and_clears_on_send() {
    let fx = fixture();
    fx.seed_history(1);
    let mut session = fx.open().await;

    let target = session.messages().next().unwrap().id.clone();
    session.begin_reply(&target).unwrap();
    assert_eq!(session.composer().pending_reply(), Some(&target));

    let sent = session.send_text("replying to you").await.unwrap();
    assert_eq!(sent.reply_to.as_ref(), Some(&target));
    assert!(session.composer().pending_reply().is_none());

    let missing = MessageId::new("never-existed");
    assert!(matches!(
        session.begin_reply(&missing),
        Err(SkillSwapError::NotFound(_))
    ));
}

#[tokio::test]
async fn non_sender_edit_and_delete_are_forbidden_and_change_nothing() {
    let fx = fixture();
    fx.seed_history(1);
    let mut session = fx.open().await;

    let theirs = session.messages().next().unwrap().id.clone();

    let err = session.edit_message(&theirs, "hijacked").await.unwrap_err();
    assert!(matches!(err, SkillSwapError::Forbidden(_)));
    assert_eq!(session.message(&theirs).unwrap().content, "m-1");
    assert!(!session.message(&theirs).unwrap().is_edited());

    let err = session.delete_message(&theirs).await.unwrap_err();
    assert!(matches!(err, SkillSwapError::Forbidden(_)));
    assert!(session.message(&theirs).is_some());

    assert!(matches!(
        session.begin_edit(&theirs),
        Err(SkillSwapError::Forbidden(_))
    ));
}

#[tokio::test]
async fn own_messages_can_be_edited_and_deleted_after_confirmation() {
    let fx = fixture();
    let mut session = fx.open().await;

    let sent = session.send_text("draft wording").await.unwrap();

    session.begin_edit(&sent.id).unwrap();
    assert_eq!(session.composer().draft(), "draft wording");

    session.edit_message(&sent.id, "final wording").await.unwrap();
    let edited = session.message(&sent.id).unwrap();
    assert_eq!(edited.content, "final wording");
    assert!(edited.is_edited());
    assert!(session.composer().pending_edit().is_none());

    session.delete_message(&sent.id).await.unwrap();
    assert!(session.message(&sent.id).is_none());
    assert_eq!(session.message_count(), 0);
}

#[tokio::test]
async fn editing_a_concurrently_deleted_message_drops_the_local_copy() {
    let fx = fixture();
    let mut session = fx.open().await;

    let sent = session.send_text("soon gone").await.unwrap();
    // Another device deletes it behind this session's back.
    fx.store
        .delete_message(&Credential::new("token-me"), &sent.id)
        .await
        .unwrap();

    let err = session.edit_message(&sent.id, "too late").await.unwrap_err();
    assert!(matches!(err, SkillSwapError::NotFound(_)));
    assert!(session.message(&sent.id).is_none());
}

#[tokio::test(start_paused = true)]
async fn three_rapid_keystrokes_emit_one_start_and_one_stop() {
    let fx = fixture();
    let mut session = fx.open().await;
    let mut commands = fx.commands;

    session.start_typing();
    tokio::time::advance(Duration::from_millis(500)).await;
    session.start_typing();
    tokio::time::advance(Duration::from_millis(500)).await;
    session.start_typing();

    let first = commands.try_recv().expect("start published");
    assert!(matches!(first, ClientCommand::TypingStart { .. }));
    assert!(commands.try_recv().is_err(), "no extra start signals");

    // The stop fires 2s after the *last* keystroke, not the first.
    tokio::time::sleep(Duration::from_millis(2100)).await;
    let second = commands.try_recv().expect("stop published");
    match second {
        ClientCommand::TypingStop { participants, .. } => {
            assert_eq!(participants, vec![fx.peer.clone()]);
        }
        other => panic!("expected typing_stop, got {other:?}"),
    }
    assert!(commands.try_recv().is_err(), "stop fires exactly once");
}

#[tokio::test(start_paused = true)]
async fn sending_flushes_the_typing_stop_immediately() {
    let fx = fixture();
    let mut session = fx.open().await;
    let mut commands = fx.commands;

    session.start_typing();
    let _ = commands.try_recv().expect("start published");

    session.send_text("done typing").await.unwrap();
    let flushed = commands.try_recv().expect("stop flushed on send");
    assert!(matches!(flushed, ClientCommand::TypingStop { .. }));
}

#[tokio::test]
async fn remote_typing_events_are_scoped_to_this_conversation() {
    let fx = fixture();
    let mut session = fx.open().await;

    session.handle_event(&ServerEvent::UserTyping {
        conversation_id: fx.conversation_id.clone(),
        user_id: fx.peer.clone(),
    });
    // Our own echo and other rooms never show up.
    session.handle_event(&ServerEvent::UserTyping {
        conversation_id: fx.conversation_id.clone(),
        user_id: fx.me.clone(),
    });
    session.handle_event(&ServerEvent::UserTyping {
        conversation_id: ConversationId::new("other-conversation"),
        user_id: UserId::new("stranger"),
    });

    assert_eq!(session.typing_users(), vec![fx.peer.clone()]);

    session.handle_event(&ServerEvent::UserStoppedTyping {
        conversation_id: fx.conversation_id.clone(),
        user_id: fx.peer.clone(),
    });
    assert!(session.typing_users().is_empty());
}

#[tokio::test]
async fn successful_upload_appends_an_attachment_message() {
    let fx = fixture();
    let mut session = fx.open().await;

    let message = session
        .upload_attachment(vec![0u8; 1024], "whiteboard.png", "image/png")
        .await
        .unwrap();

    assert_eq!(message.kind, MessageKind::Image);
    let attachment = message.attachment.as_ref().expect("attachment reference");
    assert_eq!(attachment.name, "whiteboard.png");
    assert!(!session.is_upload_in_flight());
    assert_eq!(session.message_count(), 1);
}

#[tokio::test]
async fn oversized_upload_fails_cleanly_and_clears_the_guard() {
    let fx = fixture();
    let store = Arc::new(InMemoryMessageStore::new().with_max_file_size(1024));
    store.register_identity("token-me", fx.me.clone());
    let conversation = Conversation::new_direct(fx.me.clone(), fx.peer.clone());
    let conversation_id = conversation.id.clone();
    store.insert_conversation(conversation);

    let mut session = ChatSession::open(
        store.clone(),
        store,
        fx.channel.handle(),
        Credential::new("token-me"),
        fx.me.clone(),
        conversation_id,
        &fx.config(),
    )
    .await
    .unwrap();

    let err = session
        .upload_attachment(vec![0u8; 2 * 1024 * 1024], "huge.jpg", "image/jpeg")
        .await
        .unwrap_err();

    assert!(matches!(err, SkillSwapError::PayloadTooLarge(_)));
    assert!(!session.is_upload_in_flight());
    assert_eq!(session.message_count(), 0);
}

#[tokio::test]
async fn the_store_enforces_credentials_and_sender_authorization() {
    let fx = fixture();
    fx.seed_history(1);

    let theirs = fx
        .store
        .list_messages(
            &Credential::new("token-me"),
            &fx.conversation_id,
            1,
            PAGE_SIZE,
        )
        .await
        .unwrap()
        .remove(0);

    let err = fx
        .store
        .edit_message(&Credential::new("token-me"), &theirs.id, "hijacked")
        .await
        .unwrap_err();
    assert!(matches!(err, SkillSwapError::Forbidden(_)));

    let err = fx
        .store
        .delete_message(&Credential::new("token-me"), &theirs.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SkillSwapError::Forbidden(_)));

    let err = fx
        .store
        .list_conversations(&Credential::new("expired-token"))
        .await
        .unwrap_err();
    assert!(matches!(err, SkillSwapError::Unauthorized(_)));
}

#[tokio::test]
async fn start_meeting_shares_a_generated_room_link() {
    let fx = fixture();
    let mut session = fx.open().await;

    let message = session.start_meeting("Guitar sync").await.unwrap();

    assert_eq!(message.kind, MessageKind::Meeting);
    assert_eq!(message.content, "Guitar sync");
    let info = message.meeting.as_ref().expect("meeting info");
    assert!(info.meeting_url.starts_with("https://meet.skillswap.com/"));
    let code = info.meeting_url.rsplit('/').next().unwrap();
    let fragments: Vec<&str> = code.split('-').collect();
    assert_eq!(
        fragments.iter().map(|f| f.len()).collect::<Vec<_>>(),
        vec![3, 4, 3]
    );
    assert_eq!(session.message_count(), 1);
}
