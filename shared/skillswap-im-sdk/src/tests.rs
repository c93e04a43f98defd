//! Tests for skillswap-im-sdk

#[cfg(test)]
mod tests {
    mod message_tests {
        use crate::message::{Attachment, Message, MessageKind, MimeCategory};
        use skillswap_core::{ConversationId, UserId};

        #[test]
        fn test_create_text_message() {
            let conv_id = ConversationId::generate();
            let sender_id = UserId::new("user-1");
            let message =
                Message::new_text(conv_id.clone(), sender_id.clone(), "Hello!".to_string(), None);

            assert_eq!(message.conversation_id, conv_id);
            assert_eq!(message.sender_id, sender_id);
            assert_eq!(message.kind, MessageKind::Text);
            assert!(!message.is_edited());
            assert!(message.payload_consistent());
        }

        #[test]
        fn test_mime_classification() {
            assert_eq!(MimeCategory::from_mime("image/png"), MimeCategory::Image);
            assert_eq!(MimeCategory::from_mime("IMAGE/JPEG"), MimeCategory::Image);
            assert_eq!(MimeCategory::from_mime("video/mp4"), MimeCategory::Video);
            assert_eq!(MimeCategory::from_mime("audio/ogg"), MimeCategory::Audio);
            assert_eq!(MimeCategory::from_mime("application/pdf"), MimeCategory::File);
            assert_eq!(MimeCategory::from_mime("text/csv"), MimeCategory::File);
        }

        #[test]
        fn test_attachment_message_kind_follows_mime() {
            let attachment = Attachment {
                url: "https://files.skillswap.com/a1.png".to_string(),
                name: "a1.png".to_string(),
                mime_category: MimeCategory::from_mime("image/png"),
            };
            let message = Message::new_attachment(
                ConversationId::generate(),
                UserId::new("user-1"),
                attachment,
                String::new(),
            );

            assert_eq!(message.kind, MessageKind::Image);
            assert!(message.payload_consistent());
        }

        #[test]
        fn test_payload_consistency_rejects_mixed_payloads() {
            let mut message = Message::new_meeting(
                ConversationId::generate(),
                UserId::new("user-1"),
                "Video call".to_string(),
                "https://meet.skillswap.com/abc-de12-xyz".to_string(),
            );
            assert!(message.payload_consistent());

            // A meeting message must not also carry an attachment
            message.attachment = Some(Attachment {
                url: "https://files.skillswap.com/x".to_string(),
                name: "x".to_string(),
                mime_category: MimeCategory::File,
            });
            assert!(!message.payload_consistent());

            // A text message must carry neither payload
            let mut text =
                Message::new_text(ConversationId::generate(), UserId::new("u"), "hi".into(), None);
            text.meeting = message.meeting.clone();
            assert!(!text.payload_consistent());
        }
    }

    mod conversation_tests {
        use crate::conversation::{Conversation, ConversationKind, Participant, ParticipantProfile};
        use chrono::Utc;
        use skillswap_core::UserId;

        #[test]
        fn test_create_direct_conversation() {
            let user1 = UserId::new("user-1");
            let user2 = UserId::new("user-2");
            let conv = Conversation::new_direct(user1.clone(), user2.clone());

            assert_eq!(conv.kind, ConversationKind::Direct);
            assert_eq!(conv.participants.len(), 2);
            assert!(conv.title.is_none());
            assert!(conv.is_participant(&user1));
            assert!(conv.is_participant(&user2));
        }

        #[test]
        fn test_other_active_participants_skips_inactive_and_self() {
            let me = UserId::new("me");
            let mut conv = Conversation::new_group(
                "Guitar lessons".to_string(),
                vec![me.clone(), UserId::new("left"), UserId::new("other")],
            );
            conv.participants[1].is_active = false;

            let others: Vec<_> = conv
                .other_active_participants(&me)
                .map(|p| p.user_id.clone())
                .collect();
            assert_eq!(others, vec![UserId::new("other")]);
        }

        #[test]
        fn test_record_last_message() {
            let mut conv =
                Conversation::new_direct(UserId::new("user-1"), UserId::new("user-2"));
            assert!(conv.last_message.is_none());

            let now = Utc::now();
            conv.record_last_message("see you at 5".to_string(), UserId::new("user-2"), now);

            let last = conv.last_message.expect("summary recorded");
            assert_eq!(last.content, "see you at 5");
            assert_eq!(last.sender_id, UserId::new("user-2"));
            assert_eq!(last.timestamp, now);
        }

        #[test]
        fn test_participant_display_name() {
            let p = Participant::with_profile(
                UserId::new("user-1"),
                ParticipantProfile {
                    display_name: "Ada".to_string(),
                    avatar_url: None,
                    is_online: true,
                },
            );
            assert_eq!(p.display_name(), Some("Ada"));
            assert!(Participant::new(UserId::new("user-2")).display_name().is_none());
        }
    }

    mod typing_tests {
        use crate::presence::TypingIndicator;
        use chrono::{Duration, Utc};
        use skillswap_core::{ConversationId, UserId};

        #[test]
        fn test_fresh_indicator_not_expired() {
            let indicator =
                TypingIndicator::new(ConversationId::generate(), UserId::new("user-1"));
            assert!(!indicator.is_expired());
        }

        #[test]
        fn test_stale_indicator_expires_and_refresh_revives() {
            let mut indicator =
                TypingIndicator::new(ConversationId::generate(), UserId::new("user-1"));
            indicator.started_at = Utc::now() - Duration::seconds(3);
            assert!(indicator.is_expired());

            indicator.refresh();
            assert!(!indicator.is_expired());
        }
    }

    mod event_tests {
        use crate::events::{ClientCommand, ServerEvent};
        use crate::message::Message;
        use skillswap_core::{ConversationId, UserId};

        #[test]
        fn test_server_event_round_trip() {
            let conv_id = ConversationId::generate();
            let message =
                Message::new_text(conv_id.clone(), UserId::new("user-1"), "hi".into(), None);
            let event = ServerEvent::MessageReceived {
                conversation_id: conv_id.clone(),
                message,
            };

            let raw = serde_json::to_string(&event).unwrap();
            assert!(raw.contains("\"type\":\"message_received\""));

            let decoded = ServerEvent::decode(&raw).unwrap();
            assert_eq!(decoded.conversation_id(), Some(&conv_id));
        }

        #[test]
        fn test_unknown_event_name_is_rejected() {
            let raw = r#"{"type":"wallet_credited","amount":3}"#;
            assert!(ServerEvent::decode(raw).is_err());
        }

        #[test]
        fn test_client_command_encoding() {
            let cmd = ClientCommand::TypingStart {
                conversation_id: ConversationId::new("c-1"),
                participants: vec![UserId::new("user-2")],
            };
            let raw = cmd.encode().unwrap();
            assert!(raw.contains("\"type\":\"typing_start\""));
            assert!(raw.contains("user-2"));

            let auth = ClientCommand::Authenticate {
                user_id: UserId::new("user-1"),
            };
            assert!(auth.encode().unwrap().contains("\"type\":\"authenticate\""));
        }
    }

    mod meeting_tests {
        use crate::meeting::{generate_meeting_code, generate_meeting_url, meeting_url};

        #[test]
        fn test_meeting_code_shape() {
            for _ in 0..50 {
                let code = generate_meeting_code();
                let fragments: Vec<&str> = code.split('-').collect();
                assert_eq!(fragments.len(), 3);
                assert_eq!(fragments[0].len(), 3);
                assert_eq!(fragments[1].len(), 4);
                assert_eq!(fragments[2].len(), 3);
                assert!(code
                    .chars()
                    .all(|c| c == '-' || c.is_ascii_lowercase() || c.is_ascii_digit()));
            }
        }

        #[test]
        fn test_meeting_url_template() {
            assert_eq!(
                meeting_url("abc-de12-xyz"),
                "https://meet.skillswap.com/abc-de12-xyz"
            );
            assert!(generate_meeting_url().starts_with("https://meet.skillswap.com/"));
        }
    }
}
