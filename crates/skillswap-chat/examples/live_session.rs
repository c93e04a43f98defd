//! Open a live chat session against a running SkillSwap backend.
//!
//! ```text
//! CHAT_API_BASE_URL=http://localhost:8080 \
//! CHAT_WS_URL=ws://localhost:8081/chat/v1/ws \
//! cargo run --example live_session -- <bearer-token> <user-id> <conversation-id>
//! ```

use skillswap_chat::{ChatConfig, ChatSession, HttpMessageStore, LiveChannel};
use skillswap_core::{ConversationId, Credential, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skillswap_chat=debug".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let token = args.next().expect("usage: live_session <token> <user-id> <conversation-id>");
    let user_id = UserId::new(args.next().expect("missing user id"));
    let conversation_id = ConversationId::new(args.next().expect("missing conversation id"));

    let config = ChatConfig::from_env()?;
    let credential = Credential::new(token);
    let store = Arc::new(HttpMessageStore::from_config(&config));
    let channel = LiveChannel::connect(
        config.ws_url.clone(),
        user_id.clone(),
        Duration::from_millis(config.reconnect_delay_ms),
    );

    let mut events = channel.subscribe();
    let mut session = ChatSession::open(
        store.clone(),
        store,
        channel.handle(),
        credential,
        user_id,
        conversation_id,
        &config,
    )
    .await?;

    info!(
        messages = session.message_count(),
        has_more = session.cursor().has_more,
        "session ready; streaming live events (ctrl-c to quit)"
    );
    for message in session.messages() {
        println!("[{}] {}: {}", message.created_at, message.sender_id, message.content);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                if let Ok(event) = event {
                    session.handle_event(&event);
                    if let Some(message) = session.messages().last() {
                        println!("[{}] {}: {}", message.created_at, message.sender_id, message.content);
                    }
                }
            }
        }
    }

    Ok(())
}
