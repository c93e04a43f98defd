//! Live channel adapter
//!
//! One shared WebSocket subscription per signed-in identity. The adapter
//! authenticates on every (re)connect, decodes incoming frames into the
//! closed `ServerEvent` set, and fans them out over a broadcast channel.
//! Sessions publish commands through a clonable handle; they never touch the
//! socket directly.

use futures_util::{SinkExt, StreamExt};
use skillswap_core::UserId;
use skillswap_im_sdk::{ClientCommand, ServerEvent};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsFrame;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 256;

/// Connection lifecycle: Disconnected -> Connecting -> Connected, back to
/// Disconnected on drop or teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Clonable publish surface handed to chat sessions.
#[derive(Clone)]
pub struct LiveChannelHandle {
    outgoing: mpsc::UnboundedSender<ClientCommand>,
}

impl LiveChannelHandle {
    /// Fire-and-forget: a dropped command is logged, never an error. Typing
    /// signals are ephemeral and must not fail a caller.
    pub fn publish(&self, command: ClientCommand) {
        if self.outgoing.send(command).is_err() {
            warn!("live channel is gone; command dropped");
        }
    }
}

pub struct LiveChannel {
    events: broadcast::Sender<ServerEvent>,
    outgoing: mpsc::UnboundedSender<ClientCommand>,
    state: watch::Receiver<ChannelState>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl LiveChannel {
    /// Open the shared channel for a signed-in identity. The connection is
    /// maintained in the background: on transport failure the run loop keeps
    /// retrying with a fixed delay and re-authenticates after every connect.
    pub fn connect(ws_url: String, user_id: UserId, reconnect_delay: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(
            ws_url,
            user_id,
            outgoing_rx,
            events.clone(),
            state_tx,
            shutdown_rx,
            reconnect_delay,
        ));

        Self {
            events,
            outgoing,
            state: state_rx,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    /// Detached instance with no transport behind it. Published commands are
    /// delivered to the returned receiver; used for local development and
    /// tests.
    pub fn loopback() -> (Self, mpsc::UnboundedReceiver<ClientCommand>) {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (_, state_rx) = watch::channel(ChannelState::Connected);
        let (shutdown_tx, _) = watch::channel(false);

        (
            Self {
                events,
                outgoing,
                state: state_rx,
                shutdown: shutdown_tx,
                task: None,
            },
            outgoing_rx,
        )
    }

    pub fn handle(&self) -> LiveChannelHandle {
        LiveChannelHandle {
            outgoing: self.outgoing.clone(),
        }
    }

    /// Subscribe to the decoded event stream. Each subscriber filters by its
    /// own conversation id.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Inject an event into the fan-out as if the server had pushed it.
    /// Loopback-only affordance.
    pub fn inject(&self, event: ServerEvent) {
        let _ = self.events.send(event);
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Tear down on sign-out. The run loop stops reconnecting and the
    /// subscription ends.
    pub fn teardown(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run(
    ws_url: String,
    user_id: UserId,
    mut outgoing: mpsc::UnboundedReceiver<ClientCommand>,
    events: broadcast::Sender<ServerEvent>,
    state: watch::Sender<ChannelState>,
    mut shutdown: watch::Receiver<bool>,
    reconnect_delay: Duration,
) {
    loop {
        let _ = state.send(ChannelState::Connecting);
        match connect_async(ws_url.as_str()).await {
            Ok((mut socket, _)) => {
                info!(user_id = %user_id, "live channel connected");
                let _ = state.send(ChannelState::Connected);

                // Route events to this channel before anything else.
                let authenticate = ClientCommand::Authenticate {
                    user_id: user_id.clone(),
                };
                let authenticated = match authenticate.encode() {
                    Ok(json) => socket.send(WsFrame::Text(json)).await.is_ok(),
                    Err(_) => false,
                };

                // Commands queued while offline are stale typing signals;
                // drop them rather than replaying after a gap.
                while outgoing.try_recv().is_ok() {}

                if authenticated {
                    pump(&mut socket, &mut outgoing, &events, &mut shutdown).await;
                }
                let _ = socket.close(None).await;
            }
            Err(err) => {
                warn!(%err, "live channel connect failed");
            }
        }

        let _ = state.send(ChannelState::Disconnected);
        if *shutdown.borrow() {
            return;
        }
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
}

type WsSocket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn pump(
    socket: &mut WsSocket,
    outgoing: &mut mpsc::UnboundedReceiver<ClientCommand>,
    events: &broadcast::Sender<ServerEvent>,
    shutdown: &mut watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            command = outgoing.recv() => {
                let Some(command) = command else { return };
                match command.encode() {
                    Ok(json) => {
                        if socket.send(WsFrame::Text(json)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => warn!(%err, "unencodable command dropped"),
                }
            }
            frame = socket.next() => {
                match frame {
                    Some(Ok(WsFrame::Text(text))) => match ServerEvent::decode(&text) {
                        Ok(event) => {
                            debug!(?event, "live event received");
                            let _ = events.send(event);
                        }
                        Err(err) => warn!(%err, "unknown live event dropped"),
                    },
                    Some(Ok(WsFrame::Close(_))) | None => return,
                    Some(Ok(_)) => {} // ping/pong/binary frames carry no events
                    Some(Err(err)) => {
                        warn!(%err, "live channel transport error");
                        return;
                    }
                }
            }
        }
    }
}
