//! Async connection lifecycle driver.
//!
//! [`ChatClient`] spawns one event-loop task that exclusively owns the
//! [`Lifecycle`] machine, at most one [`Session`], at most one pending
//! connect attempt, and at most one reconnect timer. Every trigger is
//! processed to completion before the next is taken, so transitions
//! never interleave.
//!
//! # Event Loop
//!
//! The task selects over:
//!
//! - User intents from the command channel
//! - Session notifications (frames, close, failure)
//! - Completion of a pending connect attempt
//! - The reconnect timer
//!
//! Each trigger is fed to the machine; the returned effects are
//! executed; a fresh [`ChatSnapshot`] is published on a watch channel
//! for the presentation layer.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, watch};
use tokio::time::Sleep;
use tracing::{debug, warn};

use crate::client::machine::{Effect, Input, Lifecycle};
use crate::client::state::{ChatSnapshot, ConnectionStatus};
use crate::config::Endpoint;
use crate::error::Result;
use crate::transport::{Session, SessionEvent};

// ============================================================================
// Types
// ============================================================================

/// A connect attempt in flight.
type ConnectFuture = Pin<Box<dyn Future<Output = Result<Session>> + Send>>;

/// An armed reconnect timer.
type ReconnectTimer = Pin<Box<Sleep>>;

// ============================================================================
// Command
// ============================================================================

/// User intents forwarded to the event loop.
#[derive(Debug)]
enum Command {
    /// Submit a display name and connect.
    SubmitUsername(String),

    /// Send one chat message.
    SendMessage(String),

    /// Retry connecting after a failure.
    Retry,

    /// Tear down the client.
    Shutdown,
}

// ============================================================================
// ChatClient
// ============================================================================

/// Handle to a running chat client.
///
/// Cheap to clone; all clones talk to the same event-loop task.
/// Dropping the last handle closes the command channel, which the
/// event loop treats as shutdown.
pub struct ChatClient {
    /// Channel for sending intents to the event loop.
    command_tx: mpsc::UnboundedSender<Command>,

    /// Latest published state.
    snapshot_rx: watch::Receiver<ChatSnapshot>,
}

impl Clone for ChatClient {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            snapshot_rx: self.snapshot_rx.clone(),
        }
    }
}

impl ChatClient {
    /// Resolves the endpoint and spawns the event-loop task.
    ///
    /// The client starts `Disconnected`; nothing is dialed until
    /// [`submit_username`](Self::submit_username).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the endpoint
    /// cannot be resolved.
    pub fn spawn(endpoint: Endpoint) -> Result<Self> {
        let ws_url = endpoint.ws_url()?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ChatSnapshot::default());

        tokio::spawn(run_event_loop(ws_url, command_rx, snapshot_tx));

        Ok(Self {
            command_tx,
            snapshot_rx,
        })
    }

    /// Submits a display name and begins connecting.
    pub fn submit_username(&self, name: impl Into<String>) {
        let _ = self.command_tx.send(Command::SubmitUsername(name.into()));
    }

    /// Sends one chat message.
    ///
    /// Silent no-op while not connected; the presentation layer is
    /// expected to disable sending in that case.
    pub fn send_message(&self, body: impl Into<String>) {
        let _ = self.command_tx.send(Command::SendMessage(body.into()));
    }

    /// Retries connecting with the last held identity.
    pub fn retry(&self) {
        let _ = self.command_tx.send(Command::Retry);
    }

    /// Shuts the client down, closing any open session normally.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(Command::Shutdown);
    }

    /// Returns the latest published state.
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Returns the current connection status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.snapshot_rx.borrow().status
    }

    /// Subscribes to state updates.
    ///
    /// One snapshot is published after every processed trigger; a
    /// renderer can await changes and redraw.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshot_rx.clone()
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Event loop owning the machine and its resources.
async fn run_event_loop(
    ws_url: String,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    snapshot_tx: watch::Sender<ChatSnapshot>,
) {
    let mut machine = Lifecycle::new();
    let mut session: Option<Session> = None;
    let mut connect: Option<ConnectFuture> = None;
    let mut reconnect: Option<ReconnectTimer> = None;

    loop {
        let input = tokio::select! {
            command = command_rx.recv() => match command {
                Some(Command::SubmitUsername(name)) => Input::SubmitUsername(name),
                Some(Command::SendMessage(body)) => Input::SendMessage(body),
                Some(Command::Retry) => Input::Retry,
                Some(Command::Shutdown) | None => Input::Shutdown,
            },

            event = session_event(&mut session), if session.is_some() => match event {
                SessionEvent::Frame(text) => Input::FrameReceived(text),
                SessionEvent::Closed { code } => {
                    session = None;
                    Input::TransportClosed { code }
                }
                SessionEvent::Failed { reason } => {
                    session = None;
                    Input::TransportFailed { reason }
                }
            },

            result = connect_ready(&mut connect), if connect.is_some() => {
                connect = None;
                match result {
                    Ok(opened) => {
                        session = Some(opened);
                        Input::TransportOpened
                    }
                    Err(e) => Input::TransportFailed {
                        reason: e.to_string(),
                    },
                }
            },

            () = timer_elapsed(&mut reconnect), if reconnect.is_some() => {
                reconnect = None;
                Input::ReconnectElapsed
            },
        };

        let stopping = matches!(input, Input::Shutdown);
        let effects = machine.handle(input);

        for effect in effects {
            match effect {
                Effect::OpenTransport => {
                    let url = ws_url.clone();
                    connect = Some(Box::pin(async move { Session::connect(&url).await }));
                }

                Effect::SendFrame(text) => {
                    match session.as_mut() {
                        Some(open) => {
                            // Fire and forget: a failure here is followed by
                            // a close notification that drives the state change.
                            if let Err(e) = open.send_text(text).await {
                                warn!(error = %e, "Failed to send frame");
                            }
                        }
                        None => warn!("Dropping frame with no open session"),
                    }
                }

                Effect::CloseTransport => {
                    connect = None;
                    if let Some(mut open) = session.take() {
                        open.close().await;
                    }
                }

                Effect::ArmReconnect(delay) => {
                    reconnect = Some(Box::pin(tokio::time::sleep(delay)));
                }

                Effect::CancelReconnect => {
                    reconnect = None;
                }
            }
        }

        let _ = snapshot_tx.send(machine.snapshot());

        if stopping {
            break;
        }
    }

    debug!("Event loop terminated");
}

// ============================================================================
// Select Helpers
// ============================================================================

/// Awaits the next session event, or forever if no session exists.
async fn session_event(session: &mut Option<Session>) -> SessionEvent {
    match session.as_mut() {
        Some(open) => open.next_event().await,
        None => std::future::pending().await,
    }
}

/// Awaits the pending connect attempt, or forever if none is in flight.
async fn connect_ready(connect: &mut Option<ConnectFuture>) -> Result<Session> {
    match connect.as_mut() {
        Some(attempt) => attempt.await,
        None => std::future::pending().await,
    }
}

/// Awaits the reconnect timer, or forever if none is armed.
async fn timer_elapsed(reconnect: &mut Option<ReconnectTimer>) {
    match reconnect.as_mut() {
        Some(timer) => timer.as_mut().await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::DateTime;
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::{Duration, timeout};
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::tungstenite::Message;
    use tracing_subscriber::EnvFilter;

    use crate::protocol::{ClientFrame, ServerEvent, WireMessage};

    type ServerWs = WebSocketStream<TcpStream>;

    /// Installs the diagnostic subscriber; repeated calls are no-ops.
    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("wirechat=debug"))
            .with_target(false)
            .with_test_writer()
            .try_init();
    }

    /// Binds a listener on a random local port.
    async fn bind_server() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        (listener, format!("ws://127.0.0.1:{port}"))
    }

    /// Accepts one WebSocket connection.
    async fn accept_ws(listener: &TcpListener) -> ServerWs {
        let (stream, _addr) = listener.accept().await.expect("accept");
        tokio_tungstenite::accept_async(stream).await.expect("upgrade")
    }

    /// Reads the next text frame, skipping control frames.
    async fn next_text(ws: &mut ServerWs) -> String {
        loop {
            let message = ws.next().await.expect("stream open").expect("frame");
            if let Message::Text(text) = message {
                return text.to_string();
            }
        }
    }

    /// Sends one server event as a text frame.
    async fn send_event(ws: &mut ServerWs, event: &ServerEvent) {
        let text = serde_json::to_string(event).expect("encode");
        ws.send(Message::Text(text.into())).await.expect("send");
    }

    /// Waits until the published snapshot satisfies the predicate.
    async fn wait_for<F>(client: &ChatClient, mut predicate: F) -> ChatSnapshot
    where
        F: FnMut(&ChatSnapshot) -> bool,
    {
        let mut rx = client.subscribe();
        timeout(Duration::from_secs(10), async move {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                if predicate(&snapshot) {
                    return snapshot;
                }
                rx.changed().await.expect("event loop alive");
            }
        })
        .await
        .expect("condition met in time")
    }

    fn epoch() -> chrono::DateTime<chrono::Utc> {
        DateTime::UNIX_EPOCH
    }

    #[tokio::test]
    async fn test_join_flow_against_mock_server() {
        init_logging();
        let (listener, url) = bind_server().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;

            let announced = next_text(&mut ws).await;
            let frame: ClientFrame = serde_json::from_str(&announced).expect("client frame");
            assert_eq!(frame, ClientFrame::username("bob"));

            send_event(&mut ws, &ServerEvent::UsernameConfirmed {
                username: "bob".to_string(),
            })
            .await;
            send_event(&mut ws, &ServerEvent::ChatHistory { messages: vec![] }).await;
            send_event(&mut ws, &ServerEvent::NewMessage {
                message: WireMessage {
                    username: "carol".to_string(),
                    message: "hi".to_string(),
                    timestamp: epoch(),
                },
            })
            .await;

            // Hold the session open until the client closes.
            while ws.next().await.is_some() {}
        });

        let client =
            ChatClient::spawn(Endpoint::new().with_ws_url(url)).expect("spawn");
        client.submit_username("bob");

        let snapshot = wait_for(&client, |s| !s.messages.is_empty()).await;
        assert_eq!(snapshot.status, ConnectionStatus::Connected);
        assert_eq!(snapshot.username, "bob");
        assert_eq!(snapshot.messages[0].author(), Some("carol"));
        assert_eq!(snapshot.messages[0].body(), "hi");
        assert!(snapshot.error.is_none());

        client.shutdown();
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_outbound_message_round_trip() {
        init_logging();
        let (listener, url) = bind_server().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;

            let _announced = next_text(&mut ws).await;
            send_event(&mut ws, &ServerEvent::UsernameConfirmed {
                username: "bob".to_string(),
            })
            .await;

            // Reflect the client's message back, as the real server does.
            let sent = next_text(&mut ws).await;
            let frame: ClientFrame = serde_json::from_str(&sent).expect("client frame");
            let ClientFrame::Message { content } = frame else {
                panic!("expected message frame");
            };
            assert_eq!(content, "hello");

            send_event(&mut ws, &ServerEvent::NewMessage {
                message: WireMessage {
                    username: "bob".to_string(),
                    message: content,
                    timestamp: epoch(),
                },
            })
            .await;

            while ws.next().await.is_some() {}
        });

        let client =
            ChatClient::spawn(Endpoint::new().with_ws_url(url)).expect("spawn");
        client.submit_username("bob");
        wait_for(&client, |s| s.username == "bob").await;

        client.send_message("hello");
        let snapshot =
            wait_for(&client, |s| s.messages.iter().any(|m| m.body() == "hello")).await;
        assert_eq!(snapshot.messages[0].author(), Some("bob"));

        client.shutdown();
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_shutdown_sends_normal_close() {
        init_logging();
        let (listener, url) = bind_server().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _announced = next_text(&mut ws).await;
            send_event(&mut ws, &ServerEvent::UsernameConfirmed {
                username: "bob".to_string(),
            })
            .await;

            // Wait for the client's close frame and report its code.
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Close(frame) = message {
                    return frame.map(|f| u16::from(f.code));
                }
            }
            None
        });

        let client =
            ChatClient::spawn(Endpoint::new().with_ws_url(url)).expect("spawn");
        client.submit_username("bob");
        wait_for(&client, |s| s.username == "bob").await;

        client.shutdown();
        let close_code = server.await.expect("server task");
        assert_eq!(close_code, Some(1000));
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces_error() {
        init_logging();
        // Nothing listens on this port.
        let (listener, url) = bind_server().await;
        drop(listener);

        let client =
            ChatClient::spawn(Endpoint::new().with_ws_url(url)).expect("spawn");
        client.submit_username("bob");

        let snapshot = wait_for(&client, |s| s.error.is_some()).await;
        assert_eq!(snapshot.status, ConnectionStatus::Disconnected);

        client.shutdown();
    }

    #[tokio::test]
    async fn test_reconnects_after_abrupt_drop() {
        init_logging();
        let (listener, url) = bind_server().await;

        let server = tokio::spawn(async move {
            // First session: confirm, then vanish without a close handshake.
            let mut ws = accept_ws(&listener).await;
            let _announced = next_text(&mut ws).await;
            send_event(&mut ws, &ServerEvent::UsernameConfirmed {
                username: "bob".to_string(),
            })
            .await;
            drop(ws);

            // The client re-dials after its reconnect delay. Confirm
            // under a distinct name so the test can observe session two.
            let mut ws = accept_ws(&listener).await;
            let announced = next_text(&mut ws).await;
            let frame: ClientFrame = serde_json::from_str(&announced).expect("client frame");
            assert_eq!(frame, ClientFrame::username("bob"));

            send_event(&mut ws, &ServerEvent::UsernameConfirmed {
                username: "bob-2".to_string(),
            })
            .await;

            while ws.next().await.is_some() {}
        });

        let client =
            ChatClient::spawn(Endpoint::new().with_ws_url(url)).expect("spawn");
        client.submit_username("bob");

        wait_for(&client, |s| s.username == "bob").await;
        let snapshot = wait_for(&client, |s| s.username == "bob-2").await;
        assert_eq!(snapshot.status, ConnectionStatus::Connected);

        client.shutdown();
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_spawn_rejects_invalid_endpoint() {
        init_logging();
        let result = ChatClient::spawn(Endpoint::new().with_api_url("not a url"));
        assert!(result.is_err());
    }
}
