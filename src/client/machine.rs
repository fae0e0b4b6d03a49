//! Connection lifecycle state machine.
//!
//! [`Lifecycle`] is the pure core of the client. Every trigger (user
//! intent, transport notification, inbound frame, timer firing) is fed
//! in as an [`Input`], processed to completion, and answered with the
//! [`Effect`]s the caller must execute. The machine performs no
//! I/O and holds no timers itself, which keeps every transition
//! deterministic and unit-testable without sockets.
//!
//! # State Machine
//!
//! ```text
//!                  SubmitUsername / Retry / ReconnectElapsed
//!   ┌──────────────┐ ──────────────────────► ┌────────────┐
//!   │ Disconnected │                          │ Connecting │
//!   └──────────────┘ ◄────────────────────── └────────────┘
//!          ▲          TransportFailed/Closed        │
//!          │                                        │ TransportOpened
//!          │       TransportClosed/Failed           ▼
//!          └────────────────────────────── ┌────────────┐
//!                                          │ Connected  │
//!                                          └────────────┘
//! ```
//!
//! Entering `Disconnected` while a confirmed identity is held arms a
//! single-shot reconnect timer. At most one timer is ever outstanding:
//! [`Effect::ArmReconnect`] replaces any pending one, and leaving
//! `Disconnected` cancels it.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::client::state::{ChatMessage, ChatSnapshot, ConnectionStatus};
use crate::protocol::{ClientFrame, DecodeError, ServerEvent, WireMessage};

// ============================================================================
// Constants
// ============================================================================

/// Delay before an automatic reconnection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// WebSocket close code for a normal, intentional closure.
const NORMAL_CLOSE_CODE: u16 = 1000;

/// Error text for a failed connection attempt.
const CONNECT_FAILED_TEXT: &str =
    "Failed to connect to server. Please check your connection and try again.";

/// Error text for an abnormal closure of an established session.
const CONNECTION_LOST_TEXT: &str = "Connection lost. Reconnecting shortly.";

// ============================================================================
// Input
// ============================================================================

/// One trigger fed into the lifecycle machine.
#[derive(Debug, Clone)]
pub enum Input {
    /// User submitted a display name; begin a fresh session.
    SubmitUsername(String),

    /// User wants to send a chat message.
    SendMessage(String),

    /// User asked to retry after a failure.
    Retry,

    /// The transport session finished opening.
    TransportOpened,

    /// The transport session closed with the given close code.
    TransportClosed {
        /// WebSocket close code (1000 = normal).
        code: u16,
    },

    /// The transport failed before or during the session.
    TransportFailed {
        /// Failure description for diagnostics.
        reason: String,
    },

    /// One inbound text frame arrived.
    FrameReceived(String),

    /// The reconnect timer fired.
    ReconnectElapsed,

    /// The client is shutting down.
    Shutdown,
}

// ============================================================================
// Effect
// ============================================================================

/// An action the caller must execute after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a new transport session.
    OpenTransport,

    /// Transmit one encoded wire frame.
    SendFrame(String),

    /// Close the current session with the normal-closure code.
    CloseTransport,

    /// Arm the reconnect timer, replacing any pending one.
    ArmReconnect(Duration),

    /// Cancel the pending reconnect timer, if any.
    CancelReconnect,
}

// ============================================================================
// Lifecycle
// ============================================================================

/// The connection lifecycle machine.
///
/// Owns all session-derived state: status, identity, the visible
/// message log, and the last error. Presentation reads snapshots; only
/// inputs mutate.
#[derive(Debug, Default)]
pub struct Lifecycle {
    /// Presentation-facing derived state.
    view: ChatSnapshot,

    /// The display name to announce; the last submitted or confirmed name.
    identity: Option<String>,

    /// Whether the server has confirmed the identity this or any prior
    /// session. Gates automatic reconnection.
    joined: bool,
}

impl Lifecycle {
    /// Creates a machine in the `Disconnected` state.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current connection status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.view.status
    }

    /// Server-confirmed display name; empty until confirmed.
    #[inline]
    #[must_use]
    pub fn username(&self) -> &str {
        &self.view.username
    }

    /// The visible chat log.
    #[inline]
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.view.messages
    }

    /// Last failure text, if any.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.view.error.as_deref()
    }

    /// Clones the presentation-facing view.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        self.view.clone()
    }

    /// Processes one input and returns the effects to execute.
    ///
    /// Transitions are atomic: the returned effects reflect a fully
    /// applied state change.
    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::SubmitUsername(name) => self.submit_username(name),
            Input::SendMessage(body) => self.send_message(&body),
            Input::Retry => self.retry(),
            Input::TransportOpened => self.transport_opened(),
            Input::TransportClosed { code } => self.transport_closed(code),
            Input::TransportFailed { reason } => self.transport_failed(&reason),
            Input::FrameReceived(text) => self.frame_received(&text),
            Input::ReconnectElapsed => self.reconnect_elapsed(),
            Input::Shutdown => self.shutdown(),
        }
    }
}

// ============================================================================
// User Intents
// ============================================================================

impl Lifecycle {
    /// Begins a fresh session with a newly submitted name.
    fn submit_username(&mut self, name: String) -> Vec<Effect> {
        if self.view.status != ConnectionStatus::Disconnected {
            warn!(status = ?self.view.status, "Ignoring username submit outside Disconnected");
            return Vec::new();
        }

        self.identity = Some(name);
        self.joined = false;
        self.view.username.clear();
        self.begin_attempt()
    }

    /// Sends one chat message if the session is open; silent no-op otherwise.
    ///
    /// No local echo: the message appears in the log only once the
    /// server reflects it back.
    fn send_message(&mut self, body: &str) -> Vec<Effect> {
        if self.view.status != ConnectionStatus::Connected {
            trace!("Dropping send while not connected");
            return Vec::new();
        }

        self.encode_frame(&ClientFrame::message(body))
    }

    /// Retries connecting with the held identity.
    fn retry(&mut self) -> Vec<Effect> {
        if self.view.status != ConnectionStatus::Disconnected {
            return Vec::new();
        }
        if self.identity.is_none() {
            warn!("Ignoring retry with no identity held");
            return Vec::new();
        }

        self.begin_attempt()
    }

    /// Common entry into `Connecting`: clears error and log, opens transport.
    fn begin_attempt(&mut self) -> Vec<Effect> {
        self.view.status = ConnectionStatus::Connecting;
        self.view.error = None;
        self.view.messages.clear();

        debug!("Opening transport session");
        vec![Effect::CancelReconnect, Effect::OpenTransport]
    }
}

// ============================================================================
// Transport Notifications
// ============================================================================

impl Lifecycle {
    /// Transport finished opening; announce the identity.
    fn transport_opened(&mut self) -> Vec<Effect> {
        if self.view.status != ConnectionStatus::Connecting {
            warn!(status = ?self.view.status, "Ignoring transport open outside Connecting");
            return Vec::new();
        }

        self.view.status = ConnectionStatus::Connected;

        match self.identity.clone() {
            Some(name) => self.encode_frame(&ClientFrame::username(name)),
            None => {
                warn!("Transport opened with no identity to announce");
                Vec::new()
            }
        }
    }

    /// Transport closed; classify by close code and prior state.
    fn transport_closed(&mut self, code: u16) -> Vec<Effect> {
        match self.view.status {
            ConnectionStatus::Disconnected => {
                debug!(code, "Ignoring close for discarded session");
                Vec::new()
            }
            ConnectionStatus::Connecting => {
                debug!(code, "Transport closed during connect");
                self.view.error = Some(CONNECT_FAILED_TEXT.to_string());
                self.enter_disconnected()
            }
            ConnectionStatus::Connected => {
                debug!(code, "Transport closed");
                if code != NORMAL_CLOSE_CODE {
                    self.view.error = Some(CONNECTION_LOST_TEXT.to_string());
                }
                self.enter_disconnected()
            }
        }
    }

    /// Transport failed outright (connect refused, protocol error).
    fn transport_failed(&mut self, reason: &str) -> Vec<Effect> {
        if self.view.status == ConnectionStatus::Disconnected {
            debug!(reason, "Ignoring failure for discarded session");
            return Vec::new();
        }

        warn!(reason, "Transport failed");
        self.view.error = Some(CONNECT_FAILED_TEXT.to_string());
        self.enter_disconnected()
    }

    /// Enters `Disconnected`, arming reconnection if the user had joined.
    fn enter_disconnected(&mut self) -> Vec<Effect> {
        self.view.status = ConnectionStatus::Disconnected;

        if self.joined && self.identity.is_some() {
            debug!(delay_ms = RECONNECT_DELAY.as_millis() as u64, "Arming reconnect timer");
            vec![Effect::ArmReconnect(RECONNECT_DELAY)]
        } else {
            Vec::new()
        }
    }

    /// Reconnect timer fired; reconnect only if still relevant.
    fn reconnect_elapsed(&mut self) -> Vec<Effect> {
        if self.view.status != ConnectionStatus::Disconnected || self.identity.is_none() {
            debug!("Ignoring stale reconnect timer");
            return Vec::new();
        }

        debug!("Attempting to reconnect");
        self.begin_attempt()
    }
}

// ============================================================================
// Inbound Frames
// ============================================================================

impl Lifecycle {
    /// Decodes and applies one inbound frame.
    ///
    /// Codec failures are logged and otherwise ignored; they never
    /// change state, set error text, or close the session.
    fn frame_received(&mut self, text: &str) -> Vec<Effect> {
        if self.view.status != ConnectionStatus::Connected {
            debug!("Ignoring frame outside Connected");
            return Vec::new();
        }

        match ServerEvent::decode(text) {
            Ok(event) => self.apply_event(event),
            Err(DecodeError::Malformed { reason }) => {
                warn!(reason, "Dropping malformed frame");
            }
            Err(DecodeError::UnknownType { tag }) => {
                warn!(tag, "Dropping frame with unknown type");
            }
        }

        Vec::new()
    }

    /// Applies one decoded server event to the derived state.
    fn apply_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::UsernameConfirmed { username } => {
                debug!(username, "Identity confirmed");
                self.identity = Some(username.clone());
                self.view.username = username;
                self.joined = true;
            }

            ServerEvent::ChatHistory { messages } => {
                // Wholesale replacement, idempotent if repeated.
                self.view.messages = messages.into_iter().map(ChatMessage::from).collect();
            }

            ServerEvent::NewMessage { message } => {
                self.view.messages.push(ChatMessage::from(message));
            }

            ServerEvent::UserJoined {
                username,
                timestamp,
            } => {
                self.view.messages.push(ChatMessage::Notice {
                    body: format!("{username} joined the chat"),
                    occurred_at: timestamp,
                });
            }

            ServerEvent::UserLeft {
                username,
                timestamp,
            } => {
                self.view.messages.push(ChatMessage::Notice {
                    body: format!("{username} left the chat"),
                    occurred_at: timestamp,
                });
            }

            ServerEvent::Error { message } => {
                warn!(message, "Server reported error");
                self.view.error = Some(message);
            }
        }
    }
}

// ============================================================================
// Teardown
// ============================================================================

impl Lifecycle {
    /// Tears down: cancels the timer, closes any open session.
    fn shutdown(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::CancelReconnect];

        if self.view.status.has_session() {
            effects.push(Effect::CloseTransport);
        }

        self.view.status = ConnectionStatus::Disconnected;
        effects
    }

    /// Encodes one outbound frame, logging instead of failing.
    fn encode_frame(&self, frame: &ClientFrame) -> Vec<Effect> {
        match frame.encode() {
            Ok(text) => {
                trace!(frame = ?frame, "Encoded outbound frame");
                vec![Effect::SendFrame(text)]
            }
            Err(e) => {
                warn!(error = %e, "Failed to encode outbound frame");
                Vec::new()
            }
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<WireMessage> for ChatMessage {
    fn from(wire: WireMessage) -> Self {
        Self::User {
            author: wire.username,
            body: wire.message,
            sent_at: wire.timestamp,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
