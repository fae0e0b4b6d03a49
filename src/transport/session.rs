//! WebSocket session wrapper.
//!
//! One [`Session`] is one logical bidirectional connection to the chat
//! server. The lifecycle manager owns at most one at a time and is
//! solely responsible for opening and closing it.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Close code reported when a close frame carries no status.
const NO_STATUS_CLOSE_CODE: u16 = 1005;

// ============================================================================
// SessionEvent
// ============================================================================

/// One notification from the transport session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One inbound text frame.
    Frame(String),

    /// The session closed.
    Closed {
        /// WebSocket close code (1000 = normal).
        code: u16,
    },

    /// The session failed with a transport error.
    Failed {
        /// Failure description.
        reason: String,
    },
}

// ============================================================================
// Session
// ============================================================================

/// An open WebSocket session to the chat server.
#[derive(Debug)]
pub struct Session {
    /// The underlying WebSocket stream.
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Session {
    /// Opens a session to the given WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`](crate::Error::WebSocket) if the
    /// handshake fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        debug!(url, "WebSocket session established");

        Ok(Self { ws })
    }

    /// Transmits one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`](crate::Error::WebSocket) if the
    /// send fails; a close notification follows via [`next_event`](Self::next_event).
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        trace!(len = text.len(), "Sending frame");
        self.ws.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Closes the session with the normal-closure code.
    pub async fn close(&mut self) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };

        if let Err(e) = self.ws.close(Some(frame)).await {
            debug!(error = %e, "Close handshake incomplete");
        }
    }

    /// Waits for the next session notification.
    ///
    /// Binary, ping, and pong frames are skipped; exactly one terminal
    /// event ([`SessionEvent::Closed`] or [`SessionEvent::Failed`]) is
    /// produced per session.
    pub async fn next_event(&mut self) -> SessionEvent {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return SessionEvent::Frame(text.to_string());
                }

                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map_or(NO_STATUS_CLOSE_CODE, |f| u16::from(f.code));
                    debug!(code, "WebSocket closed by remote");
                    return SessionEvent::Closed { code };
                }

                // Binary, Ping, Pong
                Some(Ok(_)) => {}

                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    return SessionEvent::Failed {
                        reason: e.to_string(),
                    };
                }

                None => {
                    debug!("WebSocket stream ended");
                    return SessionEvent::Closed {
                        code: ABNORMAL_CLOSE_CODE,
                    };
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
