//! Outbound frame types.
//!
//! Frames sent from the client to the chat server. Exactly two exist:
//! the identity announcement sent immediately after the transport
//! opens, and ordinary chat messages.
//!
//! Encoding is pure and synchronous; no transport concerns live here.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// ClientFrame
// ============================================================================

/// A frame sent from the client to the server.
///
/// # Format
///
/// ```json
/// {"type": "username", "username": "alice"}
/// {"type": "message", "content": "hello"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Announce the chosen display name for this session.
    Username {
        /// The display name to claim.
        username: String,
    },

    /// Send one chat message.
    Message {
        /// The message body.
        content: String,
    },
}

impl ClientFrame {
    /// Creates an identity announcement frame.
    #[inline]
    #[must_use]
    pub fn username(name: impl Into<String>) -> Self {
        Self::Username {
            username: name.into(),
        }
    }

    /// Creates a chat message frame.
    #[inline]
    #[must_use]
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
        }
    }

    /// Serializes the frame to its wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization
    /// fails (not expected for these types).
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
