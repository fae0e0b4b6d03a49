//! Presentation-facing state types.
//!
//! These are the derived values the lifecycle machine owns and the
//! presentation layer reads. Presentation never mutates them; it
//! receives fresh [`ChatSnapshot`] values and renders.

// ============================================================================
// Imports
// ============================================================================

use chrono::{DateTime, Utc};

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Connection state of the chat session.
///
/// Exactly one value at any time, owned by the lifecycle machine.
/// Moving from [`Disconnected`](Self::Disconnected) to
/// [`Connected`](Self::Connected) always passes through
/// [`Connecting`](Self::Connecting).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No transport session exists.
    #[default]
    Disconnected,

    /// A transport session is being opened.
    Connecting,

    /// The transport session is open and ready.
    Connected,
}

impl ConnectionStatus {
    /// Returns `true` if a transport session exists.
    #[inline]
    #[must_use]
    pub const fn has_session(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

// ============================================================================
// ChatMessage
// ============================================================================

/// One entry in the visible chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage {
    /// A message authored by a user.
    User {
        /// Author's display name.
        author: String,
        /// Message body.
        body: String,
        /// When the server recorded the message.
        sent_at: DateTime<Utc>,
    },

    /// A non-authored notice describing a join/leave event.
    Notice {
        /// Notice text.
        body: String,
        /// When the event occurred.
        occurred_at: DateTime<Utc>,
    },
}

impl ChatMessage {
    /// Returns the message body text.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::User { body, .. } | Self::Notice { body, .. } => body,
        }
    }

    /// Returns the author's name, or `None` for notices.
    #[inline]
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        match self {
            Self::User { author, .. } => Some(author),
            Self::Notice { .. } => None,
        }
    }
}

// ============================================================================
// ChatSnapshot
// ============================================================================

/// Read-only view of the session state for the presentation layer.
///
/// Published after every processed input, so a renderer can diff or
/// redraw wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    /// Current connection status.
    pub status: ConnectionStatus,

    /// Server-confirmed display name; empty until confirmed.
    pub username: String,

    /// The visible chat log, in server order.
    pub messages: Vec<ChatMessage>,

    /// Last failure text, if any.
    pub error: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_disconnected() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_has_session() {
        assert!(!ConnectionStatus::Disconnected.has_session());
        assert!(ConnectionStatus::Connecting.has_session());
        assert!(ConnectionStatus::Connected.has_session());
    }

    #[test]
    fn test_message_accessors() {
        let user = ChatMessage::User {
            author: "alice".to_string(),
            body: "hi".to_string(),
            sent_at: DateTime::UNIX_EPOCH,
        };
        assert_eq!(user.body(), "hi");
        assert_eq!(user.author(), Some("alice"));

        let notice = ChatMessage::Notice {
            body: "bob joined the chat".to_string(),
            occurred_at: DateTime::UNIX_EPOCH,
        };
        assert_eq!(notice.body(), "bob joined the chat");
        assert_eq!(notice.author(), None);
    }
}
