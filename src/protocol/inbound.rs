//! Inbound frame types and decoding.
//!
//! Frames sent from the chat server to the client. Decoding is pure
//! and synchronous: one text frame in, one typed [`ServerEvent`] or a
//! [`DecodeError`] out.
//!
//! Decode failures are split in two so callers can log them
//! distinctly, but both are non-fatal by design: a frame that is not
//! valid JSON (or is missing fields) is [`DecodeError::Malformed`],
//! while a structurally valid frame with a type tag this client does
//! not know is [`DecodeError::UnknownType`]. Neither may tear down the
//! connection or surface as user-visible error state.
//!
//! # Timestamps
//!
//! Servers serialize timestamps either as RFC 3339 strings or as epoch
//! milliseconds. The codec accepts both and converts to
//! [`DateTime<Utc>`]; outbound serialization (used by test fixtures)
//! emits RFC 3339 with millisecond precision.

// ============================================================================
// Imports
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// DecodeError
// ============================================================================

/// Failure to decode one inbound frame.
///
/// Both variants are recovered silently by the lifecycle manager; they
/// exist so the diagnostic log line can say which path was taken.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The frame is not valid JSON, or a known type is missing fields.
    #[error("Malformed frame: {reason}")]
    Malformed {
        /// What the parser objected to.
        reason: String,
    },

    /// The frame parsed but carries an unrecognized type tag.
    #[error("Unknown frame type: {tag}")]
    UnknownType {
        /// The unrecognized type tag.
        tag: String,
    },
}

impl DecodeError {
    /// Creates a malformed-frame error.
    #[inline]
    fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

// ============================================================================
// WireMessage
// ============================================================================

/// One chat message as the server transmits it.
///
/// Used both inside `chat_history` payloads and as the body of
/// `new_message` frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Author's display name.
    pub username: String,

    /// Message body.
    pub message: String,

    /// When the server recorded the message.
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// ServerEvent
// ============================================================================

/// A typed event decoded from one inbound frame.
///
/// # Format
///
/// ```json
/// {"type": "username_confirmed", "username": "alice"}
/// {"type": "chat_history", "messages": [{"username": "...", "message": "...", "timestamp": "..."}]}
/// {"type": "new_message", "message": {"username": "...", "message": "...", "timestamp": "..."}}
/// {"type": "user_joined", "username": "bob", "timestamp": "..."}
/// {"type": "user_left", "username": "bob", "timestamp": "..."}
/// {"type": "error", "message": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The server accepted (and possibly normalized) the display name.
    UsernameConfirmed {
        /// The confirmed display name.
        username: String,
    },

    /// Bulk history snapshot, sent once after identity confirmation.
    ChatHistory {
        /// Messages in server order.
        messages: Vec<WireMessage>,
    },

    /// One new chat message, including the client's own reflected back.
    NewMessage {
        /// The message.
        message: WireMessage,
    },

    /// A peer joined the chat.
    UserJoined {
        /// The peer's display name.
        username: String,
        /// When the join occurred.
        #[serde(with = "timestamp")]
        timestamp: DateTime<Utc>,
    },

    /// A peer left the chat.
    UserLeft {
        /// The peer's display name.
        username: String,
        /// When the leave occurred.
        #[serde(with = "timestamp")]
        timestamp: DateTime<Utc>,
    },

    /// Application-level error pushed by the server.
    ///
    /// Soft failure: the connection stays open.
    Error {
        /// Human-readable error text.
        message: String,
    },
}

/// Type tags this client understands.
const KNOWN_TYPES: [&str; 6] = [
    "username_confirmed",
    "chat_history",
    "new_message",
    "user_joined",
    "user_left",
    "error",
];

impl ServerEvent {
    /// Decodes one inbound text frame.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Malformed`] if the frame is not a JSON object
    ///   with a string `type` field, or a known type fails validation
    /// - [`DecodeError::UnknownType`] if the type tag is unrecognized
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::malformed(e.to_string()))?;

        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::malformed("missing type field"))?;

        if !KNOWN_TYPES.contains(&tag) {
            return Err(DecodeError::UnknownType {
                tag: tag.to_string(),
            });
        }

        serde_json::from_value(value).map_err(|e| DecodeError::malformed(e.to_string()))
    }
}

// ============================================================================
// Timestamp Codec
// ============================================================================

/// Serde adapter accepting RFC 3339 strings or epoch milliseconds.
pub(crate) mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TimestampVisitor)
    }

    struct TimestampVisitor;

    impl Visitor<'_> for TimestampVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("an RFC 3339 timestamp string or epoch milliseconds")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            DateTime::parse_from_rfc3339(v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| E::custom(format!("invalid timestamp {v}: {e}")))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            DateTime::from_timestamp_millis(v)
                .ok_or_else(|| E::custom(format!("epoch millis out of range: {v}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            i64::try_from(v)
                .map_err(|_| E::custom(format!("epoch millis out of range: {v}")))
                .and_then(|millis| self.visit_i64(millis))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() {
                return Err(E::custom(format!("epoch millis not finite: {v}")));
            }
            self.visit_i64(v as i64)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn test_decode_username_confirmed() {
        let event = ServerEvent::decode(r#"{"type":"username_confirmed","username":"alice"}"#)
            .expect("decode");

        assert_eq!(
            event,
            ServerEvent::UsernameConfirmed {
                username: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_decode_chat_history() {
        let frame = r#"{
            "type": "chat_history",
            "messages": [
                {"username": "alice", "message": "hi", "timestamp": "2024-03-01T12:00:00.000Z"},
                {"username": "bob", "message": "hey", "timestamp": 1709294460000}
            ]
        }"#;

        let event = ServerEvent::decode(frame).expect("decode");
        let ServerEvent::ChatHistory { messages } = event else {
            panic!("expected chat_history");
        };

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].username, "alice");
        assert_eq!(
            messages[0].timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(
            messages[1].timestamp,
            DateTime::from_timestamp_millis(1_709_294_460_000).unwrap()
        );
    }

    #[test]
    fn test_decode_new_message() {
        let frame = r#"{
            "type": "new_message",
            "message": {"username": "carol", "message": "hi", "timestamp": "2024-03-01T12:00:00Z"}
        }"#;

        let event = ServerEvent::decode(frame).expect("decode");
        let ServerEvent::NewMessage { message } = event else {
            panic!("expected new_message");
        };

        assert_eq!(message.username, "carol");
        assert_eq!(message.message, "hi");
    }

    #[test]
    fn test_decode_user_joined_and_left() {
        let joined =
            ServerEvent::decode(r#"{"type":"user_joined","username":"bob","timestamp":1000}"#)
                .expect("decode");
        assert!(matches!(joined, ServerEvent::UserJoined { ref username, .. } if username == "bob"));

        let left =
            ServerEvent::decode(r#"{"type":"user_left","username":"bob","timestamp":1000}"#)
                .expect("decode");
        assert!(matches!(left, ServerEvent::UserLeft { ref username, .. } if username == "bob"));
    }

    #[test]
    fn test_decode_server_error() {
        let event =
            ServerEvent::decode(r#"{"type":"error","message":"username taken"}"#).expect("decode");

        assert_eq!(
            event,
            ServerEvent::Error {
                message: "username taken".to_string()
            }
        );
    }

    #[test]
    fn test_decode_invalid_json_is_malformed() {
        let err = ServerEvent::decode("{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_decode_missing_type_is_malformed() {
        let err = ServerEvent::decode(r#"{"username":"alice"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_decode_missing_fields_is_malformed() {
        let err = ServerEvent::decode(r#"{"type":"new_message"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_decode_unknown_type() {
        let err = ServerEvent::decode(r#"{"type":"typing_indicator","username":"x"}"#).unwrap_err();

        let DecodeError::UnknownType { tag } = err else {
            panic!("expected UnknownType");
        };
        assert_eq!(tag, "typing_indicator");
    }

    #[test]
    fn test_fractional_epoch_millis_truncate() {
        use serde::de::IntoDeserializer;
        use serde::de::value::{Error as DeError, F64Deserializer};

        let de: F64Deserializer<DeError> = 1000.9_f64.into_deserializer();
        let parsed = timestamp::deserialize(de).expect("deserialize");
        assert_eq!(parsed, DateTime::from_timestamp_millis(1000).unwrap());
    }

    #[test]
    fn test_non_finite_timestamp_rejected() {
        use serde::de::IntoDeserializer;
        use serde::de::value::{Error as DeError, F64Deserializer};

        for junk in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let de: F64Deserializer<DeError> = junk.into_deserializer();
            assert!(timestamp::deserialize(de).is_err());
        }
    }

    #[test]
    fn test_timestamp_serializes_rfc3339() {
        let message = WireMessage {
            username: "alice".to_string(),
            message: "hi".to_string(),
            timestamp: DateTime::from_timestamp_millis(1_709_294_400_123).unwrap(),
        };

        let json = serde_json::to_string(&message).expect("serialize");
        assert!(json.contains("2024-03-01T12:00:00.123Z"));
    }
}
