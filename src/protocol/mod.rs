//! Wire protocol codec.
//!
//! This module defines the JSON text frames exchanged with the chat
//! server and the pure, stateless codec between them and typed values.
//! No side effects, no network access, no timers; the wire format is
//! unit-testable independent of transport and timing concerns.
//!
//! # Protocol Overview
//!
//! | Frame | Direction | Purpose |
//! |-------|-----------|---------|
//! | `username` | Client → Server | Announce display name |
//! | `message` | Client → Server | Send chat message |
//! | `username_confirmed` | Server → Client | Identity acknowledged |
//! | `chat_history` | Server → Client | Bulk history snapshot |
//! | `new_message` | Server → Client | One chat message |
//! | `user_joined` / `user_left` | Server → Client | Presence change |
//! | `error` | Server → Client | Application-level error |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `outbound` | Client → server frames and encoding |
//! | `inbound` | Server → client events and decoding |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound frame types and encoding.
pub mod outbound;

/// Inbound frame types and decoding.
pub mod inbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use inbound::{DecodeError, ServerEvent, WireMessage};
pub use outbound::ClientFrame;
