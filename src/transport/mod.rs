//! WebSocket transport layer.
//!
//! This module wraps the raw bidirectional channel to the chat server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  ChatClient     │                              │  Chat Server    │
//! │                 │         WebSocket            │                 │
//! │  Session ───────│◄────────────────────────────►│  (external)     │
//! │                 │        JSON text frames      │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Session Lifecycle
//!
//! 1. `Session::connect` - Dial the resolved WebSocket URL
//! 2. `Session::send_text` - Transmit encoded frames
//! 3. `Session::next_event` - Receive frames and close notifications
//! 4. `Session::close` - Close with the normal-closure code (1000)

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket session wrapper.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use session::{Session, SessionEvent};
