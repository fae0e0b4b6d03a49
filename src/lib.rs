//! Wirechat - WebSocket chat client with automatic reconnection.
//!
//! This library owns the connection lifecycle of a real-time chat
//! client: one WebSocket session at a time, identity negotiation with
//! the server, typed dispatch of inbound protocol frames into
//! presentation-visible state, and automatic reconnection after
//! unexpected closure.
//!
//! # Architecture
//!
//! The client splits into a pure core and a thin async shell:
//!
//! - **[`Lifecycle`]**: pure state machine. Triggers go in as inputs,
//!   effects come out; no I/O, no timers, fully deterministic.
//! - **[`ChatClient`]**: async driver. Owns one event-loop task that
//!   executes effects against the transport, holds the single
//!   reconnect timer, and publishes [`ChatSnapshot`] values.
//! - **Protocol codec**: stateless JSON encode/decode, unit-testable
//!   without a socket. Unrecognized or malformed frames are dropped
//!   with a diagnostic, never a failure.
//!
//! Presentation (rendering, input validation) stays outside the crate:
//! it reads snapshots and submits intents.
//!
//! # Quick Start
//!
//! ```no_run
//! use wirechat::{ChatClient, Endpoint, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let endpoint = Endpoint::new().with_api_url("https://chat.example.com");
//!     let client = ChatClient::spawn(endpoint)?;
//!
//!     client.submit_username("alice");
//!
//!     let mut updates = client.subscribe();
//!     while updates.changed().await.is_ok() {
//!         let snapshot = updates.borrow().clone();
//!         println!("{:?}: {} messages", snapshot.status, snapshot.messages.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Lifecycle machine, async driver, state types |
//! | [`config`] | Endpoint resolution |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Wire protocol codec (JSON text frames) |
//! | [`transport`] | WebSocket session wrapper |

// ============================================================================
// Modules
// ============================================================================

/// Connection lifecycle management.
///
/// The core of the crate: the pure [`Lifecycle`] machine, the async
/// [`ChatClient`] driver, and the presentation-facing state types.
pub mod client;

/// Endpoint resolution.
///
/// Derives the WebSocket URL from an override, an API base URL, or a
/// deployment origin.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Wire protocol codec.
///
/// Pure, stateless JSON encode/decode for the chat protocol.
pub mod protocol;

/// WebSocket transport layer.
///
/// The session wrapper the lifecycle driver owns.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    ChatClient, ChatMessage, ChatSnapshot, ConnectionStatus, Effect, Input, Lifecycle,
    RECONNECT_DELAY,
};

// Configuration types
pub use config::{DEFAULT_WS_URL, Endpoint};

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{ClientFrame, DecodeError, ServerEvent, WireMessage};
