//! Connection lifecycle management.
//!
//! This module contains the core of the crate:
//!
//! - [`Lifecycle`] - pure state machine mapping triggers to effects
//! - [`ChatClient`] - async driver executing effects against a real
//!   transport and publishing state snapshots
//! - State types read by the presentation layer
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `state` | Presentation-facing state types |
//! | `machine` | Pure lifecycle state machine |
//! | `manager` | Async event-loop driver |

// ============================================================================
// Submodules
// ============================================================================

/// Presentation-facing state types.
pub mod state;

/// Pure lifecycle state machine.
pub mod machine;

/// Async event-loop driver.
pub mod manager;

// ============================================================================
// Re-exports
// ============================================================================

pub use machine::{Effect, Input, Lifecycle, RECONNECT_DELAY};
pub use manager::ChatClient;
pub use state::{ChatMessage, ChatSnapshot, ConnectionStatus};
