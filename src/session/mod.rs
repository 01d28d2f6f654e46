//! Relay session management
//!
//! This module provides the `SessionBridge` that manages one client
//! connection and its upstream recognition stream:
//! - Client audio forwarded upstream, verbatim and in order
//! - Final transcripts relayed back as `{"text": ...}`
//! - Upstream errors reported as `{"error": "stt_error"}`
//! - Lifecycle and per-session statistics

mod bridge;
mod messages;
mod state;
mod stats;
mod transcript;

pub use bridge::{handle_event, SessionBridge};
pub use messages::{ClientFrame, ServerMessage, STT_ERROR};
pub use state::SessionState;
pub use stats::{SessionCounters, SessionStats};
pub use transcript::TranscriptFragment;
