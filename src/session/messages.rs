use serde::{Deserialize, Serialize};

/// Error code sent to the client when the upstream recognizer fails
pub const STT_ERROR: &str = "stt_error";

/// JSON text messages sent to the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// `{"text": "..."}`, a finalized transcript
    Transcript { text: String },

    /// `{"error": "stt_error"}`
    Error { error: String },
}

impl ServerMessage {
    pub fn transcript(text: impl Into<String>) -> Self {
        Self::Transcript { text: text.into() }
    }

    pub fn stt_error() -> Self {
        Self::Error {
            error: STT_ERROR.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// What the bridge sees of each inbound client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// Payload to forward upstream as-is
    Audio(Vec<u8>),

    /// Client started the closing handshake
    Close,

    /// Control traffic with no meaning for the relay (ping/pong)
    Control,
}
