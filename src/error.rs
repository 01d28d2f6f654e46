//! Session-level error types.
//!
//! None of these ever terminate the process: they are returned from the
//! forwarding operations and logged where a session handles them.

/// Failures reported by the upstream speech service
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecognizerError {
    #[error("failed to mint access token: {reason}")]
    Auth { reason: String },

    #[error("speech endpoint is misconfigured: {reason}")]
    Endpoint { reason: String },

    #[error("transport error talking to speech service: {reason}")]
    Transport { reason: String },

    #[error("speech service returned {code}: {message}")]
    Status { code: String, message: String },
}

impl From<tonic::Status> for RecognizerError {
    fn from(status: tonic::Status) -> Self {
        Self::Status {
            code: format!("{:?}", status.code()),
            message: status.message().to_string(),
        }
    }
}

/// Failures while forwarding between the client and the upstream stream
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// Write attempted after `end` was called on the upstream stream
    #[error("upstream stream already ended")]
    StreamEnded,

    /// The upstream side went away on its own
    #[error("upstream stream closed")]
    UpstreamClosed,

    /// The client connection could not take the message
    #[error("client connection unavailable: {reason}")]
    ClientGone { reason: String },

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
