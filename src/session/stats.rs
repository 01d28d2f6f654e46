use super::state::SessionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Statistics about a relay session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    pub state: SessionState,

    /// When the client connected
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Audio chunks written upstream
    pub chunks_forwarded: usize,

    pub bytes_forwarded: usize,

    /// `{"text": ...}` messages delivered to the client
    pub transcripts_sent: usize,

    /// Interim results that were not forwarded
    pub interim_dropped: usize,

    pub upstream_errors: usize,

    /// Audio chunks discarded because the upstream stream had ended
    pub dropped_writes: usize,
}

/// Counters shared between the two directions of a session
#[derive(Debug, Default)]
pub struct SessionCounters {
    pub chunks_forwarded: AtomicUsize,
    pub bytes_forwarded: AtomicUsize,
    pub transcripts_sent: AtomicUsize,
    pub interim_dropped: AtomicUsize,
    pub upstream_errors: AtomicUsize,
    pub dropped_writes: AtomicUsize,
}

impl SessionCounters {
    pub fn snapshot(
        &self,
        session_id: &str,
        state: SessionState,
        started_at: DateTime<Utc>,
    ) -> SessionStats {
        let duration = Utc::now().signed_duration_since(started_at);

        SessionStats {
            session_id: session_id.to_string(),
            state,
            started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_forwarded: self.chunks_forwarded.load(Ordering::SeqCst),
            bytes_forwarded: self.bytes_forwarded.load(Ordering::SeqCst),
            transcripts_sent: self.transcripts_sent.load(Ordering::SeqCst),
            interim_dropped: self.interim_dropped.load(Ordering::SeqCst),
            upstream_errors: self.upstream_errors.load(Ordering::SeqCst),
            dropped_writes: self.dropped_writes.load(Ordering::SeqCst),
        }
    }
}
