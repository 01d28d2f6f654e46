use crate::recognizer::{RecognitionSettings, SpeechRecognizer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state for HTTP handlers.
///
/// Everything here is read-only after startup except the session gauge.
#[derive(Clone)]
pub struct AppState {
    /// Opens one upstream stream per client session
    pub recognizer: Arc<dyn SpeechRecognizer>,

    /// Fixed recognition parameters used for every session
    pub settings: Arc<RecognitionSettings>,

    /// Upstream drain window after a client disconnects
    pub close_grace: Duration,

    /// Number of sessions currently running
    active_sessions: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, close_grace: Duration) -> Self {
        Self {
            recognizer,
            settings: Arc::new(RecognitionSettings::default()),
            close_grace,
            active_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    pub(crate) fn session_started(&self) -> usize {
        self.active_sessions.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn session_finished(&self) -> usize {
        self.active_sessions.fetch_sub(1, Ordering::SeqCst).saturating_sub(1)
    }
}
