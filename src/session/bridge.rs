use super::messages::{ClientFrame, ServerMessage};
use super::state::SessionState;
use super::stats::{SessionCounters, SessionStats};
use super::transcript::TranscriptFragment;
use crate::error::{ForwardError, RecognizerError};
use crate::recognizer::{
    AudioSink, RecognitionEvent, RecognitionSettings, RecognitionStream, SpeechRecognizer,
};
use chrono::{DateTime, Utc};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Client -> upstream half of a session: owns the lifecycle state and the
/// upstream audio sink.
#[derive(Debug)]
struct AudioForwarder {
    session_id: String,
    state: SessionState,
    sink: AudioSink,
    counters: Arc<SessionCounters>,
}

impl AudioForwarder {
    fn forward(&mut self, chunk: Vec<u8>) -> Result<(), ForwardError> {
        if !self.state.accepts_audio() {
            self.counters.dropped_writes.fetch_add(1, Ordering::SeqCst);
            return Err(ForwardError::StreamEnded);
        }

        let len = chunk.len();
        match self.sink.write(chunk) {
            Ok(()) => {
                self.counters.chunks_forwarded.fetch_add(1, Ordering::SeqCst);
                self.counters.bytes_forwarded.fetch_add(len, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.counters.dropped_writes.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn close(&mut self) -> bool {
        self.state.begin_close();
        let ended = self.sink.end();
        if ended {
            debug!(session_id = %self.session_id, "Ended upstream recognition stream");
        }
        ended
    }
}

/// Pairs one client connection with one upstream recognition stream.
///
/// Audio goes client -> upstream in arrival order. Final transcripts go
/// upstream -> client in emission order. Closing either side closes the
/// other.
pub struct SessionBridge {
    id: String,
    forwarder: AudioForwarder,
    events: mpsc::Receiver<RecognitionEvent>,
    counters: Arc<SessionCounters>,
    started_at: DateTime<Utc>,
    close_grace: Duration,
}

impl SessionBridge {
    /// Open the upstream stream for a newly accepted client
    pub async fn open(
        recognizer: &dyn SpeechRecognizer,
        settings: &RecognitionSettings,
        close_grace: Duration,
    ) -> Result<Self, RecognizerError> {
        let id = format!("stt-{}", uuid::Uuid::new_v4());

        let RecognitionStream { audio, events } = recognizer.open(settings).await?;

        info!(
            session_id = %id,
            recognizer = recognizer.name(),
            encoding = ?settings.encoding,
            sample_rate = settings.sample_rate_hertz,
            language = %settings.language_code,
            "Opened upstream recognition stream"
        );

        let counters = Arc::new(SessionCounters::default());

        Ok(Self {
            forwarder: AudioForwarder {
                session_id: id.clone(),
                state: SessionState::Open,
                sink: audio,
                counters: Arc::clone(&counters),
            },
            id,
            events,
            counters,
            started_at: Utc::now(),
            close_grace,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.forwarder.state
    }

    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot(&self.id, self.forwarder.state, self.started_at)
    }

    /// Write one client chunk upstream.
    ///
    /// Chunks are discarded with `ForwardError::StreamEnded` once the
    /// session is closing.
    pub fn forward_audio(&mut self, chunk: Vec<u8>) -> Result<(), ForwardError> {
        self.forwarder.forward(chunk)
    }

    /// End the upstream stream. Safe to call any number of times; only the
    /// first call reaches the upstream side and returns `true`.
    pub fn close_upstream(&mut self) -> bool {
        self.forwarder.close()
    }

    /// Run the session until both directions are done.
    ///
    /// `inbound` yields the client's frames; `outbound` takes the JSON
    /// messages for the client. Returns the final statistics.
    pub async fn run<I, E, O>(self, mut inbound: I, outbound: O) -> SessionStats
    where
        I: Stream<Item = Result<ClientFrame, E>> + Unpin + Send,
        E: Display + Send,
        O: Sink<ServerMessage> + Unpin + Send + 'static,
        O::Error: Display + Send,
    {
        let SessionBridge {
            id,
            mut forwarder,
            events,
            counters,
            started_at,
            close_grace,
        } = self;

        let cancel = CancellationToken::new();
        let mut upstream = tokio::spawn(relay_transcripts(
            id.clone(),
            events,
            outbound,
            Arc::clone(&counters),
            cancel.clone(),
        ));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(session_id = %id, "Upstream stream ended, closing client session");
                    break;
                }
                frame = inbound.next() => match frame {
                    Some(Ok(ClientFrame::Audio(chunk))) => match forwarder.forward(chunk) {
                        Ok(()) => {}
                        Err(ForwardError::StreamEnded) => {
                            debug!(session_id = %id, "Discarding audio after upstream end");
                        }
                        Err(e) => {
                            warn!(session_id = %id, "Stream write error, discarding chunk: {}", e);
                        }
                    },
                    Some(Ok(ClientFrame::Control)) => {}
                    Some(Ok(ClientFrame::Close)) | None => {
                        info!(session_id = %id, "STT connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %id, "Client connection error: {}", e);
                        break;
                    }
                }
            }
        }

        forwarder.close();

        // Let upstream flush its last finals, but never wait forever
        let drained = match tokio::time::timeout(close_grace, &mut upstream).await {
            Ok(joined) => joined,
            Err(_) => {
                debug!(session_id = %id, "Upstream drain timed out, cancelling");
                cancel.cancel();
                upstream.await
            }
        };
        if let Err(e) = drained {
            error!(session_id = %id, "Transcript task panicked: {}", e);
        }

        forwarder.state.finish();

        let stats = counters.snapshot(&id, forwarder.state, started_at);
        info!(
            session_id = %stats.session_id,
            duration_secs = stats.duration_secs,
            chunks = stats.chunks_forwarded,
            bytes = stats.bytes_forwarded,
            transcripts = stats.transcripts_sent,
            interim_dropped = stats.interim_dropped,
            upstream_errors = stats.upstream_errors,
            dropped_writes = stats.dropped_writes,
            "Session closed"
        );
        stats
    }
}

/// Upstream -> client direction. Ends when the upstream event stream ends
/// or the session cancels it; either way the client connection is closed
/// and the session is told the upstream side is gone.
async fn relay_transcripts<O>(
    session_id: String,
    mut events: mpsc::Receiver<RecognitionEvent>,
    mut outbound: O,
    counters: Arc<SessionCounters>,
    cancel: CancellationToken,
) where
    O: Sink<ServerMessage> + Unpin + Send,
    O::Error: Display + Send,
{
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if let Err(e) = handle_event(&session_id, event, &mut outbound, &counters).await {
            debug!(session_id = %session_id, "Could not deliver to client: {}", e);
        }
    }

    cancel.cancel();
    if let Err(e) = outbound.close().await {
        debug!(session_id = %session_id, "Client already closed: {}", e);
    }
}

/// Apply one upstream event to the client side
pub async fn handle_event<O>(
    session_id: &str,
    event: RecognitionEvent,
    outbound: &mut O,
    counters: &SessionCounters,
) -> Result<(), ForwardError>
where
    O: Sink<ServerMessage> + Unpin,
    O::Error: Display,
{
    match event {
        RecognitionEvent::Response(response) => {
            let Some(fragment) = TranscriptFragment::from_response(&response) else {
                return Ok(());
            };

            if !fragment.is_final {
                counters.interim_dropped.fetch_add(1, Ordering::SeqCst);
                return Ok(());
            }
            if !fragment.is_deliverable() {
                return Ok(());
            }

            info!(session_id = %session_id, "FINAL: {}", fragment.text);
            send(outbound, ServerMessage::transcript(fragment.text)).await?;
            counters.transcripts_sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        RecognitionEvent::Error(e) => {
            error!(session_id = %session_id, "STT error: {}", e);
            counters.upstream_errors.fetch_add(1, Ordering::SeqCst);
            send(outbound, ServerMessage::stt_error()).await
        }
    }
}

async fn send<O>(outbound: &mut O, message: ServerMessage) -> Result<(), ForwardError>
where
    O: Sink<ServerMessage> + Unpin,
    O::Error: Display,
{
    outbound
        .send(message)
        .await
        .map_err(|e| ForwardError::ClientGone {
            reason: e.to_string(),
        })
}
