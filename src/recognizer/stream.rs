use super::proto;
use crate::error::{ForwardError, RecognizerError};
use tokio::sync::mpsc;

/// A response from the upstream recognizer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResponse {
    pub results: Vec<RecognitionResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResult {
    /// Alternatives, most likely first
    pub alternatives: Vec<RecognitionAlternative>,
    pub is_final: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionAlternative {
    pub transcript: String,
    pub confidence: f32,
}

impl RecognitionResult {
    pub fn new(transcript: impl Into<String>, is_final: bool) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                transcript: transcript.into(),
                confidence: 0.0,
            }],
            is_final,
        }
    }
}

impl RecognitionResponse {
    /// Response carrying a single result with one alternative
    pub fn single(transcript: impl Into<String>, is_final: bool) -> Self {
        Self {
            results: vec![RecognitionResult::new(transcript, is_final)],
        }
    }
}

impl From<proto::StreamingRecognizeResponse> for RecognitionResponse {
    fn from(response: proto::StreamingRecognizeResponse) -> Self {
        Self {
            results: response
                .results
                .into_iter()
                .map(|result| RecognitionResult {
                    alternatives: result
                        .alternatives
                        .into_iter()
                        .map(|alt| RecognitionAlternative {
                            transcript: alt.transcript,
                            confidence: alt.confidence,
                        })
                        .collect(),
                    is_final: result.is_final,
                })
                .collect(),
        }
    }
}

/// Events emitted by an upstream recognition stream.
///
/// The stream has ended once the event channel is closed.
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    Response(RecognitionResponse),
    Error(RecognizerError),
}

/// Write half of an upstream recognition stream.
///
/// Writes never wait on the upstream side: chunks queue until the call
/// reads them, so a stalled upstream cannot hold up the client loop.
#[derive(Debug)]
pub struct AudioSink {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl AudioSink {
    pub fn new(tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Queue one audio chunk, verbatim and in call order
    pub fn write(&self, chunk: Vec<u8>) -> Result<(), ForwardError> {
        let tx = self.tx.as_ref().ok_or(ForwardError::StreamEnded)?;
        tx.send(chunk).map_err(|_| ForwardError::UpstreamClosed)
    }

    /// Half-close the upstream stream.
    ///
    /// Returns `true` only for the call that actually ended it.
    pub fn end(&mut self) -> bool {
        self.tx.take().is_some()
    }

    pub fn is_ended(&self) -> bool {
        self.tx.is_none()
    }
}

/// One open streaming-recognition request
#[derive(Debug)]
pub struct RecognitionStream {
    pub audio: AudioSink,
    pub events: mpsc::Receiver<RecognitionEvent>,
}

impl RecognitionStream {
    pub fn new(audio: AudioSink, events: mpsc::Receiver<RecognitionEvent>) -> Self {
        Self { audio, events }
    }
}
