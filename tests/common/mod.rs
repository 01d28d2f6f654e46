// Shared test doubles for the relay integration tests
//
// FakeRecognizer hands every opened stream back to the test as a
// FakeUpstream, so tests can read the audio the bridge wrote and push
// recognition events as if they came from the speech service.

#![allow(dead_code)]

use stt_relay::error::RecognizerError;
use stt_relay::recognizer::{
    AudioSink, RecognitionEvent, RecognitionSettings, RecognitionStream, SpeechRecognizer,
};
use tokio::sync::mpsc;

pub struct FakeUpstream {
    pub settings: RecognitionSettings,
    pub audio: mpsc::UnboundedReceiver<Vec<u8>>,
    pub events: mpsc::Sender<RecognitionEvent>,
}

impl FakeUpstream {
    /// Read audio until the bridge ends the stream
    pub async fn drain_audio(&mut self) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.audio.recv().await {
            chunks.push(chunk);
        }
        chunks
    }

    pub async fn emit(&self, event: RecognitionEvent) {
        self.events.send(event).await.unwrap();
    }
}

pub struct FakeRecognizer {
    opened: mpsc::UnboundedSender<FakeUpstream>,
}

impl FakeRecognizer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FakeUpstream>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { opened: tx }, rx)
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn open(
        &self,
        settings: &RecognitionSettings,
    ) -> Result<RecognitionStream, RecognizerError> {
        let (audio_tx, audio_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(16);

        let upstream = FakeUpstream {
            settings: settings.clone(),
            audio: audio_rx,
            events: event_tx,
        };
        self.opened
            .send(upstream)
            .map_err(|_| RecognizerError::Transport {
                reason: "test dropped the fake upstream receiver".to_string(),
            })?;

        Ok(RecognitionStream::new(AudioSink::new(audio_tx), event_rx))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Recognizer whose streams can never be opened
pub struct UnavailableRecognizer;

#[async_trait::async_trait]
impl SpeechRecognizer for UnavailableRecognizer {
    async fn open(
        &self,
        _settings: &RecognitionSettings,
    ) -> Result<RecognitionStream, RecognizerError> {
        Err(RecognizerError::Transport {
            reason: "speech service unreachable".to_string(),
        })
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

pub fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}
