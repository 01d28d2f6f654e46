//! Upstream streaming speech recognition
//!
//! A [`SpeechRecognizer`] opens one bidirectional [`RecognitionStream`] per
//! client session. The production implementation talks to Google Cloud
//! Speech-to-Text over gRPC; tests plug in channel-backed fakes.

pub mod google;
pub mod proto;
mod stream;
mod token;

pub use google::GoogleRecognizer;
pub use proto::AudioEncoding;
pub use stream::{
    AudioSink, RecognitionAlternative, RecognitionEvent, RecognitionResponse, RecognitionResult,
    RecognitionStream,
};
pub use token::{ServiceAccountClaims, TokenSource};

use crate::error::RecognizerError;

/// Fixed recognition parameters. The browser client always records
/// WEBM/Opus at 48 kHz, so these are never negotiated per session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionSettings {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub language_code: String,
    pub interim_results: bool,
}

impl RecognitionSettings {
    pub const SAMPLE_RATE_HERTZ: u32 = 48000;
    pub const LANGUAGE_CODE: &'static str = "en-US";
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            encoding: AudioEncoding::WebmOpus,
            sample_rate_hertz: Self::SAMPLE_RATE_HERTZ,
            language_code: Self::LANGUAGE_CODE.to_string(),
            interim_results: true,
        }
    }
}

impl From<&RecognitionSettings> for proto::StreamingRecognitionConfig {
    fn from(settings: &RecognitionSettings) -> Self {
        Self {
            config: Some(proto::RecognitionConfig {
                encoding: settings.encoding as i32,
                sample_rate_hertz: settings.sample_rate_hertz as i32,
                language_code: settings.language_code.clone(),
                max_alternatives: 1,
                enable_automatic_punctuation: false,
            }),
            single_utterance: false,
            interim_results: settings.interim_results,
        }
    }
}

/// Factory for upstream recognition streams
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Open one streaming-recognition request
    async fn open(&self, settings: &RecognitionSettings)
        -> Result<RecognitionStream, RecognizerError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
