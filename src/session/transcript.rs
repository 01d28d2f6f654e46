use crate::recognizer::RecognitionResponse;

/// Text extracted from one upstream response
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptFragment {
    /// Top alternative, trimmed
    pub text: String,

    pub is_final: bool,

    /// Confidence score (0.0 to 1.0), if the recognizer reported one
    pub confidence: Option<f32>,
}

impl TranscriptFragment {
    /// Read the first result of a response.
    ///
    /// Returns `None` when the response carries no result at all, which
    /// the recognizer does for speech events and empty interim updates.
    pub fn from_response(response: &RecognitionResponse) -> Option<Self> {
        let result = response.results.first()?;
        let top = result.alternatives.first();

        Some(Self {
            text: top
                .map(|alt| alt.transcript.trim().to_string())
                .unwrap_or_default(),
            is_final: result.is_final,
            confidence: top.map(|alt| alt.confidence).filter(|c| *c > 0.0),
        })
    }

    /// Only final, non-empty fragments are ever sent to the client
    pub fn is_deliverable(&self) -> bool {
        self.is_final && !self.text.is_empty()
    }
}
