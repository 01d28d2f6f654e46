pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod recognizer;
pub mod session;

pub use config::Config;
pub use credentials::{Credentials, CredentialsError};
pub use error::{ForwardError, RecognizerError};
pub use http::{create_router, AppState};
pub use recognizer::{
    GoogleRecognizer, RecognitionEvent, RecognitionResponse, RecognitionSettings,
    RecognitionStream, SpeechRecognizer,
};
pub use session::{
    ClientFrame, ServerMessage, SessionBridge, SessionState, SessionStats, TranscriptFragment,
};
