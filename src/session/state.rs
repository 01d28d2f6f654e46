use serde::{Deserialize, Serialize};

/// Lifecycle of a session bridge.
///
/// `Open -> Closing -> Closed`. Errors are reported on the side and never
/// move the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Upstream stream attached, audio is forwarded
    Open,

    /// Upstream end requested; late audio is discarded
    Closing,

    /// Both directions finished
    Closed,
}

impl SessionState {
    pub fn accepts_audio(self) -> bool {
        self == SessionState::Open
    }

    /// `Open -> Closing`. Returns whether the transition happened.
    pub fn begin_close(&mut self) -> bool {
        if *self == SessionState::Open {
            *self = SessionState::Closing;
            true
        } else {
            false
        }
    }

    pub fn finish(&mut self) {
        *self = SessionState::Closed;
    }
}
