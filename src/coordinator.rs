//! Shadow playback state replication
//!
//! The background and popup actors each hold a `Coordinator`: a locally
//! owned, possibly-stale copy of the content context's playback state plus
//! a short user-visible status line. The shadow is updated by pushed
//! lifecycle events and by an explicit pull at startup; whichever message
//! arrived most recently wins.

use crate::bus::Message;
use crate::speech::{PlaybackState, INTERRUPTED};
use log::{debug, warn};

/// Eventually-consistent replica of one tab's playback state
#[derive(Debug, Default)]
pub struct Coordinator {
    shadow: PlaybackState,
    status: Option<String>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current shadow copy
    pub fn state(&self) -> PlaybackState {
        self.shadow
    }

    /// Current user-visible status line, if any
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Set a short human-readable status line
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Clear the status line
    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Replace the shadow outright (pull path)
    pub fn replace(&mut self, state: PlaybackState) {
        debug!("Shadow state replaced by pull: {:?}", state);
        self.shadow = state;
    }

    /// Apply a pushed lifecycle event (push path)
    ///
    /// Non-event messages are ignored. A `SpeechError` whose reason is the
    /// benign "interrupted" cause still resets the shadow to idle but never
    /// touches the status line.
    pub fn apply(&mut self, message: &Message) {
        match message {
            Message::SpeechStarted | Message::SpeechResumed => {
                self.shadow = PlaybackState::playing();
            }
            Message::SpeechPaused => {
                self.shadow = PlaybackState::paused();
            }
            Message::SpeechEnded | Message::SpeechStopped => {
                self.shadow = PlaybackState::idle();
            }
            Message::SpeechError { reason } => {
                self.shadow = PlaybackState::idle();
                if reason == INTERRUPTED {
                    debug!("Utterance superseded, not surfacing to the user");
                } else {
                    warn!("Speech failed: {}", reason);
                    self.status = Some(format!("Speech error: {}", reason));
                }
            }
            Message::UpdateSpeechState(state) => {
                self.shadow = *state;
            }
            other => {
                debug!("Coordinator ignoring non-event message: {:?}", other);
            }
        }
    }
}
