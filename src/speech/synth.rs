//! Speech synthesizer abstraction
//!
//! Provides a unified interface to the platform text-to-speech engine.
//! The playback engine treats backends as black boxes: it submits one
//! utterance at a time and observes completion through drained events.

use crate::Result;
use log::info;
use serde::{Deserialize, Serialize};

/// A voice offered by the platform engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

/// One in-flight unit of synthesis work
///
/// Built from a validated speech request. The playback engine owns at most
/// one of these at a time; a new `speak` replaces (never mutates) it.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub text: String,
    /// Resolved voice, `None` when falling back to the platform default
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub lang: String,
}

/// Asynchronous notifications from the platform engine
///
/// Events always refer to the most recently submitted utterance. Backends
/// must drop callbacks raised by a superseded utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthEvent {
    /// The current utterance finished playing
    Ended,
    /// The current utterance failed with a backend-specific reason
    Errored(String),
}

/// Platform speech engine trait
///
/// All backends implement this. Submission, cancel, pause and resume are
/// synchronous; end-of-utterance and failure arrive later via
/// `drain_events`, which the owning context polls between messages.
pub trait Synth: Send {
    /// Submit an utterance, replacing whatever was playing
    fn submit(&mut self, utterance: &Utterance) -> Result<()>;

    /// Cancel/silence the current utterance
    fn cancel(&mut self) -> Result<()>;

    /// Pause the current utterance
    fn pause(&mut self) -> Result<()>;

    /// Resume a paused utterance
    fn resume(&mut self) -> Result<()>;

    /// Is the engine producing audio right now?
    fn is_speaking(&self) -> bool;

    /// Is the engine currently paused?
    fn is_paused(&self) -> bool;

    /// Currently available voices
    ///
    /// Platform voice catalogs populate asynchronously; an empty list means
    /// the catalog is not ready yet, not that no voices exist.
    fn voices(&self) -> Vec<Voice>;

    /// Take all pending events raised since the last drain
    fn drain_events(&mut self) -> Vec<SynthEvent>;
}

/// Create a platform-appropriate speech synthesizer
///
/// Tries the native engine first and falls back to the silent backend so
/// that headless environments (CI, containers without audio) still get a
/// fully functional coordination layer.
pub fn create_synth() -> Result<Box<dyn Synth>> {
    use super::backends::native::NativeSynth;
    use super::backends::null::NullSynth;

    match NativeSynth::new() {
        Ok(synth) => {
            info!("Initialized native TTS backend");
            Ok(Box::new(synth))
        }
        Err(e) => {
            info!("Native TTS unavailable ({}), using silent backend", e);
            Ok(Box::new(NullSynth::new()))
        }
    }
}
