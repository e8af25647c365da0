//! Silent speech backend
//!
//! Tracks playback state without producing audio. Used when no platform
//! engine is available (headless environments) and by tests that need
//! deterministic control over utterance completion.

use crate::speech::synth::{Synth, SynthEvent, Utterance, Voice};
use crate::Result;
use log::debug;
use std::sync::{Arc, Mutex};

struct Shared {
    speaking: bool,
    paused: bool,
    queue: Vec<SynthEvent>,
    voices: Vec<Voice>,
    last_text: Option<String>,
}

impl Shared {
    fn clear_playback(&mut self) {
        self.speaking = false;
        self.paused = false;
    }
}

/// Speech backend that plays silence
///
/// In the default mode every submitted utterance "ends" on the next event
/// drain, so callers observe a complete lifecycle at zero duration. The
/// manual mode leaves utterances in flight until the paired
/// [`NullSynthHandle`] finishes or fails them.
pub struct NullSynth {
    shared: Arc<Mutex<Shared>>,
    auto_finish: bool,
}

/// Control handle for a manual-mode [`NullSynth`]
///
/// Stands in for the platform engine's callback side: tests use it to raise
/// end/error events and to populate the voice catalog.
#[derive(Clone)]
pub struct NullSynthHandle {
    shared: Arc<Mutex<Shared>>,
}

impl NullSynth {
    /// Create an auto-finishing silent backend
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                speaking: false,
                paused: false,
                queue: Vec::new(),
                voices: Vec::new(),
                last_text: None,
            })),
            auto_finish: true,
        }
    }

    /// Create a manually driven silent backend and its control handle
    pub fn manual() -> (Self, NullSynthHandle) {
        let mut synth = Self::new();
        synth.auto_finish = false;
        let handle = NullSynthHandle {
            shared: Arc::clone(&synth.shared),
        };
        (synth, handle)
    }
}

impl Default for NullSynth {
    fn default() -> Self {
        Self::new()
    }
}

impl Synth for NullSynth {
    fn submit(&mut self, utterance: &Utterance) -> Result<()> {
        debug!("Silent backend swallowing {} chars", utterance.text.len());
        let mut shared = self.shared.lock().unwrap();
        shared.speaking = true;
        shared.paused = false;
        shared.queue.clear();
        shared.last_text = Some(utterance.text.clone());
        if self.auto_finish {
            shared.queue.push(SynthEvent::Ended);
        }
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.clear_playback();
        shared.queue.clear();
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        if shared.speaking {
            shared.paused = true;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        if shared.paused {
            shared.paused = false;
        }
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        let shared = self.shared.lock().unwrap();
        shared.speaking && !shared.paused
    }

    fn is_paused(&self) -> bool {
        self.shared.lock().unwrap().paused
    }

    fn voices(&self) -> Vec<Voice> {
        self.shared.lock().unwrap().voices.clone()
    }

    fn drain_events(&mut self) -> Vec<SynthEvent> {
        let mut shared = self.shared.lock().unwrap();
        let events = std::mem::take(&mut shared.queue);
        if events
            .iter()
            .any(|e| matches!(e, SynthEvent::Ended | SynthEvent::Errored(_)))
        {
            shared.clear_playback();
        }
        events
    }
}

impl NullSynthHandle {
    /// Raise an end-of-utterance event
    pub fn finish_utterance(&self) {
        self.shared.lock().unwrap().queue.push(SynthEvent::Ended);
    }

    /// Raise an utterance error with the given reason
    pub fn fail_utterance(&self, reason: &str) {
        self.shared
            .lock()
            .unwrap()
            .queue
            .push(SynthEvent::Errored(reason.to_string()));
    }

    /// Populate the voice catalog
    ///
    /// Catalogs can arrive after construction on real platforms; setting
    /// voices late reproduces that timing.
    pub fn set_voices(&self, voices: Vec<Voice>) {
        self.shared.lock().unwrap().voices = voices;
    }

    /// Is the backend currently producing (silent) audio?
    pub fn is_speaking(&self) -> bool {
        let shared = self.shared.lock().unwrap();
        shared.speaking && !shared.paused
    }

    /// Text of the most recently submitted utterance
    pub fn last_text(&self) -> Option<String> {
        self.shared.lock().unwrap().last_text.clone()
    }
}
