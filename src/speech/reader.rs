//! Playback engine state machine
//!
//! The `Reader` is the single authoritative holder of playback state for one
//! content context. It wraps the platform engine behind the `Synth` trait,
//! enforces the Idle/Speaking/Paused state machine and publishes lifecycle
//! events through an `EventEmitter` so transports can relay them without the
//! engine knowing who is listening.

use crate::events::{EventEmitter, Handler, SubscriptionId};
use crate::speech::synth::{Synth, SynthEvent, Utterance, Voice};
use crate::{ReadAloudError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Snapshot of playback truth
///
/// Invariant: `is_paused` implies `is_playing`. The authoritative copy lives
/// inside the `Reader`; every other holder has a shadow copy that can go
/// stale and must be refreshed by push or pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_paused: bool,
}

impl PlaybackState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn playing() -> Self {
        Self {
            is_playing: true,
            is_paused: false,
        }
    }

    pub fn paused() -> Self {
        Self {
            is_playing: true,
            is_paused: true,
        }
    }
}

/// A request to read text aloud
///
/// Constructed by a coordinator from persisted settings and immutable once
/// sent. An empty `text` asks the content context to extract the page text
/// itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    /// Preferred voice name; empty means platform default
    pub voice: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub lang: String,
}

impl SpeechRequest {
    /// Build a request from persisted settings
    pub fn from_settings(text: String, settings: &crate::settings::TtsSettings) -> Self {
        Self {
            text,
            voice: settings.voice.clone(),
            rate: settings.rate,
            pitch: settings.pitch,
            volume: settings.volume,
            lang: settings.lang.clone(),
        }
    }
}

/// Playback engine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Speaking,
    Paused,
}

/// Topic keys for reader lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderEventKind {
    Started,
    Ended,
    Stopped,
    Paused,
    Resumed,
    Errored,
}

/// Reader lifecycle events
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    Started,
    Ended,
    Stopped,
    Paused,
    Resumed,
    Errored { reason: String },
}

impl ReaderEvent {
    pub fn kind(&self) -> ReaderEventKind {
        match self {
            ReaderEvent::Started => ReaderEventKind::Started,
            ReaderEvent::Ended => ReaderEventKind::Ended,
            ReaderEvent::Stopped => ReaderEventKind::Stopped,
            ReaderEvent::Paused => ReaderEventKind::Paused,
            ReaderEvent::Resumed => ReaderEventKind::Resumed,
            ReaderEvent::Errored { .. } => ReaderEventKind::Errored,
        }
    }
}

/// Error reason raised when an utterance is superseded by a later
/// `speak`/`stop`. Expected during normal operation and never shown to the
/// user.
pub const INTERRUPTED: &str = "interrupted";

/// The playback engine
///
/// At most one live utterance at a time; `speak` while busy has interrupt
/// semantics (stop, then start the new utterance).
pub struct Reader {
    synth: Box<dyn Synth>,
    utterance: Option<Utterance>,
    phase: Phase,
    emitter: EventEmitter<ReaderEventKind, ReaderEvent>,
}

impl Reader {
    pub fn new(synth: Box<dyn Synth>) -> Self {
        Self {
            synth,
            utterance: None,
            phase: Phase::Idle,
            emitter: EventEmitter::new(),
        }
    }

    /// Subscribe to a lifecycle event
    pub fn on(&mut self, kind: ReaderEventKind, handler: Handler<ReaderEvent>) -> SubscriptionId {
        self.emitter.subscribe(kind, handler)
    }

    /// Remove a lifecycle event subscription
    pub fn off(&mut self, kind: ReaderEventKind, id: SubscriptionId) {
        self.emitter.unsubscribe(kind, id);
    }

    fn emit(&mut self, event: ReaderEvent) {
        self.emitter.publish(event.kind(), &event);
    }

    /// Current playback state
    pub fn playback_state(&self) -> PlaybackState {
        match self.phase {
            Phase::Idle => PlaybackState::idle(),
            Phase::Speaking => PlaybackState::playing(),
            Phase::Paused => PlaybackState::paused(),
        }
    }

    /// Currently available voices from the platform catalog
    pub fn voices(&self) -> Vec<Voice> {
        self.synth.voices()
    }

    /// Start speaking a request
    ///
    /// Any ongoing utterance is stopped first, so the new utterance always
    /// wins. Emits `Stopped` (when superseding) followed by `Started`.
    pub fn speak(&mut self, request: &SpeechRequest) -> Result<()> {
        validate(request)?;

        // Interrupt semantics: stop() is a no-op when idle
        self.stop()?;

        // The voice catalog may still be populating; look the name up in
        // whatever catalog exists right now and fall back to the platform
        // default instead of blocking.
        let voice = if request.voice.is_empty() {
            None
        } else {
            let found = self
                .synth
                .voices()
                .into_iter()
                .find(|v| v.name == request.voice);
            if found.is_none() {
                debug!(
                    "Voice {:?} not in current catalog, using platform default",
                    request.voice
                );
            }
            found
        };

        let utterance = Utterance {
            text: request.text.clone(),
            voice,
            rate: request.rate,
            pitch: request.pitch,
            volume: request.volume,
            lang: request.lang.clone(),
        };

        self.synth.submit(&utterance)?;
        self.utterance = Some(utterance);
        self.phase = Phase::Speaking;
        self.emit(ReaderEvent::Started);

        Ok(())
    }

    /// Stop the current utterance
    ///
    /// No-op when idle: no event, no error.
    pub fn stop(&mut self) -> Result<()> {
        if self.utterance.is_none() {
            return Ok(());
        }

        self.synth.cancel()?;
        // Anything the engine queued before the cancel belongs to the
        // utterance that was just discarded.
        for stale in self.synth.drain_events() {
            debug!("Discarding stale synth event after cancel: {:?}", stale);
        }

        self.utterance = None;
        self.phase = Phase::Idle;
        self.emit(ReaderEvent::Stopped);

        Ok(())
    }

    /// Pause the current utterance
    ///
    /// Only valid while the engine reports it is producing audio; otherwise
    /// a silent no-op.
    pub fn pause(&mut self) -> Result<()> {
        if self.phase != Phase::Speaking || !self.synth.is_speaking() {
            debug!("Ignoring pause outside of active speech");
            return Ok(());
        }

        self.synth.pause()?;
        self.phase = Phase::Paused;
        self.emit(ReaderEvent::Paused);

        Ok(())
    }

    /// Resume a paused utterance
    ///
    /// Only valid while the engine reports it is paused; otherwise a silent
    /// no-op.
    pub fn resume(&mut self) -> Result<()> {
        if self.phase != Phase::Paused || !self.synth.is_paused() {
            debug!("Ignoring resume outside of paused speech");
            return Ok(());
        }

        self.synth.resume()?;
        self.phase = Phase::Speaking;
        self.emit(ReaderEvent::Resumed);

        Ok(())
    }

    /// Drain platform engine events and apply them to the state machine
    ///
    /// Called by the owning context between messages. Events arriving with
    /// no live utterance are stale and dropped.
    pub fn poll(&mut self) {
        for event in self.synth.drain_events() {
            if self.utterance.is_none() {
                debug!("Dropping synth event with no live utterance: {:?}", event);
                continue;
            }
            match event {
                SynthEvent::Ended => {
                    self.utterance = None;
                    self.phase = Phase::Idle;
                    self.emit(ReaderEvent::Ended);
                }
                SynthEvent::Errored(reason) => {
                    if reason == INTERRUPTED {
                        debug!("Utterance interrupted");
                    } else {
                        warn!("Utterance failed: {}", reason);
                    }
                    self.utterance = None;
                    self.phase = Phase::Idle;
                    self.emit(ReaderEvent::Errored { reason });
                }
            }
        }
    }
}

/// Reject malformed requests before they reach the platform engine
fn validate(request: &SpeechRequest) -> Result<()> {
    if request.text.is_empty() {
        return Err(ReadAloudError::Validation("Empty text".to_string()));
    }
    if !request.rate.is_finite() || request.rate <= 0.0 {
        return Err(ReadAloudError::Validation(format!(
            "Rate must be a positive finite number, got {}",
            request.rate
        )));
    }
    if !request.pitch.is_finite() || request.pitch <= 0.0 {
        return Err(ReadAloudError::Validation(format!(
            "Pitch must be a positive finite number, got {}",
            request.pitch
        )));
    }
    if !request.volume.is_finite() || !(0.0..=1.0).contains(&request.volume) {
        return Err(ReadAloudError::Validation(format!(
            "Volume must be within 0.0-1.0, got {}",
            request.volume
        )));
    }
    Ok(())
}
