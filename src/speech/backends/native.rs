//! Native TTS backend using the tts crate
//!
//! Bridges to Speech Dispatcher on Linux, AVFoundation on macOS and SAPI on
//! Windows through the `tts` crate's native bindings. Feature support varies
//! per platform, so every knob is gated on `supported_features`.

use crate::speech::synth::{Synth, SynthEvent, Utterance, Voice};
use crate::{ReadAloudError, Result};
use log::{debug, warn};
use tts::Tts as TtsCrate;

/// Native TTS backend
pub struct NativeSynth {
    /// The tts crate's engine instance
    tts: TtsCrate,

    /// Whether an utterance has been submitted and not yet reported ended
    submitted: bool,
}

impl NativeSynth {
    /// Create a new native TTS synthesizer
    pub fn new() -> Result<Self> {
        debug!("Creating native TTS backend");

        let tts = TtsCrate::default()
            .map_err(|e| ReadAloudError::Playback(format!("Failed to initialize TTS: {}", e)))?;

        Ok(Self {
            tts,
            submitted: false,
        })
    }

    /// Convert a relative rate multiplier (1.0 = normal) to the engine range
    fn convert_rate(&self, rate: f32) -> f32 {
        (self.tts.normal_rate() * rate).clamp(self.tts.min_rate(), self.tts.max_rate())
    }

    /// Convert a relative pitch multiplier (1.0 = normal) to the engine range
    fn convert_pitch(&self, pitch: f32) -> f32 {
        (self.tts.normal_pitch() * pitch).clamp(self.tts.min_pitch(), self.tts.max_pitch())
    }

    /// Convert a 0.0-1.0 volume to the engine range
    fn convert_volume(&self, volume: f32) -> f32 {
        let min = self.tts.min_volume();
        let max = self.tts.max_volume();
        min + (max - min) * volume
    }

    /// Apply request parameters to the engine, skipping unsupported knobs
    fn apply_parameters(&mut self, utterance: &Utterance) -> Result<()> {
        let features = self.tts.supported_features();

        if features.rate {
            let rate = self.convert_rate(utterance.rate);
            self.tts
                .set_rate(rate)
                .map_err(|e| ReadAloudError::Playback(format!("Failed to set rate: {}", e)))?;
        } else {
            warn!("Rate control not supported on this platform");
        }

        if features.pitch {
            let pitch = self.convert_pitch(utterance.pitch);
            self.tts
                .set_pitch(pitch)
                .map_err(|e| ReadAloudError::Playback(format!("Failed to set pitch: {}", e)))?;
        } else {
            warn!("Pitch control not supported on this platform");
        }

        if features.volume {
            let volume = self.convert_volume(utterance.volume);
            self.tts
                .set_volume(volume)
                .map_err(|e| ReadAloudError::Playback(format!("Failed to set volume: {}", e)))?;
        } else {
            warn!("Volume control not supported on this platform");
        }

        if let Some(requested) = &utterance.voice {
            if features.voice {
                let voices = self.tts.voices().map_err(|e| {
                    ReadAloudError::Playback(format!("Failed to get voices: {}", e))
                })?;
                if let Some(voice) = voices.iter().find(|v| v.name() == requested.name) {
                    debug!("Selecting voice {}", requested.name);
                    self.tts.set_voice(voice).map_err(|e| {
                        ReadAloudError::Playback(format!("Failed to set voice: {}", e))
                    })?;
                } else {
                    // The engine catalog moved under us; keep the default voice
                    debug!("Voice {} no longer available, using default", requested.name);
                }
            } else {
                warn!("Voice selection not supported on this platform");
            }
        }

        Ok(())
    }
}

impl Synth for NativeSynth {
    fn submit(&mut self, utterance: &Utterance) -> Result<()> {
        self.apply_parameters(utterance)?;

        debug!("Submitting {} chars to native TTS", utterance.text.len());
        self.tts
            .speak(utterance.text.clone(), true)
            .map_err(|e| ReadAloudError::Playback(format!("Speak failed: {}", e)))?;
        self.submitted = true;

        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        self.submitted = false;

        let features = self.tts.supported_features();
        if !features.stop {
            warn!("Stop not supported on this platform");
            return Ok(());
        }

        self.tts
            .stop()
            .map_err(|e| ReadAloudError::Playback(format!("Cancel failed: {}", e)))?;

        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        // The tts crate exposes no pause primitive on any platform
        Err(ReadAloudError::Playback(
            "Pause is not supported by the native backend".to_string(),
        ))
    }

    fn resume(&mut self) -> Result<()> {
        Err(ReadAloudError::Playback(
            "Resume is not supported by the native backend".to_string(),
        ))
    }

    fn is_speaking(&self) -> bool {
        if !self.tts.supported_features().is_speaking {
            return self.submitted;
        }
        self.tts.is_speaking().unwrap_or(false)
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<Voice> {
        match self.tts.voices() {
            Ok(voices) => voices
                .iter()
                .map(|v| Voice {
                    name: v.name(),
                    lang: v.language().to_string(),
                })
                .collect(),
            Err(e) => {
                debug!("Voice catalog not available yet: {}", e);
                Vec::new()
            }
        }
    }

    fn drain_events(&mut self) -> Vec<SynthEvent> {
        if !self.submitted {
            return Vec::new();
        }

        // No end-of-utterance callback is wired up, so completion is
        // detected by polling the engine between messages.
        let still_speaking = if self.tts.supported_features().is_speaking {
            self.tts.is_speaking().unwrap_or(false)
        } else {
            false
        };

        if still_speaking {
            Vec::new()
        } else {
            self.submitted = false;
            vec![SynthEvent::Ended]
        }
    }
}
