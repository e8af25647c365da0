//! Persisted speech settings
//!
//! A flat record of user preferences loaded at actor startup and saved
//! fire-and-forget when the popup changes something. Persistence failures
//! are never surfaced; the system falls back to documented defaults.

use ini::Ini;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// User speech preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsSettings {
    /// Preferred voice name; empty selects the platform default
    pub voice: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub lang: String,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            voice: String::new(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            lang: "en-US".to_string(),
        }
    }
}

/// INI-backed settings store (~/.readaloud.cfg)
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store at the default location in the user's home directory
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: home.join(".readaloud.cfg"),
        }
    }

    /// Store at an explicit path
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the backing file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load settings from disk
    ///
    /// Never fails: a missing or unreadable file yields the defaults, with
    /// the cause logged.
    pub fn load(&self) -> TtsSettings {
        if !self.path.exists() {
            info!("No settings file at {:?}, using defaults", self.path);
            return TtsSettings::default();
        }

        let ini = match Ini::load_from_file(&self.path) {
            Ok(ini) => ini,
            Err(e) => {
                error!("Failed to read settings from {:?}: {}", self.path, e);
                info!("Proceeding with default settings");
                return TtsSettings::default();
            }
        };

        let defaults = TtsSettings::default();
        let settings = TtsSettings {
            voice: get_string(&ini, "voice", &defaults.voice),
            rate: get_float(&ini, "rate", defaults.rate),
            pitch: get_float(&ini, "pitch", defaults.pitch),
            volume: get_float(&ini, "volume", defaults.volume),
            lang: get_string(&ini, "lang", &defaults.lang),
        };
        debug!("Loaded settings from {:?}", self.path);
        settings
    }

    /// Save settings to disk
    ///
    /// Best-effort: failures are logged, never returned.
    pub fn save(&self, settings: &TtsSettings) {
        let mut ini = Ini::new();
        ini.with_section(Some("speech"))
            .set("voice", settings.voice.clone())
            .set("rate", settings.rate.to_string())
            .set("pitch", settings.pitch.to_string())
            .set("volume", settings.volume.to_string())
            .set("lang", settings.lang.clone());

        match ini.write_to_file(&self.path) {
            Ok(()) => debug!("Saved settings to {:?}", self.path),
            Err(e) => error!("Failed to save settings to {:?}: {}", self.path, e),
        }
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

fn get_string(ini: &Ini, key: &str, default: &str) -> String {
    ini.get_from(Some("speech"), key)
        .unwrap_or(default)
        .to_string()
}

fn get_float(ini: &Ini, key: &str, default: f32) -> f32 {
    ini.get_from(Some("speech"), key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = TtsSettings::default();
        assert_eq!(settings.voice, "");
        assert_eq!(settings.rate, 1.0);
        assert_eq!(settings.pitch, 1.0);
        assert_eq!(settings.volume, 1.0);
        assert_eq!(settings.lang, "en-US");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let store = SettingsStore::with_path(PathBuf::from("/nonexistent/readaloud.cfg"));
        assert_eq!(store.load(), TtsSettings::default());
    }
}
