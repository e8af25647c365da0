//! Settings persistence tests
//!
//! The store must never fail a load: anything wrong with the backing file
//! degrades to the documented defaults.

use readaloud::settings::{SettingsStore, TtsSettings};
use std::fs;

#[test]
fn test_save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::with_path(dir.path().join("readaloud.cfg"));

    let settings = TtsSettings {
        voice: "Alice".to_string(),
        rate: 1.25,
        pitch: 0.75,
        volume: 0.5,
        lang: "fr-FR".to_string(),
    };
    store.save(&settings);

    assert_eq!(store.load(), settings);
}

#[test]
fn test_missing_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::with_path(dir.path().join("readaloud.cfg"));

    assert_eq!(store.load(), TtsSettings::default());
}

#[test]
fn test_unrelated_sections_load_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readaloud.cfg");
    fs::write(&path, "[other]\nrate = 9\n").unwrap();

    let store = SettingsStore::with_path(path);
    assert_eq!(store.load(), TtsSettings::default());
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readaloud.cfg");
    fs::write(&path, "[speech]\nrate = 1.5\n").unwrap();

    let store = SettingsStore::with_path(path);
    let settings = store.load();

    assert_eq!(settings.rate, 1.5);
    assert_eq!(settings.pitch, 1.0);
    assert_eq!(settings.lang, "en-US");
}

#[test]
fn test_unparseable_values_fall_back_per_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readaloud.cfg");
    fs::write(&path, "[speech]\nrate = fast\nvolume = 0.25\n").unwrap();

    let store = SettingsStore::with_path(path);
    let settings = store.load();

    assert_eq!(settings.rate, 1.0);
    assert_eq!(settings.volume, 0.25);
}
