//! Integration tests for the cross-context coordination protocol
//!
//! These drive real actor threads over the message bus: provisioning a
//! missing content context on demand, pushing lifecycle events back to the
//! coordinators, and pulling state when a popup opens mid-playback.

use readaloud::actors::{Background, ContentInjector, Popup};
use readaloud::bus::{Address, Message, MessageBus, Reply, TabId};
use readaloud::extract::{PlainTextSource, TextSource};
use readaloud::provision::{deliver, Injector};
use readaloud::settings::{SettingsStore, TtsSettings};
use readaloud::speech::backends::null::{NullSynth, NullSynthHandle};
use readaloud::speech::{PlaybackState, SpeechRequest, Synth, Voice, INTERRUPTED};
use readaloud::{ReadAloudError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counts injections, delegating to an inner injector
struct CountingInjector {
    inner: Box<dyn Injector>,
    count: Arc<AtomicUsize>,
}

impl CountingInjector {
    fn new(inner: Box<dyn Injector>) -> (Self, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                count: Arc::clone(&count),
            },
            count,
        )
    }
}

impl Injector for CountingInjector {
    fn inject(&self, tab: TabId) -> Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.inner.inject(tab)
    }
}

/// Injection that fails outright
struct FailingInjector;

impl Injector for FailingInjector {
    fn inject(&self, _tab: TabId) -> Result<()> {
        Err(ReadAloudError::Other("injection refused".to_string()))
    }
}

/// Injection that "succeeds" without provisioning anything
struct NoopInjector;

impl Injector for NoopInjector {
    fn inject(&self, _tab: TabId) -> Result<()> {
        Ok(())
    }
}

/// Injector provisioning content actors over auto-finishing silent synths
fn silent_injector(bus: &MessageBus, page_text: &str) -> ContentInjector {
    let page_text = page_text.to_string();
    ContentInjector::new(
        bus.clone(),
        Box::new(|| Ok(Box::new(NullSynth::new()) as Box<dyn Synth>)),
        Box::new(move |_tab| {
            Box::new(PlainTextSource::new(page_text.clone())) as Box<dyn TextSource>
        }),
    )
}

fn temp_store(dir: &tempfile::TempDir) -> SettingsStore {
    SettingsStore::with_path(dir.path().join("readaloud.cfg"))
}

fn pump_until(background: &mut Background, want: fn(&Message) -> bool) -> Message {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if let Some(message) = background.pump(Duration::from_millis(50)).unwrap() {
            if want(&message) {
                return message;
            }
        }
    }
    panic!("Timed out waiting for a message");
}

/// Spawn a manually driven content context and return its synth handle
fn spawn_manual_content(bus: &MessageBus, tab: TabId, page_text: &str) -> NullSynthHandle {
    let (synth, handle) = NullSynth::manual();
    readaloud::actors::content::spawn(
        bus.clone(),
        tab,
        Box::new(synth),
        Box::new(PlainTextSource::new(page_text)),
    );
    handle
}

fn request(text: &str) -> SpeechRequest {
    SpeechRequest {
        text: text.to_string(),
        voice: String::new(),
        rate: 1.0,
        pitch: 1.0,
        volume: 1.0,
        lang: "en-US".to_string(),
    }
}

#[test]
fn test_read_provisions_missing_content_context() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    let (injector, injections) =
        CountingInjector::new(Box::new(silent_injector(&bus, "Hello from tab seven")));
    let mut background = Background::new(bus.clone(), temp_store(&dir), Box::new(injector));

    assert!(!bus.is_registered(Address::Content(7)));
    background.read_tab(7).unwrap();

    // Probe failed exactly once, provisioning ran exactly once
    assert_eq!(injections.load(Ordering::SeqCst), 1);
    assert!(bus.is_registered(Address::Content(7)));

    pump_until(&mut background, |m| *m == Message::SpeechStarted);
    assert_eq!(background.state(), PlaybackState::playing());

    // The silent backend finishes instantly; the end event follows
    pump_until(&mut background, |m| *m == Message::SpeechEnded);
    assert_eq!(background.state(), PlaybackState::idle());
    assert_eq!(background.status(), None);
}

#[test]
fn test_live_context_is_not_reprovisioned() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    let (injector, injections) =
        CountingInjector::new(Box::new(silent_injector(&bus, "page text")));
    let mut background = Background::new(bus.clone(), temp_store(&dir), Box::new(injector));

    background.read_tab(3).unwrap();
    background.read_tab(3).unwrap();

    assert_eq!(injections.load(Ordering::SeqCst), 1);

    // Exactly one start per command, never two simultaneous utterances
    let mut starts = 0;
    let deadline = Instant::now() + Duration::from_millis(500);
    while Instant::now() < deadline {
        if let Some(Message::SpeechStarted) = background.pump(Duration::from_millis(25)).unwrap() {
            starts += 1;
        }
    }
    assert_eq!(starts, 2);
}

#[test]
fn test_failed_injection_is_a_terminal_provisioning_error() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    let (injector, injections) = CountingInjector::new(Box::new(FailingInjector));
    let mut background = Background::new(bus, temp_store(&dir), Box::new(injector));

    let result = background.read_tab(9);

    assert!(matches!(result, Err(ReadAloudError::Provisioning(_))));
    assert_eq!(injections.load(Ordering::SeqCst), 1);
    assert_eq!(background.status(), Some("Could not reach this tab to read it"));
}

#[test]
fn test_failure_after_provisioning_does_not_retry() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    let (injector, injections) = CountingInjector::new(Box::new(NoopInjector));
    let mut background = Background::new(bus, temp_store(&dir), Box::new(injector));

    let result = background.read_tab(9);

    // Injection "succeeded" but the context never registered: one attempt,
    // then a terminal error instead of a retry loop
    assert!(matches!(result, Err(ReadAloudError::Provisioning(_))));
    assert_eq!(injections.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unreadable_tab_surfaces_the_validation_reason() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    // The provisioned context comes up fine; its page just has no text
    let injector = silent_injector(&bus, "   ");
    let mut background = Background::new(bus, temp_store(&dir), Box::new(injector));

    let result = background.read_tab(8);

    // The content-side validation failure keeps its kind across the wire
    // and reaches the user verbatim, not as a generic delivery message
    assert!(matches!(result, Err(ReadAloudError::Validation(_))));
    assert_eq!(background.status(), Some("No readable text in this tab"));
}

#[test]
fn test_pause_while_idle_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    spawn_manual_content(&bus, 7, "page text");
    let mut background = Background::new(bus.clone(), temp_store(&dir), Box::new(FailingInjector));

    background.pause_tab(7).unwrap();

    // Engine still idle, and no event was pushed
    let reply = bus
        .send_to(Address::Content(7), &Message::GetSpeechState)
        .unwrap();
    assert_eq!(reply, Reply::State(PlaybackState::idle()));

    let mut pushed = Vec::new();
    let deadline = Instant::now() + Duration::from_millis(300);
    while Instant::now() < deadline {
        if let Some(message) = background.pump(Duration::from_millis(25)).unwrap() {
            pushed.push(message);
        }
    }
    assert!(!pushed.contains(&Message::SpeechPaused));
    assert_eq!(background.state(), PlaybackState::idle());
}

#[test]
fn test_popup_opened_mid_playback_pulls_state() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    let handle = spawn_manual_content(&bus, 7, "page text");
    handle.set_voices(vec![Voice {
        name: "Alice".to_string(),
        lang: "en-US".to_string(),
    }]);

    // Playback begins before the popup exists; every push so far is lost
    bus.send_to(Address::Content(7), &Message::SpeakText(request("long article")))
        .unwrap();

    let popup = Popup::open(bus, 7, temp_store(&dir), Box::new(FailingInjector));

    assert_eq!(popup.state(), PlaybackState::playing());
    assert_eq!(popup.voices().len(), 1);
    assert_eq!(popup.status(), None);
    popup.close();
}

#[test]
fn test_popup_controls_playback() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    let handle = spawn_manual_content(&bus, 4, "the page body");
    let mut popup = Popup::open(bus, 4, temp_store(&dir), Box::new(FailingInjector));

    popup.read().unwrap();
    assert_eq!(handle.last_text().as_deref(), Some("the page body"));

    let message = loop {
        if let Some(m) = popup.pump(Duration::from_millis(50)).unwrap() {
            break m;
        }
    };
    assert_eq!(message, Message::SpeechStarted);
    assert_eq!(popup.state(), PlaybackState::playing());

    popup.pause().unwrap();
    while popup.state() != PlaybackState::paused() {
        popup.pump(Duration::from_millis(50)).unwrap();
    }

    popup.resume().unwrap();
    while popup.state() != PlaybackState::playing() {
        popup.pump(Duration::from_millis(50)).unwrap();
    }

    popup.stop().unwrap();
    while popup.state() != PlaybackState::idle() {
        popup.pump(Duration::from_millis(50)).unwrap();
    }
    popup.close();
}

#[test]
fn test_interrupted_error_never_reaches_status_text() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    let handle = spawn_manual_content(&bus, 2, "page text");
    let mut background = Background::new(bus, temp_store(&dir), Box::new(FailingInjector));

    background.read_tab(2).unwrap();
    pump_until(&mut background, |m| *m == Message::SpeechStarted);

    handle.fail_utterance(INTERRUPTED);
    pump_until(&mut background, |m| {
        matches!(m, Message::SpeechError { reason } if reason == INTERRUPTED)
    });

    // Shadow reset, no user-visible failure
    assert_eq!(background.state(), PlaybackState::idle());
    assert_eq!(background.status(), None);
}

#[test]
fn test_real_error_surfaces_as_status() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    let handle = spawn_manual_content(&bus, 2, "page text");
    let mut background = Background::new(bus, temp_store(&dir), Box::new(FailingInjector));

    background.read_tab(2).unwrap();
    pump_until(&mut background, |m| *m == Message::SpeechStarted);

    handle.fail_utterance("audio-busy");
    pump_until(&mut background, |m| matches!(m, Message::SpeechError { .. }));

    assert_eq!(background.state(), PlaybackState::idle());
    assert_eq!(background.status(), Some("Speech error: audio-busy"));
}

#[test]
fn test_popup_saves_settings_through_background() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    spawn_manual_content(&bus, 5, "page text");
    let mut background = Background::new(bus.clone(), temp_store(&dir), Box::new(FailingInjector));
    let mut popup = Popup::open(bus, 5, temp_store(&dir), Box::new(FailingInjector));

    let changed = TtsSettings {
        voice: "Alice".to_string(),
        rate: 1.5,
        pitch: 0.9,
        volume: 0.8,
        lang: "en-GB".to_string(),
    };
    popup.update_settings(changed.clone());

    pump_until(&mut background, |m| matches!(m, Message::SaveSettings(_)));
    assert_eq!(background.settings(), &changed);
    assert_eq!(temp_store(&dir).load(), changed);
    popup.close();
}

#[test]
fn test_one_tab_failure_does_not_affect_another() {
    let dir = tempfile::tempdir().unwrap();
    let bus = MessageBus::new();
    let sick = spawn_manual_content(&bus, 1, "page one");
    spawn_manual_content(&bus, 2, "page two");
    let mut background = Background::new(bus.clone(), temp_store(&dir), Box::new(FailingInjector));

    background.read_tab(1).unwrap();
    pump_until(&mut background, |m| *m == Message::SpeechStarted);
    sick.fail_utterance("synthesis-failed");
    pump_until(&mut background, |m| matches!(m, Message::SpeechError { .. }));

    // Tab 2 keeps working
    background.read_tab(2).unwrap();
    pump_until(&mut background, |m| *m == Message::SpeechStarted);
    assert_eq!(background.state(), PlaybackState::playing());
}

#[test]
fn test_closed_tab_commands_fall_back_to_provisioning() {
    let bus = MessageBus::new();
    let injector = silent_injector(&bus, "resurrected page");

    // Context exists, then the tab navigates away
    spawn_manual_content(&bus, 6, "original page");
    bus.unregister(Address::Content(6));

    let reply = deliver(&bus, &injector, 6, &Message::GetSpeechState).unwrap();
    assert_eq!(reply, Reply::State(PlaybackState::idle()));
    assert!(bus.is_registered(Address::Content(6)));
}
