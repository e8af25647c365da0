//! Popup actor
//!
//! Transient controller surface: exists only while its UI is open. Because
//! a popup opened mid-playback has missed every pushed event, it pulls the
//! playback state once at startup and rides pushes from then on.

use crate::bus::{Address, Envelope, Message, MessageBus, Reply, TabId};
use crate::coordinator::Coordinator;
use crate::provision::{deliver, Injector};
use crate::settings::{SettingsStore, TtsSettings};
use crate::speech::{PlaybackState, SpeechRequest, Voice};
use crate::{ReadAloudError, Result};
use log::{debug, info, warn};
use std::time::Duration;

/// The popup coordinator actor
pub struct Popup {
    bus: MessageBus,
    inbox: flume::Receiver<Envelope>,
    tab: TabId,
    settings: TtsSettings,
    voices: Vec<Voice>,
    coordinator: Coordinator,
    injector: Box<dyn Injector>,
}

impl Popup {
    /// Open the popup against a tab
    ///
    /// Registers the popup address (replacing a stale instance), loads the
    /// persisted settings, and performs the one startup pull of playback
    /// state and the voice catalog.
    pub fn open(
        bus: MessageBus,
        tab: TabId,
        store: SettingsStore,
        injector: Box<dyn Injector>,
    ) -> Self {
        let inbox = bus.register(Address::Popup);
        let settings = store.load();
        let mut popup = Self {
            bus,
            inbox,
            tab,
            settings,
            voices: Vec::new(),
            coordinator: Coordinator::new(),
            injector,
        };
        popup.refresh();
        info!("Popup open against tab {}", popup.tab);
        popup
    }

    /// One-time pull of state and voices at startup
    fn refresh(&mut self) {
        match deliver(
            &self.bus,
            self.injector.as_ref(),
            self.tab,
            &Message::GetSpeechState,
        ) {
            Ok(Reply::State(state)) => self.coordinator.replace(state),
            Ok(other) => warn!("Unexpected reply to state query: {:?}", other),
            Err(e) => {
                warn!("Could not query playback state in tab {}: {}", self.tab, e);
                self.coordinator
                    .set_status("Could not reach this tab to read it");
                return;
            }
        }

        match self
            .bus
            .send_to(Address::Content(self.tab), &Message::GetVoices)
        {
            Ok(Reply::Voices(voices)) => self.voices = voices,
            Ok(other) => warn!("Unexpected reply to voice query: {:?}", other),
            Err(e) => debug!("Voice catalog unavailable: {}", e),
        }
    }

    /// Read the tab aloud (the play button)
    pub fn read(&mut self) -> Result<()> {
        self.coordinator.clear_status();
        let request = SpeechRequest::from_settings(String::new(), &self.settings);
        self.command(Message::SpeakText(request))
    }

    pub fn pause(&mut self) -> Result<()> {
        self.command(Message::PauseSpeech)
    }

    pub fn resume(&mut self) -> Result<()> {
        self.command(Message::ResumeSpeech)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.command(Message::StopSpeech)
    }

    fn command(&mut self, message: Message) -> Result<()> {
        match deliver(&self.bus, self.injector.as_ref(), self.tab, &message) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Command for tab {} failed: {}", self.tab, e);
                self.coordinator
                    .set_status("Could not reach this tab to read it");
                Err(e)
            }
        }
    }

    /// Process at most one inbound message, waiting up to `timeout`
    pub fn pump(&mut self, timeout: Duration) -> Result<Option<Message>> {
        match self.inbox.recv_timeout(timeout) {
            Ok(envelope) => self.handle(envelope).map(Some),
            Err(flume::RecvTimeoutError::Timeout) => Ok(None),
            Err(flume::RecvTimeoutError::Disconnected) => {
                Err(ReadAloudError::Delivery("Popup inbox closed".to_string()))
            }
        }
    }

    fn handle(&mut self, envelope: Envelope) -> Result<Message> {
        let message = match envelope.message() {
            Ok(message) => message,
            Err(e) => {
                warn!("Undecodable message in popup inbox: {}", e);
                envelope.respond(Err(e));
                return Err(ReadAloudError::Delivery(
                    "Undecodable message in popup inbox".to_string(),
                ));
            }
        };

        match &message {
            Message::UpdateVoices(voices) => self.voices = voices.clone(),
            other => self.coordinator.apply(other),
        }
        envelope.respond(Ok(Reply::Ack));

        Ok(message)
    }

    /// Replace the popup's working settings and persist them
    ///
    /// Persistence is fire-and-forget through the background actor; a
    /// failed push is logged and dropped.
    pub fn update_settings(&mut self, settings: TtsSettings) {
        self.settings = settings;
        if let Err(e) = self
            .bus
            .post(Address::Background, &Message::SaveSettings(self.settings.clone()))
        {
            warn!("Settings not saved: {}", e);
        }
    }

    pub fn settings(&self) -> &TtsSettings {
        &self.settings
    }

    /// Voice catalog as last reported by the content context
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Shadow playback state
    pub fn state(&self) -> PlaybackState {
        self.coordinator.state()
    }

    /// User-visible status line, if any
    pub fn status(&self) -> Option<&str> {
        self.coordinator.status()
    }

    /// Close the popup, discarding shadow state
    pub fn close(self) {
        self.bus.unregister(Address::Popup);
        debug!("Popup closed");
    }
}
