//! Background actor
//!
//! The long-lived singleton. Owns the persisted settings as an explicit
//! field (no ambient global), triggers playback in tabs the way a context
//! menu click would, and keeps a shadow copy of playback state fed by
//! pushed lifecycle events.

use crate::bus::{Address, Envelope, Message, MessageBus, Reply, TabId};
use crate::coordinator::Coordinator;
use crate::provision::{deliver, Injector};
use crate::settings::{SettingsStore, TtsSettings};
use crate::speech::{PlaybackState, SpeechRequest};
use crate::{ReadAloudError, Result};
use log::{debug, info, warn};
use std::time::Duration;

/// The background coordinator actor
pub struct Background {
    bus: MessageBus,
    inbox: flume::Receiver<Envelope>,
    settings: TtsSettings,
    store: SettingsStore,
    coordinator: Coordinator,
    injector: Box<dyn Injector>,
}

impl Background {
    /// Register the background actor and load persisted settings
    pub fn new(bus: MessageBus, store: SettingsStore, injector: Box<dyn Injector>) -> Self {
        let inbox = bus.register(Address::Background);
        let settings = store.load();
        info!("Background actor ready");

        Self {
            bus,
            inbox,
            settings,
            store,
            coordinator: Coordinator::new(),
            injector,
        }
    }

    /// Read a tab aloud (the context-menu entry point)
    ///
    /// Builds a speech request from the persisted settings with empty text,
    /// leaving extraction to the content context, and delivers it through
    /// the provisioning protocol.
    pub fn read_tab(&mut self, tab: TabId) -> Result<()> {
        self.coordinator.clear_status();
        let request = SpeechRequest::from_settings(String::new(), &self.settings);
        self.command(tab, Message::SpeakText(request))
    }

    pub fn stop_tab(&mut self, tab: TabId) -> Result<()> {
        self.command(tab, Message::StopSpeech)
    }

    pub fn pause_tab(&mut self, tab: TabId) -> Result<()> {
        self.command(tab, Message::PauseSpeech)
    }

    pub fn resume_tab(&mut self, tab: TabId) -> Result<()> {
        self.command(tab, Message::ResumeSpeech)
    }

    fn command(&mut self, tab: TabId, message: Message) -> Result<()> {
        match deliver(&self.bus, self.injector.as_ref(), tab, &message) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Command for tab {} failed: {}", tab, e);
                self.coordinator.set_status(short_status(&e));
                Err(e)
            }
        }
    }

    /// Process at most one inbound message, waiting up to `timeout`
    ///
    /// Returns the message that was handled so callers can watch for
    /// lifecycle milestones, or `None` when the wait timed out.
    pub fn pump(&mut self, timeout: Duration) -> Result<Option<Message>> {
        match self.inbox.recv_timeout(timeout) {
            Ok(envelope) => self.handle(envelope).map(Some),
            Err(flume::RecvTimeoutError::Timeout) => Ok(None),
            Err(flume::RecvTimeoutError::Disconnected) => Err(ReadAloudError::Delivery(
                "Background inbox closed".to_string(),
            )),
        }
    }

    fn handle(&mut self, envelope: Envelope) -> Result<Message> {
        let message = match envelope.message() {
            Ok(message) => message,
            Err(e) => {
                warn!("Undecodable message in background inbox: {}", e);
                envelope.respond(Err(e));
                return Err(ReadAloudError::Delivery(
                    "Undecodable message in background inbox".to_string(),
                ));
            }
        };

        match &message {
            Message::SaveSettings(settings) => {
                debug!("Persisting updated settings");
                self.settings = settings.clone();
                self.store.save(settings);
            }
            other => self.coordinator.apply(other),
        }
        envelope.respond(Ok(Reply::Ack));

        Ok(message)
    }

    /// Shadow playback state
    pub fn state(&self) -> PlaybackState {
        self.coordinator.state()
    }

    /// User-visible status line, if any
    pub fn status(&self) -> Option<&str> {
        self.coordinator.status()
    }

    /// Currently held settings
    pub fn settings(&self) -> &TtsSettings {
        &self.settings
    }
}

/// Reduce an error to the short status string shown to the user
fn short_status(e: &ReadAloudError) -> String {
    match e {
        ReadAloudError::Provisioning(_) => "Could not reach this tab to read it".to_string(),
        ReadAloudError::Validation(reason) => reason.clone(),
        _ => "Could not control playback in this tab".to_string(),
    }
}
