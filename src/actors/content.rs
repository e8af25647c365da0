//! Per-tab content actor
//!
//! Owns the playback engine for one tab. Runs a single-threaded event loop
//! over its bus inbox; between messages it polls the platform engine so
//! end-of-utterance and failure callbacks feed back into the state machine.
//! Lifecycle events are relayed to the popup and background coordinators as
//! fire-and-forget pushes.

use crate::bus::{Address, Envelope, Message, MessageBus, Reply, TabId};
use crate::extract::TextSource;
use crate::provision::Injector;
use crate::speech::{Reader, ReaderEvent, ReaderEventKind, SpeechRequest, Synth};
use crate::{ReadAloudError, Result};
use log::{debug, info, warn};
use std::thread;
use std::time::Duration;

/// How often the loop polls the platform engine while idle on the inbox
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Spawn a content actor for a tab
///
/// The inbox is registered before the thread starts, so a command sent
/// immediately after this returns will be delivered.
pub fn spawn(
    bus: MessageBus,
    tab: TabId,
    synth: Box<dyn Synth>,
    source: Box<dyn TextSource>,
) -> thread::JoinHandle<()> {
    let inbox = bus.register(Address::Content(tab));
    thread::spawn(move || run(bus, tab, inbox, synth, source))
}

fn run(
    bus: MessageBus,
    tab: TabId,
    inbox: flume::Receiver<Envelope>,
    synth: Box<dyn Synth>,
    source: Box<dyn TextSource>,
) {
    let mut reader = Reader::new(synth);
    wire_relays(&mut reader, &bus);
    info!("Content context ready in tab {}", tab);

    loop {
        match inbox.recv_timeout(POLL_INTERVAL) {
            Ok(envelope) => {
                handle(envelope, &mut reader, &bus, source.as_ref());
                reader.poll();
            }
            Err(flume::RecvTimeoutError::Timeout) => reader.poll(),
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    // Torn down (navigation/unload): any in-flight utterance is abandoned,
    // not gracefully stopped.
    debug!("Content context in tab {} torn down", tab);
}

/// Relay every reader lifecycle event to the coordinator surfaces
///
/// A closed popup or a missing listener is normal; such pushes are dropped
/// and logged.
fn wire_relays(reader: &mut Reader, bus: &MessageBus) {
    for kind in [
        ReaderEventKind::Started,
        ReaderEventKind::Ended,
        ReaderEventKind::Stopped,
        ReaderEventKind::Paused,
        ReaderEventKind::Resumed,
        ReaderEventKind::Errored,
    ] {
        let bus = bus.clone();
        reader.on(
            kind,
            Box::new(move |event| {
                let message = match event {
                    ReaderEvent::Started => Message::SpeechStarted,
                    ReaderEvent::Ended => Message::SpeechEnded,
                    ReaderEvent::Stopped => Message::SpeechStopped,
                    ReaderEvent::Paused => Message::SpeechPaused,
                    ReaderEvent::Resumed => Message::SpeechResumed,
                    ReaderEvent::Errored { reason } => Message::SpeechError {
                        reason: reason.clone(),
                    },
                };
                for target in [Address::Popup, Address::Background] {
                    if let Err(e) = bus.post(target, &message) {
                        debug!("No listener at {:?}: {}", target, e);
                    }
                }
                Ok(())
            }),
        );
    }
}

fn handle(envelope: Envelope, reader: &mut Reader, bus: &MessageBus, source: &dyn TextSource) {
    let message = match envelope.message() {
        Ok(message) => message,
        Err(e) => {
            warn!("Undecodable message in content inbox: {}", e);
            envelope.respond(Err(e));
            return;
        }
    };

    debug!("Content context handling {:?}", message);
    let outcome = match message {
        Message::Ping => Ok(Reply::Ack),
        Message::SpeakText(request) => speak(reader, source, request).map(|_| Reply::Ack),
        Message::StopSpeech => reader.stop().map(|_| Reply::Ack),
        Message::PauseSpeech => reader.pause().map(|_| Reply::Ack),
        Message::ResumeSpeech => reader.resume().map(|_| Reply::Ack),
        Message::GetSpeechState => {
            let state = reader.playback_state();
            // Keep every coordinator fresh, not just the one asking
            for target in [Address::Popup, Address::Background] {
                if let Err(e) = bus.post(target, &Message::UpdateSpeechState(state)) {
                    debug!("No listener at {:?}: {}", target, e);
                }
            }
            Ok(Reply::State(state))
        }
        Message::GetVoices => {
            let voices = reader.voices();
            if let Err(e) = bus.post(Address::Popup, &Message::UpdateVoices(voices.clone())) {
                debug!("No popup for the voice catalog: {}", e);
            }
            Ok(Reply::Voices(voices))
        }
        other => {
            warn!("Content context ignoring {:?}", other);
            Ok(Reply::Ack)
        }
    };
    envelope.respond(outcome);
}

/// Execute a speak command, extracting the page text when none was sent
fn speak(reader: &mut Reader, source: &dyn TextSource, mut request: SpeechRequest) -> Result<()> {
    if request.text.is_empty() {
        request.text = source.extract().ok_or_else(|| {
            ReadAloudError::Validation("No readable text in this tab".to_string())
        })?;
    }
    reader.speak(&request)
}

/// Factory for platform engines, one per provisioned content context
pub type SynthFactory = Box<dyn Fn() -> Result<Box<dyn Synth>> + Send + Sync>;

/// Factory for text sources, one per provisioned content context
pub type SourceFactory = Box<dyn Fn(TabId) -> Box<dyn TextSource> + Send + Sync>;

/// The real injector: spawns a content actor into the target tab
pub struct ContentInjector {
    bus: MessageBus,
    synth_factory: SynthFactory,
    source_factory: SourceFactory,
}

impl ContentInjector {
    pub fn new(bus: MessageBus, synth_factory: SynthFactory, source_factory: SourceFactory) -> Self {
        Self {
            bus,
            synth_factory,
            source_factory,
        }
    }
}

impl Injector for ContentInjector {
    fn inject(&self, tab: TabId) -> Result<()> {
        let synth = (self.synth_factory)()?;
        let source = (self.source_factory)(tab);
        spawn(self.bus.clone(), tab, synth, source);
        Ok(())
    }
}
