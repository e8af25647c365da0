//! Addressed message transport between actors
//!
//! Three independently-lifecycled actors (background, popup, per-tab content
//! contexts) share no memory; everything crosses this bus. Each actor
//! registers an inbox under its address and every message body travels as
//! JSON, so a receiver can only ever observe serialized data, never a
//! reference into another actor's state.
//!
//! Sends are at-most-once and unqueued: a message to an address with no live
//! actor fails immediately, and the caller owns any retry policy (see the
//! provisioning protocol). Request/response pairing comes from a per-send
//! reply channel rather than correlation identifiers; there is exactly one
//! outstanding request per `send_to` call.

use crate::settings::TtsSettings;
use crate::speech::{PlaybackState, SpeechRequest, Voice};
use crate::{ReadAloudError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Identifier of one browser-tab-like content slot
pub type TabId = u32;

/// The three kinds of delivery targets
///
/// Background is a long-lived singleton, the popup exists zero-or-one at a
/// time, and content contexts are created lazily per tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Address {
    Background,
    Popup,
    Content(TabId),
}

/// Wire messages exchanged between actors
///
/// Commands flow coordinator to content, events flow content to
/// coordinators, and settings flow popup to background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    // Commands (coordinator -> content)
    SpeakText(SpeechRequest),
    StopSpeech,
    PauseSpeech,
    ResumeSpeech,
    GetSpeechState,
    GetVoices,
    /// Zero-effect liveness probe
    Ping,

    // Events (content -> coordinators)
    SpeechStarted,
    SpeechEnded,
    SpeechStopped,
    SpeechPaused,
    SpeechResumed,
    SpeechError { reason: String },
    UpdateSpeechState(PlaybackState),
    UpdateVoices(Vec<Voice>),

    // Settings (popup -> background)
    SaveSettings(TtsSettings),
}

/// Successful delivery acknowledgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    /// Message handled, nothing to report
    Ack,
    /// Answer to `GetSpeechState`
    State(PlaybackState),
    /// Answer to `GetVoices`
    Voices(Vec<Voice>),
}

/// Wire form of a handler failure
///
/// Keeps the error taxonomy intact across the actor boundary, so a
/// content-side validation failure still reads as one on the commanding
/// side instead of collapsing into a generic delivery error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum WireErrorKind {
    Validation,
    Playback,
    Delivery,
    Provisioning,
    Config,
    Other,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireError {
    kind: WireErrorKind,
    message: String,
}

impl WireError {
    fn from_error(e: &ReadAloudError) -> Self {
        let (kind, message) = match e {
            ReadAloudError::Validation(m) => (WireErrorKind::Validation, m.clone()),
            ReadAloudError::Playback(m) => (WireErrorKind::Playback, m.clone()),
            ReadAloudError::Delivery(m) => (WireErrorKind::Delivery, m.clone()),
            ReadAloudError::Provisioning(m) => (WireErrorKind::Provisioning, m.clone()),
            ReadAloudError::Config(m) => (WireErrorKind::Config, m.clone()),
            other => (WireErrorKind::Other, other.to_string()),
        };
        Self { kind, message }
    }

    fn into_error(self) -> ReadAloudError {
        match self.kind {
            WireErrorKind::Validation => ReadAloudError::Validation(self.message),
            WireErrorKind::Playback => ReadAloudError::Playback(self.message),
            WireErrorKind::Delivery => ReadAloudError::Delivery(self.message),
            WireErrorKind::Provisioning => ReadAloudError::Provisioning(self.message),
            WireErrorKind::Config => ReadAloudError::Config(self.message),
            WireErrorKind::Other => ReadAloudError::Other(self.message),
        }
    }
}

/// A delivered message as seen by the receiving actor
pub struct Envelope {
    body: String,
    reply: Option<flume::Sender<std::result::Result<String, String>>>,
}

impl Envelope {
    /// Decode the wire body
    pub fn message(&self) -> Result<Message> {
        serde_json::from_str(&self.body).map_err(Into::into)
    }

    /// Whether the sender is blocked waiting for an acknowledgment
    pub fn expects_reply(&self) -> bool {
        self.reply.is_some()
    }

    /// Consume the envelope, acknowledging the sender
    ///
    /// For fire-and-forget posts the outcome has nowhere to go; a failure is
    /// logged at the receiver and dropped.
    pub fn respond(self, outcome: Result<Reply>) {
        match self.reply {
            Some(tx) => {
                let payload = match outcome {
                    Ok(reply) => serde_json::to_string(&reply).map_err(|e| e.to_string()),
                    Err(e) => Err(serde_json::to_string(&WireError::from_error(&e))
                        .unwrap_or_else(|_| e.to_string())),
                };
                if tx.send(payload).is_err() {
                    debug!("Requester went away before the reply was sent");
                }
            }
            None => {
                if let Err(e) = outcome {
                    warn!("Posted message failed at receiver: {}", e);
                }
            }
        }
    }
}

/// The shared routing table
///
/// Cloning is cheap; all clones deliver into the same address space.
#[derive(Clone)]
pub struct MessageBus {
    registry: Arc<Mutex<HashMap<Address, flume::Sender<Envelope>>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register an inbox for an address, replacing any previous occupant
    ///
    /// Replacement matters for the popup, which can close and reopen, and
    /// for tabs whose content context is re-provisioned after navigation.
    pub fn register(&self, address: Address) -> flume::Receiver<Envelope> {
        let (tx, rx) = flume::unbounded();
        let mut registry = self.registry.lock().unwrap();
        if registry.insert(address, tx).is_some() {
            debug!("Replacing existing actor at {:?}", address);
        }
        rx
    }

    /// Remove an address from the routing table
    ///
    /// Dropping the registered sender lets the actor's receive loop observe
    /// disconnection and shut down.
    pub fn unregister(&self, address: Address) {
        self.registry.lock().unwrap().remove(&address);
    }

    /// Whether an actor is currently registered at an address
    pub fn is_registered(&self, address: Address) -> bool {
        self.registry.lock().unwrap().contains_key(&address)
    }

    fn sender(&self, address: Address) -> Result<flume::Sender<Envelope>> {
        self.registry
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .ok_or_else(|| ReadAloudError::Delivery(format!("No live actor at {:?}", address)))
    }

    /// Drop a routing entry whose receiver has gone away
    fn evict(&self, address: Address) {
        let mut registry = self.registry.lock().unwrap();
        if let Some(tx) = registry.get(&address) {
            if tx.is_disconnected() {
                registry.remove(&address);
            }
        }
    }

    /// Send a message and wait for the receiver's acknowledgment
    ///
    /// Fails when no live actor holds the address or when the target errored
    /// while handling the message. No retries, no queuing.
    pub fn send_to(&self, address: Address, message: &Message) -> Result<Reply> {
        let body = serde_json::to_string(message)?;
        let tx = self.sender(address)?;
        let (reply_tx, reply_rx) = flume::bounded(1);

        tx.send(Envelope {
            body,
            reply: Some(reply_tx),
        })
        .map_err(|_| {
            self.evict(address);
            ReadAloudError::Delivery(format!("No live actor at {:?}", address))
        })?;

        match reply_rx.recv() {
            Ok(Ok(json)) => serde_json::from_str(&json).map_err(Into::into),
            Ok(Err(raw)) => Err(match serde_json::from_str::<WireError>(&raw) {
                Ok(wire) => wire.into_error(),
                Err(_) => ReadAloudError::Delivery(format!(
                    "{:?} failed to handle message: {}",
                    address, raw
                )),
            }),
            Err(_) => Err(ReadAloudError::Delivery(format!(
                "{:?} went away while handling the message",
                address
            ))),
        }
    }

    /// Send a message without waiting for handling
    ///
    /// Used for event pushes and other fire-and-forget traffic. Still fails
    /// immediately when the target has no live actor.
    pub fn post(&self, address: Address, message: &Message) -> Result<()> {
        let body = serde_json::to_string(message)?;
        let tx = self.sender(address)?;

        tx.send(Envelope { body, reply: None }).map_err(|_| {
            self.evict(address);
            ReadAloudError::Delivery(format!("No live actor at {:?}", address))
        })
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
