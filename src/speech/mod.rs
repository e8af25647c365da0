//! Speech playback engine

pub mod backends;
pub mod reader;
pub mod synth;

pub use reader::{PlaybackState, Reader, ReaderEvent, ReaderEventKind, SpeechRequest, INTERRUPTED};
pub use synth::{create_synth, Synth, SynthEvent, Utterance, Voice};
