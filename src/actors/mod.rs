//! The three independently-lifecycled actors
//!
//! Background and popup own coordinators with shadow playback state; the
//! per-tab content actor owns the authoritative playback engine. They
//! interact only through the message bus.

pub mod background;
pub mod content;
pub mod popup;

pub use background::Background;
pub use content::{ContentInjector, SourceFactory, SynthFactory};
pub use popup::Popup;
