//! readaloud - cross-context text-to-speech playback coordination
//!
//! Lets three independently-lifecycled execution contexts (a persistent
//! background actor, per-tab content actors, a transient popup) observe and
//! drive page reading without shared memory, provisioning a tab's content
//! context on demand when a command arrives before it exists.

pub mod actors;
pub mod bus;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod extract;
pub mod provision;
pub mod settings;
pub mod speech;

pub use error::{ReadAloudError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "readaloud";
