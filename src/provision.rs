//! Liveness probe and on-demand provisioning
//!
//! A tab's content context is created lazily, so the first command aimed at
//! it can target an address with no live actor. Rather than exception-driven
//! branching, delivery runs an explicit two-step protocol: probe, provision
//! if absent, then resend the original command exactly once. This is the
//! only self-healing mechanism in the system; nothing polls for health.

use crate::bus::{Address, Message, MessageBus, Reply, TabId};
use crate::{ReadAloudError, Result};
use log::{debug, info};

/// Loads the content context's code into a tab
///
/// The concrete implementation spawns a content actor and registers it on
/// the bus; tests substitute counting or failing variants.
pub trait Injector: Send {
    fn inject(&self, tab: TabId) -> Result<()>;
}

/// Deliver a command to a tab's content context, provisioning it on demand
///
/// 1. Probe with `Ping`. Success means the context is live; send directly.
/// 2. On probe failure, inject the content context and resend the command
///    once.
/// 3. A failure after provisioning is terminal: surfaced as a
///    `ProvisioningError`, never retried again.
pub fn deliver(
    bus: &MessageBus,
    injector: &dyn Injector,
    tab: TabId,
    message: &Message,
) -> Result<Reply> {
    match bus.send_to(Address::Content(tab), &Message::Ping) {
        Ok(_) => {
            debug!("Content context for tab {} is live", tab);
            bus.send_to(Address::Content(tab), message)
        }
        Err(probe_err) => {
            info!(
                "No content context in tab {} ({}), provisioning one",
                tab, probe_err
            );
            injector.inject(tab).map_err(|e| {
                ReadAloudError::Provisioning(format!(
                    "Could not load content context into tab {}: {}",
                    tab, e
                ))
            })?;
            debug!("Content context injected into tab {}, resending", tab);

            // A handler failure from the freshly provisioned context keeps
            // its own error kind; only unreachability is a provisioning
            // failure.
            bus.send_to(Address::Content(tab), message).map_err(|e| match e {
                ReadAloudError::Delivery(reason) => ReadAloudError::Provisioning(format!(
                    "Tab {} still unreachable after provisioning: {}",
                    tab, reason
                )),
                other => other,
            })
        }
    }
}
