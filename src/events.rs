//! Typed keyed publish/subscribe primitive
//!
//! The playback engine publishes lifecycle events through an emitter so that
//! state transitions stay decoupled from transport concerns. Handlers run
//! synchronously, in subscription order, on the publishing thread.

use crate::Result;
use log::error;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Handle returned by `subscribe`, used to remove a handler later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Event handler callback
///
/// A handler that returns an error never stops the remaining handlers for
/// the same publish; the error is logged and swallowed.
pub type Handler<A> = Box<dyn FnMut(&A) -> Result<()> + Send>;

/// Generic keyed publish/subscribe container
///
/// `K` is the topic key (typically a small enum), `A` the payload passed by
/// reference to every handler subscribed to that topic.
pub struct EventEmitter<K, A> {
    listeners: HashMap<K, Vec<(SubscriptionId, Handler<A>)>>,
    next_id: u64,
}

impl<K: Eq + Hash + Copy + Debug, A> EventEmitter<K, A> {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register a handler for a topic
    ///
    /// Handlers for one topic are invoked in the order they subscribed.
    pub fn subscribe(&mut self, topic: K, handler: Handler<A>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(topic).or_default().push((id, handler));
        id
    }

    /// Remove a previously registered handler
    ///
    /// Unknown ids are ignored.
    pub fn unsubscribe(&mut self, topic: K, id: SubscriptionId) {
        if let Some(handlers) = self.listeners.get_mut(&topic) {
            handlers.retain(|(handler_id, _)| *handler_id != id);
        }
    }

    /// Publish a payload to all handlers of a topic
    ///
    /// Handler failures are logged and never propagated to the publisher.
    pub fn publish(&mut self, topic: K, payload: &A) {
        if let Some(handlers) = self.listeners.get_mut(&topic) {
            for (_, handler) in handlers.iter_mut() {
                if let Err(e) = handler(payload) {
                    error!("Event handler for {:?} failed: {}", topic, e);
                }
            }
        }
    }

    /// Number of handlers currently subscribed to a topic
    pub fn handler_count(&self, topic: K) -> usize {
        self.listeners.get(&topic).map_or(0, |h| h.len())
    }
}

impl<K: Eq + Hash + Copy + Debug, A> Default for EventEmitter<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Topic {
        A,
        B,
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Handler<String> {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Box::new(move |payload| {
            log.lock().unwrap().push(format!("{}:{}", tag, payload));
            Ok(())
        })
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut emitter: EventEmitter<Topic, String> = EventEmitter::new();

        emitter.subscribe(Topic::A, recorder(&log, "first"));
        emitter.subscribe(Topic::A, recorder(&log, "second"));
        emitter.publish(Topic::A, &"x".to_string());

        assert_eq!(*log.lock().unwrap(), vec!["first:x", "second:x"]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut emitter: EventEmitter<Topic, String> = EventEmitter::new();

        emitter.subscribe(Topic::A, Box::new(|_| Err("boom".into())));
        emitter.subscribe(Topic::A, recorder(&log, "after"));
        emitter.publish(Topic::A, &"x".to_string());

        assert_eq!(*log.lock().unwrap(), vec!["after:x"]);
    }

    #[test]
    fn test_unsubscribe_removes_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut emitter: EventEmitter<Topic, String> = EventEmitter::new();

        let id = emitter.subscribe(Topic::A, recorder(&log, "gone"));
        emitter.subscribe(Topic::A, recorder(&log, "kept"));
        emitter.unsubscribe(Topic::A, id);
        emitter.publish(Topic::A, &"x".to_string());

        assert_eq!(*log.lock().unwrap(), vec!["kept:x"]);
        assert_eq!(emitter.handler_count(Topic::A), 1);
    }

    #[test]
    fn test_publish_without_handlers_is_noop() {
        let mut emitter: EventEmitter<Topic, String> = EventEmitter::new();
        emitter.publish(Topic::B, &"ignored".to_string());
        assert_eq!(emitter.handler_count(Topic::B), 0);
    }

    #[test]
    fn test_topics_are_independent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut emitter: EventEmitter<Topic, String> = EventEmitter::new();

        emitter.subscribe(Topic::A, recorder(&log, "a"));
        emitter.subscribe(Topic::B, recorder(&log, "b"));
        emitter.publish(Topic::B, &"only".to_string());

        assert_eq!(*log.lock().unwrap(), vec!["b:only"]);
    }
}
