//! Pub/Sub Hub Module
//!
//! A channel registry decoupled from the cache's key space. Subscribers
//! are plain closures invoked synchronously on publish, in registration
//! order, and always outside any lock: the hub snapshots the channel's
//! handler list under its registry lock, releases it, then delivers. A
//! slow or reentrant handler therefore cannot stall cache operations or
//! other publishers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// A subscription handler, invoked with `(channel, message)`.
pub type Subscriber = Arc<dyn Fn(&str, &str) + Send + Sync>;

// == Pub/Sub Hub ==
/// Named channels mapping to ordered subscriber lists.
#[derive(Default)]
pub struct PubSubHub {
    channels: Mutex<HashMap<String, Vec<Subscriber>>>,
}

impl PubSubHub {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Subscribe ==
    /// Registers a handler on a channel, creating the channel if needed.
    /// Handlers on one channel are delivered to in registration order.
    pub fn subscribe(&self, channel: &str, handler: Subscriber) {
        let mut channels = self.channels.lock();
        channels
            .entry(channel.to_string())
            .or_default()
            .push(handler);
        debug!(channel, "subscriber registered");
    }

    // == Unsubscribe ==
    /// Removes a channel and all of its handlers. Returns true if the
    /// channel existed.
    ///
    /// The contract is whole-channel removal; there is no per-handler
    /// unsubscribe.
    pub fn unsubscribe(&self, channel: &str) -> bool {
        self.channels.lock().remove(channel).is_some()
    }

    // == Publish ==
    /// Delivers `message` to every handler registered on `channel` at the
    /// moment publish begins, and returns the number delivered to.
    ///
    /// Handlers registered mid-delivery are not guaranteed to receive this
    /// message. Publishing to an unknown channel delivers to nobody and
    /// returns 0.
    pub fn publish(&self, channel: &str, message: &str) -> usize {
        let handlers: Vec<Subscriber> = {
            let channels = self.channels.lock();
            match channels.get(channel) {
                Some(subs) => subs.clone(),
                None => return 0,
            }
        };

        // Registry lock released; delivery happens lock-free.
        for handler in &handlers {
            handler(channel, message);
        }
        handlers.len()
    }

    /// Names of all channels with at least one subscriber.
    pub fn channels(&self) -> Vec<String> {
        self.channels.lock().keys().cloned().collect()
    }

    /// Subscriber count for one channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for PubSubHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubHub")
            .field("channels", &self.channels())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_subscriber(counter: Arc<AtomicUsize>) -> Subscriber {
        Arc::new(move |_channel, _message| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_publish_delivers_once_per_handler() {
        let hub = PubSubHub::new();
        let counter = Arc::new(AtomicUsize::new(0));

        hub.subscribe("ch", counting_subscriber(Arc::clone(&counter)));

        assert_eq!(hub.publish("ch", "msg"), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_publish_unknown_channel_returns_zero() {
        let hub = PubSubHub::new();
        assert_eq!(hub.publish("nonexistent", "msg"), 0);
    }

    #[test]
    fn test_publish_passes_channel_and_message() {
        let hub = PubSubHub::new();
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        hub.subscribe(
            "events",
            Arc::new(move |channel, message| {
                sink.lock().push((channel.to_string(), message.to_string()));
            }),
        );

        hub.publish("events", "hello");
        assert_eq!(
            seen.lock().as_slice(),
            &[("events".to_string(), "hello".to_string())]
        );
    }

    #[test]
    fn test_multiple_handlers_registration_order() {
        let hub = PubSubHub::new();
        let order: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3u8 {
            let sink = Arc::clone(&order);
            hub.subscribe("ch", Arc::new(move |_, _| sink.lock().push(id)));
        }

        assert_eq!(hub.publish("ch", "m"), 3);
        assert_eq!(order.lock().as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn test_unsubscribe_removes_whole_channel() {
        let hub = PubSubHub::new();
        let counter = Arc::new(AtomicUsize::new(0));

        hub.subscribe("ch", counting_subscriber(Arc::clone(&counter)));
        hub.subscribe("ch", counting_subscriber(Arc::clone(&counter)));
        assert_eq!(hub.subscriber_count("ch"), 2);

        assert!(hub.unsubscribe("ch"));
        assert!(!hub.unsubscribe("ch"));
        assert_eq!(hub.publish("ch", "msg"), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reentrant_handler_does_not_deadlock() {
        let hub = Arc::new(PubSubHub::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_hub = Arc::clone(&hub);
        let inner_counter = Arc::clone(&counter);
        hub.subscribe(
            "outer",
            Arc::new(move |_, _| {
                // Subscribing from inside delivery must not block: the
                // registry lock is not held while handlers run.
                let c = Arc::clone(&inner_counter);
                inner_hub.subscribe("inner", counting_subscriber(c));
            }),
        );

        assert_eq!(hub.publish("outer", "m"), 1);
        assert_eq!(hub.publish("inner", "m"), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_channels_listing() {
        let hub = PubSubHub::new();
        hub.subscribe("a", Arc::new(|_, _| {}));
        hub.subscribe("b", Arc::new(|_, _| {}));

        let mut names = hub.channels();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
