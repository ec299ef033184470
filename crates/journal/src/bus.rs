//! Live fan-out of journal entries to subscribers, via one
//! `tokio::sync::broadcast` channel per session created lazily on first
//! subscribe.

use std::collections::HashMap;

use parking_lot::RwLock;
use thinksuit_core::Entry;
use tokio::sync::broadcast;

/// Bounded per-subscriber buffer. On overflow, `broadcast` drops the
/// oldest unread entries for that lagging subscriber and the next recv()
/// surfaces `RecvError::Lagged`, which callers treat as a `slow_consumer`
/// disconnect.
const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Default)]
pub struct SubscriptionBus {
    channels: RwLock<HashMap<String, broadcast::Sender<Entry>>>,
}

impl SubscriptionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a session's live entry stream, creating its channel
    /// if this is the first subscriber.
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<Entry> {
        let mut channels = self.channels.write();
        let tx = channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_BUFFER).0);
        tx.subscribe()
    }

    /// Publish an entry to a session's subscribers, if any are listening.
    /// A no-op when nobody has subscribed yet.
    pub fn publish(&self, session_id: &str, entry: &Entry) {
        let channels = self.channels.read();
        if let Some(tx) = channels.get(session_id) {
            let _ = tx.send(entry.clone());
        }
    }

    pub fn has_channel(&self, session_id: &str) -> bool {
        self.channels.read().contains_key(session_id)
    }

    pub fn subscriber_count(&self, session_id: &str) -> usize {
        self.channels
            .read()
            .get(session_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Tear down a session's channel once nobody is listening and the
    /// session isn't busy. Safe to call speculatively; a no-op if either
    /// condition doesn't hold.
    pub fn cleanup_if_idle(&self, session_id: &str, session_busy: bool) {
        if session_busy {
            return;
        }
        let mut channels = self.channels.write();
        if let Some(tx) = channels.get(session_id) {
            if tx.receiver_count() == 0 {
                channels.remove(session_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thinksuit_core::Event;

    #[tokio::test]
    async fn subscriber_observes_published_entries_in_order() {
        let bus = SubscriptionBus::new();
        let mut rx = bus.subscribe("s1");

        bus.publish("s1", &Entry::new("s1", Event::SessionInput, "t"));
        bus.publish("s1", &Entry::new("s1", Event::SessionResponse, "t"));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first.event, Event::SessionInput));
        assert!(matches!(second.event, Event::SessionResponse));
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let bus = SubscriptionBus::new();
        bus.publish("s1", &Entry::new("s1", Event::SessionInput, "t"));
    }

    #[tokio::test]
    async fn cleanup_removes_channel_once_idle() {
        let bus = SubscriptionBus::new();
        let rx = bus.subscribe("s1");
        assert_eq!(bus.subscriber_count("s1"), 1);
        drop(rx);
        bus.cleanup_if_idle("s1", false);
        assert!(!bus.has_channel("s1"));
    }

    #[tokio::test]
    async fn cleanup_skips_busy_sessions() {
        let bus = SubscriptionBus::new();
        let rx = bus.subscribe("s1");
        drop(rx);
        bus.cleanup_if_idle("s1", true);
        assert!(bus.has_channel("s1"));
    }
}
