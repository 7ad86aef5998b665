//! Per-user real-time event feed.

use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::constants::DEFAULT_FEED_DEDUP_WINDOW;
use crate::models::{FeedEvent, UserId};

/// One broadcast channel per subscribed user. Publishing to a user with no
/// live subscriber is a no-op; the durable store remains the source of truth.
#[derive(Debug)]
pub struct EventFeed {
    channels: DashMap<UserId, broadcast::Sender<FeedEvent>>,
    capacity: usize,
}

impl EventFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, user: UserId) -> broadcast::Receiver<FeedEvent> {
        self.channels
            .entry(user)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Returns `true` if at least one subscriber received the event.
    pub fn publish(&self, event: FeedEvent) -> bool {
        let recipient = event.recipient;
        let delivered = match self.channels.get(&recipient) {
            Some(tx) => tx.send(event).is_ok(),
            None => return false,
        };
        if !delivered {
            // Every receiver was dropped; forget the channel.
            self.channels.remove_if(&recipient, |_, tx| tx.receiver_count() == 0);
        }
        delivered
    }

    pub fn subscriber_count(&self, user: UserId) -> usize {
        self.channels
            .get(&user)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

/// Bounded memory of recently seen event ids for at-least-once consumers.
#[derive(Debug)]
pub struct FeedDedup {
    seen: HashSet<Uuid>,
    order: VecDeque<Uuid>,
    window: usize,
}

impl Default for FeedDedup {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_DEDUP_WINDOW)
    }
}

impl FeedDedup {
    pub fn new(window: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            window: window.max(1),
        }
    }

    /// `true` the first time an id is seen within the window.
    pub fn first_sighting(&mut self, event_id: Uuid) -> bool {
        if !self.seen.insert(event_id) {
            return false;
        }
        self.order.push_back(event_id);
        if self.order.len() > self.window {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedEventKind;
    use chrono::Utc;

    fn event(recipient: i64) -> FeedEvent {
        FeedEvent::new(
            UserId(recipient),
            UserId(99),
            FeedEventKind::EdgeDeleted { edge_id: Uuid::new_v4() },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_events_reach_only_their_recipient() {
        let feed = EventFeed::new(8);
        let mut alice = feed.subscribe(UserId(1));
        let mut bob = feed.subscribe(UserId(2));

        let sent = event(1);
        assert!(feed.publish(sent.clone()));
        assert_eq!(alice.recv().await.unwrap(), sent);
        assert!(bob.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers_cleans_up() {
        let feed = EventFeed::new(8);
        assert!(!feed.publish(event(1)));

        let rx = feed.subscribe(UserId(1));
        drop(rx);
        assert!(!feed.publish(event(1)));
        assert_eq!(feed.subscriber_count(UserId(1)), 0);
    }

    #[test]
    fn test_dedup_window() {
        let mut dedup = FeedDedup::new(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        assert!(dedup.first_sighting(a));
        assert!(!dedup.first_sighting(a));
        assert!(dedup.first_sighting(b));
        assert!(dedup.first_sighting(c));
        // `a` fell out of the window.
        assert!(dedup.first_sighting(a));
    }
}
