//! Broadcast channel for domain events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. State mutations
//! publish a [`TicketEvent`] through the bus; WebSocket connections
//! subscribe and filter to the events they care about. There is no
//! delivery guarantee: when the ring buffer fills, the oldest events are
//! dropped for lagging receivers.

use tokio::sync::broadcast;

use super::TicketEvent;

/// Broadcast bus for [`TicketEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TicketEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that saw the event; with no active
    /// receivers the event is silently dropped, which is correct for a
    /// notification feed.
    pub fn publish(&self, event: TicketEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver for all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventId, ProfileId, TicketId};
    use chrono::Utc;

    fn make_event(event_id: EventId) -> TicketEvent {
        TicketEvent::TicketCheckedIn {
            ticket_id: TicketId::new(),
            event_id,
            scanned_by: ProfileId::new(),
            scanned_at: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(100);
        assert_eq!(bus.publish(make_event(EventId::new())), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        let id = EventId::new();
        bus.publish(make_event(id));

        let event = rx.recv().await;
        let Ok(event) = event else {
            panic!("expected to receive event");
        };
        assert_eq!(event.event_id(), Some(id));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let id = EventId::new();
        let count = bus.publish(make_event(id));
        assert_eq!(count, 2);

        let e1 = rx1.recv().await;
        let e2 = rx2.recv().await;
        let Ok(e1) = e1 else {
            panic!("rx1 failed");
        };
        let Ok(e2) = e2 else {
            panic!("rx2 failed");
        };
        assert_eq!(e1.event_id(), e2.event_id());
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = EventBus::new(100);
        assert_eq!(bus.receiver_count(), 0);

        let rx1 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }
}
