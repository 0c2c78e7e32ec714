use crate::shared::{InventoryItemId, InventorySessionId, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Per-session channel capacity (§9 "Live session events"). A subscriber
/// that falls this far behind the publisher starts missing events rather
/// than backpressuring the writer — the spec's own call: "slow subscribers
/// drop".
const CHANNEL_CAPACITY: usize = 256;

/// The payload pushed to `sessions.subscribe` (§6) while a session is open.
/// Mirrors the shape of the write each event reports on: `JoinParticipant`,
/// `AddLine`, and `Close`/`AutoClose` are the only session-mutating
/// operations in §4.5, so they're the only three variants here.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ParticipantJoined {
        session_id: InventorySessionId,
        user_id: UserId,
        sub_area: Option<String>,
    },
    LineAdded {
        session_id: InventorySessionId,
        inventory_item_id: InventoryItemId,
        sub_area: Option<String>,
        counted_quantity: f64,
    },
    SessionClosed {
        session_id: InventorySessionId,
        adjustments_written: usize,
    },
}

/// An in-process pub/sub channel per open session (§9: "Implemented as a
/// pub/sub channel per session id; subscribers get events until they
/// disconnect"). Deliberately not durable and not authoritative — a missed
/// event here never desyncs state, since every client can always re-fetch
/// `lines`/`participants` from the database; this bus only spares them the
/// poll.
///
/// Senders are created lazily and dropped once their last receiver (and
/// this map's own handle) goes away, so a session that nobody is watching
/// live never retains an idle channel.
#[derive(Clone, Default)]
pub struct SessionEventBus {
    channels: Arc<Mutex<HashMap<InventorySessionId, broadcast::Sender<SessionEvent>>>>,
}

impl SessionEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes to the session's channel if anyone is currently
    /// subscribed; otherwise this is a no-op (no channel is created just to
    /// immediately discard the event).
    pub fn publish(&self, session_id: InventorySessionId, event: SessionEvent) {
        let channels = self.channels.lock().expect("session event bus mutex poisoned");
        if let Some(sender) = channels.get(&session_id) {
            // `send` only errors when there are zero receivers, which is
            // exactly the "nobody's watching" case this is meant to ignore.
            let _ = sender.send(event);
        }
    }

    pub fn subscribe(&self, session_id: InventorySessionId) -> broadcast::Receiver<SessionEvent> {
        let mut channels = self.channels.lock().expect("session event bus mutex poisoned");
        channels
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = SessionEventBus::new();
        bus.publish(
            InventorySessionId::new(),
            SessionEvent::SessionClosed { session_id: InventorySessionId::new(), adjustments_written: 0 },
        );
    }

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = SessionEventBus::new();
        let session_id = InventorySessionId::new();
        let mut rx = bus.subscribe(session_id);

        bus.publish(
            session_id,
            SessionEvent::ParticipantJoined { session_id, user_id: UserId::new(), sub_area: None },
        );

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::ParticipantJoined { .. }));
    }

    #[tokio::test]
    async fn independent_sessions_do_not_cross_talk() {
        let bus = SessionEventBus::new();
        let session_a = InventorySessionId::new();
        let session_b = InventorySessionId::new();
        let mut rx_b = bus.subscribe(session_b);

        bus.publish(
            session_a,
            SessionEvent::SessionClosed { session_id: session_a, adjustments_written: 1 },
        );

        assert!(rx_b.try_recv().is_err());
    }
}
