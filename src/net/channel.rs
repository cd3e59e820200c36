//! In-process room broadcast channels
//!
//! Stands in for the hosted pub/sub service: one topic per room, frames fan
//! out to every current subscriber in send order, a subscriber never hears
//! its own frames, and anything sent while a peer is unsubscribed is gone.

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use super::protocol::{PeerEvent, ProtocolError};

/// Default per-room frame buffer
pub const ROOM_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum Frame {
    Event { from: Uuid, payload: String },
    Left { from: Uuid },
}

impl Frame {
    fn sender(&self) -> Uuid {
        match self {
            Self::Event { from, .. } | Self::Left { from } => *from,
        }
    }
}

/// What a subscriber can receive
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Raw event payload from the other peer
    Event(String),
    /// The other peer unsubscribed
    PeerLeft,
}

/// Registry of room topics
pub struct ChannelHub {
    rooms: DashMap<String, broadcast::Sender<Frame>>,
    capacity: usize,
}

impl ChannelHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Join a room's topic, creating it on first use
    pub fn subscribe(&self, room_code: &str) -> RoomChannel {
        let topic = format!("room:{room_code}");
        let tx = self
            .rooms
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();
        let rx = tx.subscribe();
        let peer_id = Uuid::new_v4();

        debug!(topic = %topic, peer_id = %peer_id, "Subscribed to room channel");

        RoomChannel {
            peer_id,
            topic,
            tx,
            rx,
            left: false,
        }
    }

    /// Drop topics nobody listens to any more
    pub fn prune(&self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, tx| tx.receiver_count() > 0);
        before - self.rooms.len()
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(ROOM_CHANNEL_CAPACITY)
    }
}

/// One peer's subscription to a room topic. Dropping it unsubscribes.
pub struct RoomChannel {
    peer_id: Uuid,
    topic: String,
    tx: broadcast::Sender<Frame>,
    rx: broadcast::Receiver<Frame>,
    left: bool,
}

impl RoomChannel {
    pub fn peer_id(&self) -> Uuid {
        self.peer_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Broadcast an event to the room. Fails when nobody else is subscribed,
    /// since the frame would be lost.
    pub fn send(&self, event: &PeerEvent) -> Result<(), TransportError> {
        let payload = event.encode()?;
        self.send_payload(payload)
    }

    pub(crate) fn send_payload(&self, payload: String) -> Result<(), TransportError> {
        // our own receiver always counts
        if self.tx.receiver_count() < 2 {
            return Err(TransportError::NoSubscribers);
        }
        self.tx
            .send(Frame::Event {
                from: self.peer_id,
                payload,
            })
            .map_err(|_| TransportError::NoSubscribers)?;
        Ok(())
    }

    /// Next frame from the other peer. Cancel safe.
    pub async fn recv(&mut self) -> Result<Inbound, TransportError> {
        loop {
            match self.rx.recv().await {
                Ok(frame) if frame.sender() == self.peer_id => continue,
                Ok(Frame::Event { payload, .. }) => return Ok(Inbound::Event(payload)),
                Ok(Frame::Left { .. }) => return Ok(Inbound::PeerLeft),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = %self.topic, peer_id = %self.peer_id, lagged = n, "Room channel lagged, frames lost");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(TransportError::Closed),
            }
        }
    }

    /// Leave the topic, telling the other subscriber
    pub fn unsubscribe(mut self) {
        self.announce_leave();
    }

    fn announce_leave(&mut self) {
        if self.left {
            return;
        }
        self.left = true;
        // nobody left to tell is fine
        let _ = self.tx.send(Frame::Left { from: self.peer_id });
        debug!(topic = %self.topic, peer_id = %self.peer_id, "Unsubscribed from room channel");
    }
}

impl Drop for RoomChannel {
    fn drop(&mut self) {
        self.announce_leave();
    }
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to encode event: {0}")]
    Encode(#[from] ProtocolError),

    #[error("No other subscriber on the room channel")]
    NoSubscribers,

    #[error("Room channel closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::PlayerIndex;

    #[tokio::test]
    async fn frames_reach_the_other_peer_only() {
        let hub = ChannelHub::default();
        let mut a = hub.subscribe("ABC123");
        let mut b = hub.subscribe("ABC123");

        a.send(&PeerEvent::Disconnect).unwrap();
        b.send(&PeerEvent::Damage {
            target_player: PlayerIndex::One,
            resulting_health: 50.0,
        })
        .unwrap();

        let got = b.recv().await.unwrap();
        assert_eq!(got, Inbound::Event(PeerEvent::Disconnect.encode().unwrap()));

        match a.recv().await.unwrap() {
            Inbound::Event(payload) => assert_eq!(PeerEvent::decode(&payload).unwrap().kind(), "damage"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropping_a_subscription_signals_peer_left() {
        let hub = ChannelHub::default();
        let a = hub.subscribe("ROOM");
        let mut b = hub.subscribe("ROOM");

        drop(a);
        assert_eq!(b.recv().await.unwrap(), Inbound::PeerLeft);
    }

    #[tokio::test]
    async fn messages_sent_before_subscribing_are_lost() {
        let hub = ChannelHub::default();
        let a = hub.subscribe("ROOM");
        assert!(matches!(a.send(&PeerEvent::Disconnect), Err(TransportError::NoSubscribers)));

        let mut late = hub.subscribe("ROOM");
        a.send(&PeerEvent::Damage {
            target_player: PlayerIndex::Two,
            resulting_health: 10.0,
        })
        .unwrap();

        match late.recv().await.unwrap() {
            Inbound::Event(payload) => assert_eq!(PeerEvent::decode(&payload).unwrap().kind(), "damage"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_fails_once_the_opponent_is_gone() {
        let hub = ChannelHub::default();
        let alone = hub.subscribe("ROOM");
        let opponent = hub.subscribe("ROOM");
        assert!(alone.send(&PeerEvent::Disconnect).is_ok());

        opponent.unsubscribe();
        assert!(matches!(alone.send(&PeerEvent::Disconnect), Err(TransportError::NoSubscribers)));
    }

    #[test]
    fn rooms_are_isolated_and_pruned() {
        let hub = ChannelHub::default();
        let a = hub.subscribe("ONE");
        let b = hub.subscribe("TWO");
        assert_eq!(hub.active_rooms(), 2);

        a.unsubscribe();
        assert_eq!(hub.prune(), 1);
        assert_eq!(hub.active_rooms(), 1);
        drop(b);
    }
}
