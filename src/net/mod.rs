//! Peer networking: wire events, room channels and the peer task

pub mod channel;
pub mod peer;
pub mod protocol;

pub use channel::{ChannelHub, Inbound, RoomChannel, TransportError};
pub use peer::{spawn_peer, ExitCause, Notice, PeerCommand, PeerExit, PeerHandle, PeerSettings};
pub use protocol::{FieldSize, MatchStart, PeerEvent, PlayerIndex, ProtocolError};
