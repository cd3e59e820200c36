//! Game simulation modules

pub mod combat;
pub mod r#match;
pub mod physics;
pub mod snapshot;
pub mod terrain;
pub mod turn;

pub use r#match::{MatchSession, SessionError};
pub use snapshot::{MatchSnapshot, SnapshotBuilder};
pub use turn::{MatchResult, TurnPhase, WinReason};

use crate::net::protocol::PeerEvent;

/// What a session step asks the outside world to do
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    /// Events to broadcast to the opponent, in order
    pub outbound: Vec<PeerEvent>,
    /// Set on the step that ended the match
    pub finished: Option<MatchResult>,
    /// The opponent signalled that it left the room
    pub opponent_left: bool,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty() && self.finished.is_none() && !self.opponent_left
    }
}
