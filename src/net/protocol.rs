//! Peer-to-peer protocol message definitions
//! These are the wire types exchanged over the room broadcast channel

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GameTuning;
use crate::game::terrain::generate_profile;
use crate::game::turn::roll_wind;

/// One of the two seats in a duel. Travels as the integer 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayerIndex {
    One,
    Two,
}

impl PlayerIndex {
    pub const ALL: [PlayerIndex; 2] = [PlayerIndex::One, PlayerIndex::Two];

    /// The opponent seat
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Zero-based slot for per-player arrays
    pub fn slot(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

impl TryFrom<u8> for PlayerIndex {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ProtocolError::InvalidPlayer(other)),
        }
    }
}

impl From<PlayerIndex> for u8 {
    fn from(player: PlayerIndex) -> Self {
        match player {
            PlayerIndex::One => 1,
            PlayerIndex::Two => 2,
        }
    }
}

impl fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", u8::from(*self))
    }
}

/// Events exchanged between the two peers of a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerEvent {
    /// A shot was fired; enough to replay it locally
    Fire {
        acting_player: PlayerIndex,
        /// Degrees above the horizon, 0-90
        angle: i32,
        /// Percent of max power
        power: i32,
        /// Turn owner once this shot is fired, chosen by the firer
        next_active_player: PlayerIndex,
        /// Wind for the next turn, rolled by the firer
        next_wind: i32,
    },

    /// Health of a combatant after a resolved shot
    Damage {
        target_player: PlayerIndex,
        resulting_health: f64,
    },

    /// The sender is leaving the match
    Disconnect,
}

impl PeerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fire { .. } => "fire",
            Self::Damage { .. } => "damage",
            Self::Disconnect => "disconnect",
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(payload: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Playfield dimensions in world units (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSize {
    pub width: f64,
    pub height: f64,
}

impl FieldSize {
    /// Returns `None` unless both sides are finite and positive
    pub fn new(width: f64, height: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        (valid(width) && valid(height)).then_some(Self { width, height })
    }
}

impl Default for FieldSize {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 600.0,
        }
    }
}

/// Authoritative initial state handed to both peers by the session collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStart {
    pub match_id: Uuid,
    pub field: FieldSize,
    /// Normalized terrain heights, evenly spaced across the field width
    pub terrain: Vec<f64>,
    pub wind: i32,
    pub healths: [f64; 2],
    pub first_turn: PlayerIndex,
}

impl MatchStart {
    /// Roll a fresh match on the hosting side
    pub fn generate<R: Rng>(rng: &mut R, field: FieldSize, tuning: &GameTuning) -> Self {
        Self {
            match_id: Uuid::new_v4(),
            field,
            terrain: generate_profile(rng, tuning.terrain_segments),
            wind: roll_wind(rng, tuning.wind_range),
            healths: [tuning.max_health; 2],
            first_turn: PlayerIndex::One,
        }
    }
}

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed event payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid player index: {0}")]
    InvalidPlayer(u8),
}
