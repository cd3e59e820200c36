//! Read-only views of a session for the rendering collaborator

use serde::{Deserialize, Serialize};

use crate::net::protocol::PlayerIndex;

use super::r#match::MatchSession;
use super::turn::MatchResult;

/// Everything the renderer and HUD need for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub tick: u64,
    pub local_player: PlayerIndex,
    pub active_player: PlayerIndex,
    pub wind: i32,
    pub shots_fired: u32,
    /// Aim and fire controls should be live
    pub input_enabled: bool,
    pub tanks: Vec<TankView>,
    pub projectile: Option<ProjectileView>,
    pub explosions: Vec<ExplosionView>,
    pub result: Option<MatchResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankView {
    pub player: PlayerIndex,
    pub x: f64,
    pub y: f64,
    pub facing: i8,
    pub health: f64,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplosionView {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub alpha: f64,
}

/// Builds snapshots at a fixed tick interval
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to publish a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot of the session
    pub fn build(session: &MatchSession) -> MatchSnapshot {
        let turn = session.turn();

        let tanks = PlayerIndex::ALL
            .into_iter()
            .map(|player| {
                let tank = session.tank(player);
                TankView {
                    player,
                    x: tank.x,
                    y: tank.y,
                    facing: tank.facing,
                    health: tank.health,
                    color: tank.color.to_string(),
                }
            })
            .collect();

        MatchSnapshot {
            tick: session.tick_count(),
            local_player: session.local(),
            active_player: turn.active_player(),
            wind: turn.wind(),
            shots_fired: session.shots_fired(),
            input_enabled: session.input_enabled(),
            tanks,
            projectile: session.projectile().map(|p| ProjectileView { x: p.x, y: p.y }),
            explosions: session
                .explosions()
                .iter()
                .map(|e| ExplosionView {
                    x: e.x,
                    y: e.y,
                    radius: e.radius,
                    alpha: e.alpha,
                })
                .collect(),
            result: turn.result(),
        }
    }
}

impl MatchSnapshot {
    pub fn tank(&self, player: PlayerIndex) -> Option<&TankView> {
        self.tanks.iter().find(|t| t.player == player)
    }

    pub fn is_my_turn(&self) -> bool {
        self.result.is_none() && self.active_player == self.local_player
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameTuning;
    use crate::net::protocol::{FieldSize, MatchStart};
    use uuid::Uuid;

    fn session() -> MatchSession {
        let start = MatchStart {
            match_id: Uuid::nil(),
            field: FieldSize::default(),
            terrain: vec![0.3; 51],
            wind: -2,
            healths: [100.0, 80.0],
            first_turn: PlayerIndex::One,
        };
        MatchSession::new(&start, PlayerIndex::One, GameTuning::default(), 5).unwrap()
    }

    #[test]
    fn interval_throttles_and_force_overrides() {
        let mut builder = SnapshotBuilder::new(3);
        assert!(!builder.should_send());
        assert!(!builder.should_send());
        assert!(builder.should_send());
        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn snapshot_reflects_session() {
        let mut session = session();
        let idle = SnapshotBuilder::build(&session);
        assert!(idle.input_enabled);
        assert!(idle.is_my_turn());
        assert_eq!(idle.wind, -2);
        assert_eq!(idle.tank(PlayerIndex::Two).map(|t| t.health), Some(80.0));
        assert!(idle.projectile.is_none());

        session.request_fire(45, 50);
        let flying = SnapshotBuilder::build(&session);
        assert!(!flying.input_enabled);
        assert_eq!(flying.active_player, PlayerIndex::Two);
        assert_eq!(flying.shots_fired, 1);
        assert!(flying.projectile.is_some());
    }
}
