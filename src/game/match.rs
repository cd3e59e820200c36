//! Match session: one peer's replica of a duel
//!
//! Both peers run their own `MatchSession` and never exchange state
//! snapshots. They stay in step by replaying the same `fire` events through
//! the same deterministic physics, and by merging `damage` events.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GameTuning;
use crate::net::protocol::{FieldSize, MatchStart, PeerEvent, PlayerIndex};

use super::combat::{CombatSystem, Contact, Explosion, Tank};
use super::physics::Projectile;
use super::terrain::{Terrain, TerrainError};
use super::turn::{roll_wind, MatchResult, TurnPhase, TurnState, WinReason};
use super::Effects;

/// The single owned state of a peer's match
#[derive(Debug, Clone)]
pub struct MatchSession {
    id: Uuid,
    local: PlayerIndex,
    tuning: GameTuning,
    field: FieldSize,
    terrain: Terrain,
    tanks: [Tank; 2],
    projectile: Option<Projectile>,
    /// Healths when the live projectile was created
    shot_baseline: [f64; 2],
    explosions: Vec<Explosion>,
    turn: TurnState,
    /// Only used for rolling the next wind when the local player fires
    rng: ChaCha8Rng,
    tick: u64,
    shots_fired: u32,
}

impl MatchSession {
    /// Build the local replica from the shared match start payload
    pub fn new(
        start: &MatchStart,
        local: PlayerIndex,
        tuning: GameTuning,
        seed: u64,
    ) -> Result<Self, SessionError> {
        let field = FieldSize::new(start.field.width, start.field.height).ok_or(SessionError::InvalidField {
            width: start.field.width,
            height: start.field.height,
        })?;
        let terrain = Terrain::from_profile(&start.terrain, field)?;

        for player in PlayerIndex::ALL {
            let value = start.healths[player.slot()];
            if !value.is_finite() || value <= 0.0 {
                return Err(SessionError::InvalidHealth { player, value });
            }
        }

        let tanks = PlayerIndex::ALL.map(|player| {
            let health = start.healths[player.slot()].min(tuning.max_health);
            Tank::spawn(player, health, &terrain, &tuning)
        });
        let wind = start.wind.clamp(-tuning.wind_range, tuning.wind_range);

        info!(
            match_id = %start.match_id,
            local = %local,
            first_turn = %start.first_turn,
            wind,
            "Match session started"
        );

        Ok(Self {
            id: start.match_id,
            local,
            tuning,
            field,
            terrain,
            shot_baseline: [tanks[0].health, tanks[1].health],
            tanks,
            projectile: None,
            explosions: Vec::new(),
            turn: TurnState::new(start.first_turn, wind),
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            shots_fired: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn local(&self) -> PlayerIndex {
        self.local
    }

    pub fn tuning(&self) -> &GameTuning {
        &self.tuning
    }

    pub fn field(&self) -> FieldSize {
        self.field
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn tanks(&self) -> &[Tank; 2] {
        &self.tanks
    }

    pub fn tank(&self, player: PlayerIndex) -> &Tank {
        &self.tanks[player.slot()]
    }

    pub fn projectile(&self) -> Option<&Projectile> {
        self.projectile.as_ref()
    }

    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn phase(&self) -> TurnPhase {
        self.turn.phase()
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.turn.result()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    /// Whether the UI should accept aim and fire input
    pub fn input_enabled(&self) -> bool {
        self.turn.input_enabled(self.local) && self.projectile.is_none()
    }

    /// Local fire request from the UI. Outside our own idle turn this is a
    /// silent no-op.
    pub fn request_fire(&mut self, angle: i32, power_percent: i32) -> Effects {
        if !self.input_enabled() {
            debug!(
                match_id = %self.id,
                local = %self.local,
                phase = ?self.turn.phase(),
                "Fire request rejected"
            );
            return Effects::none();
        }

        let (angle, power) = self.tuning.clamp_aim(angle, power_percent);
        let next_active_player = self.local.other();
        let next_wind = roll_wind(&mut self.rng, self.tuning.wind_range);

        self.launch(self.local, angle, power);
        self.turn.begin_shot(next_active_player, next_wind);

        info!(
            match_id = %self.id,
            player = %self.local,
            angle,
            power,
            next_wind,
            "Shot fired"
        );

        Effects {
            outbound: vec![PeerEvent::Fire {
                acting_player: self.local,
                angle,
                power,
                next_active_player,
                next_wind,
            }],
            ..Effects::default()
        }
    }

    /// Apply an event received from the opponent
    pub fn apply_remote(&mut self, event: PeerEvent) -> Effects {
        match event {
            PeerEvent::Fire {
                acting_player,
                angle,
                power,
                next_active_player,
                next_wind,
            } => self.apply_remote_fire(acting_player, angle, power, next_active_player, next_wind),
            PeerEvent::Damage {
                target_player,
                resulting_health,
            } => self.apply_health(target_player, resulting_health),
            PeerEvent::Disconnect => self.on_peer_disconnected(),
        }
    }

    fn apply_remote_fire(
        &mut self,
        acting_player: PlayerIndex,
        angle: i32,
        power: i32,
        next_active_player: PlayerIndex,
        next_wind: i32,
    ) -> Effects {
        if self.turn.is_game_over() {
            debug!(match_id = %self.id, "Fire after match over ignored");
            return Effects::none();
        }
        if acting_player == self.local {
            warn!(match_id = %self.id, player = %acting_player, "Remote fire names the local player, ignoring");
            return Effects::none();
        }
        if self.projectile.is_some() {
            warn!(match_id = %self.id, player = %acting_player, "Remote fire while a projectile is live, ignoring");
            return Effects::none();
        }
        if acting_player != self.turn.active_player() {
            warn!(
                match_id = %self.id,
                player = %acting_player,
                active = %self.turn.active_player(),
                "Remote fire out of turn, replaying anyway"
            );
        }

        let (angle, power) = self.tuning.clamp_aim(angle, power);
        let next_wind = next_wind.clamp(-self.tuning.wind_range, self.tuning.wind_range);

        self.launch(acting_player, angle, power);
        self.turn.begin_shot(next_active_player, next_wind);

        info!(
            match_id = %self.id,
            player = %acting_player,
            angle,
            power,
            next_active = %next_active_player,
            next_wind,
            "Replaying remote shot"
        );

        Effects::none()
    }

    /// Spawn the shell under the wind currently in force
    fn launch(&mut self, shooter: PlayerIndex, angle: i32, power: i32) {
        let tank = &self.tanks[shooter.slot()];
        self.projectile = Some(Projectile::launch(
            shooter,
            tank,
            angle,
            power,
            self.turn.wind(),
            &self.tuning,
        ));
        self.shot_baseline = [self.tanks[0].health, self.tanks[1].health];
        self.shots_fired += 1;
    }

    /// Advance one fixed simulation tick
    pub fn tick(&mut self) -> Effects {
        if self.turn.is_game_over() {
            return Effects::none();
        }
        self.tick += 1;

        let mut effects = Effects::none();
        if let Some(mut projectile) = self.projectile.take() {
            projectile.step(&self.tuning);
            match CombatSystem::detect(&projectile, &self.tanks, &self.terrain, self.field, &self.tuning) {
                Some(contact) => effects = self.resolve_contact(contact),
                None => self.projectile = Some(projectile),
            }
        }

        let tuning = self.tuning;
        self.explosions.retain_mut(|explosion| explosion.update(&tuning));

        effects
    }

    /// Exactly one resolution per shot: damage, then unlock
    fn resolve_contact(&mut self, contact: Contact) -> Effects {
        let mut effects = Effects::none();

        match contact {
            Contact::OutOfBounds => {
                debug!(match_id = %self.id, "Shot left the field");
            }
            Contact::DirectHit { x, y, .. } | Contact::Terrain { x, y } => {
                self.explosions.push(Explosion::new(x, y, &self.tuning));
            }
        }

        for roll in CombatSystem::resolve(&contact, &self.tanks, &self.tuning) {
            let baseline = self.shot_baseline[roll.target.slot()];
            let (resulting_health, _) = CombatSystem::apply_damage(baseline, roll.amount);

            effects.outbound.push(PeerEvent::Damage {
                target_player: roll.target,
                resulting_health,
            });

            let applied = self.apply_health(roll.target, resulting_health);
            effects.finished = effects.finished.or(applied.finished);
        }

        self.turn.resolve_shot();
        effects
    }

    /// Merge a health value. Health never rises, so the lower value wins and
    /// repeated or reordered reports are harmless.
    fn apply_health(&mut self, target: PlayerIndex, resulting_health: f64) -> Effects {
        if !resulting_health.is_finite() {
            warn!(match_id = %self.id, player = %target, "Non-finite health reported, ignoring");
            return Effects::none();
        }

        let tank = &mut self.tanks[target.slot()];
        let merged = tank.health.min(resulting_health.max(0.0));
        if merged < tank.health {
            tank.health = merged;
            info!(match_id = %self.id, player = %target, health = merged, "Combatant damaged");
        }

        if !tank.is_knocked_out() {
            return Effects::none();
        }

        let result = MatchResult {
            winner: target.other(),
            reason: WinReason::Knockout,
        };
        if !self.turn.finish(result) {
            return Effects::none();
        }

        self.projectile = None;
        info!(match_id = %self.id, winner = %result.winner, "Knockout, match over");
        Effects {
            finished: Some(result),
            ..Effects::default()
        }
    }

    /// Opponent left, by broadcast or by transport presence. While the match
    /// is running this is a win for the local player; afterwards it is just
    /// room teardown.
    pub fn on_peer_disconnected(&mut self) -> Effects {
        let mut effects = Effects {
            opponent_left: true,
            ..Effects::default()
        };

        let result = MatchResult {
            winner: self.local,
            reason: WinReason::Disconnect,
        };
        if !self.turn.finish(result) {
            debug!(match_id = %self.id, "Opponent left after match over");
            return effects;
        }

        self.projectile = None;
        info!(match_id = %self.id, winner = %self.local, "Opponent disconnected, match over");
        effects.finished = Some(result);
        effects
    }

    /// Leave the match: discard any live shot and produce the farewell event
    pub fn leave(&mut self) -> PeerEvent {
        self.projectile = None;
        self.turn.resolve_shot();
        info!(match_id = %self.id, local = %self.local, "Leaving match");
        PeerEvent::Disconnect
    }
}

/// Session construction errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid terrain: {0}")]
    Terrain(#[from] TerrainError),

    #[error("Invalid field size {width}x{height}")]
    InvalidField { width: f64, height: f64 },

    #[error("Invalid initial health {value} for {player}")]
    InvalidHealth { player: PlayerIndex, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> MatchStart {
        MatchStart {
            match_id: Uuid::nil(),
            field: FieldSize::default(),
            terrain: vec![0.3; 51],
            wind: 0,
            healths: [100.0, 100.0],
            first_turn: PlayerIndex::One,
        }
    }

    fn session(local: PlayerIndex) -> MatchSession {
        MatchSession::new(&start(), local, GameTuning::default(), 42).unwrap()
    }

    fn run_until_resolved(session: &mut MatchSession) -> Vec<Effects> {
        let mut steps = Vec::new();
        for _ in 0..5_000 {
            let effects = session.tick();
            if !effects.is_empty() {
                steps.push(effects);
            }
            if session.projectile().is_none() {
                return steps;
            }
        }
        panic!("projectile never resolved");
    }

    #[test]
    fn rejects_invalid_start() {
        let mut bad = start();
        bad.terrain = vec![0.3];
        assert!(matches!(
            MatchSession::new(&bad, PlayerIndex::One, GameTuning::default(), 1),
            Err(SessionError::Terrain(_))
        ));

        for (width, height) in [(-100.0, 600.0), (0.0, 600.0), (1200.0, f64::NAN)] {
            let mut bad = start();
            bad.field = FieldSize { width, height };
            assert!(matches!(
                MatchSession::new(&bad, PlayerIndex::One, GameTuning::default(), 1),
                Err(SessionError::InvalidField { .. })
            ));
        }

        let mut bad = start();
        bad.healths = [100.0, f64::NAN];
        assert!(matches!(
            MatchSession::new(&bad, PlayerIndex::One, GameTuning::default(), 1),
            Err(SessionError::InvalidHealth {
                player: PlayerIndex::Two,
                ..
            })
        ));
    }

    #[test]
    fn negative_field_from_the_wire_is_an_error() {
        let mut payload = serde_json::to_value(start()).unwrap();
        payload["field"]["width"] = serde_json::json!(-100.0);
        let decoded: MatchStart = serde_json::from_value(payload).unwrap();

        let err = MatchSession::new(&decoded, PlayerIndex::Two, GameTuning::default(), 1).unwrap_err();
        assert!(matches!(err, SessionError::InvalidField { width, .. } if width == -100.0));
    }

    #[test]
    fn second_fire_before_resolution_is_rejected() {
        let mut one = session(PlayerIndex::One);

        let first = one.request_fire(45, 50);
        let second = one.request_fire(60, 80);

        assert_eq!(first.outbound.len(), 1);
        assert!(second.is_empty());
        assert_eq!(one.shots_fired(), 1);
        assert!(one.projectile().is_some());
        assert!(one.turn().is_locked());
    }

    #[test]
    fn fire_is_rejected_off_turn() {
        let mut two = session(PlayerIndex::Two);
        assert!(two.request_fire(45, 50).is_empty());
        assert!(two.projectile().is_none());
    }

    #[test]
    fn fire_clamps_aim_and_hands_over_turn() {
        let mut one = session(PlayerIndex::One);
        let effects = one.request_fire(120, 5);

        match &effects.outbound[..] {
            [PeerEvent::Fire {
                acting_player,
                angle,
                power,
                next_active_player,
                next_wind,
            }] => {
                assert_eq!(*acting_player, PlayerIndex::One);
                assert_eq!((*angle, *power), (90, 10));
                assert_eq!(*next_active_player, PlayerIndex::Two);
                assert_eq!(one.turn().wind(), *next_wind);
            }
            other => panic!("unexpected outbound {other:?}"),
        }
        assert_eq!(one.turn().active_player(), PlayerIndex::Two);
        // the shell keeps the wind it was fired under
        assert_eq!(one.projectile().map(|p| p.wind), Some(0));
    }

    #[test]
    fn remote_fire_replays_and_advances_turn_immediately() {
        let mut two = session(PlayerIndex::Two);
        two.apply_remote(PeerEvent::Fire {
            acting_player: PlayerIndex::One,
            angle: 45,
            power: 50,
            next_active_player: PlayerIndex::Two,
            next_wind: 3,
        });

        assert_eq!(two.turn().active_player(), PlayerIndex::Two);
        assert_eq!(two.turn().wind(), 3);
        assert_eq!(two.projectile().map(|p| (p.owner, p.wind)), Some((PlayerIndex::One, 0)));
        // still locked until the local replica lands
        assert!(!two.input_enabled());

        run_until_resolved(&mut two);
        assert!(two.input_enabled());
    }

    #[test]
    fn remote_fire_while_projectile_live_is_ignored() {
        let mut two = session(PlayerIndex::Two);
        let fire = |wind| PeerEvent::Fire {
            acting_player: PlayerIndex::One,
            angle: 45,
            power: 50,
            next_active_player: PlayerIndex::Two,
            next_wind: wind,
        };

        two.apply_remote(fire(2));
        let live = *two.projectile().unwrap();
        two.apply_remote(fire(-5));

        assert_eq!(two.projectile(), Some(&live));
        assert_eq!(two.turn().wind(), 2);
        assert_eq!(two.shots_fired(), 1);
    }

    #[test]
    fn remote_fire_naming_local_player_is_ignored() {
        let mut one = session(PlayerIndex::One);
        one.apply_remote(PeerEvent::Fire {
            acting_player: PlayerIndex::One,
            angle: 45,
            power: 50,
            next_active_player: PlayerIndex::Two,
            next_wind: 0,
        });
        assert!(one.projectile().is_none());
        assert_eq!(one.turn().active_player(), PlayerIndex::One);
    }

    #[test]
    fn miss_unlocks_without_damage() {
        let mut one = session(PlayerIndex::One);
        one.request_fire(45, 50);
        let steps = run_until_resolved(&mut one);

        assert!(steps.iter().all(|e| e.outbound.is_empty()));
        assert!(!one.turn().is_locked());
        // turn already belongs to the opponent
        assert!(!one.input_enabled());
        assert!(one.request_fire(45, 50).is_empty());
    }

    #[test]
    fn damage_merges_to_the_lowest_report() {
        let mut one = session(PlayerIndex::One);
        let damage = |health| PeerEvent::Damage {
            target_player: PlayerIndex::Two,
            resulting_health: health,
        };

        one.apply_remote(damage(75.0));
        one.apply_remote(damage(90.0));
        one.apply_remote(damage(75.0));
        assert_eq!(one.tank(PlayerIndex::Two).health, 75.0);
        assert!(one.result().is_none());
    }

    #[test]
    fn knockout_winner_is_written_once() {
        let mut one = session(PlayerIndex::One);
        let ko = one.apply_remote(PeerEvent::Damage {
            target_player: PlayerIndex::Two,
            resulting_health: -12.0,
        });
        let expected = MatchResult {
            winner: PlayerIndex::One,
            reason: WinReason::Knockout,
        };
        assert_eq!(ko.finished, Some(expected));
        assert_eq!(one.tank(PlayerIndex::Two).health, 0.0);

        let later = one.apply_remote(PeerEvent::Damage {
            target_player: PlayerIndex::One,
            resulting_health: 0.0,
        });
        assert!(later.finished.is_none());
        assert_eq!(one.result(), Some(expected));

        let left = one.on_peer_disconnected();
        assert!(left.opponent_left);
        assert!(left.finished.is_none());
        assert_eq!(one.result(), Some(expected));
    }

    #[test]
    fn disconnect_mid_flight_wins_for_local_player() {
        let mut one = session(PlayerIndex::One);
        one.request_fire(45, 50);
        one.tick();

        let effects = one.apply_remote(PeerEvent::Disconnect);
        assert_eq!(
            effects.finished,
            Some(MatchResult {
                winner: PlayerIndex::One,
                reason: WinReason::Disconnect
            })
        );
        assert!(one.projectile().is_none());
        assert!(one.tick().is_empty());
    }

    #[test]
    fn leaving_discards_the_live_shot() {
        let mut one = session(PlayerIndex::One);
        one.request_fire(45, 50);
        assert_eq!(one.leave(), PeerEvent::Disconnect);
        assert!(one.projectile().is_none());
        assert!(!one.turn().is_locked());
    }

    #[test]
    fn self_hit_straight_up_is_a_direct_hit() {
        let mut one = session(PlayerIndex::One);
        one.request_fire(90, 40);
        let steps = run_until_resolved(&mut one);

        let outbound: Vec<_> = steps.into_iter().flat_map(|e| e.outbound).collect();
        assert_eq!(
            outbound,
            vec![PeerEvent::Damage {
                target_player: PlayerIndex::One,
                resulting_health: 62.5
            }]
        );
        assert_eq!(one.tank(PlayerIndex::One).health, 62.5);
        assert_eq!(one.explosions().len(), 1);
    }
}
