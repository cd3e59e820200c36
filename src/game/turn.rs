//! Turn ownership, firing lock, wind and the terminal match result
//!
//! Turn ownership and the firing lock are separate on purpose: `active_player`
//! changes hands the moment a shot is fired, while `locked` only clears once
//! the local replica of that shot has resolved.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::net::protocol::PlayerIndex;

/// Roll a wind value uniformly in `-range..=range`
pub fn roll_wind<R: Rng>(rng: &mut R, range: i32) -> i32 {
    let range = range.abs();
    rng.gen_range(-range..=range)
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    Knockout,
    Disconnect,
}

/// Terminal outcome, written once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub winner: PlayerIndex,
    pub reason: WinReason,
}

impl MatchResult {
    pub fn loser(&self) -> PlayerIndex {
        self.winner.other()
    }
}

/// Coarse phase derived from the turn variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    WaitingForShot(PlayerIndex),
    InFlight,
    MatchOver(MatchResult),
}

/// Per-peer turn state
#[derive(Debug, Clone, PartialEq)]
pub struct TurnState {
    active_player: PlayerIndex,
    wind: i32,
    locked: bool,
    result: Option<MatchResult>,
}

impl TurnState {
    pub fn new(active_player: PlayerIndex, wind: i32) -> Self {
        Self {
            active_player,
            wind,
            locked: false,
            result: None,
        }
    }

    pub fn active_player(&self) -> PlayerIndex {
        self.active_player
    }

    pub fn wind(&self) -> i32 {
        self.wind
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_game_over(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.result
    }

    pub fn phase(&self) -> TurnPhase {
        match (self.result, self.locked) {
            (Some(result), _) => TurnPhase::MatchOver(result),
            (None, true) => TurnPhase::InFlight,
            (None, false) => TurnPhase::WaitingForShot(self.active_player),
        }
    }

    /// Whether `player` may fire right now as far as turn state goes
    pub fn can_fire(&self, player: PlayerIndex) -> bool {
        self.active_player == player && !self.locked && !self.is_game_over()
    }

    /// Whether the local input controls should be live
    pub fn input_enabled(&self, local: PlayerIndex) -> bool {
        self.can_fire(local)
    }

    /// A shot left the barrel: lock until it resolves and hand the turn over
    pub fn begin_shot(&mut self, next_active_player: PlayerIndex, next_wind: i32) {
        self.locked = true;
        self.active_player = next_active_player;
        self.wind = next_wind;
    }

    /// The local replica resolved (contact or despawn)
    pub fn resolve_shot(&mut self) {
        self.locked = false;
    }

    /// Enter the terminal state. Returns false if it was already terminal, in
    /// which case nothing changes.
    pub fn finish(&mut self, result: MatchResult) -> bool {
        if self.result.is_some() {
            return false;
        }
        self.result = Some(result);
        self.locked = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn shot_hands_over_turn_but_keeps_lock() {
        let mut turn = TurnState::new(PlayerIndex::One, 2);
        assert!(turn.can_fire(PlayerIndex::One));
        assert!(!turn.can_fire(PlayerIndex::Two));

        turn.begin_shot(PlayerIndex::Two, -4);
        assert_eq!(turn.active_player(), PlayerIndex::Two);
        assert_eq!(turn.wind(), -4);
        assert_eq!(turn.phase(), TurnPhase::InFlight);
        assert!(!turn.can_fire(PlayerIndex::One));
        assert!(!turn.can_fire(PlayerIndex::Two));

        turn.resolve_shot();
        assert_eq!(turn.phase(), TurnPhase::WaitingForShot(PlayerIndex::Two));
        assert!(turn.input_enabled(PlayerIndex::Two));
        assert!(!turn.input_enabled(PlayerIndex::One));
    }

    #[test]
    fn terminal_state_is_written_once() {
        let mut turn = TurnState::new(PlayerIndex::One, 0);
        let first = MatchResult {
            winner: PlayerIndex::Two,
            reason: WinReason::Knockout,
        };
        assert!(turn.finish(first));
        assert!(!turn.finish(MatchResult {
            winner: PlayerIndex::One,
            reason: WinReason::Disconnect,
        }));
        assert_eq!(turn.result(), Some(first));
        assert_eq!(turn.phase(), TurnPhase::MatchOver(first));
        assert!(!turn.can_fire(PlayerIndex::One));
    }

    #[test]
    fn wind_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let rolls: Vec<i32> = (0..500).map(|_| roll_wind(&mut rng, 5)).collect();
        assert!(rolls.iter().all(|w| (-5..=5).contains(w)));
        assert!(rolls.contains(&-5) && rolls.contains(&5));
    }
}
