//! Combat system - contact detection, splash and direct-hit damage

use crate::config::GameTuning;
use crate::net::protocol::{FieldSize, PlayerIndex};

use super::physics::{PhysicsSystem, Projectile};
use super::terrain::Terrain;

/// Colour tags handed to the renderer, indexed by player slot
pub const TANK_COLORS: [&str; 2] = ["#3b82f6", "#ef4444"];

/// A combatant
#[derive(Debug, Clone, PartialEq)]
pub struct Tank {
    /// Centre x
    pub x: f64,
    /// Centre y
    pub y: f64,
    /// +1 faces right, -1 faces left
    pub facing: i8,
    /// 0..=max_health; only lowered through the damage path
    pub health: f64,
    pub color: &'static str,
}

impl Tank {
    /// Place a player's tank on the terrain surface at its spawn column
    pub fn spawn(player: PlayerIndex, health: f64, terrain: &Terrain, tuning: &GameTuning) -> Self {
        let slot = player.slot();
        let x = terrain.width() * tuning.spawn_fractions[slot];
        Self {
            x,
            y: terrain.height_at(x) - tuning.tank_height / 2.0,
            facing: if player == PlayerIndex::One { 1 } else { -1 },
            health,
            color: TANK_COLORS[slot],
        }
    }

    pub fn is_knocked_out(&self) -> bool {
        self.health <= 0.0
    }
}

/// What a projectile touched this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    /// Left the playfield; silent miss
    OutOfBounds,
    /// Came within half a tank width of a combatant's centre
    DirectHit { target: PlayerIndex, x: f64, y: f64 },
    /// Reached the surface; the explosion sits at `(x, y)` on it
    Terrain { x: f64, y: f64 },
}

/// Damage owed to one combatant by a resolved contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRoll {
    pub target: PlayerIndex,
    pub amount: f64,
}

/// Explosion visual, decaying each tick
#[derive(Debug, Clone, PartialEq)]
pub struct Explosion {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub alpha: f64,
}

impl Explosion {
    pub fn new(x: f64, y: f64, tuning: &GameTuning) -> Self {
        Self {
            x,
            y,
            radius: tuning.explosion_start_radius,
            alpha: 1.0,
        }
    }

    /// Grow and fade; returns false once fully transparent
    pub fn update(&mut self, tuning: &GameTuning) -> bool {
        self.radius += tuning.explosion_growth;
        self.alpha -= tuning.explosion_fade;
        self.alpha > 0.0
    }
}

/// Combat system for contact checks and damage
pub struct CombatSystem;

impl CombatSystem {
    /// Check the projectile against the field bounds, the combatants and the
    /// terrain, in that order.
    pub fn detect(
        projectile: &Projectile,
        tanks: &[Tank; 2],
        terrain: &Terrain,
        field: FieldSize,
        tuning: &GameTuning,
    ) -> Option<Contact> {
        let (x, y) = (projectile.x, projectile.y);

        if x < 0.0 || x > field.width || y > field.height {
            return Some(Contact::OutOfBounds);
        }

        let hit_radius = tuning.tank_width / 2.0;
        for player in PlayerIndex::ALL {
            let tank = &tanks[player.slot()];
            if PhysicsSystem::distance(x, y, tank.x, tank.y) < hit_radius {
                return Some(Contact::DirectHit { target: player, x, y });
            }
        }

        let surface = terrain.height_at(x);
        if y >= surface {
            return Some(Contact::Terrain { x, y: surface });
        }

        None
    }

    /// Linear falloff: full base damage at the epicentre, zero at the radius
    pub fn splash_damage(distance: f64, tuning: &GameTuning) -> f64 {
        let falloff = (1.0 - distance / tuning.explosion_radius).max(0.0);
        (tuning.base_damage * falloff).floor()
    }

    /// Damage owed for a contact. Misses owe nothing; splash can hit the
    /// firer too.
    pub fn resolve(contact: &Contact, tanks: &[Tank; 2], tuning: &GameTuning) -> Vec<DamageRoll> {
        match *contact {
            Contact::OutOfBounds => Vec::new(),
            Contact::DirectHit { target, .. } => vec![DamageRoll {
                target,
                amount: tuning.direct_hit_damage(),
            }],
            Contact::Terrain { x, y } => PlayerIndex::ALL
                .into_iter()
                .filter_map(|player| {
                    let tank = &tanks[player.slot()];
                    let distance = PhysicsSystem::distance(x, y, tank.x, tank.y);
                    if distance >= tuning.explosion_radius {
                        return None;
                    }
                    let amount = Self::splash_damage(distance, tuning);
                    (amount > 0.0).then_some(DamageRoll { target: player, amount })
                })
                .collect(),
        }
    }

    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: f64, damage: f64) -> (f64, bool) {
        let new_health = (current_health - damage).max(0.0);
        (new_health, new_health <= 0.0)
    }
}
