//! Projectile launch and per-tick integration
//!
//! Everything here must come out identical on both peers for identical
//! inputs, so there is no randomness and the operation order is fixed.

use crate::config::GameTuning;
use crate::net::protocol::PlayerIndex;

use super::combat::Tank;

/// A shell in flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub owner: PlayerIndex,
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    /// Wind in force when the shell left the barrel
    pub wind: i32,
}

impl Projectile {
    /// Spawn a shell at the muzzle of `tank`. `angle` and `power_percent`
    /// must already be clamped.
    pub fn launch(
        owner: PlayerIndex,
        tank: &Tank,
        angle: i32,
        power_percent: i32,
        wind: i32,
        tuning: &GameTuning,
    ) -> Self {
        let (dir_x, dir_y) = PhysicsSystem::barrel_direction(tank.facing, angle);
        let speed = tuning.launch_speed(power_percent);

        Self {
            owner,
            x: tank.x + dir_x * tuning.cannon_length,
            y: tank.y - dir_y * tuning.cannon_length,
            vel_x: dir_x * speed,
            vel_y: -dir_y * speed,
            wind,
        }
    }

    /// Advance one simulation tick
    pub fn step(&mut self, tuning: &GameTuning) {
        self.x += self.vel_x;
        self.y += self.vel_y;
        self.vel_y += tuning.gravity;
        self.vel_x += self.wind as f64 * tuning.wind_coefficient;
    }
}

/// Stateless helpers shared by launch and collision code
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Unit barrel direction with y pointing up. A left-facing tank mirrors
    /// the angle around the vertical.
    pub fn barrel_direction(facing: i8, angle: i32) -> (f64, f64) {
        let degrees = if facing >= 0 { angle } else { 180 - angle };
        let radians = (degrees as f64).to_radians();
        (radians.cos(), radians.sin())
    }

    /// Euclidean distance between two points
    pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
        let dx = x1 - x2;
        let dy = y1 - y2;
        (dx * dx + dy * dy).sqrt()
    }
}
