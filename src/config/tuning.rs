//! Gameplay tuning shared by both peers.
//!
//! Both sides of a duel must run with identical values here; nothing in this
//! struct is negotiated over the wire.

/// Static physics, combat and presentation constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameTuning {
    /// Added to vertical velocity every tick
    pub gravity: f64,
    /// Scales the integer wind into a per-tick horizontal acceleration
    pub wind_coefficient: f64,
    /// Launch speed at 100% power
    pub max_power: f64,
    pub tank_width: f64,
    pub tank_height: f64,
    /// Distance from tank centre to the muzzle
    pub cannon_length: f64,
    /// Splash damage reaches zero at this distance
    pub explosion_radius: f64,
    pub max_health: f64,
    /// Splash damage at the epicentre
    pub base_damage: f64,
    /// Direct hits deal `base_damage * direct_hit_multiplier`
    pub direct_hit_multiplier: f64,
    /// Wind is rolled uniformly in `-wind_range..=wind_range`
    pub wind_range: i32,
    /// Terrain profile has `terrain_segments + 1` samples
    pub terrain_segments: usize,
    /// Horizontal spawn position of each tank as a fraction of field width
    pub spawn_fractions: [f64; 2],
    pub min_power_percent: i32,
    pub max_power_percent: i32,
    pub min_angle: i32,
    pub max_angle: i32,
    pub explosion_start_radius: f64,
    pub explosion_growth: f64,
    pub explosion_fade: f64,
}

impl Default for GameTuning {
    fn default() -> Self {
        Self {
            gravity: 0.3,
            wind_coefficient: 0.01,
            max_power: 15.0,
            tank_width: 60.0,
            tank_height: 40.0,
            cannon_length: 30.0,
            explosion_radius: 40.0,
            max_health: 100.0,
            base_damage: 25.0,
            direct_hit_multiplier: 1.5,
            wind_range: 5,
            terrain_segments: 50,
            spawn_fractions: [0.15, 0.85],
            min_power_percent: 10,
            max_power_percent: 100,
            min_angle: 0,
            max_angle: 90,
            explosion_start_radius: 10.0,
            explosion_growth: 5.0,
            explosion_fade: 0.05,
        }
    }
}

impl GameTuning {
    /// Clamp a raw aim into the legal range. Out-of-range input is never an error.
    pub fn clamp_aim(&self, angle: i32, power_percent: i32) -> (i32, i32) {
        (
            angle.clamp(self.min_angle, self.max_angle),
            power_percent.clamp(self.min_power_percent, self.max_power_percent),
        )
    }

    /// Launch speed for a power percentage
    pub fn launch_speed(&self, power_percent: i32) -> f64 {
        power_percent as f64 / 100.0 * self.max_power
    }

    pub fn direct_hit_damage(&self) -> f64 {
        self.base_damage * self.direct_hit_multiplier
    }
}
