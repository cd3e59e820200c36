//! Time utilities for the simulation loop

use std::time::Duration;

/// Default simulation rate
pub const SIMULATION_TPS: u32 = 60;

/// Wall-clock length of one simulation tick
pub fn tick_duration(ticks_per_second: u32) -> Duration {
    Duration::from_micros(1_000_000 / ticks_per_second.max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_duration_matches_rate() {
        assert_eq!(tick_duration(50), Duration::from_millis(20));
        assert_eq!(tick_duration(0), Duration::from_secs(1));
    }
}
