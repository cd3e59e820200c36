//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified events per second
pub fn create_limiter(events_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(events_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Inbound events accepted per second from the opponent by default
pub const INBOUND_EVENT_RATE_LIMIT: u32 = 20;

/// Guards a peer against an opponent flooding the room channel
#[derive(Clone)]
pub struct InboundLimiter {
    limiter: Arc<Limiter>,
}

impl InboundLimiter {
    pub fn new(events_per_second: u32) -> Self {
        Self {
            limiter: create_limiter(events_per_second),
        }
    }

    /// Check if an inbound event is allowed (returns true if allowed)
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for InboundLimiter {
    fn default() -> Self {
        Self::new(INBOUND_EVENT_RATE_LIMIT)
    }
}
