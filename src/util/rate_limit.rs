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
pub fn create_limiter(per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Repeated send-failure warnings per participant
pub const SEND_FAILURE_LOG_RATE: u32 = 2;

/// Unknown-message warnings per participant
pub const UNKNOWN_MESSAGE_LOG_RATE: u32 = 5;

/// Throttle for a warning that can fire every tick (e.g. a stalled peer).
///
/// Suppressed occurrences are counted and reported with the next allowed one.
pub struct LogThrottle {
    limiter: Arc<Limiter>,
    suppressed: u64,
}

impl LogThrottle {
    pub fn new(per_second: u32) -> Self {
        Self {
            limiter: create_limiter(per_second),
            suppressed: 0,
        }
    }

    /// Returns `Some(suppressed_since_last)` if this occurrence should be logged
    pub fn check(&mut self) -> Option<u64> {
        if self.limiter.check().is_ok() {
            Some(std::mem::take(&mut self.suppressed))
        } else {
            self.suppressed += 1;
            None
        }
    }
}
