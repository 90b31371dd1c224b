use governor::clock::{ Clock, DefaultClock };
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::HashMapStateStore;
use governor::{ Quota, RateLimiter };
use log::debug;
use std::time::Duration;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1200);

/// Keys tracked before stale entries are pruned.
const PRUNE_THRESHOLD: usize = 10_000;

type KeyedLimiter<C> = RateLimiter<
    String,
    HashMapStateStore<String>,
    C,
    NoOpMiddleware<<C as Clock>::Instant>
>;

/// Minimum-interval gate: a key is admitted only if at least `interval` has
/// passed since its last admitted request. Rejections leave the state untouched.
pub struct Throttle<C: Clock = DefaultClock> {
    limiter: Option<KeyedLimiter<C>>,
}

impl Throttle<DefaultClock> {
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, DefaultClock::default())
    }
}

impl<C: Clock> Throttle<C> {
    /// A zero interval disables throttling.
    pub fn with_clock(interval: Duration, clock: C) -> Self {
        // Burst of one: GCRA then admits iff `now - last_admitted >= interval`.
        let limiter = Quota::with_period(interval).map(|quota|
            RateLimiter::hashmap_with_clock(quota, clock)
        );
        Self { limiter }
    }

    pub fn admit(&self, key: &str) -> bool {
        let Some(limiter) = &self.limiter else {
            return true;
        };
        if limiter.len() > PRUNE_THRESHOLD {
            limiter.retain_recent();
        }
        let admitted = limiter.check_key(&key.to_string()).is_ok();
        if !admitted {
            debug!("Throttled request for key '{}'", key);
        }
        admitted
    }
}
