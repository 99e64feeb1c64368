// FallGuard — Millisecond Clock & Deadlines
//
// Timestamps are a free-running u32 millisecond counter (wraps after ~49
// days). All comparisons go through `elapsed`, which is wraparound safe as
// long as the two instants are less than one wrap apart.

/// Milliseconds since boot, truncated to 32 bits.
pub type Timestamp = u32;

/// Source of the monotonic millisecond tick.
pub trait Clock {
    fn now_ms(&self) -> Timestamp;
}

/// `now - since`, modulo 2^32.
#[inline]
pub fn elapsed(now: Timestamp, since: Timestamp) -> u32 {
    now.wrapping_sub(since)
}

/// How long to sleep so that a loop iteration started at `started` lasts
/// `period_ms`. Zero when the iteration already overran.
pub fn period_remaining(started: Timestamp, now: Timestamp, period_ms: u32) -> u32 {
    period_ms.saturating_sub(elapsed(now, started))
}

/// A point-in-time plus a duration. Pure data: nothing has to be cancelled,
/// the owner simply stops asking once it no longer cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub started_at: Timestamp,
    pub duration_ms: u32,
}

impl Deadline {
    pub fn new(started_at: Timestamp, duration_ms: u32) -> Self {
        Self { started_at, duration_ms }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        elapsed(now, self.started_at) >= self.duration_ms
    }

    /// Milliseconds left before expiry (0 once expired).
    pub fn remaining(&self, now: Timestamp) -> u32 {
        self.duration_ms.saturating_sub(elapsed(now, self.started_at))
    }
}
