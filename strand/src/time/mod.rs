//! Timers.
//!
//! Every loop keeps its timers in one table ordered by deadline. Timers due at
//! the same instant fire in the order they were registered. The table is only
//! consulted between drain passes, so even an already-expired timer suspends
//! its task once.

use std::time::{Duration, Instant};

mod timer;
pub(crate) use timer::TimerTable;
pub use timer::TimerKey;

mod sleep;
pub use sleep::{sleep, sleep_until, Sleep};

mod timeout;
pub use timeout::{timeout, timeout_at, Timeout};

/// Roughly 30 years from now. Used when `now + duration` does not fit in an
/// `Instant`.
pub(crate) fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}

/// `now + duration`, clamped to [`far_future`].
pub(crate) fn deadline_after(duration: Duration) -> Instant {
    Instant::now()
        .checked_add(duration)
        .unwrap_or_else(far_future)
}
