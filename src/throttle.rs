//! Restart throttling
//!
//! The last-restart timestamp lives on the policy, so one restart
//! throttles every pod the policy selects until the interval elapses.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Decide whether a restart is permitted at `now`.
///
/// Permitted when no interval is configured, when nothing has been
/// restarted yet, or when at least `min_interval` has passed since the
/// last restart. A last restart in the future counts as not elapsed.
pub fn permits(
    last_restart: Option<DateTime<Utc>>,
    min_interval: Option<Duration>,
    now: DateTime<Utc>,
) -> bool {
    let (Some(last), Some(min_interval)) = (last_restart, min_interval) else {
        return true;
    };

    match (now - last).to_std() {
        Ok(elapsed) => elapsed >= min_interval,
        Err(_) => false,
    }
}

/// Time left before the next restart is permitted, for logging.
pub fn remaining(
    last_restart: Option<DateTime<Utc>>,
    min_interval: Option<Duration>,
    now: DateTime<Utc>,
) -> Option<Duration> {
    let last = last_restart?;
    let min_interval = min_interval?;
    let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
    min_interval.checked_sub(elapsed).filter(|d| !d.is_zero())
}
