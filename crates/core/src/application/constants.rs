// Queue engine constants (no magic values)
use std::time::Duration;

/// Display countdown refresh interval (1s)
pub const DEFAULT_COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Number of departments listed in the admin overview ranking
pub const DEFAULT_TOP_DEPARTMENTS_LIMIT: usize = 5;

/// Buffered ledger-change notifications per subscriber
/// Slow subscribers beyond this see `Lagged` and refresh from a snapshot
pub const LEDGER_EVENT_CHANNEL_CAPACITY: usize = 256;

pub const SECONDS_PER_MINUTE: f64 = 60.0;

pub const MILLIS_PER_MINUTE: f64 = 60_000.0;
