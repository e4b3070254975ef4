//! Position & ETA Estimator
//!
//! Pure functions from ledger state to the numbers a student sees:
//! - position: 1-based rank among waiting entries only
//! - ETA: `position * average_service_minutes * 60` seconds
//! - progress: measured against the waiting count captured at join
//!
//! The ETA model is linear on purpose. It has no variance, no staff-count
//! multiplier and no per-queue history weighting.

use crate::application::constants::{MILLIS_PER_MINUTE, SECONDS_PER_MINUTE};
use crate::domain::{
    DepartmentId, DomainError, EntryId, EntryStatus, Ledger, QueueEntry, QueueNumber,
};
use serde::{Deserialize, Serialize};

/// Source of the per-person service duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTimeMode {
    /// Use the ledger's configured average
    #[default]
    Configured,
    /// Use the mean call-to-finish time of served entries, falling back to configured
    Observed,
}

/// Derived position of one active entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionView {
    pub entry_id: EntryId,
    pub department_id: DepartmentId,
    pub queue_number: QueueNumber,
    pub status: EntryStatus,
    /// 0 while serving
    pub position: u32,
    pub total_waiting: u32,
    pub eta_seconds: u64,
    pub progress_percent: u8,
}

/// Rank among waiting entries; a serving entry has position 0
pub fn position(ledger: &Ledger, entry: &QueueEntry) -> u32 {
    match entry.status {
        EntryStatus::Waiting => {
            let ahead = ledger
                .waiting()
                .filter(|e| e.queue_number < entry.queue_number)
                .count();
            ahead as u32 + 1
        }
        EntryStatus::Serving | EntryStatus::Served | EntryStatus::Skipped => 0,
    }
}

pub fn eta_seconds(position: u32, service_minutes: f64) -> u64 {
    (position as f64 * service_minutes * SECONDS_PER_MINUTE).round() as u64
}

/// `round((waiting_at_join - position) / waiting_at_join * 100)`, clamped to 0..=100
pub fn progress_percent(waiting_at_join: u32, position: u32) -> u8 {
    if waiting_at_join == 0 {
        return 100;
    }
    let done = waiting_at_join.saturating_sub(position) as f64;
    let percent = (done / waiting_at_join as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Mean service duration of served entries, in minutes
pub fn observed_service_minutes(history: &[QueueEntry]) -> Option<f64> {
    let durations: Vec<i64> = history
        .iter()
        .filter_map(QueueEntry::service_duration_ms)
        .filter(|ms| *ms > 0)
        .collect();
    if durations.is_empty() {
        return None;
    }
    let total: i64 = durations.iter().sum();
    Some(total as f64 / durations.len() as f64 / MILLIS_PER_MINUTE)
}

pub fn effective_service_minutes(ledger: &Ledger, mode: ServiceTimeMode) -> f64 {
    match mode {
        ServiceTimeMode::Configured => ledger.average_service_minutes(),
        ServiceTimeMode::Observed => observed_service_minutes(ledger.history())
            .unwrap_or_else(|| ledger.average_service_minutes()),
    }
}

/// Position view for an active entry of `ledger`
pub fn position_view(
    ledger: &Ledger,
    entry_id: &str,
    mode: ServiceTimeMode,
) -> Result<PositionView, DomainError> {
    let entry = ledger
        .find(entry_id)
        .ok_or_else(|| DomainError::EntryNotFound(entry_id.to_string()))?;

    let position = position(ledger, entry);
    let (eta_seconds, progress_percent) = match entry.status {
        EntryStatus::Waiting => (
            eta_seconds(position, effective_service_minutes(ledger, mode)),
            progress_percent(entry.waiting_at_join, position),
        ),
        EntryStatus::Serving | EntryStatus::Served | EntryStatus::Skipped => (0, 100),
    };

    Ok(PositionView {
        entry_id: entry.id.clone(),
        department_id: entry.department_id.clone(),
        queue_number: entry.queue_number,
        status: entry.status,
        position,
        total_waiting: ledger.total_waiting() as u32,
        eta_seconds,
        progress_percent,
    })
}

/// Mean ETA over waiting entries in minutes, 0 when nobody waits
pub fn average_wait_minutes(ledger: &Ledger, mode: ServiceTimeMode) -> f64 {
    let waiting = ledger.total_waiting();
    if waiting == 0 {
        return 0.0;
    }
    // Positions are exactly 1..=n, so the mean position is (n + 1) / 2
    let mean_position = (waiting as f64 + 1.0) / 2.0;
    mean_position * effective_service_minutes(ledger, mode)
}

/// Display countdown anchored to an authoritative ETA.
///
/// `remaining_seconds` only decrements for UI smoothness; callers re-anchor
/// whenever a mutation changes the position or the computed ETA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    position: u32,
    eta_seconds: u64,
    anchored_at: i64,
}

impl Countdown {
    pub fn new(position: u32, eta_seconds: u64, now_millis: i64) -> Self {
        Self {
            position,
            eta_seconds,
            anchored_at: now_millis,
        }
    }

    pub fn eta_seconds(&self) -> u64 {
        self.eta_seconds
    }

    /// Seconds left, decremented once per whole elapsed second, floored at 0
    pub fn remaining_seconds(&self, now_millis: i64) -> u64 {
        let elapsed = (now_millis - self.anchored_at).max(0) / 1000;
        self.eta_seconds.saturating_sub(elapsed as u64)
    }

    /// Re-anchor if the position or ETA changed; returns whether it did
    pub fn reanchor(&mut self, position: u32, eta_seconds: u64, now_millis: i64) -> bool {
        if self.position == position && self.eta_seconds == eta_seconds {
            return false;
        }
        *self = Self::new(position, eta_seconds, now_millis);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Subject;

    fn ledger_of(n: usize) -> Ledger {
        let mut ledger = Ledger::new("registrar", 5.0);
        for i in 1..=n {
            ledger
                .join(format!("e-{}", i), Subject::new(format!("S{}", i), format!("ST{}", i)), i as i64)
                .unwrap();
        }
        ledger
    }

    fn pos(ledger: &Ledger, id: &str) -> u32 {
        position_view(ledger, id, ServiceTimeMode::Configured)
            .unwrap()
            .position
    }

    #[test]
    fn test_position_follows_queue_number() {
        let ledger = ledger_of(3);
        assert_eq!(pos(&ledger, "e-1"), 1);
        assert_eq!(pos(&ledger, "e-2"), 2);
        assert_eq!(pos(&ledger, "e-3"), 3);
    }

    #[test]
    fn test_eta_is_linear() {
        let ledger = ledger_of(2);
        let view = position_view(&ledger, "e-2", ServiceTimeMode::Configured).unwrap();
        assert_eq!(view.eta_seconds, 2 * 5 * 60);
        assert_eq!(view.total_waiting, 2);
    }

    #[test]
    fn test_position_drops_by_one_when_entry_ahead_leaves_waiting() {
        let mut ledger = ledger_of(4);
        let before = pos(&ledger, "e-4");

        ledger.call_next(10).unwrap();
        assert_eq!(pos(&ledger, "e-4"), before - 1);

        ledger.skip("e-2", 20).unwrap();
        assert_eq!(pos(&ledger, "e-4"), before - 2);

        ledger.leave("e-3").unwrap();
        assert_eq!(pos(&ledger, "e-4"), before - 3);
    }

    #[test]
    fn test_skipped_entry_excluded_from_rank() {
        let mut ledger = ledger_of(3);
        ledger.skip("e-2", 10).unwrap();
        assert_eq!(pos(&ledger, "e-3"), 2);
    }

    #[test]
    fn test_serving_entry_view() {
        let mut ledger = ledger_of(2);
        ledger.call_next(10).unwrap();
        let view = position_view(&ledger, "e-1", ServiceTimeMode::Configured).unwrap();
        assert_eq!(view.status, EntryStatus::Serving);
        assert_eq!(view.position, 0);
        assert_eq!(view.eta_seconds, 0);
        assert_eq!(view.progress_percent, 100);
        assert_eq!(pos(&ledger, "e-2"), 1);
    }

    #[test]
    fn test_progress_uses_fixed_denominator() {
        let mut ledger = ledger_of(4);
        // e-4 joined behind three others: denominator 4
        assert_eq!(
            position_view(&ledger, "e-4", ServiceTimeMode::Configured)
                .unwrap()
                .progress_percent,
            0
        );

        ledger.leave("e-1").unwrap();
        // Later joiners do not move the denominator
        ledger.join("e-5", Subject::new("S5", "ST5"), 50).unwrap();

        let view = position_view(&ledger, "e-4", ServiceTimeMode::Configured).unwrap();
        assert_eq!(view.position, 3);
        assert_eq!(view.progress_percent, 25);
    }

    #[test]
    fn test_progress_percent_rounding() {
        assert_eq!(progress_percent(3, 2), 33);
        assert_eq!(progress_percent(3, 1), 67);
        assert_eq!(progress_percent(3, 5), 0);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn test_unknown_entry_is_not_found() {
        let ledger = ledger_of(1);
        let err = position_view(&ledger, "missing", ServiceTimeMode::Configured).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_observed_service_minutes() {
        let mut ledger = ledger_of(3);
        assert!(observed_service_minutes(ledger.history()).is_none());
        assert_eq!(effective_service_minutes(&ledger, ServiceTimeMode::Observed), 5.0);

        ledger.call_next(0).unwrap();
        ledger.mark_served("e-1", 120_000).unwrap();
        ledger.call_next(200_000).unwrap();
        ledger.mark_served("e-2", 440_000).unwrap();

        // (2 min + 4 min) / 2
        assert_eq!(observed_service_minutes(ledger.history()), Some(3.0));
        assert_eq!(effective_service_minutes(&ledger, ServiceTimeMode::Observed), 3.0);
        assert_eq!(effective_service_minutes(&ledger, ServiceTimeMode::Configured), 5.0);
    }

    #[test]
    fn test_average_wait_minutes() {
        assert_eq!(average_wait_minutes(&ledger_of(0), ServiceTimeMode::Configured), 0.0);
        // ETAs 5, 10, 15 minutes
        assert_eq!(average_wait_minutes(&ledger_of(3), ServiceTimeMode::Configured), 10.0);
    }

    #[test]
    fn test_countdown_decrements_and_floors() {
        let countdown = Countdown::new(1, 3, 10_000);
        assert_eq!(countdown.remaining_seconds(10_000), 3);
        assert_eq!(countdown.remaining_seconds(11_999), 2);
        assert_eq!(countdown.remaining_seconds(60_000), 0);
        assert_eq!(countdown.remaining_seconds(5_000), 3);
    }

    #[test]
    fn test_countdown_reanchor() {
        let mut countdown = Countdown::new(2, 600, 0);
        assert!(!countdown.reanchor(2, 600, 30_000));
        assert_eq!(countdown.remaining_seconds(30_000), 570);

        assert!(countdown.reanchor(1, 300, 30_000));
        assert_eq!(countdown.remaining_seconds(30_000), 300);
    }

    #[test]
    fn test_countdown_reanchors_on_position_change_with_same_eta() {
        let mut countdown = Countdown::new(3, 900, 0);
        assert!(countdown.reanchor(2, 900, 450_000));
        assert_eq!(countdown.remaining_seconds(450_000), 900);
    }
}
