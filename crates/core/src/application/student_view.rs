// Student Queue View
//
// Every active membership of one student, across departments, with a
// display countdown. Positions always come from the registry; the countdown
// only smooths the ETA between recomputations.

use crate::application::estimator::{self, Countdown, PositionView, ServiceTimeMode};
use crate::application::registry::QueueRegistry;
use crate::application::shutdown::ShutdownToken;
use crate::domain::{DepartmentId, EntryId, EntryStatus, QueueNumber};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// One row of the student's "my queues" screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRow {
    pub entry_id: EntryId,
    pub department_id: DepartmentId,
    pub department_name: String,
    pub queue_number: QueueNumber,
    pub status: EntryStatus,
    pub position: u32,
    pub total_waiting: u32,
    pub eta_seconds: u64,
    pub remaining_seconds: u64,
    pub progress_percent: u8,
}

struct Membership {
    view: PositionView,
    department_name: String,
    countdown: Countdown,
}

pub struct StudentQueueView {
    registry: Arc<QueueRegistry>,
    external_id: String,
    mode: ServiceTimeMode,
    memberships: Vec<Membership>,
}

impl StudentQueueView {
    pub fn new(
        registry: Arc<QueueRegistry>,
        external_id: impl Into<String>,
        mode: ServiceTimeMode,
    ) -> Self {
        Self {
            registry,
            external_id: external_id.into(),
            mode,
            memberships: Vec::new(),
        }
    }

    /// Recompute memberships from the registry.
    ///
    /// Countdown anchors survive when position and ETA are unchanged and reset otherwise.
    pub fn refresh(&mut self) -> Result<()> {
        let now = self.registry.now_millis();
        let mut refreshed = Vec::new();

        for (ledger, entry) in self.registry.memberships_of(&self.external_id)? {
            let view = estimator::position_view(&ledger, &entry.id, self.mode)?;
            let department_name = self
                .registry
                .department(ledger.department_id())
                .map(|d| d.name)
                .unwrap_or_else(|_| ledger.department_id().to_string());

            let countdown = match self.memberships.iter().find(|m| m.view.entry_id == view.entry_id) {
                Some(previous) => {
                    let mut countdown = previous.countdown;
                    countdown.reanchor(view.position, view.eta_seconds, now);
                    countdown
                }
                None => Countdown::new(view.position, view.eta_seconds, now),
            };

            refreshed.push(Membership {
                view,
                department_name,
                countdown,
            });
        }

        debug!(external_id = %self.external_id, memberships = refreshed.len(), "Student view refreshed");
        self.memberships = refreshed;
        Ok(())
    }

    /// Display rows at `now_millis`
    pub fn rows(&self, now_millis: i64) -> Vec<MembershipRow> {
        self.memberships
            .iter()
            .map(|m| MembershipRow {
                entry_id: m.view.entry_id.clone(),
                department_id: m.view.department_id.clone(),
                department_name: m.department_name.clone(),
                queue_number: m.view.queue_number,
                status: m.view.status,
                position: m.view.position,
                total_waiting: m.view.total_waiting,
                eta_seconds: m.view.eta_seconds,
                remaining_seconds: m.countdown.remaining_seconds(now_millis),
                progress_percent: m.view.progress_percent,
            })
            .collect()
    }

    /// Refresh and render in one step
    pub fn snapshot(&mut self) -> Result<Vec<MembershipRow>> {
        self.refresh()?;
        Ok(self.rows(self.registry.now_millis()))
    }

    /// Display loop: re-render on every tick and recompute on every ledger change.
    ///
    /// Stops on shutdown, when the event channel closes, or when no receiver
    /// is left for `rows_tx`.
    pub async fn run(
        mut self,
        tick: Duration,
        mut shutdown: ShutdownToken,
        rows_tx: watch::Sender<Vec<MembershipRow>>,
    ) -> Result<()> {
        let mut events = self.registry.subscribe();
        let mut ticker = tokio::time::interval(tick);
        self.refresh()?;

        info!(external_id = %self.external_id, "Student view loop started");
        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                event = events.recv() => match event {
                    Ok(_) => self.refresh()?,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(external_id = %self.external_id, missed = missed, "Student view lagged, refreshing");
                        self.refresh()?;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = ticker.tick() => {}
            }

            if rows_tx.send(self.rows(self.registry.now_millis())).is_err() {
                break;
            }
        }
        info!(external_id = %self.external_id, "Student view loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::tests::test_registry;
    use crate::application::serving::ServingController;
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::Subject;
    use crate::port::TimeProvider;

    #[test]
    fn test_rows_across_departments() {
        let (registry, clock) = test_registry();
        registry.join("registrar", Subject::new("Bob", "ST2")).unwrap();
        registry.join("registrar", Subject::new("Alice", "ST1")).unwrap();
        clock.advance(1000);
        registry.join("bursary", Subject::new("Alice", "ST1")).unwrap();

        let mut view = StudentQueueView::new(registry, "ST1", ServiceTimeMode::Configured);
        let rows = view.snapshot().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].department_name, "Registrar");
        assert_eq!(rows[0].position, 2);
        assert_eq!(rows[0].eta_seconds, 600);
        assert_eq!(rows[1].department_id, "bursary");
        assert_eq!(rows[1].position, 1);
        assert_eq!(rows[1].eta_seconds, 600);
    }

    #[test]
    fn test_countdown_ticks_without_mutating_position() {
        let (registry, clock) = test_registry();
        registry.join("registrar", Subject::new("Alice", "ST1")).unwrap();

        let mut view = StudentQueueView::new(registry, "ST1", ServiceTimeMode::Configured);
        view.refresh().unwrap();

        clock.advance(90_000);
        let rows = view.rows(clock.now_millis());
        assert_eq!(rows[0].remaining_seconds, 300 - 90);
        assert_eq!(rows[0].position, 1);

        // Refresh with unchanged ETA keeps the anchor
        view.refresh().unwrap();
        assert_eq!(view.rows(clock.now_millis())[0].remaining_seconds, 210);
    }

    #[test]
    fn test_position_change_reanchors_countdown() {
        let (registry, clock) = test_registry();
        registry.join("registrar", Subject::new("Bob", "ST2")).unwrap();
        registry.join("registrar", Subject::new("Alice", "ST1")).unwrap();
        let staff = ServingController::new(registry.clone());

        let mut view = StudentQueueView::new(registry, "ST1", ServiceTimeMode::Configured);
        view.refresh().unwrap();
        clock.advance(30_000);

        staff.call_next_student("registrar").unwrap();
        view.refresh().unwrap();
        let rows = view.rows(clock.now_millis());
        assert_eq!(rows[0].position, 1);
        assert_eq!(rows[0].remaining_seconds, 300);
    }

    #[test]
    fn test_observed_mode_reanchors_when_only_position_moves() {
        let (registry, clock) = test_registry();
        let bob = registry.join("registrar", Subject::new("Bob", "ST2")).unwrap();
        registry.join("registrar", Subject::new("Alice", "ST1")).unwrap();
        registry.join("registrar", Subject::new("Carol", "ST3")).unwrap();
        let staff = ServingController::new(registry.clone());

        let mut view = StudentQueueView::new(registry, "ST3", ServiceTimeMode::Observed);
        view.refresh().unwrap();
        assert_eq!(view.rows(clock.now_millis())[0].eta_seconds, 900);

        // Bob takes 7.5 minutes, so Carol's ETA at position 2 stays 900s
        staff.call_next_student("registrar").unwrap();
        clock.set(1_450_000);
        staff.mark_as_served("registrar", &bob.id).unwrap();

        view.refresh().unwrap();
        let rows = view.rows(clock.now_millis());
        assert_eq!(rows[0].position, 2);
        assert_eq!(rows[0].eta_seconds, 900);
        assert_eq!(rows[0].remaining_seconds, 900);
    }

    #[test]
    fn test_left_membership_disappears() {
        let (registry, _) = test_registry();
        let entry = registry.join("library", Subject::new("Alice", "ST1")).unwrap();
        let mut view = StudentQueueView::new(registry.clone(), "ST1", ServiceTimeMode::Configured);
        assert_eq!(view.snapshot().unwrap().len(), 1);

        registry.leave(&entry.id).unwrap();
        assert!(view.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_loop_publishes_changes() {
        let (registry, _) = test_registry();
        let view = StudentQueueView::new(registry.clone(), "ST1", ServiceTimeMode::Configured);
        let (rows_tx, mut rows_rx) = watch::channel(Vec::new());
        let (shutdown_tx, shutdown) = shutdown_channel();

        let handle = tokio::spawn(view.run(Duration::from_millis(10), shutdown, rows_tx));

        registry.join("registrar", Subject::new("Alice", "ST1")).unwrap();
        let rows = loop {
            rows_rx.changed().await.unwrap();
            let rows = rows_rx.borrow_and_update().clone();
            if !rows.is_empty() {
                break rows;
            }
        };
        assert_eq!(rows[0].department_id, "registrar");

        shutdown_tx.shutdown();
        handle.await.unwrap().unwrap();
    }
}
