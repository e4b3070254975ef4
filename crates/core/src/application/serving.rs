// Staff Serving Controller
//
// Staff-facing wrapper over the department ledger. The serving slot holds
// at most one entry and is only refilled by an explicit `call_next_student`.

use crate::application::registry::{LedgerEventKind, QueueRegistry};
use crate::domain::{DomainError, EntryId, QueueEntry};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of asking for the next student.
///
/// Refusals are values so staff screens can show feedback instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    Called { entry: QueueEntry },
    AlreadyServing { entry_id: EntryId },
    Paused,
    Closed,
    Empty,
}

impl CallOutcome {
    pub fn is_called(&self) -> bool {
        matches!(self, CallOutcome::Called { .. })
    }
}

pub struct ServingController {
    registry: Arc<QueueRegistry>,
}

impl ServingController {
    pub fn new(registry: Arc<QueueRegistry>) -> Self {
        Self { registry }
    }

    /// Flip the paused flag; returns the new value
    pub fn toggle_serving_paused(&self, department_id: &str) -> Result<bool> {
        let paused = self
            .registry
            .apply(department_id, LedgerEventKind::PauseToggled, |ledger, _| {
                let paused = !ledger.is_paused();
                ledger.set_paused(paused)?;
                Ok(paused)
            })?;

        info!(department_id = %department_id, paused = paused, "Serving pause toggled");
        Ok(paused)
    }

    /// Move the next waiting student into the serving slot
    pub fn call_next_student(&self, department_id: &str) -> Result<CallOutcome> {
        let result = self
            .registry
            .apply(department_id, LedgerEventKind::Called, |ledger, now| {
                ledger.call_next(now)
            });

        let outcome = match result {
            Ok(entry) => {
                info!(
                    department_id = %department_id,
                    entry_id = %entry.id,
                    queue_number = entry.queue_number,
                    "Student called"
                );
                return Ok(CallOutcome::Called { entry });
            }
            Err(AppError::Domain(refusal)) => match refusal {
                DomainError::AlreadyServing { entry_id, .. } => {
                    CallOutcome::AlreadyServing { entry_id }
                }
                DomainError::QueuePaused(_) => CallOutcome::Paused,
                DomainError::QueueClosed(_) => CallOutcome::Closed,
                DomainError::QueueEmpty(_) => CallOutcome::Empty,
                other => return Err(other.into()),
            },
            Err(other) => return Err(other),
        };

        warn!(department_id = %department_id, outcome = ?outcome, "Call next refused");
        Ok(outcome)
    }

    pub fn mark_as_served(&self, department_id: &str, entry_id: &str) -> Result<QueueEntry> {
        let entry = self
            .registry
            .apply(department_id, LedgerEventKind::Served, |ledger, now| {
                ledger.mark_served(entry_id, now)
            })?;

        info!(department_id = %department_id, entry_id = %entry_id, "Student served");
        Ok(entry)
    }

    pub fn skip_student(&self, department_id: &str, entry_id: &str) -> Result<QueueEntry> {
        let entry = self
            .registry
            .apply(department_id, LedgerEventKind::Skipped, |ledger, now| {
                ledger.skip(entry_id, now)
            })?;

        info!(department_id = %department_id, entry_id = %entry_id, "Student skipped");
        Ok(entry)
    }

    /// Staff-side removal, legal for waiting and serving entries
    pub fn remove_from_queue(&self, department_id: &str, entry_id: &str) -> Result<QueueEntry> {
        let entry = self
            .registry
            .apply(department_id, LedgerEventKind::Removed, |ledger, _| {
                ledger.leave(entry_id)
            })?;

        info!(department_id = %department_id, entry_id = %entry_id, "Student removed from queue");
        Ok(entry)
    }

    pub fn current_serving(&self, department_id: &str) -> Result<Option<QueueEntry>> {
        Ok(self.registry.ledger(department_id)?.serving().cloned())
    }

    /// Waiting entries in call order
    pub fn waiting(&self, department_id: &str) -> Result<Vec<QueueEntry>> {
        Ok(self
            .registry
            .ledger(department_id)?
            .waiting()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::estimator::{position_view, ServiceTimeMode};
    use crate::application::registry::tests::test_registry;
    use crate::domain::{EntryStatus, QueueStatus, Subject};

    fn controller() -> (Arc<QueueRegistry>, ServingController) {
        let (registry, _) = test_registry();
        let controller = ServingController::new(registry.clone());
        (registry, controller)
    }

    fn serving_count(registry: &QueueRegistry, department_id: &str) -> usize {
        registry
            .ledger(department_id)
            .unwrap()
            .entries()
            .iter()
            .filter(|e| e.status == EntryStatus::Serving)
            .count()
    }

    #[test]
    fn test_alice_bob_scenario() {
        let (registry, staff) = controller();
        let alice = registry.join("registrar", Subject::new("Alice", "ST1")).unwrap();
        let bob = registry.join("registrar", Subject::new("Bob", "ST2")).unwrap();

        let ledger = registry.ledger("registrar").unwrap();
        assert_eq!(
            position_view(&ledger, &bob.id, ServiceTimeMode::Configured).unwrap().position,
            2
        );
        assert_eq!(ledger.total_waiting(), 2);

        let outcome = staff.call_next_student("registrar").unwrap();
        assert!(outcome.is_called());
        let ledger = registry.ledger("registrar").unwrap();
        assert_eq!(ledger.serving_entry_id(), Some(alice.id.as_str()));
        assert_eq!(ledger.find(&alice.id).unwrap().status, EntryStatus::Serving);
        assert_eq!(
            position_view(&ledger, &bob.id, ServiceTimeMode::Configured).unwrap().position,
            1
        );

        staff.mark_as_served("registrar", &alice.id).unwrap();
        let ledger = registry.ledger("registrar").unwrap();
        assert!(ledger.serving_entry_id().is_none());
        assert_eq!(ledger.history()[0].id, alice.id);
        assert_eq!(ledger.total_waiting(), 1);
    }

    #[test]
    fn test_second_call_reports_conflict() {
        let (registry, staff) = controller();
        let alice = registry.join("registrar", Subject::new("Alice", "ST1")).unwrap();
        registry.join("registrar", Subject::new("Bob", "ST2")).unwrap();

        staff.call_next_student("registrar").unwrap();
        let outcome = staff.call_next_student("registrar").unwrap();
        assert_eq!(outcome, CallOutcome::AlreadyServing { entry_id: alice.id });
        assert_eq!(serving_count(&registry, "registrar"), 1);
    }

    #[test]
    fn test_paused_call_is_refused_and_state_unchanged() {
        let (registry, staff) = controller();
        registry.join("registrar", Subject::new("Alice", "ST1")).unwrap();
        assert!(staff.toggle_serving_paused("registrar").unwrap());
        let before = registry.ledger("registrar").unwrap();

        let outcome = staff.call_next_student("registrar").unwrap();
        assert_eq!(outcome, CallOutcome::Paused);
        assert!(Arc::ptr_eq(&before, &registry.ledger("registrar").unwrap()));

        assert!(!staff.toggle_serving_paused("registrar").unwrap());
        assert!(staff.call_next_student("registrar").unwrap().is_called());
    }

    #[test]
    fn test_empty_and_closed_outcomes() {
        let (registry, staff) = controller();
        assert_eq!(staff.call_next_student("library").unwrap(), CallOutcome::Empty);

        registry
            .apply("library", LedgerEventKind::StatusChanged, |ledger, _| {
                ledger.set_status(QueueStatus::Closed);
                Ok(())
            })
            .unwrap();
        assert_eq!(staff.call_next_student("library").unwrap(), CallOutcome::Closed);
        assert!(staff.toggle_serving_paused("library").is_err());
    }

    #[test]
    fn test_unknown_department_is_error_not_outcome() {
        let (_, staff) = controller();
        let err = staff.call_next_student("cafeteria").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_serving_never_auto_advances() {
        let (registry, staff) = controller();
        let alice = registry.join("registrar", Subject::new("Alice", "ST1")).unwrap();
        let bob = registry.join("registrar", Subject::new("Bob", "ST2")).unwrap();

        staff.call_next_student("registrar").unwrap();
        staff.skip_student("registrar", &alice.id).unwrap();
        assert!(staff.current_serving("registrar").unwrap().is_none());

        match staff.call_next_student("registrar").unwrap() {
            CallOutcome::Called { entry } => assert_eq!(entry.id, bob.id),
            other => panic!("expected Called, got {:?}", other),
        }

        staff.remove_from_queue("registrar", &bob.id).unwrap();
        assert!(staff.current_serving("registrar").unwrap().is_none());
        assert!(staff.waiting("registrar").unwrap().is_empty());
    }

    #[test]
    fn test_skip_third_entry_position() {
        let (registry, staff) = controller();
        registry.join("registrar", Subject::new("Alice", "ST1")).unwrap();
        let bob = registry.join("registrar", Subject::new("Bob", "ST2")).unwrap();
        let carol = registry.join("registrar", Subject::new("Carol", "ST3")).unwrap();

        staff.skip_student("registrar", &bob.id).unwrap();
        let ledger = registry.ledger("registrar").unwrap();
        assert_eq!(
            position_view(&ledger, &carol.id, ServiceTimeMode::Configured).unwrap().position,
            2
        );
        assert_eq!(ledger.attention()[0].id, bob.id);
    }
}
