//! Admin Aggregation Layer
//!
//! Read-only rollups over every department ledger plus bulk mutations
//! (clear, reset, status). Also owns the explicit `AdminSettings` value that
//! other consumers receive instead of reading ambient globals.

use crate::application::constants::{DEFAULT_COUNTDOWN_TICK, DEFAULT_TOP_DEPARTMENTS_LIMIT};
use crate::application::estimator::{self, ServiceTimeMode};
use crate::application::registry::{LedgerEventKind, QueueRegistry};
use crate::domain::{DepartmentId, EntryId, Ledger, QueueEntry, QueueStatus};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Institution-wide settings (branding and estimator behaviour)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub institution_name: String,
    pub service_time_mode: ServiceTimeMode,
    pub top_departments_limit: usize,
    pub countdown_tick_secs: u64,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            institution_name: "Campus Services".to_string(),
            service_time_mode: ServiceTimeMode::Configured,
            top_departments_limit: DEFAULT_TOP_DEPARTMENTS_LIMIT,
            countdown_tick_secs: DEFAULT_COUNTDOWN_TICK.as_secs(),
        }
    }
}

impl AdminSettings {
    pub fn validate(&self) -> Result<()> {
        if self.institution_name.trim().is_empty() {
            return Err(AppError::Validation(
                "institution name cannot be empty".to_string(),
            ));
        }
        if self.top_departments_limit == 0 {
            return Err(AppError::Validation(
                "top departments limit must be at least 1".to_string(),
            ));
        }
        if self.countdown_tick_secs == 0 {
            return Err(AppError::Validation(
                "countdown tick must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentStats {
    pub department_id: DepartmentId,
    pub department_name: String,
    pub total_waiting: u32,
    pub avg_wait_minutes: f64,
    pub next_entry_id: Option<EntryId>,
    pub serving_entry_id: Option<EntryId>,
    pub served_today: u64,
    pub status: QueueStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminOverview {
    pub institution_name: String,
    pub total_waiting: u32,
    pub total_served_today: u64,
    pub active_queues: u32,
    /// Waiting-weighted mean over departments with a queue
    pub average_wait_minutes: f64,
    pub top_departments: Vec<DepartmentStats>,
}

pub struct AdminService {
    registry: Arc<QueueRegistry>,
    settings: RwLock<AdminSettings>,
}

impl AdminService {
    pub fn new(registry: Arc<QueueRegistry>, settings: AdminSettings) -> Self {
        Self {
            registry,
            settings: RwLock::new(settings),
        }
    }

    pub fn settings(&self) -> Result<AdminSettings> {
        self.settings
            .read()
            .map(|s| s.clone())
            .map_err(|_| AppError::Internal("settings lock poisoned".to_string()))
    }

    pub fn update_settings(&self, settings: AdminSettings) -> Result<AdminSettings> {
        settings.validate()?;
        let mut current = self
            .settings
            .write()
            .map_err(|_| AppError::Internal("settings lock poisoned".to_string()))?;
        *current = settings.clone();

        info!(
            institution_name = %settings.institution_name,
            service_time_mode = ?settings.service_time_mode,
            "Admin settings updated"
        );
        Ok(settings)
    }

    pub fn department_stats(&self, department_id: &str) -> Result<DepartmentStats> {
        let ledger = self.registry.ledger(department_id)?;
        let mode = self.settings()?.service_time_mode;
        self.stats_for(&ledger, mode)
    }

    /// Stats for every department, in directory order
    pub fn all_stats(&self) -> Result<Vec<DepartmentStats>> {
        let mode = self.settings()?.service_time_mode;
        self.registry
            .ledgers()?
            .iter()
            .map(|ledger| self.stats_for(ledger, mode))
            .collect()
    }

    pub fn overview(&self) -> Result<AdminOverview> {
        let settings = self.settings()?;
        let stats = self.all_stats()?;

        let total_waiting: u32 = stats.iter().map(|s| s.total_waiting).sum();
        let total_served_today: u64 = stats.iter().map(|s| s.served_today).sum();
        let active_queues = stats
            .iter()
            .filter(|s| s.status == QueueStatus::Active)
            .count() as u32;
        let average_wait_minutes = if total_waiting == 0 {
            0.0
        } else {
            stats
                .iter()
                .map(|s| s.avg_wait_minutes * s.total_waiting as f64)
                .sum::<f64>()
                / total_waiting as f64
        };

        let mut top_departments: Vec<_> = stats
            .into_iter()
            .filter(|s| s.total_waiting > 0)
            .collect();
        top_departments.sort_by(|a, b| {
            b.total_waiting
                .cmp(&a.total_waiting)
                .then_with(|| a.department_name.cmp(&b.department_name))
        });
        top_departments.truncate(settings.top_departments_limit);

        debug!(total_waiting = total_waiting, active_queues = active_queues, "Overview computed");

        Ok(AdminOverview {
            institution_name: settings.institution_name,
            total_waiting,
            total_served_today,
            active_queues,
            average_wait_minutes,
            top_departments,
        })
    }

    /// Drop every active entry; served history and counter stay
    pub fn clear_queue(&self, department_id: &str) -> Result<usize> {
        let removed = self
            .registry
            .apply(department_id, LedgerEventKind::Cleared, |ledger, _| Ok(ledger.clear()))?;

        warn!(department_id = %department_id, removed = removed, "Queue cleared");
        Ok(removed)
    }

    /// Clear plus zeroed served-today counter and history
    pub fn reset_queue(&self, department_id: &str) -> Result<usize> {
        let removed = self
            .registry
            .apply(department_id, LedgerEventKind::Reset, |ledger, _| Ok(ledger.reset()))?;

        warn!(department_id = %department_id, removed = removed, "Queue reset");
        Ok(removed)
    }

    /// Set Active, Paused, or Closed; Closed also blocks joins
    pub fn update_queue_status(&self, department_id: &str, status: QueueStatus) -> Result<()> {
        self.registry
            .apply(department_id, LedgerEventKind::StatusChanged, |ledger, _| {
                ledger.set_status(status);
                Ok(())
            })?;

        info!(department_id = %department_id, status = %status, "Queue status updated");
        Ok(())
    }

    pub fn configure_service_minutes(&self, department_id: &str, minutes: f64) -> Result<()> {
        self.registry
            .apply(department_id, LedgerEventKind::Reconfigured, |ledger, _| {
                ledger.set_average_service_minutes(minutes)
            })?;

        info!(department_id = %department_id, minutes = minutes, "Service estimate updated");
        Ok(())
    }

    /// Skipped entries waiting for staff follow-up
    pub fn attention_list(&self, department_id: &str) -> Result<Vec<QueueEntry>> {
        Ok(self.registry.ledger(department_id)?.attention().to_vec())
    }

    fn stats_for(&self, ledger: &Ledger, mode: ServiceTimeMode) -> Result<DepartmentStats> {
        let department = self.registry.department(ledger.department_id())?;
        Ok(DepartmentStats {
            department_id: department.id,
            department_name: department.name,
            total_waiting: ledger.total_waiting() as u32,
            avg_wait_minutes: estimator::average_wait_minutes(ledger, mode),
            next_entry_id: ledger.next_waiting().map(|e| e.id.clone()),
            serving_entry_id: ledger.serving_entry_id().map(str::to_string),
            served_today: ledger.served_today(),
            status: ledger.status(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::tests::test_registry;
    use crate::application::serving::ServingController;
    use crate::domain::{DomainError, Subject};

    fn setup() -> (Arc<QueueRegistry>, ServingController, AdminService) {
        let (registry, _) = test_registry();
        let staff = ServingController::new(registry.clone());
        let admin = AdminService::new(registry.clone(), AdminSettings::default());
        (registry, staff, admin)
    }

    fn join_n(registry: &QueueRegistry, department_id: &str, n: usize) -> Vec<QueueEntry> {
        (1..=n)
            .map(|i| {
                registry
                    .join(department_id, Subject::new(format!("S{}", i), format!("{}-{}", department_id, i)))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_department_stats() {
        let (registry, staff, admin) = setup();
        let entries = join_n(&registry, "registrar", 3);
        staff.call_next_student("registrar").unwrap();

        let stats = admin.department_stats("registrar").unwrap();
        assert_eq!(stats.total_waiting, 2);
        assert_eq!(stats.next_entry_id.as_deref(), Some(entries[1].id.as_str()));
        assert_eq!(stats.serving_entry_id.as_deref(), Some(entries[0].id.as_str()));
        // ETAs 5 and 10 minutes
        assert_eq!(stats.avg_wait_minutes, 7.5);
        assert_eq!(stats.status, QueueStatus::Active);
    }

    #[test]
    fn test_clear_vs_reset() {
        let (registry, staff, admin) = setup();
        let entries = join_n(&registry, "registrar", 3);
        staff.mark_as_served("registrar", &entries[0].id).unwrap();

        assert_eq!(admin.clear_queue("registrar").unwrap(), 2);
        let stats = admin.department_stats("registrar").unwrap();
        assert_eq!(stats.total_waiting, 0);
        assert_eq!(stats.served_today, 1);

        // Served #1 stays in history, so numbering continues past it
        let after_clear = registry.join("registrar", Subject::new("Dan", "ST9")).unwrap();
        assert!(after_clear.queue_number > entries[0].queue_number);
        assert_eq!(after_clear.queue_number, 4);

        admin.reset_queue("registrar").unwrap();
        let stats = admin.department_stats("registrar").unwrap();
        assert_eq!(stats.total_waiting, 0);
        assert_eq!(stats.served_today, 0);

        let after_reset = registry.join("registrar", Subject::new("Eve", "ST10")).unwrap();
        assert_eq!(after_reset.queue_number, 1);
    }

    #[test]
    fn test_closed_blocks_join_paused_does_not() {
        let (registry, staff, admin) = setup();

        admin.update_queue_status("library", QueueStatus::Paused).unwrap();
        registry.join("library", Subject::new("Alice", "ST1")).unwrap();
        assert_eq!(
            staff.call_next_student("library").unwrap(),
            crate::application::serving::CallOutcome::Paused
        );

        admin.update_queue_status("library", QueueStatus::Closed).unwrap();
        let err = registry.join("library", Subject::new("Bob", "ST2")).unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::QueueClosed(_))));
        assert!(registry.ledger("library").unwrap().is_paused());

        admin.update_queue_status("library", QueueStatus::Active).unwrap();
        assert!(staff.call_next_student("library").unwrap().is_called());
    }

    #[test]
    fn test_overview_ranks_departments() {
        let (registry, _, admin) = setup();
        join_n(&registry, "registrar", 1);
        join_n(&registry, "bursary", 3);
        join_n(&registry, "library", 1);
        admin.update_queue_status("library", QueueStatus::Paused).unwrap();

        let overview = admin.overview().unwrap();
        assert_eq!(overview.total_waiting, 5);
        assert_eq!(overview.active_queues, 2);
        let ranked: Vec<_> = overview
            .top_departments
            .iter()
            .map(|s| s.department_id.as_str())
            .collect();
        assert_eq!(ranked, vec!["bursary", "library", "registrar"]);
        // bursary: 3 waiting at 10 min -> mean 20; library & registrar: 5 each
        assert_eq!(overview.average_wait_minutes, (20.0 * 3.0 + 5.0 + 5.0) / 5.0);
    }

    #[test]
    fn test_overview_respects_limit() {
        let (registry, _, admin) = setup();
        join_n(&registry, "registrar", 2);
        join_n(&registry, "bursary", 1);

        let mut settings = admin.settings().unwrap();
        settings.top_departments_limit = 1;
        admin.update_settings(settings).unwrap();

        let overview = admin.overview().unwrap();
        assert_eq!(overview.top_departments.len(), 1);
        assert_eq!(overview.top_departments[0].department_id, "registrar");
    }

    #[test]
    fn test_update_settings_validation() {
        let (_, _, admin) = setup();
        let mut settings = admin.settings().unwrap();
        settings.institution_name = " ".to_string();
        assert!(admin.update_settings(settings).is_err());
        assert_eq!(admin.settings().unwrap(), AdminSettings::default());
    }

    #[test]
    fn test_observed_mode_changes_estimate() {
        let (registry, staff, admin) = setup();
        let entries = join_n(&registry, "registrar", 2);
        staff.call_next_student("registrar").unwrap();
        staff.mark_as_served("registrar", &entries[0].id).unwrap();

        // Mock clock did not advance: observed duration is zero and ignored
        let mut settings = admin.settings().unwrap();
        settings.service_time_mode = ServiceTimeMode::Observed;
        admin.update_settings(settings).unwrap();
        assert_eq!(admin.department_stats("registrar").unwrap().avg_wait_minutes, 5.0);
    }

    #[test]
    fn test_configure_service_minutes() {
        let (registry, _, admin) = setup();
        join_n(&registry, "registrar", 1);
        admin.configure_service_minutes("registrar", 12.0).unwrap();
        assert_eq!(admin.department_stats("registrar").unwrap().avg_wait_minutes, 12.0);
        assert!(admin.configure_service_minutes("registrar", -1.0).is_err());
    }

    #[test]
    fn test_attention_list() {
        let (registry, staff, admin) = setup();
        let entries = join_n(&registry, "registrar", 2);
        staff.skip_student("registrar", &entries[0].id).unwrap();
        let attention = admin.attention_list("registrar").unwrap();
        assert_eq!(attention.len(), 1);
        assert_eq!(attention[0].id, entries[0].id);
    }
}
