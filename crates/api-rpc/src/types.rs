//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results. Every method takes
//! named (object) parameters.

use campusq_core::application::{
    AdminSettings, MembershipRow, PositionView, ServiceTimeMode,
};
use campusq_core::domain::{DepartmentId, EntryId, QueueEntry, QueueStatus};
use serde::{Deserialize, Serialize};

/// Requests scoped to one department
/// (queue.ledger, staff.call_next, staff.toggle_pause, admin.clear,
/// admin.reset, admin.attention)
#[derive(Debug, Serialize, Deserialize)]
pub struct DepartmentRequest {
    pub department_id: DepartmentId,
}

/// departments.list.v1 - one row per department
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub id: DepartmentId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub average_service_minutes: f64,
    pub status: QueueStatus,
    pub total_waiting: u32,
    pub serving_entry_id: Option<EntryId>,
}

/// queue.join.v1 - Join a department queue
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    pub department_id: DepartmentId,
    pub name: String,
    pub external_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub entry: QueueEntry,
    pub position: PositionView,
}

/// queue.leave.v1 / queue.position.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryRequest {
    pub entry_id: EntryId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub entry_id: EntryId,
    pub department_id: DepartmentId,
    pub left: bool,
}

/// queue.ledger.v1 - whole-ledger snapshot for staff screens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerResponse {
    pub department_id: DepartmentId,
    pub status: QueueStatus,
    pub paused: bool,
    pub average_service_minutes: f64,
    pub serving: Option<QueueEntry>,
    pub waiting: Vec<QueueEntry>,
    pub served_today: u64,
    pub attention: Vec<QueueEntry>,
}

/// student.queues.v1 / student.watch.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct StudentRequest {
    pub external_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentQueuesResponse {
    pub external_id: String,
    pub memberships: Vec<MembershipRow>,
}

/// staff.serve.v1 / staff.skip.v1 / staff.remove.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct StaffEntryRequest {
    pub department_id: DepartmentId,
    pub entry_id: EntryId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TogglePauseResponse {
    pub department_id: DepartmentId,
    pub paused: bool,
}

/// admin.stats.v1 - one department, or all when `department_id` or the
/// whole params object is omitted
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StatsRequest {
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

/// admin.clear.v1 / admin.reset.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub department_id: DepartmentId,
    pub removed: usize,
}

/// admin.status.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusRequest {
    pub department_id: DepartmentId,
    pub status: QueueStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub department_id: DepartmentId,
    pub status: QueueStatus,
}

/// admin.service_minutes.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceMinutesRequest {
    pub department_id: DepartmentId,
    pub minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceMinutesResponse {
    pub department_id: DepartmentId,
    pub average_service_minutes: f64,
}

/// admin.settings.update.v1 - omitted fields keep their current value
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub institution_name: Option<String>,
    #[serde(default)]
    pub service_time_mode: Option<ServiceTimeMode>,
    #[serde(default)]
    pub top_departments_limit: Option<usize>,
    #[serde(default)]
    pub countdown_tick_secs: Option<u64>,
}

impl SettingsPatch {
    pub fn apply_to(self, mut settings: AdminSettings) -> AdminSettings {
        if let Some(name) = self.institution_name {
            settings.institution_name = name;
        }
        if let Some(mode) = self.service_time_mode {
            settings.service_time_mode = mode;
        }
        if let Some(limit) = self.top_departments_limit {
            settings.top_departments_limit = limit;
        }
        if let Some(tick) = self.countdown_tick_secs {
            settings.countdown_tick_secs = tick;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_patch_keeps_omitted_fields() {
        let patch: SettingsPatch =
            serde_json::from_value(serde_json::json!({ "service_time_mode": "observed" }))
                .unwrap();
        let updated = patch.apply_to(AdminSettings::default());

        assert_eq!(updated.service_time_mode, ServiceTimeMode::Observed);
        assert_eq!(updated.institution_name, AdminSettings::default().institution_name);
    }

    #[test]
    fn test_stats_request_department_is_optional() {
        let req: StatsRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(req.department_id.is_none());
    }
}
