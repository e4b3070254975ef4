//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC parameters to the registry, the serving
//! controller and the admin service.

use crate::error::to_rpc_error;
use crate::types::{
    ClearResponse, DepartmentRequest, DepartmentSummary, EntryRequest, JoinRequest, JoinResponse,
    LeaveResponse, LedgerResponse, ServiceMinutesRequest, ServiceMinutesResponse, SettingsPatch,
    StaffEntryRequest, StatsRequest, StatusRequest, StatusResponse, StudentQueuesResponse,
    StudentRequest, TogglePauseResponse,
};
use campusq_core::application::estimator;
use campusq_core::application::{
    shutdown_channel, AdminOverview, AdminService, AdminSettings, CallOutcome, DepartmentStats,
    PositionView, QueueRegistry, ServingController, StudentQueueView,
};
use campusq_core::domain::{QueueEntry, Subject};
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::{PendingSubscriptionSink, SubscriptionMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected services
pub struct RpcHandler {
    registry: Arc<QueueRegistry>,
    serving: ServingController,
    admin: Arc<AdminService>,
}

impl RpcHandler {
    pub fn new(registry: Arc<QueueRegistry>, admin: Arc<AdminService>) -> Self {
        Self {
            serving: ServingController::new(registry.clone()),
            registry,
            admin,
        }
    }

    /// departments.list.v1
    pub async fn departments(&self) -> RpcResult<Vec<DepartmentSummary>> {
        self.registry
            .departments()
            .into_iter()
            .map(|department| {
                let ledger = self.registry.ledger(&department.id).map_err(to_rpc_error)?;
                Ok(DepartmentSummary {
                    id: department.id,
                    name: department.name,
                    description: department.description,
                    icon: department.icon,
                    average_service_minutes: ledger.average_service_minutes(),
                    status: ledger.status(),
                    total_waiting: ledger.total_waiting() as u32,
                    serving_entry_id: ledger.serving_entry_id().map(str::to_string),
                })
            })
            .collect()
    }

    /// queue.join.v1
    pub async fn join(&self, params: JoinRequest) -> RpcResult<JoinResponse> {
        let subject = Subject::new(params.name, params.external_id);
        let entry = self
            .registry
            .join(&params.department_id, subject)
            .map_err(to_rpc_error)?;
        let position = self.position_of(&entry.id)?;

        Ok(JoinResponse { entry, position })
    }

    /// queue.leave.v1
    pub async fn leave(&self, params: EntryRequest) -> RpcResult<LeaveResponse> {
        let entry = self.registry.leave(&params.entry_id).map_err(to_rpc_error)?;

        Ok(LeaveResponse {
            entry_id: entry.id,
            department_id: entry.department_id,
            left: true,
        })
    }

    /// queue.position.v1
    pub async fn position(&self, params: EntryRequest) -> RpcResult<PositionView> {
        self.position_of(&params.entry_id)
    }

    /// queue.ledger.v1
    pub async fn ledger(&self, params: DepartmentRequest) -> RpcResult<LedgerResponse> {
        let ledger = self
            .registry
            .ledger(&params.department_id)
            .map_err(to_rpc_error)?;

        Ok(LedgerResponse {
            department_id: ledger.department_id().to_string(),
            status: ledger.status(),
            paused: ledger.is_paused(),
            average_service_minutes: ledger.average_service_minutes(),
            serving: ledger.serving().cloned(),
            waiting: ledger.waiting().cloned().collect(),
            served_today: ledger.served_today(),
            attention: ledger.attention().to_vec(),
        })
    }

    /// student.queues.v1
    pub async fn student_queues(&self, params: StudentRequest) -> RpcResult<StudentQueuesResponse> {
        let mut view = self.student_view(&params.external_id)?;
        let memberships = view.snapshot().map_err(to_rpc_error)?;

        Ok(StudentQueuesResponse {
            external_id: params.external_id,
            memberships,
        })
    }

    /// staff.call_next.v1
    pub async fn call_next(&self, params: DepartmentRequest) -> RpcResult<CallOutcome> {
        self.serving
            .call_next_student(&params.department_id)
            .map_err(to_rpc_error)
    }

    /// staff.serve.v1
    pub async fn serve(&self, params: StaffEntryRequest) -> RpcResult<QueueEntry> {
        self.serving
            .mark_as_served(&params.department_id, &params.entry_id)
            .map_err(to_rpc_error)
    }

    /// staff.skip.v1
    pub async fn skip(&self, params: StaffEntryRequest) -> RpcResult<QueueEntry> {
        self.serving
            .skip_student(&params.department_id, &params.entry_id)
            .map_err(to_rpc_error)
    }

    /// staff.remove.v1
    pub async fn remove(&self, params: StaffEntryRequest) -> RpcResult<QueueEntry> {
        self.serving
            .remove_from_queue(&params.department_id, &params.entry_id)
            .map_err(to_rpc_error)
    }

    /// staff.toggle_pause.v1
    pub async fn toggle_pause(&self, params: DepartmentRequest) -> RpcResult<TogglePauseResponse> {
        let paused = self
            .serving
            .toggle_serving_paused(&params.department_id)
            .map_err(to_rpc_error)?;

        Ok(TogglePauseResponse {
            department_id: params.department_id,
            paused,
        })
    }

    /// admin.stats.v1
    pub async fn stats(&self, params: Option<StatsRequest>) -> RpcResult<Vec<DepartmentStats>> {
        match params.unwrap_or_default().department_id {
            Some(department_id) => self
                .admin
                .department_stats(&department_id)
                .map(|stats| vec![stats])
                .map_err(to_rpc_error),
            None => self.admin.all_stats().map_err(to_rpc_error),
        }
    }

    /// admin.overview.v1
    pub async fn overview(&self) -> RpcResult<AdminOverview> {
        self.admin.overview().map_err(to_rpc_error)
    }

    /// admin.clear.v1
    pub async fn clear(&self, params: DepartmentRequest) -> RpcResult<ClearResponse> {
        let removed = self
            .admin
            .clear_queue(&params.department_id)
            .map_err(to_rpc_error)?;

        Ok(ClearResponse {
            department_id: params.department_id,
            removed,
        })
    }

    /// admin.reset.v1
    pub async fn reset(&self, params: DepartmentRequest) -> RpcResult<ClearResponse> {
        let removed = self
            .admin
            .reset_queue(&params.department_id)
            .map_err(to_rpc_error)?;

        Ok(ClearResponse {
            department_id: params.department_id,
            removed,
        })
    }

    /// admin.status.v1
    pub async fn set_status(&self, params: StatusRequest) -> RpcResult<StatusResponse> {
        self.admin
            .update_queue_status(&params.department_id, params.status)
            .map_err(to_rpc_error)?;

        Ok(StatusResponse {
            department_id: params.department_id,
            status: params.status,
        })
    }

    /// admin.attention.v1
    pub async fn attention(&self, params: DepartmentRequest) -> RpcResult<Vec<QueueEntry>> {
        self.admin
            .attention_list(&params.department_id)
            .map_err(to_rpc_error)
    }

    /// admin.settings.get.v1
    pub async fn settings(&self) -> RpcResult<AdminSettings> {
        self.admin.settings().map_err(to_rpc_error)
    }

    /// admin.settings.update.v1
    pub async fn update_settings(&self, patch: SettingsPatch) -> RpcResult<AdminSettings> {
        let current = self.admin.settings().map_err(to_rpc_error)?;
        self.admin
            .update_settings(patch.apply_to(current))
            .map_err(to_rpc_error)
    }

    /// admin.service_minutes.v1
    pub async fn service_minutes(
        &self,
        params: ServiceMinutesRequest,
    ) -> RpcResult<ServiceMinutesResponse> {
        self.admin
            .configure_service_minutes(&params.department_id, params.minutes)
            .map_err(to_rpc_error)?;
        let ledger = self
            .registry
            .ledger(&params.department_id)
            .map_err(to_rpc_error)?;

        Ok(ServiceMinutesResponse {
            department_id: params.department_id,
            average_service_minutes: ledger.average_service_minutes(),
        })
    }

    /// student.watch.v1 - push countdown rows every tick and after each change
    pub async fn watch_student(
        &self,
        params: StudentRequest,
        pending: PendingSubscriptionSink,
    ) -> SubscriptionResult {
        let settings = self.admin.settings()?;
        let view = StudentQueueView::new(
            self.registry.clone(),
            params.external_id.clone(),
            settings.service_time_mode,
        );
        let tick = Duration::from_secs(settings.countdown_tick_secs);
        let sink = pending.accept().await?;

        let (rows_tx, mut rows_rx) = watch::channel(Vec::new());
        let (shutdown_tx, shutdown) = shutdown_channel();
        let view_task = tokio::spawn(view.run(tick, shutdown, rows_tx));
        info!(external_id = %params.external_id, "Student watch subscribed");

        loop {
            tokio::select! {
                _ = sink.closed() => break,
                changed = rows_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let rows = rows_rx.borrow_and_update().clone();
                    let message = SubscriptionMessage::from_json(&rows)?;
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
            }
        }

        shutdown_tx.shutdown();
        let _ = view_task.await;
        debug!(external_id = %params.external_id, "Student watch closed");
        Ok(())
    }

    fn position_of(&self, entry_id: &str) -> RpcResult<PositionView> {
        let mode = self.admin.settings().map_err(to_rpc_error)?.service_time_mode;
        let ledger = self
            .registry
            .ledger_of_active(entry_id)
            .map_err(to_rpc_error)?;
        estimator::position_view(&ledger, entry_id, mode).map_err(|e| to_rpc_error(e.into()))
    }

    fn student_view(&self, external_id: &str) -> RpcResult<StudentQueueView> {
        let mode = self.admin.settings().map_err(to_rpc_error)?.service_time_mode;
        Ok(StudentQueueView::new(self.registry.clone(), external_id, mode))
    }
}
