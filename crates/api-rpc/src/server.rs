//! JSON-RPC Server
//!
//! Serves HTTP and WebSocket on one localhost TCP port. Subscriptions
//! (`student.watch.v1`) need the WebSocket transport.

use crate::error::ServerError;
use crate::handler::RpcHandler;
use crate::types::{
    DepartmentRequest, EntryRequest, JoinRequest, ServiceMinutesRequest, SettingsPatch,
    StaffEntryRequest, StatsRequest, StatusRequest, StudentRequest,
};
use campusq_core::application::{AdminService, QueueRegistry};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9527;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// Register a method taking named parameters
macro_rules! register_with_params {
    ($module:expr, $handler:expr, $name:literal, $req:ty, $method:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$method(req).await
                }
            })
            .map_err(|e| ServerError::Register {
                method: $name.to_string(),
                reason: e.to_string(),
            })?;
    }};
}

/// Register a method that ignores its parameters
macro_rules! register_without_params {
    ($module:expr, $handler:expr, $name:literal, $method:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($name, move |_, _, _| {
                let handler = handler.clone();
                async move { handler.$method().await }
            })
            .map_err(|e| ServerError::Register {
                method: $name.to_string(),
                reason: e.to_string(),
            })?;
    }};
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(
        config: RpcServerConfig,
        registry: Arc<QueueRegistry>,
        admin: Arc<AdminService>,
    ) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(registry, admin)),
        }
    }

    fn build_module(&self) -> Result<RpcModule<()>, ServerError> {
        let mut module = RpcModule::new(());
        let handler = &self.handler;

        // Student
        register_without_params!(module, handler, "departments.list.v1", departments);
        register_with_params!(module, handler, "queue.join.v1", JoinRequest, join);
        register_with_params!(module, handler, "queue.leave.v1", EntryRequest, leave);
        register_with_params!(module, handler, "queue.position.v1", EntryRequest, position);
        register_with_params!(module, handler, "queue.ledger.v1", DepartmentRequest, ledger);
        register_with_params!(module, handler, "student.queues.v1", StudentRequest, student_queues);

        // Staff
        register_with_params!(module, handler, "staff.call_next.v1", DepartmentRequest, call_next);
        register_with_params!(module, handler, "staff.serve.v1", StaffEntryRequest, serve);
        register_with_params!(module, handler, "staff.skip.v1", StaffEntryRequest, skip);
        register_with_params!(module, handler, "staff.remove.v1", StaffEntryRequest, remove);
        register_with_params!(module, handler, "staff.toggle_pause.v1", DepartmentRequest, toggle_pause);

        // Admin
        register_with_params!(module, handler, "admin.stats.v1", Option<StatsRequest>, stats);
        register_without_params!(module, handler, "admin.overview.v1", overview);
        register_with_params!(module, handler, "admin.clear.v1", DepartmentRequest, clear);
        register_with_params!(module, handler, "admin.reset.v1", DepartmentRequest, reset);
        register_with_params!(module, handler, "admin.status.v1", StatusRequest, set_status);
        register_with_params!(module, handler, "admin.attention.v1", DepartmentRequest, attention);
        register_without_params!(module, handler, "admin.settings.get.v1", settings);
        register_with_params!(module, handler, "admin.settings.update.v1", SettingsPatch, update_settings);
        register_with_params!(
            module,
            handler,
            "admin.service_minutes.v1",
            ServiceMinutesRequest,
            service_minutes
        );

        let handler = self.handler.clone();
        module
            .register_subscription(
                "student.watch.v1",
                "student.watch",
                "student.unwatch.v1",
                move |params, pending, _, _| {
                    let handler = handler.clone();
                    async move {
                        let req: StudentRequest = match params.parse() {
                            Ok(req) => req,
                            Err(e) => {
                                pending.reject(e).await;
                                return Ok(());
                            }
                        };
                        handler.watch_student(req, pending).await
                    }
                },
            )
            .map_err(|e| ServerError::Register {
                method: "student.watch.v1".to_string(),
                reason: e.to_string(),
            })?;

        Ok(module)
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address, which differs from the configured one when
    /// `port` is 0.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = server.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        let module = self.build_module()?;
        let methods = module.method_names().count();
        let handle = server.start(module);

        info!(addr = %local_addr, methods = methods, "JSON-RPC server started");
        Ok((local_addr, handle))
    }
}
