// Application Layer - Use Cases over the department ledgers

pub mod admin;
pub mod constants;
pub mod estimator;
pub mod registry;
pub mod serving;
pub mod shutdown;
pub mod student_view;

// Re-exports
pub use admin::{AdminOverview, AdminService, AdminSettings, DepartmentStats};
pub use estimator::{Countdown, PositionView, ServiceTimeMode};
pub use registry::{LedgerEvent, LedgerEventKind, QueueRegistry};
pub use serving::{CallOutcome, ServingController};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use student_view::{MembershipRow, StudentQueueView};
