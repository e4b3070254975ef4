// Domain Layer - Pure queue rules and entities

pub mod department;
pub mod entry;
pub mod error;
pub mod ledger;

// Re-exports
pub use department::Department;
pub use entry::{DepartmentId, EntryId, EntryStatus, QueueEntry, QueueNumber, Subject};
pub use error::DomainError;
pub use ledger::{Ledger, QueueStatus};
