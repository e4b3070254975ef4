// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid entry state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Department not found: {0}")]
    DepartmentNotFound(String),

    #[error("Already serving entry {entry_id} in {department_id}")]
    AlreadyServing {
        department_id: String,
        entry_id: String,
    },

    #[error("Queue is paused: {0}")]
    QueuePaused(String),

    #[error("Queue is closed: {0}")]
    QueueClosed(String),

    #[error("No waiting entries in {0}")]
    QueueEmpty(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Refusals caused by the serving-slot or queue-status rules
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            DomainError::AlreadyServing { .. }
                | DomainError::QueuePaused(_)
                | DomainError::QueueClosed(_)
                | DomainError::InvalidStateTransition { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::EntryNotFound(_)
                | DomainError::DepartmentNotFound(_)
                | DomainError::QueueEmpty(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
