// Queue Entry Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Entry ID (UUID v4)
pub type EntryId = String;

/// Department identifier (one ledger per department)
pub type DepartmentId = String;

/// Join-order ticket number, distinct from the live position
pub type QueueNumber = u32;

/// Upper bound for subject name and external id length
pub const MAX_SUBJECT_FIELD_LEN: usize = 128;

/// Entry Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Waiting,
    Serving,
    Served,
    Skipped,
}

impl EntryStatus {
    /// Legal transitions of the entry state machine.
    ///
    /// Removal (leave/cancel) is not a status and is handled by the ledger.
    pub fn can_transition_to(self, next: EntryStatus) -> bool {
        match self {
            EntryStatus::Waiting => match next {
                EntryStatus::Serving | EntryStatus::Served | EntryStatus::Skipped => true,
                EntryStatus::Waiting => false,
            },
            EntryStatus::Serving => match next {
                EntryStatus::Served | EntryStatus::Skipped => true,
                EntryStatus::Waiting | EntryStatus::Serving => false,
            },
            EntryStatus::Served => false,
            EntryStatus::Skipped => false,
        }
    }

    /// Waiting and serving entries live in the active ledger
    pub fn is_active(self) -> bool {
        match self {
            EntryStatus::Waiting | EntryStatus::Serving => true,
            EntryStatus::Served | EntryStatus::Skipped => false,
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Waiting => write!(f, "waiting"),
            EntryStatus::Serving => write!(f, "serving"),
            EntryStatus::Served => write!(f, "served"),
            EntryStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Display identity of the person joining a queue.
///
/// Nothing is authenticated here; the identity is recorded as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub external_id: String,
}

impl Subject {
    pub fn new(name: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_id: external_id.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "subject name cannot be empty".to_string(),
            ));
        }
        if self.external_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "subject external id cannot be empty".to_string(),
            ));
        }
        if self.name.len() > MAX_SUBJECT_FIELD_LEN || self.external_id.len() > MAX_SUBJECT_FIELD_LEN
        {
            return Err(DomainError::ValidationError(format!(
                "subject fields too long (max {} bytes)",
                MAX_SUBJECT_FIELD_LEN
            )));
        }
        Ok(())
    }
}

/// One person's membership record in a ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub subject_name: String,
    pub subject_external_id: String,
    pub department_id: DepartmentId,
    pub queue_number: QueueNumber,
    pub status: EntryStatus,

    pub joined_at: i64, // epoch ms
    pub called_at: Option<i64>,
    pub finished_at: Option<i64>,

    /// Waiting count (self included) captured at join, the progress denominator
    pub waiting_at_join: u32,
}

impl QueueEntry {
    /// Create a new waiting entry
    ///
    /// # Arguments
    ///
    /// * `id` - Unique entry ID (injected, not generated)
    /// * `department_id` - Owning department
    /// * `subject` - Validated display identity
    /// * `queue_number` - Ticket number assigned by the ledger
    /// * `joined_at` - Join timestamp in epoch ms (injected, not system time)
    /// * `waiting_at_join` - Waiting count including this entry
    pub fn new(
        id: impl Into<String>,
        department_id: impl Into<String>,
        subject: Subject,
        queue_number: QueueNumber,
        joined_at: i64,
        waiting_at_join: u32,
    ) -> Self {
        Self {
            id: id.into(),
            subject_name: subject.name,
            subject_external_id: subject.external_id,
            department_id: department_id.into(),
            queue_number,
            status: EntryStatus::Waiting,
            joined_at,
            called_at: None,
            finished_at: None,
            waiting_at_join,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.status == EntryStatus::Waiting
    }

    pub fn is_serving(&self) -> bool {
        self.status == EntryStatus::Serving
    }

    fn transition(&mut self, next: EntryStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Transition to Serving with explicit timestamp
    pub fn call(&mut self, now_millis: i64) -> Result<()> {
        self.transition(EntryStatus::Serving)?;
        self.called_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Served with explicit timestamp
    pub fn serve(&mut self, now_millis: i64) -> Result<()> {
        self.transition(EntryStatus::Served)?;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Skipped with explicit timestamp
    pub fn skip(&mut self, now_millis: i64) -> Result<()> {
        self.transition(EntryStatus::Skipped)?;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Time between call and completion, when both are known
    pub fn service_duration_ms(&self) -> Option<i64> {
        match (self.called_at, self.finished_at) {
            (Some(called), Some(finished)) if finished >= called => Some(finished - called),
            _ => None,
        }
    }
}
