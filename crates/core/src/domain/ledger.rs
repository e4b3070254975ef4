// Queue Ledger Domain Model
//
// The authoritative ordered record of entries for one department.

use crate::domain::entry::{
    DepartmentId, EntryId, EntryStatus, QueueEntry, QueueNumber, Subject,
};
use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Ledger-level operating status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    #[default]
    Active,
    /// Blocks `call_next`, still accepts joins
    Paused,
    /// Blocks `call_next` and `join`
    Closed,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Active => write!(f, "active"),
            QueueStatus::Paused => write!(f, "paused"),
            QueueStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Ordered entries of one department queue.
///
/// `entries` holds only waiting and serving entries, sorted by queue number.
/// Served entries move to `history`, skipped entries to `attention`.
#[derive(Debug, Clone, Serialize)]
pub struct Ledger {
    department_id: DepartmentId,
    entries: Vec<QueueEntry>,
    serving_entry_id: Option<EntryId>,
    status: QueueStatus,
    average_service_minutes: f64,
    history: Vec<QueueEntry>,
    attention: Vec<QueueEntry>,
    served_today: u64,
    /// Highest number issued since the last reset
    #[serde(skip)]
    last_queue_number: QueueNumber,
}

impl Ledger {
    pub fn new(department_id: impl Into<String>, average_service_minutes: f64) -> Self {
        Self {
            department_id: department_id.into(),
            entries: Vec::new(),
            serving_entry_id: None,
            status: QueueStatus::Active,
            average_service_minutes,
            history: Vec::new(),
            attention: Vec::new(),
            served_today: 0,
            last_queue_number: 0,
        }
    }

    pub fn department_id(&self) -> &str {
        &self.department_id
    }

    /// Active entries (waiting + serving) in queue-number order
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Waiting entries in FIFO order
    pub fn waiting(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter().filter(|e| e.is_waiting())
    }

    pub fn total_waiting(&self) -> usize {
        self.waiting().count()
    }

    /// Lowest-numbered waiting entry
    pub fn next_waiting(&self) -> Option<&QueueEntry> {
        self.waiting().min_by_key(|e| e.queue_number)
    }

    pub fn serving_entry_id(&self) -> Option<&str> {
        self.serving_entry_id.as_deref()
    }

    pub fn serving(&self) -> Option<&QueueEntry> {
        let id = self.serving_entry_id.as_deref()?;
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn status(&self) -> QueueStatus {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        match self.status {
            QueueStatus::Active => false,
            QueueStatus::Paused | QueueStatus::Closed => true,
        }
    }

    pub fn average_service_minutes(&self) -> f64 {
        self.average_service_minutes
    }

    pub fn history(&self) -> &[QueueEntry] {
        &self.history
    }

    pub fn attention(&self) -> &[QueueEntry] {
        &self.attention
    }

    pub fn served_today(&self) -> u64 {
        self.served_today
    }

    /// Find an active entry
    pub fn find(&self, entry_id: &str) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    /// Find an entry in the active set, history, or attention list
    pub fn find_any(&self, entry_id: &str) -> Option<&QueueEntry> {
        self.find(entry_id)
            .or_else(|| self.history.iter().find(|e| e.id == entry_id))
            .or_else(|| self.attention.iter().find(|e| e.id == entry_id))
    }

    /// Next ticket number: one past every number issued since the last reset
    pub fn next_queue_number(&self) -> QueueNumber {
        self.entries
            .iter()
            .chain(self.history.iter())
            .chain(self.attention.iter())
            .map(|e| e.queue_number)
            .fold(self.last_queue_number, QueueNumber::max)
            + 1
    }

    /// Append a new waiting entry
    pub fn join(&mut self, id: impl Into<String>, subject: Subject, now_millis: i64) -> Result<QueueEntry> {
        subject.validate()?;
        if self.status == QueueStatus::Closed {
            return Err(DomainError::QueueClosed(self.department_id.clone()));
        }

        let waiting_at_join = self.total_waiting() as u32 + 1;
        let entry = QueueEntry::new(
            id,
            self.department_id.clone(),
            subject,
            self.next_queue_number(),
            now_millis,
            waiting_at_join,
        );
        self.last_queue_number = entry.queue_number;
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Remove an active entry regardless of its status
    pub fn leave(&mut self, entry_id: &str) -> Result<QueueEntry> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.id == entry_id)
            .ok_or_else(|| DomainError::EntryNotFound(entry_id.to_string()))?;
        let entry = self.entries.remove(idx);
        self.release_slot(entry_id);
        Ok(entry)
    }

    /// Move an active entry to the served history
    pub fn mark_served(&mut self, entry_id: &str, now_millis: i64) -> Result<QueueEntry> {
        let idx = self.active_index(entry_id, EntryStatus::Served)?;
        let mut entry = self.entries[idx].clone();
        entry.serve(now_millis)?;

        self.entries.remove(idx);
        self.release_slot(entry_id);
        self.history.push(entry.clone());
        self.served_today += 1;
        Ok(entry)
    }

    /// Move an active entry to the attention list
    pub fn skip(&mut self, entry_id: &str, now_millis: i64) -> Result<QueueEntry> {
        let idx = self.active_index(entry_id, EntryStatus::Skipped)?;
        let mut entry = self.entries[idx].clone();
        entry.skip(now_millis)?;

        self.entries.remove(idx);
        self.release_slot(entry_id);
        self.attention.push(entry.clone());
        Ok(entry)
    }

    /// Put the lowest-numbered waiting entry into the serving slot
    pub fn call_next(&mut self, now_millis: i64) -> Result<QueueEntry> {
        match self.status {
            QueueStatus::Active => {}
            QueueStatus::Paused => return Err(DomainError::QueuePaused(self.department_id.clone())),
            QueueStatus::Closed => return Err(DomainError::QueueClosed(self.department_id.clone())),
        }
        if let Some(entry_id) = &self.serving_entry_id {
            return Err(DomainError::AlreadyServing {
                department_id: self.department_id.clone(),
                entry_id: entry_id.clone(),
            });
        }

        let next_id = self
            .next_waiting()
            .map(|e| e.id.clone())
            .ok_or_else(|| DomainError::QueueEmpty(self.department_id.clone()))?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == next_id)
            .ok_or_else(|| DomainError::EntryNotFound(next_id.clone()))?;
        entry.call(now_millis)?;

        let called = entry.clone();
        self.serving_entry_id = Some(next_id);
        Ok(called)
    }

    /// Toggle between Active and Paused; a closed ledger must be reopened explicitly
    pub fn set_paused(&mut self, paused: bool) -> Result<()> {
        match self.status {
            QueueStatus::Closed => Err(DomainError::QueueClosed(self.department_id.clone())),
            QueueStatus::Active | QueueStatus::Paused => {
                self.status = if paused {
                    QueueStatus::Paused
                } else {
                    QueueStatus::Active
                };
                Ok(())
            }
        }
    }

    pub fn set_status(&mut self, status: QueueStatus) {
        self.status = status;
    }

    pub fn set_average_service_minutes(&mut self, minutes: f64) -> Result<()> {
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(DomainError::ValidationError(format!(
                "average service minutes must be positive, got {}",
                minutes
            )));
        }
        self.average_service_minutes = minutes;
        Ok(())
    }

    /// Drop every active entry; history and the served counter stay.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.serving_entry_id = None;
        removed
    }

    /// Clear plus zeroed served counter, history and attention list.
    ///
    /// The only operation that restarts numbering at 1.
    pub fn reset(&mut self) -> usize {
        let removed = self.clear();
        self.history.clear();
        self.attention.clear();
        self.served_today = 0;
        self.last_queue_number = 0;
        removed
    }

    fn release_slot(&mut self, entry_id: &str) {
        if self.serving_entry_id.as_deref() == Some(entry_id) {
            self.serving_entry_id = None;
        }
    }

    /// Index of an active entry, or the error explaining why `target` is unreachable
    fn active_index(&self, entry_id: &str, target: EntryStatus) -> Result<usize> {
        if let Some(idx) = self.entries.iter().position(|e| e.id == entry_id) {
            return Ok(idx);
        }
        match self.find_any(entry_id) {
            Some(finished) => Err(DomainError::InvalidStateTransition {
                from: finished.status.to_string(),
                to: target.to_string(),
            }),
            None => Err(DomainError::EntryNotFound(entry_id.to_string())),
        }
    }
}
