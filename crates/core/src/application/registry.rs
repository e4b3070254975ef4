//! Queue Registry - the single owned ledger per department
//!
//! Student, staff and admin views all read from and mutate the same ledger.
//! Mutations are whole-state replacements: the current ledger is cloned,
//! the operation runs on the clone, and the new `Arc` is swapped in only on
//! success. Readers see the old or the new ledger, never a half-applied one.

use crate::application::constants::LEDGER_EVENT_CHANNEL_CAPACITY;
use crate::domain::{Department, DepartmentId, DomainError, EntryId, Ledger, QueueEntry, Subject};
use crate::error::{AppError, Result};
use crate::port::{DepartmentDirectory, IdProvider, TimeProvider};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// What changed in a ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventKind {
    Joined,
    Left,
    Called,
    Served,
    Skipped,
    Removed,
    PauseToggled,
    StatusChanged,
    Cleared,
    Reset,
    Reconfigured,
}

/// Change notification published after every successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub department_id: DepartmentId,
    pub kind: LedgerEventKind,
    pub entry_id: Option<EntryId>,
    pub at: i64, // epoch ms
}

/// Mutation results that name the entry they touched
pub trait ChangeTarget {
    fn entry_id(&self) -> Option<&str> {
        None
    }
}

impl ChangeTarget for QueueEntry {
    fn entry_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl ChangeTarget for () {}
impl ChangeTarget for bool {}
impl ChangeTarget for usize {}

type LedgerMap = HashMap<DepartmentId, Arc<Ledger>>;

pub struct QueueRegistry {
    directory: Arc<dyn DepartmentDirectory>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    ledgers: RwLock<LedgerMap>,
    events: broadcast::Sender<LedgerEvent>,
}

impl QueueRegistry {
    /// Create a registry with one empty ledger per directory department
    pub fn new(
        directory: Arc<dyn DepartmentDirectory>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let ledgers = directory
            .list_departments()
            .into_iter()
            .map(|d| {
                let ledger = Arc::new(Ledger::new(d.id.clone(), d.average_service_minutes));
                (d.id, ledger)
            })
            .collect();
        let (events, _) = broadcast::channel(LEDGER_EVENT_CHANNEL_CAPACITY);

        Self {
            directory,
            id_provider,
            time_provider,
            ledgers: RwLock::new(ledgers),
            events,
        }
    }

    pub fn now_millis(&self) -> i64 {
        self.time_provider.now_millis()
    }

    /// Subscribe to ledger-change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub fn departments(&self) -> Vec<Department> {
        self.directory.list_departments()
    }

    pub fn department(&self, department_id: &str) -> Result<Department> {
        self.directory
            .find(department_id)
            .ok_or_else(|| DomainError::DepartmentNotFound(department_id.to_string()).into())
    }

    /// Snapshot of one department's ledger
    pub fn ledger(&self, department_id: &str) -> Result<Arc<Ledger>> {
        if let Some(ledger) = self.read()?.get(department_id) {
            return Ok(Arc::clone(ledger));
        }
        // Department added to the directory after startup
        Ok(Arc::new(self.fresh_ledger(department_id)?))
    }

    /// Snapshots of every department's ledger, in directory order
    pub fn ledgers(&self) -> Result<Vec<Arc<Ledger>>> {
        self.departments()
            .iter()
            .map(|d| self.ledger(&d.id))
            .collect()
    }

    /// Find an entry anywhere: active, history, or attention list
    pub fn entry(&self, entry_id: &str) -> Result<QueueEntry> {
        self.read()?
            .values()
            .find_map(|l| l.find_any(entry_id).cloned())
            .ok_or_else(|| DomainError::EntryNotFound(entry_id.to_string()).into())
    }

    /// Ledger holding the active entry `entry_id`
    pub fn ledger_of_active(&self, entry_id: &str) -> Result<Arc<Ledger>> {
        self.read()?
            .values()
            .find(|l| l.find(entry_id).is_some())
            .cloned()
            .ok_or_else(|| DomainError::EntryNotFound(entry_id.to_string()).into())
    }

    /// Active entries of one subject across all departments
    pub fn memberships_of(&self, external_id: &str) -> Result<Vec<(Arc<Ledger>, QueueEntry)>> {
        let mut memberships: Vec<_> = self
            .read()?
            .values()
            .flat_map(|ledger| {
                ledger
                    .entries()
                    .iter()
                    .filter(|e| e.subject_external_id == external_id)
                    .map(|e| (Arc::clone(ledger), e.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        memberships.sort_by_key(|(_, e)| e.joined_at);
        Ok(memberships)
    }

    /// Join a department queue
    pub fn join(&self, department_id: &str, subject: Subject) -> Result<QueueEntry> {
        let entry_id = self.id_provider.generate_id();
        let entry = self.apply(department_id, LedgerEventKind::Joined, |ledger, now| {
            ledger.join(entry_id, subject, now)
        })?;

        info!(
            department_id = %department_id,
            entry_id = %entry.id,
            queue_number = entry.queue_number,
            "Subject joined queue"
        );
        Ok(entry)
    }

    /// Leave whichever queue holds `entry_id`
    pub fn leave(&self, entry_id: &str) -> Result<QueueEntry> {
        let department_id = self.ledger_of_active(entry_id)?.department_id().to_string();
        let entry = self.apply(&department_id, LedgerEventKind::Left, |ledger, _| {
            ledger.leave(entry_id)
        })?;

        info!(department_id = %department_id, entry_id = %entry_id, "Subject left queue");
        Ok(entry)
    }

    /// Apply `op` to a clone of the ledger and publish the change on success.
    ///
    /// The write lock is held for the whole read-modify-write, so two
    /// mutations on the registry never interleave.
    pub fn apply<T, F>(&self, department_id: &str, kind: LedgerEventKind, op: F) -> Result<T>
    where
        T: ChangeTarget,
        F: FnOnce(&mut Ledger, i64) -> std::result::Result<T, DomainError>,
    {
        let now = self.time_provider.now_millis();
        let result = {
            let mut ledgers = self.write()?;
            let mut next = match ledgers.get(department_id) {
                Some(current) => Ledger::clone(current),
                None => self.fresh_ledger(department_id)?,
            };

            let result = op(&mut next, now)?;
            ledgers.insert(department_id.to_string(), Arc::new(next));
            result
        };

        let event = LedgerEvent {
            department_id: department_id.to_string(),
            kind,
            entry_id: result.entry_id().map(str::to_string),
            at: now,
        };
        debug!(department_id = %department_id, kind = ?kind, "Ledger changed");
        // No subscribers is fine
        let _ = self.events.send(event);

        Ok(result)
    }

    fn fresh_ledger(&self, department_id: &str) -> Result<Ledger> {
        let department = self.department(department_id)?;
        Ok(Ledger::new(department.id, department.average_service_minutes))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerMap>> {
        self.ledgers
            .read()
            .map_err(|_| AppError::Internal("ledger registry lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerMap>> {
        self.ledgers
            .write()
            .map_err(|_| AppError::Internal("ledger registry lock poisoned".to_string()))
    }
}
