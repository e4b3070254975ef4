// Department Domain Model

use crate::domain::entry::DepartmentId;
use serde::{Deserialize, Serialize};

/// Per-person service estimate used when a department does not configure one
pub const DEFAULT_AVERAGE_SERVICE_MINUTES: f64 = 5.0;

fn default_service_minutes() -> f64 {
    DEFAULT_AVERAGE_SERVICE_MINUTES
}

/// Department offering a service queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    /// Configured estimate seeded into the department's ledger
    #[serde(default = "default_service_minutes")]
    pub average_service_minutes: f64,
}

impl Department {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            average_service_minutes: DEFAULT_AVERAGE_SERVICE_MINUTES,
        }
    }

    pub fn with_service_minutes(mut self, minutes: f64) -> Self {
        self.average_service_minutes = minutes;
        self
    }
}
