// Department Directory Port
//
// Resolves department ids to display data and validates join targets.

use crate::domain::{Department, DomainError};
use std::collections::HashSet;

/// Directory of departments that own a queue
pub trait DepartmentDirectory: Send + Sync {
    /// All departments, in display order
    fn list_departments(&self) -> Vec<Department>;

    /// Find a department by id
    fn find(&self, department_id: &str) -> Option<Department> {
        self.list_departments()
            .into_iter()
            .find(|d| d.id == department_id)
    }
}

/// Fixed directory seeded from configuration
pub struct StaticDepartmentDirectory {
    departments: Vec<Department>,
}

impl StaticDepartmentDirectory {
    /// Build a directory, rejecting blank or duplicate ids
    pub fn new(departments: Vec<Department>) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();
        for department in &departments {
            if department.id.trim().is_empty() {
                return Err(DomainError::ValidationError(
                    "department id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(department.id.as_str()) {
                return Err(DomainError::ValidationError(format!(
                    "duplicate department id: {}",
                    department.id
                )));
            }
            if !department.average_service_minutes.is_finite()
                || department.average_service_minutes <= 0.0
            {
                return Err(DomainError::ValidationError(format!(
                    "department {} has non-positive service minutes",
                    department.id
                )));
            }
        }
        Ok(Self { departments })
    }
}

impl DepartmentDirectory for StaticDepartmentDirectory {
    fn list_departments(&self) -> Vec<Department> {
        self.departments.clone()
    }

    fn find(&self, department_id: &str) -> Option<Department> {
        self.departments
            .iter()
            .find(|d| d.id == department_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_department() {
        let directory = StaticDepartmentDirectory::new(vec![
            Department::new("registrar", "Registrar"),
            Department::new("bursary", "Bursary"),
        ])
        .unwrap();

        assert_eq!(directory.find("bursary").unwrap().name, "Bursary");
        assert!(directory.find("library").is_none());
        assert_eq!(directory.list_departments().len(), 2);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let result = StaticDepartmentDirectory::new(vec![
            Department::new("registrar", "Registrar"),
            Department::new("registrar", "Registry"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_service_minutes() {
        let result = StaticDepartmentDirectory::new(vec![
            Department::new("registrar", "Registrar").with_service_minutes(0.0)
        ]);
        assert!(result.is_err());
    }
}
