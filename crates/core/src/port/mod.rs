// Port Layer - Interfaces for external collaborators

pub mod department_directory;
pub mod id_provider; // For deterministic testing
pub mod time_provider;

// Re-exports
pub use department_directory::{DepartmentDirectory, StaticDepartmentDirectory};
pub use id_provider::IdProvider;
pub use time_provider::TimeProvider;
