//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use campusq_core::domain::DomainError;
use campusq_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;
use thiserror::Error;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// Failure to bring the server up
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to build server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to register {method}: {reason}")]
    Register { method: String, reason: String },
}

fn domain_code(err: &DomainError) -> i32 {
    match err {
        DomainError::EntryNotFound(_)
        | DomainError::DepartmentNotFound(_)
        | DomainError::QueueEmpty(_) => code::NOT_FOUND,
        DomainError::AlreadyServing { .. }
        | DomainError::QueuePaused(_)
        | DomainError::QueueClosed(_)
        | DomainError::InvalidStateTransition { .. } => code::CONFLICT,
        DomainError::ValidationError(_) => code::VALIDATION_ERROR,
    }
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::NotFound(msg) => ErrorObjectOwned::owned(code::NOT_FOUND, msg, None::<()>),
        AppError::Conflict(msg) => ErrorObjectOwned::owned(code::CONFLICT, msg, None::<()>),
        AppError::Internal(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Domain(e) => ErrorObjectOwned::owned(domain_code(&e), e.to_string(), None::<()>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_by_kind() {
        let not_found = to_rpc_error(DomainError::EntryNotFound("e-1".into()).into());
        assert_eq!(not_found.code(), code::NOT_FOUND);

        let conflict = to_rpc_error(
            DomainError::AlreadyServing {
                department_id: "registrar".into(),
                entry_id: "e-1".into(),
            }
            .into(),
        );
        assert_eq!(conflict.code(), code::CONFLICT);

        let closed = to_rpc_error(DomainError::QueueClosed("library".into()).into());
        assert_eq!(closed.code(), code::CONFLICT);

        let invalid = to_rpc_error(DomainError::ValidationError("name".into()).into());
        assert_eq!(invalid.code(), code::VALIDATION_ERROR);
    }

    #[test]
    fn test_app_errors_keep_message() {
        let err = to_rpc_error(AppError::Internal("lock poisoned".into()));
        assert_eq!(err.code(), code::INTERNAL_ERROR);
        assert_eq!(err.message(), "lock poisoned");
    }
}
