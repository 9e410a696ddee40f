//! Error types shared across the store, services and HTTP surface.

use thiserror::Error;

use crate::repository::util::{is_credential_expired, is_network_failure};

/// Errors raised by the record store and other repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(diesel::result::Error),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Credential expired: {0}")]
    CredentialExpired(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Corrupt data: {0}")]
    Corrupt(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::DuplicateKey(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                StoreError::Unavailable(info.message().to_string())
            }
            DieselError::DatabaseError(_, ref info) if is_credential_expired(info.message()) => {
                StoreError::CredentialExpired(info.message().to_string())
            }
            DieselError::DatabaseError(_, ref info) if is_network_failure(info.message()) => {
                StoreError::Unavailable(info.message().to_string())
            }
            DieselError::DeserializationError(err) => StoreError::Corrupt(err.to_string()),
            other => StoreError::Database(other),
        }
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Database(diesel::result::Error::NotFound))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the service layer, one variant per user-facing kind.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Consistency(String),

    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    InputFormat(String),

    #[error("{0}")]
    Fatal(String),
}

impl AppError {
    /// Stable identifier for the error kind, used in API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Authorization(_) => "authorization",
            AppError::NotFound(_) => "not_found",
            AppError::Consistency(_) => "consistency",
            AppError::Transient(_) => "transient",
            AppError::InputFormat(_) => "input_format",
            AppError::Fatal(_) => "fatal",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            ref err if err.is_not_found() => AppError::NotFound("Record not found".to_string()),
            StoreError::DuplicateKey(msg) => AppError::Consistency(msg),
            StoreError::CredentialExpired(msg) | StoreError::Unavailable(msg) => {
                AppError::Transient(msg)
            }
            other => AppError::Fatal(other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::util::{to_diesel_error, to_unavailable_error, DbErrorInfo};
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    fn db_error(kind: DatabaseErrorKind, msg: &str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(DbErrorInfo(msg.to_string())))
    }

    #[test]
    fn test_store_error_classification() {
        assert!(matches!(
            StoreError::from(db_error(
                DatabaseErrorKind::UniqueViolation,
                "UNIQUE constraint failed: energy_data.id"
            )),
            StoreError::DuplicateKey(_)
        ));
        assert!(matches!(
            StoreError::from(db_error(DatabaseErrorKind::Unknown, "JWT expired")),
            StoreError::CredentialExpired(_)
        ));
        assert!(matches!(
            StoreError::from(db_error(DatabaseErrorKind::Unknown, "syntax error")),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn test_app_error_mapping() {
        assert_eq!(
            AppError::from(StoreError::DuplicateKey("id".into())).kind(),
            "consistency"
        );
        assert_eq!(
            AppError::from(StoreError::CredentialExpired("jwt".into())).kind(),
            "transient"
        );
        assert_eq!(
            AppError::from(StoreError::Database(DieselError::NotFound)).kind(),
            "not_found"
        );
        assert_eq!(
            AppError::from(StoreError::Corrupt("bad".into())).kind(),
            "fatal"
        );
    }

    #[test]
    fn test_network_failures_are_transient() {
        let refused = StoreError::from(to_diesel_error(
            "error connecting to server: Connection refused (os error 111)",
        ));
        assert!(matches!(refused, StoreError::Unavailable(_)));
        assert_eq!(AppError::from(refused).kind(), "transient");

        let pool = StoreError::from(to_unavailable_error("unable to open database file"));
        assert!(matches!(pool, StoreError::Unavailable(_)));
        assert_eq!(AppError::from(pool).kind(), "transient");
    }
}
