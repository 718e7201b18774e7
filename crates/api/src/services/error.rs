//! Service error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors returned by the directory, access and inventory services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The actor is authenticated but not allowed to do this.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// The target entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness rule was violated (duplicate grant, taken identity).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource"),
            RepositoryError::Conflict(what) => Self::Conflict(what),
            other => Self::Repository(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_keep_their_meaning() {
        assert!(matches!(
            ServiceError::from(RepositoryError::NotFound),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            ServiceError::from(RepositoryError::Conflict("grant".into())),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from(RepositoryError::DataCorruption("bad".into())),
            ServiceError::Repository(_)
        ));
    }
}
