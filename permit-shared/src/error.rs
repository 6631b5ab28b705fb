/// Domain error taxonomy
///
/// Every service operation returns [`RbacResult`]. The HTTP layer maps each
/// variant onto a status code; nothing here knows about HTTP.

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Errors surfaced by the resolver and the admin services
#[derive(Debug, thiserror::Error)]
pub enum RbacError {
    /// Referenced user, role or menu does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Uniqueness violation or integrity guard
    #[error("{0}")]
    Conflict(String),

    /// Missing or malformed input, reported before any mutation
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Store unreachable or query failed
    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),

    /// Credential mismatch or unusable token
    #[error("{0}")]
    Auth(String),

    /// Anything else (hashing failures, token encoding)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RbacError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<StoreError> for RbacError {
    fn from(err: StoreError) -> Self {
        match err {
            // A constraint hit here means a concurrent writer won the race
            // between our pre-check and the write.
            StoreError::Constraint(message) => RbacError::Conflict(message),
            other => RbacError::Storage(other),
        }
    }
}

impl From<PasswordError> for RbacError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooWeak(message) => RbacError::Validation {
                field: "password",
                message,
            },
            other => RbacError::Internal(other.to_string()),
        }
    }
}

impl From<JwtError> for RbacError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(_) => RbacError::Internal(err.to_string()),
            other => RbacError::Auth(other.to_string()),
        }
    }
}

/// Result alias for domain operations
pub type RbacResult<T> = Result<T, RbacError>;
