// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error hierarchy for tollgate.
//!
//! ```text
//! AuthError (session and codec failures)
//! └── StoreError  - Credential store and token registry operations
//! ```
//!
//! `StoreError` describes persistence failures. `AuthError` is what the
//! session layer reports to callers; the HTTP layer maps each variant to a
//! status code.
//!
//! # Examples
//!
//! ```
//! use tollgate_core::error::{AuthError, StoreError};
//!
//! let error = StoreError::duplicate_email("ann@x.com");
//! let auth: AuthError = error.into();
//! assert!(matches!(auth, AuthError::EmailAlreadyInUse { .. }));
//! ```

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for session and codec operations.
pub type AuthResult<T> = Result<T, AuthError>;

// =============================================================================
// StoreError
// =============================================================================

/// Credential store and token registry errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A user with this email already exists.
    #[error("Email already registered: {email}")]
    DuplicateEmail {
        /// The conflicting email.
        email: String,
    },

    /// A token with this value is already recorded.
    #[error("Token value already recorded")]
    DuplicateToken,

    /// The referenced owner does not exist.
    #[error("Token owner not found: {user_id}")]
    OwnerNotFound {
        /// The missing owner id.
        user_id: i64,
    },

    /// A stored row could not be mapped back to a domain value.
    #[error("Corrupted row in {table}: {message}")]
    CorruptedRow {
        /// Table name.
        table: &'static str,
        /// Error message.
        message: String,
    },

    /// Password hashing failed.
    #[error("Password hashing failed: {message}")]
    Hashing {
        /// Error message.
        message: String,
    },

    /// Underlying database error.
    #[error("Database error: {message}")]
    Database {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<rusqlite::Error>,
    },
}

impl StoreError {
    /// Creates a duplicate email error.
    pub fn duplicate_email(email: impl Into<String>) -> Self {
        Self::DuplicateEmail {
            email: email.into(),
        }
    }

    /// Creates a corrupted row error.
    pub fn corrupted_row(table: &'static str, message: impl Into<String>) -> Self {
        Self::CorruptedRow {
            table,
            message: message.into(),
        }
    }

    /// Creates a hashing error.
    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing {
            message: message.into(),
        }
    }

    /// Creates a database error without an underlying source.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the error type for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            StoreError::DuplicateEmail { .. } => "duplicate_email",
            StoreError::DuplicateToken => "duplicate_token",
            StoreError::OwnerNotFound { .. } => "owner_not_found",
            StoreError::CorruptedRow { .. } => "corrupted_row",
            StoreError::Hashing { .. } => "hashing",
            StoreError::Database { .. } => "database",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// =============================================================================
// AuthError
// =============================================================================

/// Session, codec and header errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password at login.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Registration with an email that already exists.
    #[error("Email already in use: {email}")]
    EmailAlreadyInUse {
        /// The conflicting email.
        email: String,
    },

    /// The token subject has no matching user.
    #[error("User not found: {email}")]
    UserNotFound {
        /// Subject taken from the token.
        email: String,
    },

    /// Signature or structure of a token is invalid.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Error message.
        message: String,
    },

    /// Missing or malformed `Authorization: Bearer` header.
    #[error("Invalid authorization header")]
    InvalidAuthorizationHeader,

    /// The presented token cannot be used for this operation.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message.
        message: String,
    },

    /// Token signing failed.
    #[error("Token signing failed: {message}")]
    Signing {
        /// Error message.
        message: String,
    },

    /// Store failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl AuthError {
    /// Creates a malformed token error.
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a signing error.
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Returns `true` for failures caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthError::Signing { .. } | AuthError::Store(_))
    }

    /// Returns the error type for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::EmailAlreadyInUse { .. } => "email_already_in_use",
            AuthError::UserNotFound { .. } => "user_not_found",
            AuthError::MalformedToken { .. } => "malformed_token",
            AuthError::InvalidAuthorizationHeader => "invalid_authorization_header",
            AuthError::Unauthorized { .. } => "unauthorized",
            AuthError::Signing { .. } => "signing",
            AuthError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail { email } => AuthError::EmailAlreadyInUse { email },
            other => AuthError::Store(other),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_email_becomes_email_already_in_use() {
        let err: AuthError = StoreError::duplicate_email("ann@x.com").into();
        match err {
            AuthError::EmailAlreadyInUse { email } => assert_eq!(email, "ann@x.com"),
            other => panic!("Expected EmailAlreadyInUse, got {other:?}"),
        }
    }

    #[test]
    fn test_other_store_errors_stay_wrapped() {
        let err: AuthError = StoreError::DuplicateToken.into();
        assert!(matches!(err, AuthError::Store(StoreError::DuplicateToken)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_client_errors() {
        assert!(AuthError::InvalidCredentials.is_client_error());
        assert!(AuthError::InvalidAuthorizationHeader.is_client_error());
        assert!(AuthError::malformed_token("bad").is_client_error());
        assert!(!AuthError::signing("boom").is_client_error());
    }

    #[test]
    fn test_error_types() {
        assert_eq!(StoreError::DuplicateToken.error_type(), "duplicate_token");
        assert_eq!(StoreError::database("locked").error_type(), "database");
        assert_eq!(AuthError::InvalidCredentials.error_type(), "invalid_credentials");
        assert_eq!(
            AuthError::unauthorized("expired").error_type(),
            "unauthorized"
        );
    }

    #[test]
    fn test_rusqlite_error_conversion() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Database { source: Some(_), .. }));
    }
}
