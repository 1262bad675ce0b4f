// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for tollgate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Identifiers
// =============================================================================

/// Stable surrogate key of a user.
///
/// # Examples
///
/// ```
/// use tollgate_core::types::UserId;
///
/// let id = UserId::new(7);
/// assert_eq!(id.get(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a user id.
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// =============================================================================
// User
// =============================================================================

/// A persisted identity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Surrogate key.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Unique email, case-sensitive as stored.
    pub email: String,
    /// PHC-formatted password hash.
    pub password_hash: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Already-hashed password.
    pub password_hash: String,
}

impl NewUser {
    /// Creates a new user record.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
        }
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// The TTL class a token was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived token authorizing individual requests.
    Access,
    /// Long-lived token used only to obtain a new pair.
    Refresh,
}

impl TokenKind {
    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(format!("unknown token kind: {other}")),
        }
    }
}

/// One issued token and its revocation state.
///
/// The registry flags are independent of the expiry embedded in the signed
/// token. Both have to pass before a token is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Surrogate key.
    pub id: i64,
    /// The signed token string.
    pub value: String,
    /// TTL class.
    pub kind: TokenKind,
    /// Revoked by logout or a newer session.
    pub revoked: bool,
    /// Marked expired by a newer session.
    pub expired: bool,
    /// Owning user.
    pub owner: UserId,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Returns `true` if neither flag is set.
    #[inline]
    pub fn is_usable(&self) -> bool {
        !self.revoked && !self.expired
    }
}

// =============================================================================
// Tests
// =============================================================================
