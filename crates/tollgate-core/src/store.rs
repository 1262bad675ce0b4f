// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Persistence capabilities used by the session layer.
//!
//! Both traits are synchronous. Callers running on an async runtime are
//! expected to move calls onto a blocking thread.

use crate::error::StoreResult;
use crate::types::{NewUser, TokenKind, TokenRecord, User, UserId};

/// Persists user identity and password hash.
pub trait CredentialStore: Send + Sync {
    /// Inserts a user.
    ///
    /// Fails with [`StoreError::DuplicateEmail`](crate::error::StoreError::DuplicateEmail)
    /// when the unique constraint on email is violated.
    fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Looks up a user by exact email.
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Looks up a user by id.
    fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Returns every user ordered by id.
    fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Checks that the backing store is reachable.
    fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Durable record of every issued token and its revocation flags.
pub trait TokenRegistry: Send + Sync {
    /// Inserts a token with both flags cleared.
    fn record(&self, value: &str, kind: TokenKind, owner: UserId) -> StoreResult<TokenRecord>;

    /// Looks up a token by its raw value.
    fn find_by_value(&self, value: &str) -> StoreResult<Option<TokenRecord>>;

    /// Returns every token owned by `owner`, oldest first.
    fn all_for_owner(&self, owner: UserId) -> StoreResult<Vec<TokenRecord>>;

    /// Sets `revoked` and `expired` on every token of `owner`.
    ///
    /// Returns the number of rows that changed.
    fn invalidate_all_for_owner(&self, owner: UserId) -> StoreResult<usize>;

    /// Sets both flags on a single token. Returns `false` if no row matched.
    fn revoke(&self, value: &str) -> StoreResult<bool>;

    /// Deletes tokens that are both revoked and expired.
    fn purge_invalidated(&self) -> StoreResult<usize>;
}

/// Combined capability required by the session orchestrator and the
/// request authenticator.
pub trait AuthStore: CredentialStore + TokenRegistry + 'static {}

impl<T> AuthStore for T where T: CredentialStore + TokenRegistry + 'static {}
