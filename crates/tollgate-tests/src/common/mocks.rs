// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! [`InstrumentedStore`] wraps an in-memory [`SqliteStore`] so tests can
//! count registry lookups, widen race windows and simulate an outage.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tollgate_core::{
    CredentialStore, NewUser, SqliteStore, StoreError, StoreResult, TokenKind, TokenRecord,
    TokenRegistry, User, UserId,
};

/// Store wrapper with interaction counters and fault injection.
pub struct InstrumentedStore {
    inner: SqliteStore,

    /// `find_by_value` calls.
    token_lookups: AtomicUsize,

    /// `find_user_by_email` and `find_user_by_id` calls.
    user_lookups: AtomicUsize,

    /// `record` calls.
    records: AtomicUsize,

    /// Sleep after invalidation, before the caller records new tokens.
    invalidate_delay_ms: AtomicU64,

    /// Force `ping` to fail.
    unavailable: AtomicBool,
}

impl InstrumentedStore {
    /// Wraps a fresh in-memory store.
    pub fn new() -> Self {
        Self::wrap(SqliteStore::open_in_memory().expect("in-memory store opens"))
    }

    /// Wraps an existing store.
    pub fn wrap(inner: SqliteStore) -> Self {
        Self {
            inner,
            token_lookups: AtomicUsize::new(0),
            user_lookups: AtomicUsize::new(0),
            records: AtomicUsize::new(0),
            invalidate_delay_ms: AtomicU64::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Sets the delay injected after every `invalidate_all_for_owner`.
    pub fn with_invalidate_delay(self, delay: Duration) -> Self {
        self.invalidate_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Makes `ping` fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of registry lookups by token value.
    pub fn token_lookups(&self) -> usize {
        self.token_lookups.load(Ordering::SeqCst)
    }

    /// Number of user lookups.
    pub fn user_lookups(&self) -> usize {
        self.user_lookups.load(Ordering::SeqCst)
    }

    /// Number of recorded tokens.
    pub fn records(&self) -> usize {
        self.records.load(Ordering::SeqCst)
    }

    /// Resets all counters.
    pub fn reset_counters(&self) {
        self.token_lookups.store(0, Ordering::SeqCst);
        self.user_lookups.store(0, Ordering::SeqCst);
        self.records.store(0, Ordering::SeqCst);
    }

    /// Usable tokens of `owner`, grouped by kind.
    pub fn usable_tokens(&self, owner: UserId, kind: TokenKind) -> Vec<TokenRecord> {
        self.inner
            .all_for_owner(owner)
            .expect("token listing succeeds")
            .into_iter()
            .filter(|t| t.kind == kind && t.is_usable())
            .collect()
    }
}

impl Default for InstrumentedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for InstrumentedStore {
    fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.inner.create_user(user)
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_user_by_email(email)
    }

    fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_user_by_id(id)
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        self.inner.list_users()
    }

    fn ping(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::database("simulated outage"));
        }
        self.inner.ping()
    }
}

impl TokenRegistry for InstrumentedStore {
    fn record(&self, value: &str, kind: TokenKind, owner: UserId) -> StoreResult<TokenRecord> {
        self.records.fetch_add(1, Ordering::SeqCst);
        self.inner.record(value, kind, owner)
    }

    fn find_by_value(&self, value: &str) -> StoreResult<Option<TokenRecord>> {
        self.token_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_value(value)
    }

    fn all_for_owner(&self, owner: UserId) -> StoreResult<Vec<TokenRecord>> {
        self.inner.all_for_owner(owner)
    }

    fn invalidate_all_for_owner(&self, owner: UserId) -> StoreResult<usize> {
        let changed = self.inner.invalidate_all_for_owner(owner)?;
        let delay = self.invalidate_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        Ok(changed)
    }

    fn revoke(&self, value: &str) -> StoreResult<bool> {
        self.inner.revoke(value)
    }

    fn purge_invalidated(&self) -> StoreResult<usize> {
        self.inner.purge_invalidated()
    }
}
