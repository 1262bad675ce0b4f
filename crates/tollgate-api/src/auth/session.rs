// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session lifecycle: register, login, refresh, logout.
//!
//! [`SessionService`] is the only component that writes to both the
//! credential store and the token registry. Every issuance rotates the
//! user's tokens: all prior rows are invalidated, then the new pair is
//! recorded. The two steps run under a per-user mutex so that concurrent
//! logins for one user leave exactly one usable pair behind.
//!
//! All methods perform blocking store I/O and password hashing; call them
//! from a blocking context.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tollgate_core::{
    AuthError, AuthResult, AuthStore, CredentialHasher, NewUser, TokenKind, User, UserId,
};
use tracing::{debug, info, warn};

use super::authenticator::bearer_token;
use super::{AuthContext, TokenCodec, TokenPair};

const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

/// Coordinates the credential store, password hasher, codec and registry.
pub struct SessionService<S> {
    store: Arc<S>,
    codec: TokenCodec,
    hasher: Arc<CredentialHasher>,
    locks: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
}

impl<S> Clone for SessionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            codec: self.codec.clone(),
            hasher: self.hasher.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<S: AuthStore> SessionService<S> {
    /// Creates a new session service.
    pub fn new(store: Arc<S>, codec: TokenCodec, hasher: Arc<CredentialHasher>) -> Self {
        Self {
            store,
            codec,
            hasher,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Returns the token codec.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates an account and opens its first session.
    ///
    /// Email uniqueness is enforced by the store, not pre-checked.
    pub fn register(&self, name: &str, email: &str, password: &str) -> AuthResult<TokenPair> {
        let password_hash = self.hasher.hash(password)?;

        let user = self
            .store
            .create_user(NewUser::new(name, email, password_hash))?;

        let pair = self.codec.issue_pair(&user)?;
        self.with_user_lock(user.id, || self.rotate(user.id, &pair))?;

        info!(user_id = %user.id, "User registered");
        Ok(pair)
    }

    /// Verifies credentials and opens a new session, ending every prior one.
    pub fn authenticate(&self, email: &str, password: &str) -> AuthResult<TokenPair> {
        let user = match self.store.find_user_by_email(email)? {
            Some(user) => user,
            None => {
                self.hasher.verify_absent(password);
                debug!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password_hash) {
            debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.codec.issue_pair(&user)?;
        self.with_user_lock(user.id, || self.rotate(user.id, &pair))?;

        info!(user_id = %user.id, "User logged in");
        Ok(pair)
    }

    /// Exchanges a usable refresh token for a new pair.
    ///
    /// The presented refresh token is invalidated together with every other
    /// token of its owner.
    pub fn refresh(&self, authorization: Option<&str>) -> AuthResult<TokenPair> {
        let token = bearer_token(authorization).ok_or(AuthError::InvalidAuthorizationHeader)?;

        let subject = self
            .codec
            .extract_subject(token)
            .map_err(|_| AuthError::unauthorized(INVALID_REFRESH_TOKEN))?;

        let user = self
            .store
            .find_user_by_email(&subject)?
            .ok_or(AuthError::UserNotFound { email: subject })?;

        if !self.codec.is_valid_for(token, &user) {
            debug!(user_id = %user.id, "Refresh token expired or issued to another subject");
            return Err(AuthError::unauthorized(INVALID_REFRESH_TOKEN));
        }

        let pair = self.codec.issue_pair(&user)?;
        self.with_user_lock(user.id, || {
            // Checked under the lock so two refreshes with one token cannot both win.
            self.ensure_usable_refresh(token, &user)?;
            self.rotate(user.id, &pair)
        })?;

        info!(user_id = %user.id, "Session refreshed");
        Ok(pair)
    }

    /// Ends the session identified by the bearer access token.
    ///
    /// Only a live token ends a session: it must be registered, still usable,
    /// and valid for its owner. Anything else, including a missing or
    /// malformed header, is a no-op returning `false`. On success the token
    /// and every other token of its owner are invalidated and `context` is
    /// cleared. The HTTP handler has no context to clear because logout sits
    /// under the public prefix; in-process callers holding one pass it here.
    pub fn logout(
        &self,
        authorization: Option<&str>,
        context: &mut Option<AuthContext>,
    ) -> AuthResult<bool> {
        let Some(token) = bearer_token(authorization) else {
            return Ok(false);
        };

        let Some(record) = self.store.find_by_value(token)? else {
            debug!("Logout with unknown token");
            return Ok(false);
        };

        let owner = record.owner;
        let ended = self.with_user_lock(owner, || {
            // Re-read under the lock; a concurrent login may have rotated it.
            if !self.is_live(token, owner)? {
                return Ok(false);
            }
            self.store.revoke(token)?;
            self.store.invalidate_all_for_owner(owner)?;
            Ok(true)
        })?;

        if !ended {
            debug!(user_id = %owner, "Logout with stale token ignored");
            return Ok(false);
        }

        *context = None;
        info!(user_id = %owner, "User logged out");
        Ok(true)
    }

    /// Returns every registered user.
    pub fn list_users(&self) -> AuthResult<Vec<User>> {
        Ok(self.store.list_users()?)
    }

    /// Looks a user up by id.
    pub fn find_user(&self, id: UserId) -> AuthResult<Option<User>> {
        Ok(self.store.find_user_by_id(id)?)
    }

    /// Returns the number of per-user locks currently held.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    fn ensure_usable_refresh(&self, token: &str, user: &User) -> AuthResult<()> {
        match self.store.find_by_value(token)? {
            Some(record)
                if record.kind == TokenKind::Refresh
                    && record.is_usable()
                    && record.owner == user.id =>
            {
                Ok(())
            }
            Some(record) => {
                warn!(
                    user_id = %user.id,
                    kind = %record.kind,
                    revoked = record.revoked,
                    "Refresh rejected for unusable token"
                );
                Err(AuthError::unauthorized(INVALID_REFRESH_TOKEN))
            }
            None => {
                debug!(user_id = %user.id, "Refresh rejected for unregistered token");
                Err(AuthError::unauthorized(INVALID_REFRESH_TOKEN))
            }
        }
    }

    fn is_live(&self, token: &str, owner: UserId) -> AuthResult<bool> {
        let usable = self
            .store
            .find_by_value(token)?
            .is_some_and(|record| record.is_usable() && record.owner == owner);
        if !usable {
            return Ok(false);
        }

        Ok(self
            .store
            .find_user_by_id(owner)?
            .is_some_and(|user| self.codec.is_valid_for(token, &user)))
    }

    /// Invalidate-then-record. Callers must hold the owner's lock.
    fn rotate(&self, owner: UserId, pair: &TokenPair) -> AuthResult<()> {
        let invalidated = self.store.invalidate_all_for_owner(owner)?;
        self.store
            .record(&pair.access_token, TokenKind::Access, owner)?;
        self.store
            .record(&pair.refresh_token, TokenKind::Refresh, owner)?;

        debug!(user_id = %owner, invalidated, "Tokens rotated");
        Ok(())
    }

    fn with_user_lock<T>(&self, owner: UserId, f: impl FnOnce() -> AuthResult<T>) -> AuthResult<T> {
        let lock = self.locks.entry(owner).or_default().clone();
        let result = {
            let _guard = lock.lock();
            f()
        };
        drop(lock);

        self.locks
            .remove_if(&owner, |_, lock| Arc::strong_count(lock) == 1);
        result
    }
}

impl<S> std::fmt::Debug for SessionService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("codec", &self.codec)
            .field("active_locks", &self.locks.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CodecConfig;
    use tollgate_core::{CredentialStore, SqliteStore, TokenRegistry};

    fn service_with_ttls(access: i64, refresh: i64) -> SessionService<SqliteStore> {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let codec = TokenCodec::new(CodecConfig::new(
            b"0123456789abcdef0123456789abcdef".to_vec(),
            access,
            refresh,
        ))
        .unwrap();
        let hasher = Arc::new(CredentialHasher::low_cost().unwrap());
        SessionService::new(store, codec, hasher)
    }

    fn service() -> SessionService<SqliteStore> {
        service_with_ttls(900, 86_400)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    fn usable(service: &SessionService<SqliteStore>, token: &str) -> bool {
        service
            .store()
            .find_by_value(token)
            .unwrap()
            .is_some_and(|r| r.is_usable())
    }

    #[test]
    fn test_register_records_both_tokens() {
        let service = service();
        let pair = service.register("Ann", "ann@x.com", "pw1").unwrap();

        let access = service.store().find_by_value(&pair.access_token).unwrap().unwrap();
        let refresh = service.store().find_by_value(&pair.refresh_token).unwrap().unwrap();
        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert!(access.is_usable());
        assert!(refresh.is_usable());
    }

    #[test]
    fn test_register_duplicate_email() {
        let service = service();
        service.register("Ann", "ann@x.com", "pw1").unwrap();

        let err = service.register("Ann", "ann@x.com", "pw2").unwrap_err();
        assert!(matches!(err, AuthError::EmailAlreadyInUse { .. }));
    }

    #[test]
    fn test_authenticate_invalidates_prior_tokens() {
        let service = service();
        let first = service.register("Ann", "ann@x.com", "pw1").unwrap();
        let second = service.authenticate("ann@x.com", "pw1").unwrap();

        assert!(!usable(&service, &first.access_token));
        assert!(!usable(&service, &first.refresh_token));
        assert!(usable(&service, &second.access_token));
        assert!(usable(&service, &second.refresh_token));
    }

    #[test]
    fn test_authenticate_rejects_bad_credentials() {
        let service = service();
        service.register("Ann", "ann@x.com", "pw1").unwrap();

        assert!(matches!(
            service.authenticate("ann@x.com", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate("nobody@x.com", "pw1"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_refresh_rotates_pair() {
        let service = service();
        let pair = service.register("Ann", "ann@x.com", "pw1").unwrap();

        let next = service.refresh(Some(bearer(&pair.refresh_token).as_str())).unwrap();
        assert!(usable(&service, &next.access_token));
        assert!(!usable(&service, &pair.refresh_token));

        // The consumed refresh token cannot be replayed.
        let replay = service.refresh(Some(bearer(&pair.refresh_token).as_str()));
        assert!(matches!(replay, Err(AuthError::Unauthorized { .. })));
    }

    #[test]
    fn test_refresh_rejects_access_token() {
        let service = service();
        let pair = service.register("Ann", "ann@x.com", "pw1").unwrap();

        let result = service.refresh(Some(bearer(&pair.access_token).as_str()));
        assert!(matches!(result, Err(AuthError::Unauthorized { .. })));
        assert!(usable(&service, &pair.access_token));
    }

    #[test]
    fn test_refresh_rejects_expired_token() {
        let service = service_with_ttls(900, -60);
        let pair = service.register("Ann", "ann@x.com", "pw1").unwrap();
        let owner = service
            .store()
            .find_user_by_email("ann@x.com")
            .unwrap()
            .unwrap()
            .id;
        let before = service.store().all_for_owner(owner).unwrap().len();

        let result = service.refresh(Some(bearer(&pair.refresh_token).as_str()));
        assert!(matches!(result, Err(AuthError::Unauthorized { .. })));

        let after = service.store().all_for_owner(owner).unwrap().len();
        assert_eq!(before, after);
    }

    #[test]
    fn test_refresh_header_errors() {
        let service = service();
        assert!(matches!(
            service.refresh(None),
            Err(AuthError::InvalidAuthorizationHeader)
        ));
        assert!(matches!(
            service.refresh(Some("Basic abc")),
            Err(AuthError::InvalidAuthorizationHeader)
        ));
        assert!(matches!(
            service.refresh(Some("Bearer garbage")),
            Err(AuthError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_logout_revokes_and_clears_context() {
        let service = service();
        let pair = service.register("Ann", "ann@x.com", "pw1").unwrap();
        let user = service
            .store()
            .find_user_by_email("ann@x.com")
            .unwrap()
            .unwrap();
        let mut context = Some(AuthContext::from_user(&user));

        let done = service
            .logout(Some(bearer(&pair.access_token).as_str()), &mut context)
            .unwrap();

        assert!(done);
        assert!(context.is_none());
        assert!(!usable(&service, &pair.access_token));
        assert!(!usable(&service, &pair.refresh_token));
    }

    #[test]
    fn test_logout_without_header_is_noop() {
        let service = service();
        let pair = service.register("Ann", "ann@x.com", "pw1").unwrap();
        let mut context = None;

        assert!(!service.logout(None, &mut context).unwrap());
        assert!(!service.logout(Some("Bearer unknown"), &mut context).unwrap());
        assert!(usable(&service, &pair.access_token));
    }

    #[test]
    fn test_logout_with_superseded_token_keeps_current_session() {
        let service = service();
        let old = service.register("Ann", "ann@x.com", "pw1").unwrap();
        let current = service.authenticate("ann@x.com", "pw1").unwrap();
        let mut context = None;

        for _ in 0..2 {
            let done = service
                .logout(Some(bearer(&old.access_token).as_str()), &mut context)
                .unwrap();
            assert!(!done);
        }

        assert!(usable(&service, &current.access_token));
        assert!(usable(&service, &current.refresh_token));
    }

    #[test]
    fn test_logout_with_expired_token_is_noop() {
        let service = service_with_ttls(-60, 86_400);
        let pair = service.register("Ann", "ann@x.com", "pw1").unwrap();
        let user = service
            .store()
            .find_user_by_email("ann@x.com")
            .unwrap()
            .unwrap();
        let mut context = Some(AuthContext::from_user(&user));

        let done = service
            .logout(Some(bearer(&pair.access_token).as_str()), &mut context)
            .unwrap();

        assert!(!done);
        assert!(context.is_some());
        assert!(usable(&service, &pair.refresh_token));
    }

    #[test]
    fn test_locks_are_released() {
        let service = service();
        service.register("Ann", "ann@x.com", "pw1").unwrap();
        service.authenticate("ann@x.com", "pw1").unwrap();
        assert_eq!(service.active_locks(), 0);
    }
}
