// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application state shared across handlers.

use std::sync::Arc;

use tollgate_core::{AuthStore, CredentialHasher, SqliteStore};

use crate::auth::{RequestAuthenticator, SessionService, TokenCodec};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// AppState
// =============================================================================

/// Application state shared across all handlers.
///
/// Generic over the store so tests can wrap the production store.
pub struct AppState<S = SqliteStore> {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Session lifecycle operations.
    pub sessions: SessionService<S>,
    /// Per-request authentication.
    pub authenticator: RequestAuthenticator<S>,
    /// Backing store.
    pub store: Arc<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            sessions: self.sessions.clone(),
            authenticator: self.authenticator.clone(),
            store: self.store.clone(),
        }
    }
}

impl<S: AuthStore> AppState<S> {
    /// Creates a new app state builder.
    pub fn builder() -> AppStateBuilder<S> {
        AppStateBuilder::new()
    }

    /// Returns the session service.
    pub fn sessions(&self) -> &SessionService<S> {
        &self.sessions
    }

    /// Returns the request authenticator.
    pub fn authenticator(&self) -> &RequestAuthenticator<S> {
        &self.authenticator
    }

    /// Returns the token codec.
    pub fn codec(&self) -> &TokenCodec {
        self.sessions.codec()
    }
}

// =============================================================================
// AppStateBuilder
// =============================================================================

/// Builder for constructing AppState.
pub struct AppStateBuilder<S> {
    config: Option<ApiConfig>,
    store: Option<Arc<S>>,
    codec: Option<TokenCodec>,
    hasher: Option<Arc<CredentialHasher>>,
}

impl<S: AuthStore> AppStateBuilder<S> {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            codec: None,
            hasher: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the store.
    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the token codec.
    pub fn codec(mut self, codec: TokenCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Sets the password hasher.
    pub fn hasher(mut self, hasher: Arc<CredentialHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Builds the AppState.
    ///
    /// The store and codec are required. The hasher defaults to argon2id
    /// with its standard cost.
    pub fn build(self) -> ApiResult<AppState<S>> {
        let config = self.config.unwrap_or_default();
        let store = self
            .store
            .ok_or_else(|| ApiError::internal("AppState requires a store"))?;
        let codec = self
            .codec
            .ok_or_else(|| ApiError::internal("AppState requires a token codec"))?;
        let hasher = match self.hasher {
            Some(hasher) => hasher,
            None => Arc::new(CredentialHasher::new(Default::default())?),
        };

        let sessions = SessionService::new(store.clone(), codec.clone(), hasher);
        let authenticator =
            RequestAuthenticator::new(store.clone(), codec, config.public_prefix.clone());

        Ok(AppState {
            config: Arc::new(config),
            sessions,
            authenticator,
            store,
        })
    }
}

impl<S: AuthStore> Default for AppStateBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CodecConfig;

    fn codec() -> TokenCodec {
        TokenCodec::new(CodecConfig::new(
            b"0123456789abcdef0123456789abcdef".to_vec(),
            900,
            86_400,
        ))
        .unwrap()
    }

    #[test]
    fn test_app_state_builder() {
        let state = AppState::<SqliteStore>::builder()
            .config(ApiConfig::new().with_public_prefix("/public"))
            .store(Arc::new(SqliteStore::open_in_memory().unwrap()))
            .codec(codec())
            .hasher(Arc::new(CredentialHasher::low_cost().unwrap()))
            .build()
            .unwrap();

        assert_eq!(state.authenticator().public_prefix(), "/public");
        assert_eq!(state.codec().access_ttl_secs(), 900);
    }

    #[test]
    fn test_builder_requires_store() {
        let result = AppState::<SqliteStore>::builder().codec(codec()).build();
        assert!(result.is_err());
    }
}
