// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server runtime orchestration.
//!
//! Turns a validated [`TollgateConfig`] into a running service:
//!
//! - Opens the SQLite store
//! - Builds the password hasher and token codec
//! - Assembles application state and the router
//! - Serves until a shutdown signal, then drains within the grace period

use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonwebtoken::Algorithm;
use tracing::{info, warn};

use tollgate_api::{ApiConfig, ApiServer, AppState, CodecConfig, CorsSettings, TokenCodec};
use tollgate_config::{
    JwtAlgorithm, PasswordConfig, ResolvedJwt, ServerConfig, TollgateConfig, load_config,
};
use tollgate_core::{CredentialHasher, HashingCost, SqliteStore};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// ServerRuntime
// =============================================================================

/// Runs the tollgate HTTP service until shutdown is signaled.
pub struct ServerRuntime {
    config: Arc<TollgateConfig>,
    shutdown: ShutdownCoordinator,
}

impl ServerRuntime {
    /// Creates a new runtime from a validated configuration.
    pub fn new(config: TollgateConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &TollgateConfig {
        &self.config
    }

    /// Returns a handle that can trigger shutdown programmatically.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Serves requests until shutdown.
    pub async fn run(self) -> BinResult<()> {
        info!(version = crate::VERSION, "Starting tollgate");

        let state = build_state(&self.config)?;
        let server = ApiServer::new(state);
        let grace = self.config.server.shutdown_timeout();

        let watcher = self.shutdown.clone();
        tokio::spawn(async move { watcher.wait_for_shutdown().await });

        let mut serving = tokio::spawn(server.run_with_shutdown(self.shutdown.shutdown_signal()));

        tokio::select! {
            joined = &mut serving => return flatten(joined),
            _ = self.shutdown.shutdown_signal() => {}
        }

        info!(grace_secs = grace.as_secs(), "Draining in-flight requests");
        let result = match tokio::time::timeout(grace, serving).await {
            Ok(joined) => flatten(joined),
            Err(_) => {
                warn!("Shutdown grace period elapsed with requests still in flight");
                Ok(())
            }
        };

        info!("tollgate shutdown complete");
        result
    }
}

fn flatten(
    joined: Result<tollgate_api::ApiResult<()>, tokio::task::JoinError>,
) -> BinResult<()> {
    joined
        .map_err(|e| BinError::runtime(format!("server task failed: {e}")))?
        .map_err(BinError::from)
}

// =============================================================================
// Component Assembly
// =============================================================================

/// Builds application state backed by the configured SQLite database.
pub fn build_state(config: &TollgateConfig) -> BinResult<AppState<SqliteStore>> {
    let store = open_store(config)?;

    let hasher = CredentialHasher::new(hashing_cost(&config.security.password))
        .map_err(|e| BinError::from(e).with_context("building password hasher"))?;

    let jwt = config.security.jwt.resolve()?;
    let codec = TokenCodec::new(codec_config(jwt)?)
        .map_err(|e| BinError::from(e).with_context("building token codec"))?;

    let state = AppState::builder()
        .config(api_config(&config.server))
        .store(Arc::new(store))
        .codec(codec)
        .hasher(Arc::new(hasher))
        .build()?;

    Ok(state)
}

/// Opens the store at the configured path, creating parent directories.
pub fn open_store(config: &TollgateConfig) -> BinResult<SqliteStore> {
    let path = &config.database.path;
    ensure_parent_dir(path)?;

    let store = SqliteStore::open(path, config.database.busy_timeout())
        .map_err(|e| BinError::from(e).with_context(format!("opening {}", path.display())))?;

    info!(path = %path.display(), "Database ready");
    Ok(store)
}

fn ensure_parent_dir(path: &Path) -> BinResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent).map_err(|e| {
                BinError::init(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })
        }
        _ => Ok(()),
    }
}

/// Maps the server section onto API settings.
pub fn api_config(server: &ServerConfig) -> ApiConfig {
    let cors = CorsSettings {
        allowed_origins: server.cors.allowed_origins.clone(),
        allowed_methods: server.cors.allowed_methods.clone(),
        allowed_headers: server.cors.allowed_headers.clone(),
        exposed_headers: server.cors.exposed_headers.clone(),
        allow_credentials: server.cors.allow_credentials,
        max_age: std::time::Duration::from_secs(server.cors.max_age_secs),
    };

    ApiConfig {
        host: server.bind_address,
        port: server.port,
        public_prefix: server.public_prefix.clone(),
        cors,
        request_timeout: server.request_timeout(),
        shutdown_timeout: server.shutdown_timeout(),
        max_body_size: server.max_body_size,
    }
}

/// Maps resolved JWT settings onto the codec configuration.
pub fn codec_config(jwt: ResolvedJwt) -> BinResult<CodecConfig> {
    let access = ttl_secs(jwt.access_ttl, "access")?;
    let refresh = ttl_secs(jwt.refresh_ttl, "refresh")?;

    let mut config = CodecConfig::new(jwt.secret, access, refresh)
        .with_algorithm(signing_algorithm(jwt.algorithm));
    if let Some(issuer) = jwt.issuer {
        config = config.with_issuer(issuer);
    }
    Ok(config)
}

fn ttl_secs(ttl: std::time::Duration, kind: &str) -> BinResult<i64> {
    i64::try_from(ttl.as_secs())
        .map_err(|_| BinError::config(format!("{kind} token lifetime is out of range")))
}

fn signing_algorithm(algorithm: JwtAlgorithm) -> Algorithm {
    match algorithm {
        JwtAlgorithm::HS256 => Algorithm::HS256,
        JwtAlgorithm::HS384 => Algorithm::HS384,
        JwtAlgorithm::HS512 => Algorithm::HS512,
    }
}

fn hashing_cost(password: &PasswordConfig) -> HashingCost {
    HashingCost {
        memory_kib: password.memory_kib,
        iterations: password.iterations,
        parallelism: password.parallelism,
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the server runtime.
#[derive(Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<TollgateConfig>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: TollgateConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the runtime. An explicit config wins over a path.
    pub fn build(self) -> BinResult<ServerRuntime> {
        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::config("No configuration provided"))?;
                load_config(&path).map_err(|e| {
                    BinError::from(e).with_context(format!("loading {}", path.display()))
                })?
            }
        };

        for warning in config.warnings() {
            warn!("{warning}");
        }

        Ok(ServerRuntime::new(config))
    }
}

// =============================================================================
// Tests
// =============================================================================
