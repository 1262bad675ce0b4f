// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for tollgate.
//!
//! # Schema Structure
//!
//! ```text
//! TollgateConfig
//! ├── server: ServerConfig
//! │   └── cors: CorsConfig
//! ├── database: DatabaseConfig
//! └── security: SecurityConfig
//!     ├── jwt: JwtConfig
//!     └── password: PasswordConfig
//! ```
//!
//! The signing secret and both token TTLs have no defaults. A configuration
//! without them fails validation, so the service refuses to start.

use crate::error::{ConfigError, ConfigResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize, Serializer};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default public path prefix.
pub const DEFAULT_PUBLIC_PREFIX: &str = "/auth";

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Default maximum request body size (1MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default database file.
pub const DEFAULT_DATABASE_PATH: &str = "tollgate.db";

/// Default SQLite busy timeout in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Default Argon2 memory cost in KiB.
pub const DEFAULT_PASSWORD_MEMORY_KIB: u32 = 19 * 1024;

/// Default Argon2 iterations.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 2;

/// Default Argon2 parallelism.
pub const DEFAULT_PASSWORD_PARALLELISM: u32 = 1;

/// Recommended minimum HMAC key length in bytes.
pub const RECOMMENDED_SECRET_BYTES: usize = 32;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for tollgate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TollgateConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Security configuration.
    #[serde(default)]
    pub security: SecurityConfig,
}

impl TollgateConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.database.validate()?;
        self.security.validate()?;
        Ok(())
    }

    /// Returns non-fatal findings worth showing to an operator.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Ok(jwt) = self.security.jwt.resolve() {
            if jwt.secret.len() < RECOMMENDED_SECRET_BYTES {
                warnings.push(format!(
                    "JWT secret is {} bytes; at least {} is recommended",
                    jwt.secret.len(),
                    RECOMMENDED_SECRET_BYTES
                ));
            }
            if jwt.refresh_ttl <= jwt.access_ttl {
                warnings.push("Refresh token TTL is not longer than access token TTL".to_string());
            }
        }

        if self.server.cors.allowed_origins.is_empty() {
            warnings.push("No CORS origins configured; browsers on other origins are rejected".to_string());
        }

        warnings
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path prefix that bypasses token evaluation.
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_public_prefix() -> String {
    DEFAULT_PUBLIC_PREFIX.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

impl ServerConfig {
    /// Validates the server configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "server.request_timeout_secs",
                "cannot be zero",
            ));
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::validation(
                "server.max_body_size",
                "cannot be zero",
            ));
        }
        if !self.public_prefix.starts_with('/') {
            return Err(ConfigError::validation(
                "server.public_prefix",
                "must start with '/'",
            ));
        }
        self.cors.validate()?;
        Ok(())
    }

    /// Returns the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the shutdown timeout as a Duration.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Returns the socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: DEFAULT_PORT,
            public_prefix: default_public_prefix(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            cors: CorsConfig::default(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins (use "*" for all).
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Allowed methods.
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<String>,

    /// Allowed headers.
    #[serde(default = "default_headers")]
    pub allowed_headers: Vec<String>,

    /// Headers exposed to browser scripts.
    #[serde(default = "default_exposed_headers")]
    pub exposed_headers: Vec<String>,

    /// Allow credentials.
    #[serde(default)]
    pub allow_credentials: bool,

    /// Max age in seconds.
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

fn default_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_headers() -> Vec<String> {
    ["Authorization", "Content-Type", "Cache-Control"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_exposed_headers() -> Vec<String> {
    vec!["Authorization".to_string()]
}

fn default_max_age() -> u64 {
    3600
}

impl CorsConfig {
    /// Validates the CORS configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.allow_credentials && self.allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::validation(
                "server.cors.allow_credentials",
                "cannot be combined with a wildcard origin",
            ));
        }
        Ok(())
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: default_methods(),
            allowed_headers: default_headers(),
            exposed_headers: default_exposed_headers(),
            allow_credentials: false,
            max_age_secs: default_max_age(),
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Time a statement waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_busy_timeout() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl DatabaseConfig {
    /// Validates the database configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::validation("database.path", "cannot be empty"));
        }
        Ok(())
    }

    /// Returns the busy timeout as a Duration.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

// =============================================================================
// Security Configuration
// =============================================================================

/// Security configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// JWT configuration.
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Password hashing configuration.
    #[serde(default)]
    pub password: PasswordConfig,
}

impl SecurityConfig {
    /// Validates the security configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.jwt.validate()?;
        self.password.validate()?;
        Ok(())
    }
}

/// JWT configuration.
///
/// `secret`, `access_ttl_secs` and `refresh_ttl_secs` are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwtConfig {
    /// Base64-encoded HMAC key material.
    #[serde(default)]
    pub secret: Option<SecretValue>,

    /// Access token lifetime in seconds.
    #[serde(default)]
    pub access_ttl_secs: Option<u64>,

    /// Refresh token lifetime in seconds.
    #[serde(default)]
    pub refresh_ttl_secs: Option<u64>,

    /// Signing algorithm.
    #[serde(default)]
    pub algorithm: JwtAlgorithm,

    /// Optional `iss` claim.
    #[serde(default)]
    pub issuer: Option<String>,
}

/// JWT settings with every required value present and decoded.
#[derive(Clone)]
pub struct ResolvedJwt {
    /// Decoded key material.
    pub secret: Vec<u8>,
    /// Access token lifetime.
    pub access_ttl: Duration,
    /// Refresh token lifetime.
    pub refresh_ttl: Duration,
    /// Signing algorithm.
    pub algorithm: JwtAlgorithm,
    /// Optional issuer.
    pub issuer: Option<String>,
}

impl std::fmt::Debug for ResolvedJwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedJwt")
            .field("secret", &"***")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtConfig {
    /// Validates the JWT configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.resolve().map(|_| ())
    }

    /// Checks required values and decodes the secret.
    pub fn resolve(&self) -> ConfigResult<ResolvedJwt> {
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| ConfigError::missing_field("security.jwt.secret"))?
            .decode_base64()
            .map_err(|message| ConfigError::validation("security.jwt.secret", message))?;

        let access_ttl = required_ttl(self.access_ttl_secs, "security.jwt.access_ttl_secs")?;
        let refresh_ttl = required_ttl(self.refresh_ttl_secs, "security.jwt.refresh_ttl_secs")?;

        Ok(ResolvedJwt {
            secret,
            access_ttl,
            refresh_ttl,
            algorithm: self.algorithm,
            issuer: self.issuer.clone(),
        })
    }
}

fn required_ttl(value: Option<u64>, field: &str) -> ConfigResult<Duration> {
    match value {
        None => Err(ConfigError::missing_field(field)),
        Some(0) => Err(ConfigError::validation(field, "cannot be zero")),
        Some(secs) if secs > i64::MAX as u64 => Err(ConfigError::validation(field, "too large")),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

/// JWT signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256.
    #[default]
    HS256,
    /// HMAC using SHA-384.
    HS384,
    /// HMAC using SHA-512.
    HS512,
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordConfig {
    /// Memory in KiB.
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,

    /// Number of passes.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Degree of parallelism.
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 {
    DEFAULT_PASSWORD_MEMORY_KIB
}

fn default_iterations() -> u32 {
    DEFAULT_PASSWORD_ITERATIONS
}

fn default_parallelism() -> u32 {
    DEFAULT_PASSWORD_PARALLELISM
}

impl PasswordConfig {
    /// Validates the password configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.parallelism == 0 {
            return Err(ConfigError::validation(
                "security.password.parallelism",
                "cannot be zero",
            ));
        }
        if self.iterations == 0 {
            return Err(ConfigError::validation(
                "security.password.iterations",
                "cannot be zero",
            ));
        }
        if self.memory_kib < 8 * self.parallelism {
            return Err(ConfigError::validation(
                "security.password.memory_kib",
                "must be at least 8 KiB per lane",
            ));
        }
        Ok(())
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_PASSWORD_MEMORY_KIB,
            iterations: DEFAULT_PASSWORD_ITERATIONS,
            parallelism: DEFAULT_PASSWORD_PARALLELISM,
        }
    }
}

// =============================================================================
// Secret Value
// =============================================================================

/// A secret read from configuration.
///
/// `Display`, `Debug` and serialization all mask the value.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretValue(String);

impl SecretValue {
    /// Creates a new secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw value.
    pub fn raw(&self) -> &str {
        &self.0
    }

    /// Decodes the value as standard base64.
    pub fn decode_base64(&self) -> Result<Vec<u8>, String> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            return Err("cannot be empty".to_string());
        }
        let bytes = BASE64
            .decode(trimmed)
            .map_err(|e| format!("not valid base64: {e}"))?;
        if bytes.is_empty() {
            return Err("decodes to zero bytes".to_string());
        }
        Ok(bytes)
    }
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

impl std::fmt::Display for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "***")
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 32 bytes of 0x2a
    const SECRET: &str = "KioqKioqKioqKioqKioqKioqKioqKioqKioqKioqKio=";

    fn complete_jwt() -> JwtConfig {
        JwtConfig {
            secret: Some(SecretValue::new(SECRET)),
            access_ttl_secs: Some(900),
            refresh_ttl_secs: Some(604_800),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_is_incomplete() {
        let config = TollgateConfig::default();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.public_prefix, "/auth");

        match config.validate() {
            Err(ConfigError::MissingField { field }) => assert_eq!(field, "security.jwt.secret"),
            other => panic!("Expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_each_jwt_setting_is_required() {
        let mut jwt = complete_jwt();
        jwt.access_ttl_secs = None;
        assert!(matches!(
            jwt.validate(),
            Err(ConfigError::MissingField { field }) if field == "security.jwt.access_ttl_secs"
        ));

        let mut jwt = complete_jwt();
        jwt.refresh_ttl_secs = None;
        assert!(matches!(
            jwt.validate(),
            Err(ConfigError::MissingField { field }) if field == "security.jwt.refresh_ttl_secs"
        ));

        assert!(complete_jwt().validate().is_ok());
    }

    #[test]
    fn test_secret_must_be_base64() {
        let mut jwt = complete_jwt();
        jwt.secret = Some(SecretValue::new("not base64!"));
        assert!(matches!(jwt.validate(), Err(ConfigError::Validation { .. })));

        jwt.secret = Some(SecretValue::new("   "));
        assert!(matches!(jwt.validate(), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut jwt = complete_jwt();
        jwt.access_ttl_secs = Some(0);
        assert!(matches!(jwt.validate(), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_resolve_decodes_secret() {
        let resolved = complete_jwt().resolve().unwrap();
        assert_eq!(resolved.secret, vec![0x2a; 32]);
        assert_eq!(resolved.access_ttl, Duration::from_secs(900));
        assert_eq!(resolved.algorithm, JwtAlgorithm::HS256);
        assert!(!format!("{resolved:?}").contains(SECRET));
    }

    #[test]
    fn test_secret_value_is_masked() {
        let secret = SecretValue::new("c2VjcmV0");
        assert_eq!(secret.raw(), "c2VjcmV0");
        assert_eq!(secret.to_string(), "***");
        assert!(!format!("{secret:?}").contains("c2VjcmV0"));

        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, "\"***\"");
    }

    #[test]
    fn test_cors_credentials_with_wildcard_rejected() {
        let cors = CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: true,
            ..Default::default()
        };
        assert!(cors.validate().is_err());
    }

    #[test]
    fn test_public_prefix_must_be_absolute() {
        let server = ServerConfig {
            public_prefix: "auth".to_string(),
            ..Default::default()
        };
        assert!(server.validate().is_err());
    }

    #[test]
    fn test_password_config_validation() {
        assert!(PasswordConfig::default().validate().is_ok());

        let config = PasswordConfig {
            memory_kib: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warnings() {
        let mut config = TollgateConfig::default();
        config.security.jwt = complete_jwt();
        config.security.jwt.secret = Some(SecretValue::new("c2hvcnQ="));
        config.security.jwt.refresh_ttl_secs = Some(60);

        let warnings = config.warnings();
        assert!(warnings.iter().any(|w| w.contains("JWT secret")));
        assert!(warnings.iter().any(|w| w.contains("Refresh token TTL")));
        assert!(warnings.iter().any(|w| w.contains("CORS")));
    }
}
