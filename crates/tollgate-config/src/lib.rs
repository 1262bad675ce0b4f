// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tollgate-config
//!
//! Configuration management for the tollgate authentication service.
//!
//! ## Features
//!
//! - **Schema Definition**: Typed sections with validation
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Placeholders**: `${VAR}` and `${VAR:default}` in raw file content
//! - **Environment Overrides**: `TOLLGATE_*` variables win over file values
//!
//! ## Quick Start
//!
//! ```no_run
//! use tollgate_config::loader::load_config;
//!
//! let config = load_config("tollgate.yaml").unwrap();
//! println!("Listening on {}", config.server.socket_addr());
//! ```
//!
//! ## Required Settings
//!
//! The service does not start unless all three are present:
//!
//! ```yaml
//! security:
//!   jwt:
//!     secret: "${TOLLGATE_SECRET}"   # base64 HMAC key
//!     access_ttl_secs: 900
//!     refresh_ttl_secs: 604800
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};

pub use schema::{
    CorsConfig, DatabaseConfig, JwtAlgorithm, JwtConfig, PasswordConfig, ResolvedJwt,
    SecretValue, SecurityConfig, ServerConfig, TollgateConfig,
};

pub use loader::{ConfigFormat, ConfigLoader, ConfigLoaderBuilder, load_config, load_config_str};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

// =============================================================================
// Prelude
// =============================================================================

/// Convenience re-exports for common use cases.
pub mod prelude {
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::loader::{ConfigLoader, load_config};
    pub use crate::schema::{JwtConfig, SecretValue, TollgateConfig};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "tollgate-config");
    }

    #[test]
    fn test_prelude_imports() {
        use prelude::*;
        let config = TollgateConfig::default();
        assert!(config.security.jwt.secret.is_none());
    }
}
