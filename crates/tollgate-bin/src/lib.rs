// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tollgate-bin
//!
//! CLI binary for the tollgate authentication service.
//!
//! - CLI argument parsing with clap
//! - Server runtime assembly (store, hasher, codec, router)
//! - Graceful shutdown handling
//! - Logging initialization
//! - Maintenance commands (validate, gen-key, prune)
//!
//! ## Usage
//!
//! ```bash
//! # Start the server (default command)
//! tollgate
//!
//! # Start with a custom config
//! tollgate -c /etc/tollgate/tollgate.yaml
//!
//! # Validate configuration
//! tollgate validate --strict
//!
//! # Generate a signing secret
//! tollgate gen-key
//!
//! # Delete revoked token rows
//! tollgate prune
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{RuntimeBuilder, ServerRuntime};
pub use shutdown::ShutdownCoordinator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
