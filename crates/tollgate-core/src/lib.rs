// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tollgate-core
//!
//! Core types and persistence for the tollgate authentication service.
//!
//! - **Types**: `UserId`, `User`, `NewUser`, `TokenKind`, `TokenRecord`
//! - **Store**: `CredentialStore` and `TokenRegistry` capabilities
//! - **Sqlite**: the SQLite-backed implementation of both
//! - **Password**: Argon2id hashing with constant-time verification
//! - **Error**: `StoreError` and the `AuthError` taxonomy
//!
//! ## Example
//!
//! ```rust
//! use tollgate_core::{CredentialStore, NewUser, SqliteStore, TokenKind, TokenRegistry};
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! let user = store.create_user(NewUser::new("Ann", "ann@x.com", "hash")).unwrap();
//!
//! store.record("signed-token", TokenKind::Access, user.id).unwrap();
//! store.invalidate_all_for_owner(user.id).unwrap();
//!
//! let record = store.find_by_value("signed-token").unwrap().unwrap();
//! assert!(!record.is_usable());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod password;
pub mod sqlite;
pub mod store;
pub mod types;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::{AuthError, AuthResult, StoreError, StoreResult};
pub use password::{CredentialHasher, HashingCost};
pub use sqlite::{DEFAULT_BUSY_TIMEOUT, SqliteStore};
pub use store::{AuthStore, CredentialStore, TokenRegistry};
pub use types::{NewUser, TokenKind, TokenRecord, User, UserId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
