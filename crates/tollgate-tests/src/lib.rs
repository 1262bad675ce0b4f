// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tollgate Integration Tests
//!
//! Shared harness and end-to-end suites for the tollgate service.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Signing keys, codec settings, sample users
//!   - `mocks`: [`InstrumentedStore`](common::mocks::InstrumentedStore), a
//!     SQLite store wrapper that counts lookups and injects delays
//!   - `harness`: [`TestApp`](common::harness::TestApp), the router driven
//!     in-process with `tower::ServiceExt::oneshot`
//!   - `assertions`: Error body checks
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tollgate-tests
//! cargo test -p tollgate-tests --test integration_auth
//! cargo test -p tollgate-tests --test integration_session
//! cargo test -p tollgate-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Auth Tests (`integration_auth.rs`)
//! - Register, login, refresh and logout over HTTP
//! - Revocation and single-active-session behavior
//! - Protected routes and error bodies
//!
//! ### Session Tests (`integration_session.rs`)
//! - Concurrent logins and refreshes for one user
//! - Authenticator pass-through without store lookups
//!
//! ### Config Tests (`integration_config.rs`)
//! - YAML, TOML and JSON loading
//! - Required settings and environment overrides

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
}
