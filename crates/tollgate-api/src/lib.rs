// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tollgate-api
//!
//! HTTP surface of the tollgate authentication service.
//!
//! Tokens are self-contained signed JWTs, checked on every request against a
//! server-side registry so that logout and "new login ends old sessions"
//! take effect immediately.
//!
//! - [`auth`]: token codec, session lifecycle, per-request authenticator
//! - [`middleware`]: tower layer wiring the authenticator into axum
//! - [`handlers`]: `/auth/*`, `/users`, `/health`, `/ready`
//! - [`server`]: router assembly and graceful serving

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;
pub mod state;

pub use auth::{
    AnonymousReason, AuthContext, Claims, CodecConfig, RequestAuthenticator, SessionService,
    TokenCodec, TokenPair, Verdict,
};
pub use config::{ApiConfig, CorsSettings};
pub use error::{ApiError, ApiResult};
pub use server::ApiServer;
pub use state::{AppState, AppStateBuilder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
