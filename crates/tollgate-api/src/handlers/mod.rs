// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API handlers for all endpoints.
//!
//! - [`health`]: Liveness and readiness
//! - [`auth`]: Register, login, refresh and logout
//! - [`users`]: Protected user listing and profile

mod auth;
mod health;
mod users;

pub use auth::*;
pub use health::*;
pub use users::*;

use crate::error::ApiResult;

/// Runs blocking store work off the async executor.
///
/// Store calls and password hashing block; a panicking task becomes a 500.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
