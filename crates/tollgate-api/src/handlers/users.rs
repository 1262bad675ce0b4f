// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Protected user handlers.

use axum::{Json, extract::State};
use tollgate_core::AuthStore;

use super::blocking;
use crate::error::{ApiError, ApiResult};
use crate::extractors::Auth;
use crate::response::{UserProfile, UserSummary};
use crate::state::AppState;

/// GET /users
///
/// Lists every registered user.
pub async fn list_users<S: AuthStore>(
    State(state): State<AppState<S>>,
    Auth(_ctx): Auth,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let sessions = state.sessions.clone();
    let users = blocking(move || Ok(sessions.list_users()?)).await?;

    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

/// GET /users/me
///
/// Returns the caller's profile.
pub async fn current_user<S: AuthStore>(
    State(state): State<AppState<S>>,
    Auth(ctx): Auth,
) -> ApiResult<Json<UserProfile>> {
    let sessions = state.sessions.clone();
    let user_id = ctx.user_id;
    let user = blocking(move || Ok(sessions.find_user(user_id)?))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(UserProfile::from(user)))
}
