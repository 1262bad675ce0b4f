// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tollgate_core::AuthStore;

use super::blocking;
use crate::error::{ApiResult, ValidationErrors};
use crate::extractors::{AuthorizationHeader, ValidatedJson};
use crate::response::TokenResponse;
use crate::state::AppState;

// =============================================================================
// Register
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email.
    #[serde(default)]
    pub email: String,
    /// Password.
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    /// Checks field presence and email shape.
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = ValidationErrors::new();
        errors.require("name", &self.name);
        errors.require("email", &self.email);
        errors.require("password", &self.password);

        if !self.email.trim().is_empty() && !is_email_shaped(&self.email) {
            errors.add("email", "email must look like local@domain");
        }

        errors.into_result(())
    }
}

fn is_email_shaped(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// POST /auth/register
///
/// Creates an account and returns its first token pair.
pub async fn register<S: AuthStore>(
    State(state): State<AppState<S>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let sessions = state.sessions.clone();
    let pair = blocking(move || {
        Ok(sessions.register(&request.name, &request.email, &request.password)?)
    })
    .await?;

    Ok((
        StatusCode::OK,
        Json(TokenResponse::new(pair, state.codec().access_ttl_secs())),
    ))
}

// =============================================================================
// Login
// =============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email.
    #[serde(default)]
    pub email: String,
    /// Password.
    #[serde(default)]
    pub password: String,
}

/// POST /auth/login
///
/// Verifies credentials, ends every earlier session of the user and returns
/// a new token pair.
pub async fn login<S: AuthStore>(
    State(state): State<AppState<S>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut errors = ValidationErrors::new();
    errors.require("email", &request.email);
    errors.require("password", &request.password);
    errors.into_result(())?;

    let sessions = state.sessions.clone();
    let pair =
        blocking(move || Ok(sessions.authenticate(&request.email, &request.password)?)).await?;

    Ok(Json(TokenResponse::new(
        pair,
        state.codec().access_ttl_secs(),
    )))
}

// =============================================================================
// Refresh Token
// =============================================================================

/// POST /auth/refresh-token
///
/// Exchanges the bearer refresh token for a new token pair.
pub async fn refresh_token<S: AuthStore>(
    State(state): State<AppState<S>>,
    authorization: AuthorizationHeader,
) -> ApiResult<impl IntoResponse> {
    let sessions = state.sessions.clone();
    let pair = blocking(move || Ok(sessions.refresh(authorization.as_deref())?)).await?;

    Ok(Json(TokenResponse::new(
        pair,
        state.codec().access_ttl_secs(),
    )))
}

// =============================================================================
// Logout
// =============================================================================

/// POST /auth/logout
///
/// Revokes the bearer access token. Always answers 200 with an empty body
/// unless the store fails.
///
/// The route is public, so no [`AuthContext`](crate::auth::AuthContext) is
/// ever attached here and there is nothing to clear.
pub async fn logout<S: AuthStore>(
    State(state): State<AppState<S>>,
    authorization: AuthorizationHeader,
) -> ApiResult<StatusCode> {
    let sessions = state.sessions.clone();
    blocking(move || {
        sessions.logout(authorization.as_deref(), &mut None)?;
        Ok(())
    })
    .await?;

    Ok(StatusCode::OK)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    fn request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_register_validation() {
        assert!(request("Ann", "ann@x.com", "pw1").validate().is_ok());

        match request(" ", "", "").validate() {
            Err(ApiError::Validation {
                errors: Some(errors),
                ..
            }) => assert_eq!(errors.fields.len(), 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(is_email_shaped("ann@x.com"));
        assert!(is_email_shaped("a@b"));
        assert!(!is_email_shaped("ann"));
        assert!(!is_email_shaped("@x.com"));
        assert!(!is_email_shaped("ann@"));
        assert!(!is_email_shaped("a@b@c"));
        assert!(!is_email_shaped("ann @x.com"));
    }
}
