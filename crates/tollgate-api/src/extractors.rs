// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Custom extractors for API handlers.

use std::net::{IpAddr, SocketAddr};

use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts},
    http::{Extensions, HeaderMap, header, request::Parts},
};
use serde::de::DeserializeOwned;

use crate::auth::AuthContext;
use crate::error::ApiError;

// =============================================================================
// Auth Extractor
// =============================================================================

/// Extractor for authenticated requests.
///
/// Extracts the `AuthContext` placed by the auth middleware. Returns 401 if
/// the request stayed anonymous.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Auth(ctx): Auth) -> impl IntoResponse {
///     format!("Hello, {}", ctx.name)
/// }
/// ```
pub struct Auth(pub AuthContext);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(Auth)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

// =============================================================================
// Authorization Header Extractor
// =============================================================================

/// The raw `Authorization` header value, if present and valid UTF-8.
///
/// Parsing is left to the session service so that a malformed header can be
/// treated differently per endpoint.
pub struct AuthorizationHeader(pub Option<String>);

impl AuthorizationHeader {
    /// Returns the header value.
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for AuthorizationHeader
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(AuthorizationHeader(value))
    }
}

// =============================================================================
// Validated JSON Extractor
// =============================================================================

/// Extractor for JSON payloads.
///
/// Deserialization failures are reported as 400 in the standard error body.
pub struct ValidatedJson<T>(pub T);

impl<S, T> axum::extract::FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;

        Ok(ValidatedJson(value))
    }
}

// =============================================================================
// Client IP
// =============================================================================

/// Resolves the client IP address of a request.
///
/// Prefers `X-Forwarded-For`, then `X-Real-IP`, then the peer address from
/// [`ConnectInfo`].
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok());

    let real_ip = || {
        headers
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
    };

    forwarded.or_else(real_ip).or_else(|| {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip())
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_auth_rejects_anonymous() {
        let mut parts = parts(Request::builder().uri("/users"));
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_authorization_header() {
        let mut parts = parts(
            Request::builder()
                .uri("/auth/logout")
                .header(header::AUTHORIZATION, "Bearer abc"),
        );
        let AuthorizationHeader(value) =
            AuthorizationHeader::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(value.as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let parts = parts(
            Request::builder()
                .uri("/")
                .header("X-Forwarded-For", "10.0.0.1, 10.0.0.2")
                .header("X-Real-IP", "10.0.0.9"),
        );
        let ip = client_ip(&parts.headers, &parts.extensions);
        assert_eq!(ip, Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let mut parts = parts(Request::builder().uri("/").header("X-Real-IP", "not-an-ip"));
        assert_eq!(client_ip(&parts.headers, &parts.extensions), None);

        let peer: SocketAddr = "192.168.1.7:40000".parse().unwrap();
        parts.extensions.insert(ConnectInfo(peer));
        assert_eq!(
            client_ip(&parts.headers, &parts.extensions),
            Some(peer.ip())
        );
    }
}
