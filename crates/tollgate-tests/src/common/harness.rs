// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Drives the full router in-process. Requests go through the same
//! middleware stack as production, without binding a socket.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use tollgate_api::response::TokenResponse;
use tollgate_api::{ApiServer, AppState, CodecConfig, SessionService, TokenCodec};
use tollgate_core::{AuthStore, CredentialHasher, SqliteStore};

use super::fixtures::{UserFixture, test_codec_config};

// =============================================================================
// TestApp
// =============================================================================

/// An application instance backed by an in-memory store.
pub struct TestApp<S = SqliteStore> {
    /// Shared application state.
    pub state: AppState<S>,
    /// The backing store, for direct inspection.
    pub store: Arc<S>,
    router: Router,
}

impl TestApp<SqliteStore> {
    /// Creates an app with a fresh in-memory SQLite store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(
            SqliteStore::open_in_memory().expect("in-memory store opens"),
        ))
    }

    /// Creates an app with custom codec settings.
    pub fn with_codec(config: CodecConfig) -> Self {
        Self::build(
            Arc::new(SqliteStore::open_in_memory().expect("in-memory store opens")),
            config,
        )
    }
}

impl Default for TestApp<SqliteStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AuthStore> TestApp<S> {
    /// Creates an app over the given store with default codec settings.
    pub fn with_store(store: Arc<S>) -> Self {
        Self::build(store, test_codec_config())
    }

    /// Creates an app over the given store and codec settings.
    pub fn build(store: Arc<S>, codec: CodecConfig) -> Self {
        let codec = TokenCodec::new(codec).expect("codec config is valid");
        let hasher = CredentialHasher::low_cost().expect("low-cost hasher builds");

        let state = AppState::builder()
            .store(store.clone())
            .codec(codec)
            .hasher(Arc::new(hasher))
            .build()
            .expect("state builds");
        let router = ApiServer::new(state.clone()).router();

        Self {
            state,
            store,
            router,
        }
    }

    /// Returns the session service.
    pub fn sessions(&self) -> &SessionService<S> {
        self.state.sessions()
    }

    /// Sends a raw request.
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse { status, body }
    }

    /// POSTs a JSON body.
    pub async fn post_json(&self, path: &str, body: Value) -> TestResponse {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds");
        self.request(request).await
    }

    /// POSTs with no body and an optional bearer token.
    pub async fn post(&self, path: &str, bearer: Option<&str>) -> TestResponse {
        self.request(with_bearer(Request::post(path), bearer)).await
    }

    /// GETs with an optional bearer token.
    pub async fn get(&self, path: &str, bearer: Option<&str>) -> TestResponse {
        self.request(with_bearer(Request::get(path), bearer)).await
    }

    /// Registers `user` and returns the issued tokens. Panics on failure.
    pub async fn register(&self, user: UserFixture) -> TokenResponse {
        let response = self
            .post_json(
                "/auth/register",
                serde_json::json!({
                    "name": user.name,
                    "email": user.email,
                    "password": user.password,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "register: {:?}", response.body);
        response.tokens()
    }

    /// Logs `user` in.
    pub async fn login(&self, user: UserFixture) -> TestResponse {
        self.post_json(
            "/auth/login",
            serde_json::json!({ "email": user.email, "password": user.password }),
        )
        .await
    }
}

fn with_bearer(builder: axum::http::request::Builder, bearer: Option<&str>) -> Request<Body> {
    let builder = match bearer {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    };
    builder.body(Body::empty()).expect("request builds")
}

// =============================================================================
// TestResponse
// =============================================================================

/// Status and decoded body of a response.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// JSON body, `Null` when empty.
    pub body: Value,
}

impl TestResponse {
    /// The `error.code` field of an error body.
    pub fn error_code(&self) -> Option<&str> {
        self.body["error"]["code"].as_str()
    }

    /// The `error.message` field of an error body.
    pub fn error_message(&self) -> Option<&str> {
        self.body["error"]["message"].as_str()
    }

    /// Decodes a token response body. Panics if the body is not one.
    pub fn tokens(&self) -> TokenResponse {
        serde_json::from_value(self.body.clone()).expect("body is a token response")
    }
}
