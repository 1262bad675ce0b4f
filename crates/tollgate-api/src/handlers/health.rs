// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Health check handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tollgate_core::AuthStore;

use super::blocking;
use crate::response::{HealthResponse, ReadyResponse};
use crate::state::AppState;

/// GET /health
///
/// Simple liveness check. Returns 200 OK while the process serves requests.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

/// GET /ready
///
/// Readiness check. Answers 503 when the store cannot be reached.
pub async fn ready<S: AuthStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let store = state.store.clone();
    let result = blocking(move || Ok(store.ping()?)).await;

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ready".to_string(),
                store: "ok".to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "unavailable".to_string(),
                    store: "unreachable".to_string(),
                }),
            )
        }
    }
}
