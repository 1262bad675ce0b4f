// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Assertions

use axum::http::StatusCode;

use super::harness::TestResponse;

/// Asserts status and `error.code` of an error response.
#[track_caller]
pub fn assert_error(response: &TestResponse, status: StatusCode, code: &str) {
    assert_eq!(response.status, status, "body: {:?}", response.body);
    assert_eq!(
        response.error_code(),
        Some(code),
        "body: {:?}",
        response.body
    );
}

/// Asserts a 401 with the `UNAUTHORIZED` code.
#[track_caller]
pub fn assert_unauthorized(response: &TestResponse) {
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
}

/// Asserts a token response with non-empty, distinct tokens.
#[track_caller]
pub fn assert_token_pair(response: &TestResponse) {
    assert_eq!(response.status, StatusCode::OK, "body: {:?}", response.body);
    let tokens = response.tokens();
    assert!(!tokens.access_token.is_empty());
    assert!(!tokens.refresh_token.is_empty());
    assert_ne!(tokens.access_token, tokens.refresh_token);
    assert_eq!(tokens.token_type, "Bearer");
}
