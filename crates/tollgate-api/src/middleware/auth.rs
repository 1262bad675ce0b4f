// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request authentication middleware.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{Request, header},
    response::Response,
};
use tollgate_core::AuthStore;
use tower::{Layer, Service};
use uuid::Uuid;

use crate::auth::{AnonymousReason, AuthContext, RequestAuthenticator, Verdict};
use crate::extractors::client_ip;

// =============================================================================
// AuthLayer
// =============================================================================

/// Layer that runs the [`RequestAuthenticator`] on every request.
///
/// The layer never rejects. It attaches an [`AuthContext`] to the request
/// extensions when a usable access token is presented; handlers that need
/// an identity use the `Auth` extractor.
pub struct AuthLayer<S> {
    authenticator: RequestAuthenticator<S>,
}

impl<S> Clone for AuthLayer<S> {
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
        }
    }
}

impl<S: AuthStore> AuthLayer<S> {
    /// Creates a new auth layer.
    pub fn new(authenticator: RequestAuthenticator<S>) -> Self {
        Self { authenticator }
    }
}

impl<S, T> Layer<T> for AuthLayer<S> {
    type Service = AuthMiddleware<S, T>;

    fn layer(&self, inner: T) -> Self::Service {
        AuthMiddleware {
            inner,
            authenticator: self.authenticator.clone(),
        }
    }
}

// =============================================================================
// AuthMiddleware
// =============================================================================

/// Middleware produced by [`AuthLayer`].
pub struct AuthMiddleware<S, T> {
    inner: T,
    authenticator: RequestAuthenticator<S>,
}

impl<S, T: Clone> Clone for AuthMiddleware<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            authenticator: self.authenticator.clone(),
        }
    }
}

impl<S, T> Service<Request<Body>> for AuthMiddleware<S, T>
where
    S: AuthStore,
    T: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    T::Future: Send + 'static,
{
    type Response = T::Response;
    type Error = T::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let authenticator = self.authenticator.clone();
        // Take the service that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let path = req.uri().path().to_string();
            let authorization = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let already = req.extensions().get::<AuthContext>().is_some();

            let verdict = tokio::task::spawn_blocking(move || {
                authenticator.evaluate(&path, authorization.as_deref(), already)
            })
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Authentication task failed");
                Verdict::Anonymous(AnonymousReason::StoreUnavailable)
            });

            if let Verdict::Authenticated(ctx) = verdict {
                let mut ctx = ctx.with_request_id(Uuid::now_v7());
                if let Some(ip) = client_ip(req.headers(), req.extensions()) {
                    ctx = ctx.with_client_ip(ip);
                }
                req.extensions_mut().insert(ctx);
            }

            inner.call(req).await
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::{CodecConfig, TokenCodec};
    use tollgate_core::{CredentialStore, NewUser, SqliteStore, TokenKind, TokenRegistry};
    use tower::ServiceExt;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_attaches_context_for_registered_token() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let codec = TokenCodec::new(CodecConfig::new(
            b"0123456789abcdef0123456789abcdef".to_vec(),
            900,
            86_400,
        ))
        .unwrap();
        let user = store
            .create_user(NewUser::new("Ann", "ann@x.com", "hash"))
            .unwrap();
        let token = codec.issue_access(&user).unwrap();
        store.record(&token, TokenKind::Access, user.id).unwrap();

        let layer = AuthLayer::new(RequestAuthenticator::new(store, codec, "/auth"));
        let service = layer.layer(tower::service_fn(|req: Request<Body>| async move {
            let who = req
                .extensions()
                .get::<AuthContext>()
                .map(|ctx| ctx.email.clone())
                .unwrap_or_else(|| "anonymous".to_string());
            Ok::<_, std::convert::Infallible>(Response::new(Body::from(who)))
        }));

        let req = Request::builder()
            .uri("/users")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = service.clone().oneshot(req).await.unwrap();
        assert_eq!(body_text(response).await, "ann@x.com");

        let req = Request::builder().uri("/users").body(Body::empty()).unwrap();
        let response = service.oneshot(req).await.unwrap();
        assert_eq!(body_text(response).await, "anonymous");
    }

    #[tokio::test]
    async fn test_context_carries_forwarded_client_ip() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let codec = TokenCodec::new(CodecConfig::new(
            b"0123456789abcdef0123456789abcdef".to_vec(),
            900,
            86_400,
        ))
        .unwrap();
        let user = store
            .create_user(NewUser::new("Ann", "ann@x.com", "hash"))
            .unwrap();
        let token = codec.issue_access(&user).unwrap();
        store.record(&token, TokenKind::Access, user.id).unwrap();

        let layer = AuthLayer::new(RequestAuthenticator::new(store, codec, "/auth"));
        let service = layer.layer(tower::service_fn(|req: Request<Body>| async move {
            let ip = req
                .extensions()
                .get::<AuthContext>()
                .and_then(|ctx| ctx.client_ip)
                .map(|ip| ip.to_string())
                .unwrap_or_default();
            Ok::<_, std::convert::Infallible>(Response::new(Body::from(ip)))
        }));

        let req = Request::builder()
            .uri("/users/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header("X-Forwarded-For", "203.0.113.5")
            .body(Body::empty())
            .unwrap();
        let response = service.oneshot(req).await.unwrap();
        assert_eq!(body_text(response).await, "203.0.113.5");
    }
}
