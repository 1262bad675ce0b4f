// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-request authentication.
//!
//! [`RequestAuthenticator::evaluate`] decides whether a request becomes
//! authenticated. It never fails: every problem with the presented token
//! leaves the request anonymous and is reported through [`Verdict`], so the
//! protected handler (not the authenticator) decides what to return.

use std::fmt;
use std::sync::Arc;

use tollgate_core::{AuthStore, TokenKind};

use super::{AuthContext, TokenCodec};

const BEARER_PREFIX: &str = "Bearer ";

/// Extracts the token from an `Authorization` header value.
///
/// Returns `None` unless the value starts with `Bearer ` and carries a
/// non-empty token.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Verdict
// =============================================================================

/// Why a request stayed anonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousReason {
    /// No `Authorization: Bearer` header.
    MissingHeader,
    /// Signature or structure check failed.
    MalformedToken,
    /// The token was never issued by this service.
    UnknownToken,
    /// The registry marks the token revoked or expired.
    Revoked,
    /// A refresh token was presented.
    NotAccessToken,
    /// The subject has no account.
    UnknownUser,
    /// The token expired or belongs to someone else.
    InvalidForUser,
    /// The store could not be queried.
    StoreUnavailable,
}

impl AnonymousReason {
    /// Returns a short label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::MalformedToken => "malformed_token",
            Self::UnknownToken => "unknown_token",
            Self::Revoked => "revoked",
            Self::NotAccessToken => "not_access_token",
            Self::UnknownUser => "unknown_user",
            Self::InvalidForUser => "invalid_for_user",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for AnonymousReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The path is under the public prefix; nothing was checked.
    Public,
    /// The request already carries a context; it is left untouched.
    Unchanged,
    /// The request proceeds without a context.
    Anonymous(AnonymousReason),
    /// The request proceeds with this context attached.
    Authenticated(AuthContext),
}

impl Verdict {
    /// Returns the context if the request was authenticated.
    pub fn into_context(self) -> Option<AuthContext> {
        match self {
            Self::Authenticated(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Returns `true` for [`Verdict::Authenticated`].
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

// =============================================================================
// RequestAuthenticator
// =============================================================================

/// Turns a bearer access token into an [`AuthContext`].
pub struct RequestAuthenticator<S> {
    store: Arc<S>,
    codec: TokenCodec,
    public_prefix: String,
}

impl<S> Clone for RequestAuthenticator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            codec: self.codec.clone(),
            public_prefix: self.public_prefix.clone(),
        }
    }
}

impl<S: AuthStore> RequestAuthenticator<S> {
    /// Creates an authenticator. Paths under `public_prefix` bypass all checks.
    pub fn new(store: Arc<S>, codec: TokenCodec, public_prefix: impl Into<String>) -> Self {
        let prefix = public_prefix.into();
        Self {
            store,
            codec,
            public_prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the public prefix.
    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Returns `true` if `path` is exactly the prefix or lies beneath it.
    pub fn is_public(&self, path: &str) -> bool {
        if self.public_prefix.is_empty() {
            return false;
        }
        match path.strip_prefix(self.public_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Evaluates one request. Performs blocking store reads.
    pub fn evaluate(
        &self,
        path: &str,
        authorization: Option<&str>,
        already_authenticated: bool,
    ) -> Verdict {
        let verdict = self.decide(path, authorization, already_authenticated);
        match &verdict {
            Verdict::Anonymous(reason) => {
                tracing::debug!(path, reason = %reason, "Request left anonymous");
            }
            Verdict::Authenticated(ctx) => {
                tracing::debug!(path, user_id = %ctx.user_id, "Request authenticated");
            }
            Verdict::Public | Verdict::Unchanged => {}
        }
        verdict
    }

    fn decide(&self, path: &str, authorization: Option<&str>, already: bool) -> Verdict {
        if self.is_public(path) {
            return Verdict::Public;
        }

        let Some(token) = bearer_token(authorization) else {
            return Verdict::Anonymous(AnonymousReason::MissingHeader);
        };

        let Ok(subject) = self.codec.extract_subject(token) else {
            return Verdict::Anonymous(AnonymousReason::MalformedToken);
        };

        if already {
            return Verdict::Unchanged;
        }

        let record = match self.store.find_by_value(token) {
            Ok(Some(record)) => record,
            Ok(None) => return Verdict::Anonymous(AnonymousReason::UnknownToken),
            Err(e) => {
                tracing::warn!(error = %e, "Token registry lookup failed");
                return Verdict::Anonymous(AnonymousReason::StoreUnavailable);
            }
        };

        if !record.is_usable() {
            return Verdict::Anonymous(AnonymousReason::Revoked);
        }
        if record.kind != TokenKind::Access {
            return Verdict::Anonymous(AnonymousReason::NotAccessToken);
        }

        let user = match self.store.find_user_by_email(&subject) {
            Ok(Some(user)) => user,
            Ok(None) => return Verdict::Anonymous(AnonymousReason::UnknownUser),
            Err(e) => {
                tracing::warn!(error = %e, "User lookup failed");
                return Verdict::Anonymous(AnonymousReason::StoreUnavailable);
            }
        };

        if record.owner != user.id || !self.codec.is_valid_for(token, &user) {
            return Verdict::Anonymous(AnonymousReason::InvalidForUser);
        }

        Verdict::Authenticated(AuthContext::from_user(&user))
    }
}

impl<S> fmt::Debug for RequestAuthenticator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestAuthenticator")
            .field("public_prefix", &self.public_prefix)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
