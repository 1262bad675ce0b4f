// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Signed token creation and parsing.
//!
//! The codec performs no I/O. Signature and structure are checked when a
//! token is decoded; expiry is a separate question answered by
//! [`TokenCodec::is_expired`], so a decoded token may already be expired.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tollgate_core::{AuthError, AuthResult, User};

use super::Claims;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// CodecConfig
// =============================================================================

/// Token codec configuration.
#[derive(Clone)]
pub struct CodecConfig {
    /// HMAC key material (already base64-decoded).
    secret: Vec<u8>,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: i64,
    /// HMAC algorithm.
    pub algorithm: Algorithm,
    /// Optional `iss` claim; validated on decode when set.
    pub issuer: Option<String>,
}

impl CodecConfig {
    /// Creates a configuration with HS256 and no issuer.
    pub fn new(secret: impl Into<Vec<u8>>, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_secs,
            refresh_ttl_secs,
            algorithm: Algorithm::HS256,
            issuer: None,
        }
    }

    /// Sets the algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ApiResult<()> {
        if self.secret.is_empty() {
            return Err(ApiError::internal("Token signing secret is not configured"));
        }
        if !matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ApiError::internal("Only HMAC algorithms are supported"));
        }
        if self.secret.len() < 32 {
            tracing::warn!("Token signing secret is shorter than recommended (32 bytes)");
        }
        Ok(())
    }
}

impl std::fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecConfig")
            .field("secret", &"***")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .finish()
    }
}

// =============================================================================
// TokenPair
// =============================================================================

/// An access token and the refresh token issued alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Short-lived token for request authentication.
    pub access_token: String,
    /// Long-lived token for obtaining a new pair.
    pub refresh_token: String,
}

// =============================================================================
// TokenCodec
// =============================================================================

/// Stateless token encoder and decoder.
///
/// Key material is loaded once and shared read-only; clones are cheap.
#[derive(Clone)]
pub struct TokenCodec {
    config: Arc<CodecConfig>,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl TokenCodec {
    /// Creates a codec from the given configuration.
    pub fn new(config: CodecConfig) -> ApiResult<Self> {
        config.validate()?;

        let encoding_key = EncodingKey::from_secret(&config.secret);
        let decoding_key = DecodingKey::from_secret(&config.secret);

        let mut validation = Validation::new(config.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);
        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            config: Arc::new(config),
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            validation: Arc::new(validation),
        })
    }

    /// Issues a token for `subject` expiring `ttl_secs` from now.
    pub fn issue(&self, subject: &str, name: &str, ttl_secs: i64) -> AuthResult<String> {
        let mut claims = Claims::new(subject, name, ttl_secs);
        if let Some(ref issuer) = self.config.issuer {
            claims = claims.with_issuer(issuer);
        }

        encode(&Header::new(self.config.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::signing(e.to_string()))
    }

    /// Issues an access token for a user.
    pub fn issue_access(&self, user: &User) -> AuthResult<String> {
        self.issue(&user.email, &user.name, self.config.access_ttl_secs)
    }

    /// Issues a refresh token for a user.
    pub fn issue_refresh(&self, user: &User) -> AuthResult<String> {
        self.issue(&user.email, &user.name, self.config.refresh_ttl_secs)
    }

    /// Issues an access and a refresh token for a user.
    pub fn issue_pair(&self, user: &User) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(user)?,
            refresh_token: self.issue_refresh(user)?,
        })
    }

    /// Verifies signature and structure and returns the claims.
    ///
    /// Expired tokens decode successfully.
    pub fn decode(&self, token: &str) -> AuthResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                let message = match e.kind() {
                    ErrorKind::InvalidSignature => "invalid signature".to_string(),
                    ErrorKind::InvalidToken => "invalid token format".to_string(),
                    ErrorKind::InvalidAlgorithm => "unexpected algorithm".to_string(),
                    ErrorKind::InvalidIssuer => "invalid issuer".to_string(),
                    ErrorKind::MissingRequiredClaim(claim) => format!("missing claim '{claim}'"),
                    _ => e.to_string(),
                };
                AuthError::malformed_token(message)
            })
    }

    /// Returns the subject (email) of a well-formed token.
    pub fn extract_subject(&self, token: &str) -> AuthResult<String> {
        self.decode(token).map(|claims| claims.sub)
    }

    /// Returns `true` once the token's embedded expiry has passed.
    pub fn is_expired(&self, token: &str) -> AuthResult<bool> {
        self.decode(token).map(|claims| claims.is_expired())
    }

    /// Returns `true` iff the token names `user` as subject and has not expired.
    pub fn is_valid_for(&self, token: &str, user: &User) -> bool {
        match self.decode(token) {
            Ok(claims) => claims.sub == user.email && !claims.is_expired(),
            Err(_) => false,
        }
    }

    /// Returns the access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.config.access_ttl_secs
    }

    /// Returns the refresh token lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.config.refresh_ttl_secs
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.config.algorithm)
            .field("access_ttl_secs", &self.config.access_ttl_secs)
            .field("refresh_ttl_secs", &self.config.refresh_ttl_secs)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tollgate_core::UserId;

    const SECRET: &[u8] = b"test-secret-key-that-is-at-least-32-bytes-long";

    fn codec() -> TokenCodec {
        TokenCodec::new(CodecConfig::new(SECRET, 900, 86_400)).unwrap()
    }

    fn user(email: &str) -> User {
        User {
            id: UserId::new(1),
            name: "Ann".to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        for (subject, ttl) in [("ann@x.com", 1), ("bob@y.org", 900), ("c@z.io", 86_400 * 30)] {
            let token = codec.issue(subject, "Name", ttl).unwrap();
            assert_eq!(codec.extract_subject(&token).unwrap(), subject);
            assert!(!codec.is_expired(&token).unwrap());
        }
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let codec = codec();
        let token = codec.issue("ann@x.com", "Ann", -60).unwrap();

        assert_eq!(codec.extract_subject(&token).unwrap(), "ann@x.com");
        assert!(codec.is_expired(&token).unwrap());
        assert!(!codec.is_valid_for(&token, &user("ann@x.com")));
    }

    #[test]
    fn test_is_valid_for() {
        let codec = codec();
        let ann = user("ann@x.com");
        let pair = codec.issue_pair(&ann).unwrap();

        assert!(codec.is_valid_for(&pair.access_token, &ann));
        assert!(codec.is_valid_for(&pair.refresh_token, &ann));
        assert!(!codec.is_valid_for(&pair.access_token, &user("bob@x.com")));
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn test_tampered_token_is_malformed() {
        let codec = codec();
        let token = codec.issue("ann@x.com", "Ann", 60).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');

        assert!(matches!(
            codec.extract_subject(&tampered),
            Err(AuthError::MalformedToken { .. })
        ));
        assert!(matches!(
            codec.extract_subject("not.a.token"),
            Err(AuthError::MalformedToken { .. })
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = codec().issue("ann@x.com", "Ann", 60).unwrap();
        let other = TokenCodec::new(CodecConfig::new(
            b"a-completely-different-secret-of-32-bytes".to_vec(),
            900,
            86_400,
        ))
        .unwrap();

        assert!(matches!(
            other.decode(&token),
            Err(AuthError::MalformedToken { .. })
        ));
    }

    #[test]
    fn test_issuer_is_checked() {
        let with_issuer =
            TokenCodec::new(CodecConfig::new(SECRET, 900, 86_400).with_issuer("tollgate")).unwrap();
        let token = with_issuer.issue("ann@x.com", "Ann", 60).unwrap();
        assert_eq!(with_issuer.decode(&token).unwrap().iss.as_deref(), Some("tollgate"));

        let foreign = codec().issue("ann@x.com", "Ann", 60).unwrap();
        assert!(with_issuer.decode(&foreign).is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(TokenCodec::new(CodecConfig::new(Vec::new(), 900, 86_400)).is_err());
    }

    #[test]
    fn test_non_hmac_algorithm_rejected() {
        let config = CodecConfig::new(SECRET, 900, 86_400).with_algorithm(Algorithm::RS256);
        assert!(TokenCodec::new(config).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = CodecConfig::new(SECRET, 900, 86_400);
        assert!(!format!("{config:?}").contains("test-secret"));
    }
}
