// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures

use tollgate_api::{CodecConfig, TokenCodec};

/// Base64 form of a 32-byte key, as it would appear in configuration.
pub const TEST_SECRET_B64: &str = "KioqKioqKioqKioqKioqKioqKioqKioqKioqKioqKio=";

/// Access token lifetime used by default in tests.
pub const TEST_ACCESS_TTL: i64 = 900;

/// Refresh token lifetime used by default in tests.
pub const TEST_REFRESH_TTL: i64 = 86_400;

/// Raw signing key matching [`TEST_SECRET_B64`].
pub fn test_secret() -> Vec<u8> {
    vec![b'*'; 32]
}

/// Codec settings with the default test lifetimes.
pub fn test_codec_config() -> CodecConfig {
    codec_config_with_ttls(TEST_ACCESS_TTL, TEST_REFRESH_TTL)
}

/// Codec settings with custom lifetimes. Negative values issue tokens that
/// are already expired.
pub fn codec_config_with_ttls(access: i64, refresh: i64) -> CodecConfig {
    CodecConfig::new(test_secret(), access, refresh)
}

/// A codec using [`test_codec_config`].
pub fn test_codec() -> TokenCodec {
    TokenCodec::new(test_codec_config()).expect("test codec config is valid")
}

/// A user to register in tests.
#[derive(Debug, Clone, Copy)]
pub struct UserFixture {
    /// Display name.
    pub name: &'static str,
    /// Email.
    pub email: &'static str,
    /// Plaintext password.
    pub password: &'static str,
}

/// Sample users.
pub struct UserFixtures;

impl UserFixtures {
    /// The user from the registration walkthrough.
    pub fn ann() -> UserFixture {
        UserFixture {
            name: "Ann",
            email: "ann@x.com",
            password: "pw1",
        }
    }

    /// A second, unrelated user.
    pub fn bob() -> UserFixture {
        UserFixture {
            name: "Bob",
            email: "bob@x.com",
            password: "hunter2",
        }
    }
}
