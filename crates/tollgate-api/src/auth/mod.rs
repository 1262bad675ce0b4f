// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication module.
//!
//! This module provides:
//! - Token issuance and parsing ([`TokenCodec`])
//! - Session lifecycle with server-side revocation ([`SessionService`])
//! - Per-request authentication ([`RequestAuthenticator`])
//! - The authenticated identity ([`AuthContext`])

mod authenticator;
mod claims;
mod codec;
mod context;
mod session;

pub use authenticator::{AnonymousReason, RequestAuthenticator, Verdict, bearer_token};
pub use claims::Claims;
pub use codec::{CodecConfig, TokenCodec, TokenPair};
pub use context::AuthContext;
pub use session::SessionService;
