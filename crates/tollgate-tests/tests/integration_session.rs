// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Session Integration Tests
//!
//! Session orchestration and request authentication against an
//! instrumented store:
//!
//! - `test_concurrent_*`: racing logins and refreshes for one user
//! - `test_authenticator_*`: verdicts and store lookups per request

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tollgate_api::{
    AnonymousReason, CodecConfig, RequestAuthenticator, SessionService, TokenCodec, TokenPair,
    Verdict,
};
use tollgate_core::{CredentialHasher, CredentialStore, TokenKind};
use tollgate_tests::prelude::*;

// =============================================================================
// Test Helpers
// =============================================================================

struct Fixture {
    store: Arc<InstrumentedStore>,
    sessions: SessionService<InstrumentedStore>,
    authenticator: RequestAuthenticator<InstrumentedStore>,
}

fn fixture_with(store: InstrumentedStore, codec: CodecConfig) -> Fixture {
    let store = Arc::new(store);
    let codec = TokenCodec::new(codec).unwrap();
    let hasher = Arc::new(CredentialHasher::low_cost().unwrap());

    Fixture {
        sessions: SessionService::new(store.clone(), codec.clone(), hasher),
        authenticator: RequestAuthenticator::new(store.clone(), codec, "/auth"),
        store,
    }
}

fn fixture() -> Fixture {
    fixture_with(InstrumentedStore::new(), test_codec_config())
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn register(fixture: &Fixture, user: UserFixture) -> TokenPair {
    fixture
        .sessions
        .register(user.name, user.email, user.password)
        .unwrap()
}

fn verdict(fixture: &Fixture, path: &str, token: &str) -> Verdict {
    fixture
        .authenticator
        .evaluate(path, Some(bearer(token).as_str()), false)
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_logins_leave_one_usable_session() {
    let fixture = fixture_with(
        InstrumentedStore::new().with_invalidate_delay(Duration::from_millis(50)),
        test_codec_config(),
    );
    let ann = UserFixtures::ann();
    register(&fixture, ann);

    let barrier = Barrier::new(2);
    let pairs: Vec<TokenPair> = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    fixture.sessions.authenticate(ann.email, ann.password)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    let user = fixture.store.find_user_by_email(ann.email).unwrap().unwrap();
    let access = fixture.store.usable_tokens(user.id, TokenKind::Access);
    let refresh = fixture.store.usable_tokens(user.id, TokenKind::Refresh);
    assert_eq!(access.len(), 1);
    assert_eq!(refresh.len(), 1);

    // The surviving tokens come from the same pair.
    let winner = pairs
        .iter()
        .find(|p| p.access_token == access[0].value)
        .expect("usable token was issued by one of the logins");
    assert_eq!(winner.refresh_token, refresh[0].value);

    let authenticated = pairs
        .iter()
        .filter(|p| verdict(&fixture, "/users", &p.access_token).is_authenticated())
        .count();
    assert_eq!(authenticated, 1);
    assert_eq!(fixture.sessions.active_locks(), 0);
}

#[test]
fn test_concurrent_refresh_with_one_token_has_one_winner() {
    let fixture = fixture_with(
        InstrumentedStore::new().with_invalidate_delay(Duration::from_millis(50)),
        test_codec_config(),
    );
    let ann = UserFixtures::ann();
    let pair = register(&fixture, ann);
    let header = bearer(&pair.refresh_token);

    let barrier = Barrier::new(2);
    let outcomes: Vec<bool> = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    fixture.sessions.refresh(Some(header.as_str())).is_ok()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);

    let user = fixture.store.find_user_by_email(ann.email).unwrap().unwrap();
    assert_eq!(fixture.store.usable_tokens(user.id, TokenKind::Access).len(), 1);
    assert_eq!(fixture.sessions.active_locks(), 0);
}

#[test]
fn test_concurrent_logins_for_different_users_do_not_interfere() {
    let fixture = fixture();
    let ann = UserFixtures::ann();
    let bob = UserFixtures::bob();
    register(&fixture, ann);
    register(&fixture, bob);

    let barrier = Barrier::new(2);
    let (ann_pair, bob_pair) = thread::scope(|s| {
        let a = s.spawn(|| {
            barrier.wait();
            fixture.sessions.authenticate(ann.email, ann.password).unwrap()
        });
        let b = s.spawn(|| {
            barrier.wait();
            fixture.sessions.authenticate(bob.email, bob.password).unwrap()
        });
        (a.join().unwrap(), b.join().unwrap())
    });

    assert!(verdict(&fixture, "/users", &ann_pair.access_token).is_authenticated());
    assert!(verdict(&fixture, "/users", &bob_pair.access_token).is_authenticated());
}

// =============================================================================
// Request Authenticator
// =============================================================================

#[test]
fn test_authenticator_valid_token_needs_one_registry_lookup() {
    let fixture = fixture();
    let pair = register(&fixture, UserFixtures::ann());
    fixture.store.reset_counters();

    match verdict(&fixture, "/users/me", &pair.access_token) {
        Verdict::Authenticated(ctx) => {
            assert_eq!(ctx.email, "ann@x.com");
            assert_eq!(ctx.name, "Ann");
        }
        other => panic!("expected authenticated, got {other:?}"),
    }
    assert_eq!(fixture.store.token_lookups(), 1);
}

#[test]
fn test_authenticator_already_authenticated_passes_through() {
    let fixture = fixture();
    let pair = register(&fixture, UserFixtures::ann());
    fixture.store.reset_counters();

    let header = bearer(&pair.access_token);
    let verdict = fixture
        .authenticator
        .evaluate("/users", Some(header.as_str()), true);

    assert_eq!(verdict, Verdict::Unchanged);
    assert_eq!(fixture.store.token_lookups(), 0);
    assert_eq!(fixture.store.user_lookups(), 0);
}

#[test]
fn test_authenticator_public_prefix_skips_everything() {
    let fixture = fixture();
    let pair = register(&fixture, UserFixtures::ann());
    fixture.store.reset_counters();

    for path in ["/auth", "/auth/login", "/auth/refresh-token"] {
        assert_eq!(verdict(&fixture, path, &pair.access_token), Verdict::Public);
    }
    assert_eq!(fixture.store.token_lookups(), 0);

    // Prefix matching stops at segment boundaries.
    assert!(verdict(&fixture, "/authority", &pair.access_token).is_authenticated());
    assert_eq!(fixture.store.token_lookups(), 1);
}

#[test]
fn test_authenticator_anonymous_reasons() {
    let fixture = fixture();
    let pair = register(&fixture, UserFixtures::ann());

    assert_eq!(
        fixture.authenticator.evaluate("/users", None, false),
        Verdict::Anonymous(AnonymousReason::MissingHeader)
    );
    assert_eq!(
        fixture
            .authenticator
            .evaluate("/users", Some("Basic abc"), false),
        Verdict::Anonymous(AnonymousReason::MissingHeader)
    );
    assert_eq!(
        verdict(&fixture, "/users", "garbage"),
        Verdict::Anonymous(AnonymousReason::MalformedToken)
    );
    assert_eq!(
        verdict(&fixture, "/users", &pair.refresh_token),
        Verdict::Anonymous(AnonymousReason::NotAccessToken)
    );

    let foreign = TokenCodec::new(CodecConfig::new(vec![b'#'; 32], 900, 900))
        .unwrap()
        .issue("ann@x.com", "Ann", 900)
        .unwrap();
    assert_eq!(
        verdict(&fixture, "/users", &foreign),
        Verdict::Anonymous(AnonymousReason::MalformedToken)
    );

    let unrecorded = TokenCodec::new(test_codec_config())
        .unwrap()
        .issue("ann@x.com", "Ann", 900)
        .unwrap();
    assert_eq!(
        verdict(&fixture, "/users", &unrecorded),
        Verdict::Anonymous(AnonymousReason::UnknownToken)
    );
}

#[test]
fn test_authenticator_rejects_revoked_token_before_expiry() {
    let fixture = fixture();
    let pair = register(&fixture, UserFixtures::ann());

    let mut context = None;
    assert!(
        fixture
            .sessions
            .logout(Some(bearer(&pair.access_token).as_str()), &mut context)
            .unwrap()
    );

    assert_eq!(
        verdict(&fixture, "/users", &pair.access_token),
        Verdict::Anonymous(AnonymousReason::Revoked)
    );
}

#[test]
fn test_authenticator_rejects_expired_but_registered_token() {
    let fixture = fixture_with(
        InstrumentedStore::new(),
        codec_config_with_ttls(-60, TEST_REFRESH_TTL),
    );
    let pair = register(&fixture, UserFixtures::ann());

    assert_eq!(
        verdict(&fixture, "/users", &pair.access_token),
        Verdict::Anonymous(AnonymousReason::InvalidForUser)
    );
}

#[test]
fn test_authenticator_single_active_session() {
    let fixture = fixture();
    let ann = UserFixtures::ann();
    let first = register(&fixture, ann);
    let second = fixture.sessions.authenticate(ann.email, ann.password).unwrap();

    assert_eq!(
        verdict(&fixture, "/users", &first.access_token),
        Verdict::Anonymous(AnonymousReason::Revoked)
    );
    assert!(verdict(&fixture, "/users", &second.access_token).is_authenticated());
}
