//! Edge cases across tombstones, audit feeds, tokens, and rate limiting

use cachet_core::audit::{create_audit_event_at, unwrap_audit_event, AuditAction};
use cachet_core::token::{create_access_token_at, validate_access_token_at, Tier};
use cachet_core::tombstone::{create_deletion_request_at, create_tombstone_at};
use cachet_core::wrap::wrap_at;
use cachet_core::{
    resolve_address, unwrap_feed, Address, CachetError, Keypair, MemoryCounterStore,
    RateLimitConfig, RateLimiter, SecretBundle, KIND_DELETION,
};

fn bundle(pairs: &[(&str, &str)]) -> SecretBundle {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_tombstone_then_resurrection() {
    let keys = Keypair::generate();
    let address = Address::new("proj", "prod").unwrap();

    let (write1, _) =
        wrap_at(&bundle(&[("K", "v1")]), &keys, &address, 1_000).expect("Should wrap");
    let (tomb, _) = create_tombstone_at(&keys, &address, 2_000).expect("Should wrap");
    let (write2, _) =
        wrap_at(&bundle(&[("K", "v2")]), &keys, &address, 3_000).expect("Should wrap");

    // After the tombstone: address reads as deleted, not absent
    let feed = vec![write1.clone(), tomb.clone()];
    let current = resolve_address(unwrap_feed(feed.iter(), &keys), &address)
        .expect("Address was written");
    assert!(current.is_tombstone());

    // After the later write: address is live again
    let feed = vec![write1, tomb, write2];
    let current = resolve_address(unwrap_feed(feed.iter(), &keys), &address)
        .expect("Address was written");
    assert!(!current.is_tombstone());
    assert_eq!(current.secrets["K"], "v2");
}

#[test]
fn test_deleted_is_distinct_from_never_created() {
    let keys = Keypair::generate();
    let written = Address::new("proj", "prod").unwrap();
    let never = Address::new("proj", "staging").unwrap();

    let (tomb, _) = create_tombstone_at(&keys, &written, 1_000).expect("Should wrap");
    let feed = vec![tomb];

    let deleted = resolve_address(unwrap_feed(feed.iter(), &keys), &written);
    let untouched = resolve_address(unwrap_feed(feed.iter(), &keys), &never);

    assert!(deleted.expect("tombstoned address resolves").is_tombstone());
    assert!(untouched.is_none());
}

#[test]
fn test_mixed_feed_of_secret_audit_and_deletion_records() {
    let keys = Keypair::generate();
    let address = Address::new("proj", "prod").unwrap();

    let (secret_env, _) =
        wrap_at(&bundle(&[("K", "v")]), &keys, &address, 1_000).expect("Should wrap");
    let (audit_env, _) =
        create_audit_event_at(&keys, AuditAction::SecretCreate, "proj|prod", None, 1_000)
            .expect("Should create");
    let deletion =
        create_deletion_request_at(&keys, &["some-id".to_string()], None, 1_000)
            .expect("Should build");

    let feed = vec![secret_env.clone(), audit_env.clone(), deletion.clone()];

    // The secrets path sees exactly the secret envelope
    let secrets: Vec<_> = unwrap_feed(feed.iter(), &keys).collect();
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets[0].secrets["K"], "v");

    // The audit path sees exactly the audit envelope
    let audits: Vec<_> = feed
        .iter()
        .filter_map(|e| unwrap_audit_event(e, &keys))
        .collect();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, AuditAction::SecretCreate);

    // The deletion request stays public and readable as-is
    assert_eq!(deletion.kind, KIND_DELETION);
    assert!(deletion.verify());
}

#[test]
fn test_token_lifecycle_failure_modes_are_distinct() {
    let operator = Keypair::generate();
    let impostor = Keypair::generate();
    let subject = Keypair::generate();
    let now = 1_700_000_000;

    let (good, token) =
        create_access_token_at(&subject.public_key(), &operator, Tier::Pro, "inv_1", now)
            .expect("Should issue");

    // Valid
    let validated =
        validate_access_token_at(&good, &operator.public_key(), &subject, now + 10)
            .expect("Should validate");
    assert_eq!(validated.tier, Tier::Pro);

    // Expired: well-formed, correct issuer, too late
    let expired = validate_access_token_at(
        &good,
        &operator.public_key(),
        &subject,
        token.expires_at + 1,
    );
    assert!(matches!(expired, Err(CachetError::TokenExpired { .. })));

    // Wrong issuer: decrypts cleanly, authority check fails
    let (forged, _) =
        create_access_token_at(&subject.public_key(), &impostor, Tier::Pro, "inv_2", now)
            .expect("Should issue");
    let wrong_issuer =
        validate_access_token_at(&forged, &operator.public_key(), &subject, now + 10);
    assert!(matches!(wrong_issuer, Err(CachetError::WrongIssuer(_))));

    // Undecryptable: not addressed to this holder
    let outsider = Keypair::generate();
    let not_mine =
        validate_access_token_at(&good, &operator.public_key(), &outsider, now + 10);
    assert!(matches!(not_mine, Err(CachetError::DecryptionFailed(_))));
}

#[test]
fn test_rate_limit_exhaustion_and_window_reset() {
    let limiter = RateLimiter::new(MemoryCounterStore::new());
    let config = RateLimitConfig {
        max_requests: 5,
        window_secs: 60,
    };
    let now = 1_700_000_040;

    // N allowed, the (N+1)th blocked
    for _ in 0..5 {
        assert!(limiter.check_at("npub-alice", &config, now).allowed);
    }
    let blocked = limiter.check_at("npub-alice", &config, now);
    assert!(!blocked.allowed);

    // The next window starts fresh
    let decision = limiter.check_at("npub-alice", &config, blocked.reset_at);
    assert!(decision.allowed);
    assert_eq!(decision.current, 1);
}

#[test]
fn test_bundle_values_may_be_structured_text() {
    let keys = Keypair::generate();
    let address = Address::new("proj", "prod").unwrap();

    let nested = r#"{"user":"svc","password":"p@ss|word","hosts":["a","b"]}"#;
    let secrets = bundle(&[("DB_CONFIG", nested), ("EMPTY", "")]);

    let (envelope, _) = wrap_at(&secrets, &keys, &address, 1_000).expect("Should wrap");
    let recovered = cachet_core::unwrap(&envelope, &keys).expect("Should unwrap");

    assert_eq!(recovered["DB_CONFIG"], nested);
    assert_eq!(recovered["EMPTY"], "");
}
