//! License gate behaviour across restarts, using the on-disk store

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use novel_wizard::auth::{AuthError, AuthGate, GateState, AUTH_ACTIVATED_KEY, AUTH_CODE_KEY};
use novel_wizard::storage::{FileStore, KeyValueStore};
use tempfile::TempDir;

const CODE: &str = "AUTH0011-2025";

/// 2025-03-01: the following year has no Feb 29, so one year is 365 days
fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
}

fn reopen(dir: &TempDir) -> AuthGate {
    AuthGate::new(Arc::new(FileStore::open_in(dir.path()).unwrap()))
}

#[test]
fn test_activation_survives_restart() {
    let dir = TempDir::new().unwrap();
    let verified = reopen(&dir).verify(CODE, t0()).unwrap();
    assert!(verified.newly_activated);

    let mut gate = reopen(&dir);
    assert!(!gate.is_unlocked());
    let later = t0() + Duration::days(364);
    match gate.check_status(later) {
        GateState::Unlocked(authorization) => {
            assert_eq!(authorization.activated_at, t0());
            assert_eq!(authorization.remaining_days(later), 1);
        }
        GateState::Locked => panic!("expected the gate to be unlocked"),
    }
}

#[test]
fn test_expired_activation_is_purged_on_restart() {
    let dir = TempDir::new().unwrap();
    reopen(&dir).verify(CODE, t0()).unwrap();

    let mut gate = reopen(&dir);
    assert_eq!(gate.check_status(t0() + Duration::days(366)), &GateState::Locked);

    let store = FileStore::open_in(dir.path()).unwrap();
    assert_eq!(store.get(AUTH_CODE_KEY).unwrap(), None);
    assert_eq!(store.get(AUTH_ACTIVATED_KEY).unwrap(), None);
}

#[test]
fn test_reverify_keeps_original_window() {
    let dir = TempDir::new().unwrap();
    reopen(&dir).verify(CODE, t0()).unwrap();

    let verified = reopen(&dir)
        .verify(CODE, t0() + Duration::days(200))
        .unwrap();
    assert!(!verified.newly_activated);
    assert_eq!(verified.authorization.activated_at, t0());
}

#[test]
fn test_expired_code_reported_then_renewable() {
    let dir = TempDir::new().unwrap();
    reopen(&dir).verify(CODE, t0()).unwrap();

    let late = t0() + Duration::days(400);
    let mut gate = reopen(&dir);
    let err = gate.verify(CODE, late).unwrap_err();
    assert!(matches!(err, AuthError::ExpiredCode { .. }));
    assert_eq!(err.to_string(), "license code expired on 2026-03-01");
    assert!(!gate.is_unlocked());

    let renewed = gate.verify(CODE, late).unwrap();
    assert!(renewed.newly_activated);
    assert_eq!(renewed.authorization.activated_at, late);
}

#[test]
fn test_wrong_and_blank_codes() {
    let dir = TempDir::new().unwrap();
    let mut gate = reopen(&dir);

    assert!(matches!(gate.verify("", t0()), Err(AuthError::MissingCode)));
    assert!(matches!(
        gate.verify("AUTH0000-0000", t0()),
        Err(AuthError::InvalidCode)
    ));
    assert!(!gate.is_unlocked());
}
