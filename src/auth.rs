//! License-code gate with a one-year activation window.
//!
//! A code is activated the first time it is verified. From then on it stays
//! valid until one calendar year after that first activation; verifying it
//! again inside the window keeps the original activation date. An expired
//! activation is purged, after which a fresh verification starts a new term.

use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use thiserror::Error;

use crate::storage::{KeyValueStore, StoreError};

/// Storage key for the activated code
pub const AUTH_CODE_KEY: &str = "authCode";
/// Storage key for the activation timestamp (RFC 3339)
pub const AUTH_ACTIVATED_KEY: &str = "authActivatedAt";

/// Length of an activation window
pub const VALIDITY: Months = Months::new(12);

/// Codes the gate accepts, with the label shown once unlocked
const KNOWN_CODES: &[(&str, &str)] = &[("AUTH0011-2025", "Licensed user")];

fn label_for(code: &str) -> Option<&'static str> {
    KNOWN_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, label)| *label)
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("please enter a license code")]
    MissingCode,

    #[error("invalid license code")]
    InvalidCode,

    #[error("license code expired on {}", .expired_at.format("%Y-%m-%d"))]
    ExpiredCode { expired_at: DateTime<Utc> },
}

/// A persisted activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRecord {
    pub code: String,
    pub activated_at: DateTime<Utc>,
}

impl AuthorizationRecord {
    pub fn expires_at(&self) -> DateTime<Utc> {
        // Only fails past chrono's maximum date
        self.activated_at
            .checked_add_months(VALIDITY)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at()
    }
}

/// An unlocked gate's details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub code: String,
    pub label: &'static str,
    pub activated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Authorization {
    fn from_record(record: &AuthorizationRecord, label: &'static str) -> Self {
        Self {
            code: record.code.clone(),
            label,
            activated_at: record.activated_at,
            expires_at: record.expires_at(),
        }
    }

    /// Whole days left, rounded up
    pub fn remaining_days(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.expires_at - now).num_seconds();
        if secs <= 0 {
            0
        } else {
            (secs + 86_399) / 86_400
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked(Authorization),
}

/// Outcome of a successful [`AuthGate::verify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub authorization: Authorization,
    /// True when this call started a new activation window
    pub newly_activated: bool,
}

impl Verified {
    /// User-facing confirmation
    pub fn message(&self, now: DateTime<Utc>) -> String {
        if self.newly_activated {
            "License activated. Valid for one year.".to_string()
        } else {
            format!(
                "License valid, {} days remaining.",
                self.authorization.remaining_days(now)
            )
        }
    }
}

pub struct AuthGate {
    store: Arc<dyn KeyValueStore>,
    state: GateState,
}

impl AuthGate {
    /// Create a locked gate. Call [`AuthGate::check_status`] to pick up a
    /// stored activation.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            state: GateState::Locked,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, GateState::Unlocked(_))
    }

    /// Verify a code typed by the user
    pub fn verify(&mut self, code: &str, now: DateTime<Utc>) -> Result<Verified, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::MissingCode);
        }
        let label = label_for(code).ok_or(AuthError::InvalidCode)?;

        if let Some(record) = self.read_record().filter(|r| r.code == code) {
            if record.is_valid_at(now) {
                let authorization = Authorization::from_record(&record, label);
                self.state = GateState::Unlocked(authorization.clone());
                tracing::info!(expires_at = %authorization.expires_at, "License re-verified");
                return Ok(Verified {
                    authorization,
                    newly_activated: false,
                });
            }

            let expired_at = record.expires_at();
            self.purge();
            tracing::info!(%expired_at, "License expired");
            return Err(AuthError::ExpiredCode { expired_at });
        }

        let record = AuthorizationRecord {
            code: code.to_string(),
            activated_at: now,
        };
        if let Err(e) = self.write_record(&record) {
            tracing::warn!(error = %e, "Could not persist license activation");
        }

        let authorization = Authorization::from_record(&record, label);
        self.state = GateState::Unlocked(authorization.clone());
        tracing::info!(expires_at = %authorization.expires_at, "License activated");
        Ok(Verified {
            authorization,
            newly_activated: true,
        })
    }

    /// Rebuild the gate from storage. Anything other than a known, unexpired
    /// activation is purged and leaves the gate locked.
    pub fn check_status(&mut self, now: DateTime<Utc>) -> &GateState {
        let restored = self.read_record().and_then(|record| {
            let label = label_for(&record.code)?;
            record
                .is_valid_at(now)
                .then(|| Authorization::from_record(&record, label))
        });

        match restored {
            Some(authorization) => self.state = GateState::Unlocked(authorization),
            None => self.purge(),
        }
        &self.state
    }

    /// Lock the gate and delete the stored activation
    pub fn lock(&mut self) {
        self.purge();
    }

    fn purge(&mut self) {
        self.state = GateState::Locked;
        for key in [AUTH_CODE_KEY, AUTH_ACTIVATED_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "Could not clear license record");
            }
        }
    }

    fn read_record(&self) -> Option<AuthorizationRecord> {
        let read = |key: &str| -> Option<String> {
            self.store
                .get(key)
                .map_err(|e| tracing::warn!(key, error = %e, "Could not read license record"))
                .ok()
                .flatten()
        };

        let code = read(AUTH_CODE_KEY)?;
        let activated_raw = read(AUTH_ACTIVATED_KEY)?;
        let activated_at = DateTime::parse_from_rfc3339(&activated_raw)
            .map_err(|e| tracing::warn!(error = %e, "Malformed license activation time"))
            .ok()?
            .with_timezone(&Utc);

        Some(AuthorizationRecord { code, activated_at })
    }

    fn write_record(&self, record: &AuthorizationRecord) -> Result<(), StoreError> {
        self.store.set(AUTH_CODE_KEY, &record.code)?;
        self.store
            .set(AUTH_ACTIVATED_KEY, &record.activated_at.to_rfc3339())
    }
}
