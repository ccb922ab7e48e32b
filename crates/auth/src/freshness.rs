//! Credential-cache freshness decision.
//!
//! The bearer credential caches the identity record's claims so most calls
//! skip the store. `is_fresh` bounds how long the cache may be trusted;
//! `reconcile` folds the store's current view back into the credential once
//! the bound is exceeded. Both are pure: callers supply `now` and the fetched
//! claims, and a new `SessionClaims` value is returned instead of mutating
//! shared state.

use chrono::{DateTime, Duration, Utc};

use crate::claims::{SessionClaims, UserClaims};

/// A credential is fresh iff it carries a subject and was reconciled against
/// the store within the refresh interval. Fresh credentials are trusted
/// as-is; no store access happens for them.
///
/// The interval is the upper bound on revocation propagation delay: a
/// revoked privilege survives at most this long before the next call is
/// forced through `reconcile`.
pub fn is_fresh(claims: &SessionClaims, now: DateTime<Utc>, refresh_interval: Duration) -> bool {
    let Some(last_verified_at) = claims.last_verified_at else {
        return false;
    };
    if now.signed_duration_since(last_verified_at) > refresh_interval {
        return false;
    }
    claims.subject.is_some()
}

/// Outcome of reconciling cached claims against the store's current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Store and credential agree on the token version; the credential is
    /// re-hydrated from the store values and re-stamped.
    Refreshed(SessionClaims),
    /// The identity vanished or the version mismatched; the credential is
    /// destroyed, forcing re-authentication on the next guard check.
    Invalidated(SessionClaims),
}

impl Reconciliation {
    pub fn claims(&self) -> &SessionClaims {
        match self {
            Reconciliation::Refreshed(claims) | Reconciliation::Invalidated(claims) => claims,
        }
    }

    pub fn into_claims(self) -> SessionClaims {
        match self {
            Reconciliation::Refreshed(claims) | Reconciliation::Invalidated(claims) => claims,
        }
    }
}

/// Fold the store's current claims into a stale credential.
///
/// Invalidation triggers on a missing identity record, on any version
/// mismatch, and on the asymmetric case where the credential carries no
/// version but the store has already been bumped past zero. Role and scope
/// values never participate in the comparison; the version is the sole
/// revocation signal.
pub fn reconcile(
    session: &SessionClaims,
    current: Option<&UserClaims>,
    now: DateTime<Utc>,
) -> Reconciliation {
    let Some(current) = current else {
        return Reconciliation::Invalidated(SessionClaims::invalidated());
    };

    let mismatch = match session.token_version {
        Some(cached) => cached != current.token_version,
        None => current.token_version > 0,
    };
    if mismatch {
        return Reconciliation::Invalidated(SessionClaims::invalidated());
    }

    Reconciliation::Refreshed(SessionClaims {
        subject: session.subject,
        role: current.role,
        scopes: current.scopes.clone(),
        token_version: Some(current.token_version),
        last_verified_at: Some(now),
    })
}
