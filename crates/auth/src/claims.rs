use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clavis_core::UserId;

use crate::{Role, Scope};

/// Claims held by the persistent identity record (the source of truth).
///
/// `token_version` is a monotonic counter whose increment is the sole
/// revocation mechanism: any mismatch between a cached and stored value
/// invalidates the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub role: Role,
    pub scopes: Vec<Scope>,
    pub token_version: u64,
}

/// Claims cached inside the long-lived bearer credential.
///
/// A mirror of the identity record at last verification, never the source
/// of truth. All fields are optional because an invalidated credential keeps
/// its carrier but loses its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub subject: Option<UserId>,
    pub role: Role,
    pub scopes: Vec<Scope>,
    pub token_version: Option<u64>,
    pub last_verified_at: Option<DateTime<Utc>>,
}

impl SessionClaims {
    /// Hydrate a credential from the identity record at sign-in.
    pub fn from_user_claims(subject: UserId, claims: &UserClaims, now: DateTime<Utc>) -> Self {
        Self {
            subject: Some(subject),
            role: claims.role,
            scopes: claims.scopes.clone(),
            token_version: Some(claims.token_version),
            last_verified_at: Some(now),
        }
    }

    /// Destroyed credential: subject cleared, role reset to default-deny,
    /// scopes emptied. The next authentication guard will reject it.
    pub fn invalidated() -> Self {
        Self {
            subject: None,
            role: Role::User,
            scopes: Vec::new(),
            token_version: None,
            last_verified_at: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.subject.is_some()
    }

    pub fn has_scope(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }
}

/// Coerce an untrusted token version into a valid one.
///
/// Anything other than a non-negative integer collapses to `0`. Total;
/// never fails.
pub fn normalize_token_version(value: Option<i64>) -> u64 {
    match value {
        Some(v) if v >= 0 => v as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_token_version_accepts_non_negative() {
        assert_eq!(normalize_token_version(Some(0)), 0);
        assert_eq!(normalize_token_version(Some(7)), 7);
    }

    #[test]
    fn normalize_token_version_collapses_invalid_to_zero() {
        assert_eq!(normalize_token_version(None), 0);
        assert_eq!(normalize_token_version(Some(-1)), 0);
        assert_eq!(normalize_token_version(Some(i64::MIN)), 0);
    }

    #[test]
    fn invalidated_claims_are_default_deny() {
        let claims = SessionClaims::invalidated();
        assert_eq!(claims.subject, None);
        assert_eq!(claims.role, Role::User);
        assert!(claims.scopes.is_empty());
        assert_eq!(claims.token_version, None);
        assert_eq!(claims.last_verified_at, None);
        assert!(!claims.is_authenticated());
    }

    #[test]
    fn hydration_copies_the_identity_record() {
        let user = UserClaims {
            role: Role::Admin,
            scopes: vec![Scope::parse("auth:read").unwrap()],
            token_version: 3,
        };
        let now = Utc::now();
        let session = SessionClaims::from_user_claims(UserId::new(), &user, now);

        assert!(session.is_authenticated());
        assert_eq!(session.role, Role::Admin);
        assert_eq!(session.scopes, user.scopes);
        assert_eq!(session.token_version, Some(3));
        assert_eq!(session.last_verified_at, Some(now));
    }

    proptest! {
        #[test]
        fn normalize_token_version_is_idempotent(value in proptest::option::of(any::<i64>())) {
            let once = normalize_token_version(value);
            prop_assert_eq!(normalize_token_version(Some(once as i64)), once);
        }
    }
}
