//! Request/response DTOs and JSON mapping helpers.

use serde::{Deserialize, Serialize};

use clavis_auth::{Role, Scope, SessionClaims, UserClaims, normalize_scopes};
use clavis_core::UserId;

/// Body of an admin authorization update.
///
/// `Role` and `Scope` deserialization are strict, so a malformed role or a
/// scope that does not match the pattern is rejected at this boundary. The
/// normalizer downstream only ever coerces, it never rejects.
#[derive(Debug, Deserialize)]
pub struct UserAuthorizationInput {
    pub role: Role,
    #[serde(default)]
    pub scopes: Vec<Scope>,
}

impl UserAuthorizationInput {
    /// Deduplicated scope set (validity is already guaranteed by the type).
    pub fn normalized_scopes(&self) -> Vec<Scope> {
        normalize_scopes(self.scopes.iter().map(Scope::as_str))
    }
}

/// Persisted claims as returned to admin callers.
#[derive(Debug, Serialize)]
pub struct ClaimsBody {
    pub role: Role,
    pub scopes: Vec<Scope>,
    pub token_version: u64,
}

impl From<UserClaims> for ClaimsBody {
    fn from(claims: UserClaims) -> Self {
        Self {
            role: claims.role,
            scopes: claims.scopes,
            token_version: claims.token_version,
        }
    }
}

/// The caller's own session view (`/rpc/me`).
#[derive(Debug, Serialize)]
pub struct SessionUserBody {
    pub id: UserId,
    pub role: Role,
    pub scopes: Vec<Scope>,
    pub token_version: Option<u64>,
}

impl SessionUserBody {
    pub fn from_claims(id: UserId, claims: &SessionClaims) -> Self {
        Self {
            id,
            role: claims.role,
            scopes: claims.scopes.clone(),
            token_version: claims.token_version,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RevokeBody {
    pub token_version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_rejects_malformed_scopes() {
        let ok: Result<UserAuthorizationInput, _> =
            serde_json::from_str(r#"{"role":"user","scopes":["auth:read"]}"#);
        assert!(ok.is_ok());

        let bad: Result<UserAuthorizationInput, _> =
            serde_json::from_str(r#"{"role":"user","scopes":["not a scope"]}"#);
        assert!(bad.is_err());

        let bad_role: Result<UserAuthorizationInput, _> =
            serde_json::from_str(r#"{"role":"root","scopes":[]}"#);
        assert!(bad_role.is_err());
    }

    #[test]
    fn input_scopes_default_to_empty_and_deduplicate() {
        let input: UserAuthorizationInput = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert!(input.normalized_scopes().is_empty());

        let input: UserAuthorizationInput =
            serde_json::from_str(r#"{"role":"admin","scopes":["a:b","a:b"]}"#).unwrap();
        assert_eq!(input.normalized_scopes().len(), 1);
    }
}
