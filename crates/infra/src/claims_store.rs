use async_trait::async_trait;
use thiserror::Error;

use clavis_auth::{Role, Scope, UserClaims};
use clavis_core::UserId;

/// Claims Store failure.
///
/// `NotFound`, `CannotDemoteLastAdmin` and `AlreadyInitialized` are
/// deterministic outcomes callers translate into typed responses; `Database`
/// wraps unexpected backend failures and propagates opaquely (no retry at
/// this layer).
#[derive(Debug, Error)]
pub enum ClaimsStoreError {
    #[error("user not found")]
    NotFound,

    /// Demotion would leave zero administrators.
    #[error("cannot remove admin role from the last administrator")]
    CannotDemoteLastAdmin,

    /// Bootstrap refused: an administrator already exists.
    #[error("an administrator already exists")]
    AlreadyInitialized,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Transactional persistence for per-user role, scope set, and token version.
///
/// Every operation is atomic: a call cancelled before commit leaves no
/// partial state. Writes that succeed always bump `token_version` by exactly
/// one, which is what invalidates outstanding credentials for that user.
#[async_trait]
pub trait ClaimsStore: Send + Sync {
    /// Current claims for a user, normalized; `None` if the identity record
    /// does not exist.
    async fn read(&self, user_id: UserId) -> Result<Option<UserClaims>, ClaimsStoreError>;

    /// Replace role and scopes inside a serialized transaction.
    ///
    /// The version bump happens even when the new values equal the current
    /// ones, so any authorization-relevant write revokes outstanding
    /// credentials. Demoting the last administrator fails with
    /// `CannotDemoteLastAdmin` and leaves the record untouched.
    async fn update_role_and_scopes(
        &self,
        user_id: UserId,
        role: Role,
        scopes: Vec<Scope>,
    ) -> Result<UserClaims, ClaimsStoreError>;

    /// Bump the token version without altering role or scopes, forcing
    /// re-authentication while keeping privileges. Returns the new version.
    async fn revoke(&self, user_id: UserId) -> Result<u64, ClaimsStoreError>;

    /// Promote the given user to the first administrator.
    ///
    /// Serialized with updates; succeeds only while no administrator exists.
    async fn bootstrap_first_admin(
        &self,
        user_id: UserId,
        scopes: Vec<Scope>,
    ) -> Result<UserClaims, ClaimsStoreError>;

    async fn has_any_admin(&self) -> Result<bool, ClaimsStoreError>;
}
