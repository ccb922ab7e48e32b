//! Authorization chain.
//!
//! Endpoints compose an ordered stack of guard levels; evaluation walks the
//! stack left to right and a denial at any level short-circuits without
//! evaluating later levels or the procedure body. Role and scope checks only
//! run after authentication has succeeded, so authorization alone never
//! reveals whether a resource exists.

use chrono::Utc;
use thiserror::Error;

use clavis_auth::{Reconciliation, Role, Scope, SessionClaims, reconcile};
use clavis_infra::{ClaimsStore, ClaimsStoreError};

use crate::context::CallContext;

/// A single level in the authorization chain.
#[derive(Debug, Clone)]
pub enum GuardLevel {
    /// No checks; anonymous and unresolved calls pass.
    Public,
    /// Requires a resolved subject; trusts the (bounded-staleness) cached
    /// claims without forcing a store round trip.
    Authenticated,
    /// Requires a live reconciliation against the claims store during this
    /// call. For privilege-sensitive operations where the bounded staleness
    /// window of `Authenticated` is unacceptable.
    FreshlyReverified,
    /// Requires the (re-verified) role to be in the allowed set.
    RoleGated(Vec<Role>),
    /// Requires every listed scope to be present (exact match).
    ScopeGated(Vec<Scope>),
}

/// Typed guard failure.
///
/// `Unauthorized` and `Forbidden` are denials; `Store` wraps an unexpected
/// store failure and propagates opaquely. Inner denials are never downgraded
/// by outer levels.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Store(#[from] ClaimsStoreError),
}

/// An ordered guard stack for one endpoint.
#[derive(Debug, Clone)]
pub struct Procedure {
    levels: Vec<GuardLevel>,
}

/// No authorization.
pub fn public_procedure() -> Procedure {
    Procedure {
        levels: vec![GuardLevel::Public],
    }
}

/// Requires an authenticated caller (cached claims suffice).
pub fn protected_procedure() -> Procedure {
    Procedure {
        levels: vec![GuardLevel::Public, GuardLevel::Authenticated],
    }
}

/// Requires an authenticated caller re-verified against the store this call.
pub fn strict_protected_procedure() -> Procedure {
    Procedure {
        levels: vec![
            GuardLevel::Public,
            GuardLevel::Authenticated,
            GuardLevel::FreshlyReverified,
        ],
    }
}

/// Strictly re-verified, then role-gated.
pub fn role_protected_procedure(roles: impl IntoIterator<Item = Role>) -> Procedure {
    let mut procedure = strict_protected_procedure();
    procedure
        .levels
        .push(GuardLevel::RoleGated(roles.into_iter().collect()));
    procedure
}

/// Strictly re-verified, then scope-gated.
pub fn scope_protected_procedure(scopes: impl IntoIterator<Item = Scope>) -> Procedure {
    let mut procedure = strict_protected_procedure();
    procedure
        .levels
        .push(GuardLevel::ScopeGated(scopes.into_iter().collect()));
    procedure
}

impl Procedure {
    /// Evaluate the guard stack against the call context.
    ///
    /// Returns the authorized claims, or `None` when the stack never
    /// required authentication.
    pub async fn authorize(
        &self,
        ctx: &mut CallContext,
        store: &dyn ClaimsStore,
    ) -> Result<Option<SessionClaims>, GuardError> {
        let mut authorized: Option<SessionClaims> = None;

        for level in &self.levels {
            match level {
                GuardLevel::Public => {}

                GuardLevel::Authenticated => {
                    let user = ctx.resolve().ok_or(GuardError::Unauthorized)?;
                    authorized = Some(user.clone());
                }

                GuardLevel::FreshlyReverified => {
                    let user = ctx.resolve().cloned().ok_or(GuardError::Unauthorized)?;
                    let subject = user.subject.ok_or(GuardError::Unauthorized)?;

                    let current = store.read(subject).await?;
                    match reconcile(&user, current.as_ref(), Utc::now()) {
                        Reconciliation::Refreshed(fresh) => {
                            ctx.replace_session(fresh.clone());
                            authorized = Some(fresh);
                        }
                        Reconciliation::Invalidated(cleared) => {
                            ctx.replace_session(cleared);
                            return Err(GuardError::Unauthorized);
                        }
                    }
                }

                GuardLevel::RoleGated(allowed) => {
                    let user = authorized.as_ref().ok_or(GuardError::Unauthorized)?;
                    if !allowed.contains(&user.role) {
                        return Err(GuardError::Forbidden);
                    }
                }

                GuardLevel::ScopeGated(required) => {
                    let user = authorized.as_ref().ok_or(GuardError::Unauthorized)?;
                    if !required.iter().all(|scope| user.has_scope(scope)) {
                        return Err(GuardError::Forbidden);
                    }
                }
            }
        }

        Ok(authorized)
    }

    /// Like [`authorize`](Self::authorize), for stacks that require
    /// authentication: the absence of claims is itself a denial.
    pub async fn authorize_user(
        &self,
        ctx: &mut CallContext,
        store: &dyn ClaimsStore,
    ) -> Result<SessionClaims, GuardError> {
        self.authorize(ctx, store)
            .await?
            .ok_or(GuardError::Unauthorized)
    }
}
