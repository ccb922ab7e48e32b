//! Per-call context.
//!
//! One `CallContext` exists per inbound call and is owned exclusively by it.
//! Resolution is memoized: the first guard that needs the caller's identity
//! derives the auth state, and repeated guard checks reuse the cached result
//! instead of re-deriving it.

use clavis_auth::SessionClaims;

/// Tagged authorization state of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No guard has looked at the credential yet.
    Unresolved,
    /// Resolution ran and found no authenticated subject.
    Anonymous,
    /// Resolution ran and found an authenticated subject.
    Authenticated,
}

/// Request correlation identifiers threaded through for audit logging.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub request_id: String,
    pub correlation_id: String,
    pub client_ip: Option<String>,
}

/// Ephemeral context for one inbound call.
#[derive(Debug, Clone)]
pub struct CallContext {
    session: Option<SessionClaims>,
    state: AuthState,
    pub meta: RequestMeta,
}

impl CallContext {
    /// `session` is the credential's view after the freshness check; `None`
    /// when no (valid) credential accompanied the call.
    pub fn new(session: Option<SessionClaims>, meta: RequestMeta) -> Self {
        Self {
            session,
            state: AuthState::Unresolved,
            meta,
        }
    }

    /// Resolve the caller's identity. Idempotent: the first call tags the
    /// auth state, subsequent calls return the memoized result.
    pub fn resolve(&mut self) -> Option<&SessionClaims> {
        if self.state == AuthState::Unresolved {
            self.state = match &self.session {
                Some(claims) if claims.is_authenticated() => AuthState::Authenticated,
                _ => AuthState::Anonymous,
            };
        }
        match self.state {
            AuthState::Authenticated => self.session.as_ref(),
            _ => None,
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.state
    }

    pub fn session(&self) -> Option<&SessionClaims> {
        self.session.as_ref()
    }

    /// Overwrite the memoized claims after a live re-verification.
    pub(crate) fn replace_session(&mut self, claims: SessionClaims) {
        self.state = if claims.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        };
        self.session = Some(claims);
    }
}
