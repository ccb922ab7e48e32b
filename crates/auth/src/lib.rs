//! `clavis-auth` — pure claims model (zero-trust boundary).
//!
//! This crate is intentionally decoupled from HTTP and storage: it owns the
//! closed role set, validated scopes, the claims normalizer applied at every
//! boundary crossing, and the credential-cache freshness decision. All
//! functions here are total and non-blocking.

pub mod claims;
pub mod freshness;
pub mod role;
pub mod scope;
pub mod security;

pub use claims::{SessionClaims, UserClaims, normalize_token_version};
pub use freshness::{Reconciliation, is_fresh, reconcile};
pub use role::{Role, normalize_role};
pub use scope::{InvalidScope, Scope, normalize_scopes};
pub use security::SecurityEvent;
