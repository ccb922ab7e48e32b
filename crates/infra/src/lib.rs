//! `clavis-infra` — persistence for user claims.
//!
//! The Claims Store is the single shared mutable resource across calls. It
//! exposes atomic read/update/revoke/bootstrap operations; the administrator
//! cardinality invariant is enforced inside serialized transactions here, not
//! in the callers.

pub mod claims_store;
pub mod memory;
pub mod postgres;

pub use claims_store::{ClaimsStore, ClaimsStoreError};
pub use memory::InMemoryClaimsStore;
pub use postgres::{PostgresClaimsStore, run_migrations};
