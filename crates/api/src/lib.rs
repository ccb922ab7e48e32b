//! `clavis-api` — RPC surface for the claims-versioning core.
//!
//! Inbound calls carry a signed bearer credential. The middleware decides
//! credential freshness (reconciling against the claims store when stale),
//! then each endpoint composes an ordered guard chain over the call context
//! before its body runs.

pub mod app;
pub mod config;
pub mod context;
pub mod guards;
pub mod middleware;
pub mod request_context;
pub mod session;
