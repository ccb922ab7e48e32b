//! `clavis-observability` — process-wide logging/tracing wiring.

pub mod tracing;

pub use crate::tracing::init;
