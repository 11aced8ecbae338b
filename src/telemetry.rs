//! Tracing bootstrap
//!
//! Structured logging via `tracing`. The engine emits spans and events on
//! the ingest and retrieval paths; embedding this helper is optional and
//! host applications with their own subscriber should skip it.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize a console subscriber honoring `RUST_LOG`
///
/// Defaults to `info` when no filter is set. Safe to call more than once;
/// subsequent calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
