//! Tracing/logging bootstrap (§A.1 of SPEC_FULL.md).

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber configured from `RUST_LOG`
/// (falling back to `info`), the way the teacher's example binaries call
/// `init_tracing()` before building the app.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
