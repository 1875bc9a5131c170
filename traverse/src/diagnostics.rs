//! A minimal `tracing_subscriber` installer for binaries and tests that want
//! to see this crate's `debug!`/`trace!` spans.
//!
//! The core itself has no CLI surface (spec.md §6), so this is intentionally
//! a plain builder function rather than `traceconf::TracingConfig`'s
//! `clap`-flattened options: a host wiring this crate into its own CLI
//! already owns its own trace-level flags and should set the global
//! subscriber itself.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a `tracing_subscriber` that reads its filter from `RUST_LOG`,
/// falling back to `default_directive` when unset.
///
/// Returns an error if a global subscriber is already installed; callers
/// that don't care (tests racing each other for the global default) should
/// ignore it.
pub fn install(default_directive: &str) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let subscriber = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
}
