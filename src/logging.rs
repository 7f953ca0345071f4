//! Process-wide tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: compact output, level taken from the
/// `POSTERN_LOG` environment variable (TRACE for this crate in debug
/// builds, INFO otherwise).
///
/// Library users who already run a subscriber should skip this; it is for
/// the binary and for ad-hoc embedding.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init() {
    let default = if cfg!(debug_assertions) {
        "postern=trace"
    } else {
        "postern=info"
    };

    let filter =
        EnvFilter::try_from_env("POSTERN_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
