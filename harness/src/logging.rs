//! Development-time tracing for debugging the harness.
//!
//! Two logging channels exist and stay separate:
//!
//! - **Tracing (this module)**: harness diagnostics via `RUST_LOG`, written
//!   to stderr, never part of captured run artifacts.
//! - **Bundler diagnostics**: controlled through the synthesized
//!   `infrastructureLogging` level (suppressed unless the run is verbose).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output goes to stderr in compact
/// format, e.g. `RUST_LOG=harness=debug hotcase run my-case`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
