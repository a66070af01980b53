//! Logging Setup
//!
//! Installs the tracing subscriber for binaries and tests embedding the
//! governance layer. Library code only emits through `tracing` macros and
//! never installs a subscriber itself.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber honoring `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once; later calls are no-ops.
pub fn init() {
    init_with_level(Level::INFO);
}

/// Install a formatting subscriber with an explicit default level.
pub fn init_with_level(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .try_init();
}
