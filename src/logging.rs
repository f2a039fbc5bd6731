//! Tracing subscriber setup.
//!
//! Level defaults to `info` for this crate and `warn` elsewhere;
//! `RUST_LOG` overrides it (e.g. `RUST_LOG=flodepth_service=debug` to see
//! every model attempt).

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "flodepth_service=info,warn";

/// Installs the global fmt subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
