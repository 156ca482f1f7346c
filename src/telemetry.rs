//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. `verbosity` follows the CLI's `-v`/`-q`
/// counting convention: 0 is the default, positive values increase verbosity.
pub fn init(verbosity: i8) {
    let default_directive = match verbosity {
        v if v <= -1 => "papergather=warn",
        0 => "papergather=info",
        _ => "papergather=debug",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
