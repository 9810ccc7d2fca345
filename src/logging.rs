//! Tracing subscriber setup for the codexup binary.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` when
/// `verbose` is true. Later calls are ignored since the global subscriber can
/// only be set once per process.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}
